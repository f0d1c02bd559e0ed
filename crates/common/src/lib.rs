pub mod password;
pub mod settings;

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::io::IsTerminal;
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use settings::Logger;

/// Name of the identifier field inside stored documents.
pub const ID_FIELD: &str = "_id";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }

    /// Accepts the directions a client may send: `asc`/`desc`,
    /// `ascending`/`descending` or `1`/`-1`.
    pub fn from_json(value: &serde_json::Value) -> Option<SortOrder> {
        match value {
            serde_json::Value::String(s) => match s.to_ascii_lowercase().as_str() {
                "asc" | "ascending" | "1" => Some(SortOrder::Ascending),
                "desc" | "descending" | "-1" => Some(SortOrder::Descending),
                _ => None,
            },
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(1) => Some(SortOrder::Ascending),
                Some(-1) => Some(SortOrder::Descending),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Equality match on a (dotted) document field, e.g. `github.id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldFilter {
    pub field: String,
    pub value: serde_json::Value,
}

impl FieldFilter {
    pub fn new(field: &str, value: impl Into<serde_json::Value>) -> Self {
        Self {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn path(&self) -> Vec<String> {
        self.field.split('.').map(str::to_string).collect()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryParams {
    #[serde(default)]
    pub sorting: VecDeque<(String, SortOrder)>,
    pub limit: Option<usize>,
    pub skip: Option<usize>,
    pub filter: Option<FieldFilter>,
}

impl QueryParams {
    pub fn new(limit: Option<usize>, skip: Option<usize>, sort: Option<&str>) -> Self {
        Self {
            sorting: sort.map(Self::parse_sort).unwrap_or_default(),
            limit,
            skip,
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: FieldFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Parses a JSON-encoded `{field: direction}` map.
    ///
    /// Malformed input yields no sorting at all; entries with an unknown
    /// direction are skipped. The public `id` key is mapped onto the stored
    /// identifier field.
    pub fn parse_sort(raw: &str) -> VecDeque<(String, SortOrder)> {
        let map = match serde_json::from_str::<indexmap::IndexMap<String, serde_json::Value>>(raw)
        {
            Ok(map) => map,
            Err(err) => {
                warn!("Ignoring malformed sort specification {raw:?}: {err}");
                return VecDeque::new();
            }
        };

        map.into_iter()
            .filter_map(|(field, direction)| {
                let order = SortOrder::from_json(&direction)?;
                let field = if field == "id" { ID_FIELD.to_string() } else { field };
                Some((field, order))
            })
            .collect()
    }
}

pub fn init_logging(logger: &Logger) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logger.level.as_str()));

    let stdout_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stdout().is_terminal());

    let (file_layer, guard) = if logger.directory.is_empty() {
        (None, None)
    } else {
        let file_appender = tracing_appender::rolling::never(&logger.directory, "crash-reporter.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        (Some(fmt::layer().with_ansi(false).with_writer(non_blocking)), Some(guard))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .ok();

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_sort_translates_id_key() {
        let sorting = QueryParams::parse_sort(r#"{"id":"desc","username":1}"#);
        assert_eq!(
            sorting,
            VecDeque::from(vec![
                ("_id".to_string(), SortOrder::Descending),
                ("username".to_string(), SortOrder::Ascending),
            ])
        );
    }

    #[test]
    fn parse_sort_ignores_malformed_input() {
        assert!(QueryParams::parse_sort("not json").is_empty());
        assert!(QueryParams::parse_sort(r#"["username"]"#).is_empty());
    }

    #[test]
    fn parse_sort_skips_unknown_directions() {
        let sorting = QueryParams::parse_sort(r#"{"email":"sideways","date":"asc"}"#);
        assert_eq!(sorting, VecDeque::from(vec![("date".to_string(), SortOrder::Ascending)]));
    }

    #[test]
    fn query_params_without_sort() {
        let params = QueryParams::new(Some(5), Some(10), None);
        assert_eq!(params.limit, Some(5));
        assert_eq!(params.skip, Some(10));
        assert!(params.sorting.is_empty());
        assert!(params.filter.is_none());
    }

    #[test]
    fn field_filter_path_splits_on_dots() {
        let filter = FieldFilter::new("github.id", "42");
        assert_eq!(filter.path(), vec!["github".to_string(), "id".to_string()]);
        assert_eq!(filter.value, serde_json::json!("42"));
    }
}
