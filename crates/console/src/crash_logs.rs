use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::{ConsoleError, server_url};
use common::QueryParams;
use data::crash_log::CrashLog;

pub const ROWS_PER_PAGE: [usize; 3] = [5, 10, 15];
pub const DEFAULT_ORDER: &str = "-date";

const DISPLAY_DATE_FORMAT: &str = "%b-%d-%Y";
const NOTIFICATION_DATE_FORMAT: &str = "%b-%d-%Y %H:%M";

/// Listing request for one page of a project's crash logs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrashLogQuery {
    pub limit: usize,
    pub skip: usize,
    /// JSON object, e.g. `{"date":"desc"}`.
    pub sort: String,
}

impl CrashLogQuery {
    pub fn to_params(&self) -> QueryParams {
        QueryParams::new(Some(self.limit), Some(self.skip), Some(self.sort.as_str()))
    }

    /// `{base}/projects/{project}/crash-logs?limit=..&skip=..&sort=..`
    pub fn url(&self, base: &str, project: uuid::Uuid) -> Result<Url, ConsoleError> {
        let mut url = server_url(base, &["projects", &project.to_string(), "crash-logs"])?;
        url.query_pairs_mut()
            .append_pair("limit", &self.limit.to_string())
            .append_pair("skip", &self.skip.to_string())
            .append_pair("sort", &self.sort);
        Ok(url)
    }
}

/// Range of rows shown, 1-based and inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemRange {
    pub min: usize,
    pub max: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrashLogRow {
    pub crash_log: CrashLog,
    pub display_date: String,
    pub notification_date: String,
    pub download_url: Option<String>,
}

impl CrashLogRow {
    fn new(crash_log: CrashLog, base: &str) -> Result<Self, ConsoleError> {
        let download_url = crash_log
            .upload_file_minidump
            .as_deref()
            .map(|name| download_url(base, name))
            .transpose()?;

        Ok(Self {
            display_date: display_date(&crash_log.date),
            notification_date: notification_date(&crash_log.date),
            download_url,
            crash_log,
        })
    }
}

pub fn display_date(date: &DateTime<Utc>) -> String {
    date.format(DISPLAY_DATE_FORMAT).to_string()
}

pub fn notification_date(date: &DateTime<Utc>) -> String {
    date.format(NOTIFICATION_DATE_FORMAT).to_string()
}

/// Public URL of a stored minidump.
pub fn download_url(base: &str, filename: &str) -> Result<String, ConsoleError> {
    Ok(server_url(base, &["crash-logs", "downloads", filename])?.to_string())
}

/// Pagination and ordering state of the crash-log table of one project.
#[derive(Debug, Clone)]
pub struct CrashLogsView {
    base_url: String,
    page: usize,
    limit: usize,
    order: String,
    total: u64,
    items: ItemRange,
    pages: Vec<usize>,
    rows: Vec<CrashLogRow>,
    loaded: bool,
}

impl CrashLogsView {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            page: 1,
            limit: ROWS_PER_PAGE[0],
            order: DEFAULT_ORDER.to_string(),
            total: 0,
            items: ItemRange::default(),
            pages: Vec::new(),
            rows: Vec::new(),
            loaded: false,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn order(&self) -> &str {
        &self.order
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn items(&self) -> ItemRange {
        self.items
    }

    pub fn pages(&self) -> &[usize] {
        &self.pages
    }

    pub fn rows(&self) -> &[CrashLogRow] {
        &self.rows
    }

    /// The query for the current state.
    pub fn query(&self) -> CrashLogQuery {
        let (field, direction) = match self.order.strip_prefix('-') {
            Some(field) => (field, "desc"),
            None => (self.order.as_str(), "asc"),
        };

        let mut sort = serde_json::Map::new();
        sort.insert(field.to_string(), direction.into());

        CrashLogQuery {
            limit: self.limit,
            skip: self.limit * (self.page - 1),
            sort: serde_json::Value::Object(sort).to_string(),
        }
    }

    /// Stays on the last page once a result has told how many there are.
    pub fn next_page(&mut self) -> CrashLogQuery {
        if !self.loaded || self.page < self.pages.len() {
            self.page += 1;
        }
        self.query()
    }

    pub fn previous_page(&mut self) -> CrashLogQuery {
        self.page = self.page.saturating_sub(1).max(1);
        self.query()
    }

    pub fn change_rows_per_page(&mut self, limit: usize) -> Result<CrashLogQuery, ConsoleError> {
        if !ROWS_PER_PAGE.contains(&limit) {
            return Err(ConsoleError::InvalidPageSize(limit));
        }
        self.limit = limit;
        self.page = 1;
        self.loaded = false;
        Ok(self.query())
    }

    /// `field` sorts ascending, `-field` descending. An empty expression
    /// restores the default order.
    pub fn set_order(&mut self, order: &str) -> CrashLogQuery {
        let order = order.trim();
        self.order = if order.is_empty() || order == "-" {
            DEFAULT_ORDER.to_string()
        } else {
            order.to_string()
        };
        self.query()
    }

    /// Takes in the result of the last query.
    pub fn apply_page(&mut self, total: u64, crash_logs: Vec<CrashLog>) -> Result<(), ConsoleError> {
        self.rows = crash_logs
            .into_iter()
            .map(|crash_log| CrashLogRow::new(crash_log, &self.base_url))
            .collect::<Result<_, _>>()?;
        self.total = total;

        let total = usize::try_from(total).unwrap_or(usize::MAX);
        self.items = ItemRange {
            min: self.limit * (self.page - 1) + 1,
            max: (self.limit * self.page).min(total),
        };
        self.pages = (1..=total.div_ceil(self.limit)).collect();
        self.loaded = true;

        debug!(
            page = self.page,
            total = self.total,
            "Applied crash log page of {} rows",
            self.rows.len()
        );
        Ok(())
    }
}
