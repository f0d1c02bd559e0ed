use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Form fields a crash reporter client may submit. Anything else is dropped.
pub const CRASH_LOG_FIELDS: &[&str] = &[
    "ver",
    "platform",
    "process_type",
    "guid",
    "_version",
    "_productName",
    "prod",
    "_companyName",
    "extra",
];

/// Multipart field carrying the minidump file.
pub const MINIDUMP_FIELD: &str = "upload_file_minidump";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CrashLog {
    #[serde(rename = "_id")]
    pub id: uuid::Uuid,
    pub project: uuid::Uuid,
    pub ver: Option<String>,
    pub platform: Option<String>,
    pub process_type: Option<String>,
    pub guid: Option<String>,
    #[serde(rename = "_version")]
    pub version: Option<String>,
    #[serde(rename = "_productName")]
    pub product_name: Option<String>,
    pub prod: Option<String>,
    #[serde(rename = "_companyName")]
    pub company_name: Option<String>,
    pub extra: Option<serde_json::Value>,
    pub upload_file_minidump: Option<String>,
    #[serde(with = "crate::timestamp")]
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewCrashLog {
    pub project: uuid::Uuid,
    pub ver: Option<String>,
    pub platform: Option<String>,
    pub process_type: Option<String>,
    pub guid: Option<String>,
    pub version: Option<String>,
    pub product_name: Option<String>,
    pub prod: Option<String>,
    pub company_name: Option<String>,
    pub extra: Option<String>,
    pub upload_file_minidump: Option<String>,
}

impl NewCrashLog {
    /// Builds a crash log from submitted form fields, keeping only the
    /// whitelisted ones.
    pub fn from_fields(
        project: uuid::Uuid,
        fields: &HashMap<String, String>,
        upload_file_minidump: Option<String>,
    ) -> Self {
        let get = |name: &str| fields.get(name).cloned();
        Self {
            project,
            ver: get("ver"),
            platform: get("platform"),
            process_type: get("process_type"),
            guid: get("guid"),
            version: get("_version"),
            product_name: get("_productName"),
            prod: get("prod"),
            company_name: get("_companyName"),
            extra: get("extra"),
            upload_file_minidump,
        }
    }

    pub fn has_declared_fields(fields: &HashMap<String, String>) -> bool {
        CRASH_LOG_FIELDS.iter().any(|name| fields.contains_key(*name))
    }
}

/// Interprets `extra` as JSON when possible, otherwise keeps the raw text.
pub fn parse_extra(raw: String) -> serde_json::Value {
    serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw))
}

impl From<NewCrashLog> for CrashLog {
    fn from(crash_log: NewCrashLog) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            project: crash_log.project,
            ver: crash_log.ver,
            platform: crash_log.platform,
            process_type: crash_log.process_type,
            guid: crash_log.guid,
            version: crash_log.version,
            product_name: crash_log.product_name,
            prod: crash_log.prod,
            company_name: crash_log.company_name,
            extra: crash_log.extra.map(parse_extra),
            upload_file_minidump: crash_log.upload_file_minidump,
            date: Utc::now(),
        }
    }
}
