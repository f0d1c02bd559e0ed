use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use data::crash_log::CrashLog;
use data::project::Project;
use data::user::{Role, User};
use services::Page;

#[derive(Debug, Serialize)]
pub struct GithubResponse {
    pub id: Option<String>,
    #[serde(rename = "profileUrl")]
    pub profile_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Role,
    pub github: GithubResponse,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            github: GithubResponse {
                id: user.github.id.clone(),
                profile_url: user.github.profile_url.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CrashLogResponse {
    pub id: Uuid,
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
    pub upload_file_minidump: Option<String>,
    pub extra: Option<serde_json::Value>,
    pub date: DateTime<Utc>,
}

impl From<&CrashLog> for CrashLogResponse {
    fn from(crash_log: &CrashLog) -> Self {
        Self {
            id: crash_log.id,
            ver: crash_log.ver.clone(),
            platform: crash_log.platform.clone(),
            process_type: crash_log.process_type.clone(),
            guid: crash_log.guid.clone(),
            version: crash_log.version.clone(),
            product_name: crash_log.product_name.clone(),
            prod: crash_log.prod.clone(),
            company_name: crash_log.company_name.clone(),
            upload_file_minidump: crash_log.upload_file_minidump.clone(),
            extra: crash_log.extra.clone(),
            date: crash_log.date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub id: Uuid,
    pub name: String,
    pub owner: Uuid,
    pub crash_logs: usize,
    pub created_at: DateTime<Utc>,
}

impl From<&Project> for ProjectResponse {
    fn from(project: &Project) -> Self {
        Self {
            id: project.id,
            name: project.name.clone(),
            owner: project.owner,
            crash_logs: project.crash_logs.len(),
            created_at: project.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PageResponse<T> {
    pub total: u64,
    pub items: Vec<T>,
}

impl<T> PageResponse<T> {
    pub fn from_page<U>(page: &Page<U>) -> Self
    where
        for<'a> T: From<&'a U>,
    {
        Self {
            total: page.total,
            items: page.items.iter().map(T::from).collect(),
        }
    }
}
