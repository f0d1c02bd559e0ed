use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Project {
    #[serde(rename = "_id")]
    pub id: uuid::Uuid,
    pub name: String,
    pub owner: uuid::Uuid,
    #[serde(default)]
    pub crash_logs: Vec<uuid::Uuid>,
    #[serde(with = "crate::timestamp")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NewProject {
    pub name: String,
    pub owner: uuid::Uuid,
}

impl From<NewProject> for Project {
    fn from(project: NewProject) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            name: project.name,
            owner: project.owner,
            crash_logs: Vec::new(),
            created_at: Utc::now(),
        }
    }
}
