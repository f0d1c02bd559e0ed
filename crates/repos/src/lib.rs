pub mod crash_log;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod project;
pub mod user;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use sqlx::PgPool;
use std::fmt::Debug;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::RepoError;
use crate::memory::MemoryDao;
use crate::postgres::PgDao;
pub use common::{FieldFilter, QueryParams, SortOrder};
use data::{crash_log::CrashLog, project::Project, user::User};

pub trait Document: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    const COLLECTION: &'static str;

    const SORTABLE_FIELDS: &'static [&'static str];

    fn id(&self) -> Uuid;

    // Key that no two documents of the collection may share.
    fn unique_key(&self) -> Option<String> {
        None
    }
}

#[async_trait]
pub trait Dao<T: Document>: Send + Sync + Debug {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<T>, RepoError>;

    async fn save(&self, document: &T) -> Result<T, RepoError>;

    async fn update(&self, document: &T) -> Result<Option<T>, RepoError>;

    async fn delete(&self, id: Uuid) -> Result<bool, RepoError>;

    async fn find_all(&self, params: &QueryParams) -> Result<Vec<T>, RepoError>;

    async fn find_all_by_field(
        &self,
        field: &str,
        value: serde_json::Value,
    ) -> Result<Vec<T>, RepoError> {
        let params = QueryParams::default().with_filter(FieldFilter::new(field, value));
        self.find_all(&params).await
    }

    async fn count(&self, filter: Option<&FieldFilter>) -> Result<u64, RepoError>;

    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

impl Document for User {
    const COLLECTION: &'static str = "users";
    const SORTABLE_FIELDS: &'static [&'static str] =
        &["username", "email", "role", "created_at"];

    fn id(&self) -> Uuid {
        self.id
    }

    // Mirrors the documents_local_username_key index.
    fn unique_key(&self) -> Option<String> {
        if self.is_local() {
            self.username.clone()
        } else {
            None
        }
    }
}

impl Document for Project {
    const COLLECTION: &'static str = "projects";
    const SORTABLE_FIELDS: &'static [&'static str] = &["name", "owner", "created_at"];

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Document for CrashLog {
    const COLLECTION: &'static str = "crash_logs";
    const SORTABLE_FIELDS: &'static [&'static str] = &[
        "date",
        "ver",
        "platform",
        "process_type",
        "guid",
        "_version",
        "_productName",
        "prod",
        "_companyName",
    ];

    fn id(&self) -> Uuid {
        self.id
    }
}

pub(crate) fn is_sortable<T: Document>(field: &str) -> bool {
    field == common::ID_FIELD || T::SORTABLE_FIELDS.contains(&field)
}

#[derive(Debug, Clone)]
pub struct Repo {
    pub users: Arc<dyn Dao<User>>,
    pub projects: Arc<dyn Dao<Project>>,
    pub crash_logs: Arc<dyn Dao<CrashLog>>,
}

impl Repo {
    pub fn new(pool: PgPool) -> Repo {
        Repo {
            users: Arc::new(PgDao::<User>::new(pool.clone())),
            projects: Arc::new(PgDao::<Project>::new(pool.clone())),
            crash_logs: Arc::new(PgDao::<CrashLog>::new(pool)),
        }
    }

    pub fn in_memory() -> Repo {
        Repo {
            users: Arc::new(MemoryDao::<User>::default()),
            projects: Arc::new(MemoryDao::<Project>::default()),
            crash_logs: Arc::new(MemoryDao::<CrashLog>::default()),
        }
    }

    pub async fn ping(&self) -> Result<(), RepoError> {
        self.users.ping().await
    }
}
