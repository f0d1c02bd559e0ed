use tracing::{debug, instrument};
use uuid::Uuid;

use crate::ServiceError;
use data::crash_log::{CrashLog, NewCrashLog};
use repos::Repo;

#[derive(Debug, Clone)]
pub struct CrashLogService {
    repo: Repo,
}

impl CrashLogService {
    pub fn new(repo: Repo) -> Self {
        Self { repo }
    }

    /// Persists a crash log and appends it to its project's crash-log list.
    #[instrument(skip(self, crash_log), fields(project = %crash_log.project))]
    pub async fn save_new_crash_log(&self, crash_log: NewCrashLog) -> Result<CrashLog, ServiceError> {
        let mut project = self
            .repo
            .projects
            .find_by_id(crash_log.project)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Project not found".to_string()))?;

        let crash_log = CrashLog::from(crash_log);
        self.repo.crash_logs.save(&crash_log).await?;

        project.crash_logs.push(crash_log.id);
        self.repo.projects.update(&project).await?;

        debug!("Stored crash log {}", crash_log.id);
        Ok(crash_log)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<CrashLog, ServiceError> {
        self.repo
            .crash_logs
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Crash log not found".to_string()))
    }
}
