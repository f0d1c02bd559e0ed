use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{Page, ServiceError};
use common::QueryParams;
use data::crash_log::CrashLog;
use data::project::{NewProject, Project};
use data::user::User;
use repos::Repo;
use repos::crash_log::CrashLogRepo;

#[derive(Debug, Clone)]
pub struct ProjectService {
    repo: Repo,
}

impl ProjectService {
    pub fn new(repo: Repo) -> Self {
        Self { repo }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Project, ServiceError> {
        self.repo
            .projects
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Project not found".to_string()))
    }

    /// Creates a project owned by `owner` and records it in the owner's
    /// project list.
    #[instrument(skip(self, owner), fields(owner = %owner.id))]
    pub async fn create(&self, owner: &User, name: &str) -> Result<Project, ServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::BadRequest("Project name is required".to_string()));
        }

        let project = Project::from(NewProject {
            name: name.to_string(),
            owner: owner.id,
        });
        self.repo.projects.save(&project).await?;

        let mut owner = self
            .repo
            .users
            .find_by_id(owner.id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;
        owner.projects.push(project.id);
        self.repo.users.update(&owner).await?;

        info!("Created project {} ({})", project.name, project.id);
        Ok(project)
    }

    /// Deletes `project` with all of its crash logs and detaches it from its
    /// owner. Returns the deleted crash logs.
    #[instrument(skip(self, project), fields(project = %project.id))]
    pub async fn delete_recursively(&self, project: &Project) -> Result<Vec<CrashLog>, ServiceError> {
        let mut crash_logs =
            CrashLogRepo::find_all_by_project(self.repo.crash_logs.as_ref(), project.id).await?;
        for id in &project.crash_logs {
            if !crash_logs.iter().any(|crash_log| crash_log.id == *id) {
                if let Some(crash_log) = self.repo.crash_logs.find_by_id(*id).await? {
                    crash_logs.push(crash_log);
                }
            }
        }

        for crash_log in &crash_logs {
            self.repo.crash_logs.delete(crash_log.id).await?;
        }
        self.repo.projects.delete(project.id).await?;

        if let Some(mut owner) = self.repo.users.find_by_id(project.owner).await? {
            owner.projects.retain(|id| *id != project.id);
            self.repo.users.update(&owner).await?;
        }

        info!(
            "Deleted project {} with {} crash logs",
            project.id,
            crash_logs.len()
        );
        Ok(crash_logs)
    }

    /// Deletes every listed project that still exists.
    pub async fn delete_recursively_by_ids(
        &self,
        ids: &[Uuid],
    ) -> Result<Vec<CrashLog>, ServiceError> {
        let mut removed = Vec::new();
        for id in ids {
            match self.repo.projects.find_by_id(*id).await? {
                Some(project) => removed.extend(self.delete_recursively(&project).await?),
                None => warn!("Project {id} already gone, skipping"),
            }
        }
        Ok(removed)
    }

    pub async fn list(&self, params: QueryParams) -> Result<Page<Project>, ServiceError> {
        let total = self.repo.projects.count(None).await?;
        let items = self.repo.projects.find_all(&params).await?;
        Ok(Page { total, items })
    }

    pub async fn list_crash_logs(
        &self,
        project_id: Uuid,
        params: QueryParams,
    ) -> Result<Page<CrashLog>, ServiceError> {
        let project = self.find_by_id(project_id).await?;
        let dao = self.repo.crash_logs.as_ref();

        let total = CrashLogRepo::count_by_project(dao, project.id).await?;
        let items = CrashLogRepo::find_by_project(dao, project.id, params).await?;
        Ok(Page { total, items })
    }
}
