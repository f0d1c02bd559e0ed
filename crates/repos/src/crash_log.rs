use crate::error::RepoError;
use crate::{Dao, FieldFilter, QueryParams};
use data::crash_log::CrashLog;

pub struct CrashLogRepo {}

impl CrashLogRepo {
    fn project_filter(project: uuid::Uuid) -> FieldFilter {
        FieldFilter::new("project", project.to_string())
    }

    pub async fn find_by_project(
        dao: &dyn Dao<CrashLog>,
        project: uuid::Uuid,
        params: QueryParams,
    ) -> Result<Vec<CrashLog>, RepoError> {
        dao.find_all(&params.with_filter(Self::project_filter(project)))
            .await
    }

    pub async fn count_by_project(
        dao: &dyn Dao<CrashLog>,
        project: uuid::Uuid,
    ) -> Result<u64, RepoError> {
        dao.count(Some(&Self::project_filter(project))).await
    }

    pub async fn find_all_by_project(
        dao: &dyn Dao<CrashLog>,
        project: uuid::Uuid,
    ) -> Result<Vec<CrashLog>, RepoError> {
        Self::find_by_project(dao, project, QueryParams::default()).await
    }
}
