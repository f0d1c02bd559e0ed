use serde_json::json;

use crate::Dao;
use crate::error::RepoError;
use data::project::Project;

pub struct ProjectRepo {}

impl ProjectRepo {
    pub async fn find_by_owner(
        dao: &dyn Dao<Project>,
        owner: uuid::Uuid,
    ) -> Result<Vec<Project>, RepoError> {
        dao.find_all_by_field("owner", json!(owner)).await
    }
}
