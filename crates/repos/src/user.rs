use serde_json::json;

use crate::Dao;
use crate::error::RepoError;
use data::user::{Role, User};

pub struct UserRepo {}

impl UserRepo {
    pub async fn find_by_username_for_local(
        dao: &dyn Dao<User>,
        username: &str,
    ) -> Result<Option<User>, RepoError> {
        let users = dao.find_all_by_field("username", json!(username)).await?;
        Ok(users.into_iter().find(User::is_local))
    }

    pub async fn find_all_by_role(dao: &dyn Dao<User>, role: Role) -> Result<Vec<User>, RepoError> {
        dao.find_all_by_field("role", json!(role)).await
    }

    pub async fn find_by_github_id(
        dao: &dyn Dao<User>,
        github_id: &str,
    ) -> Result<Option<User>, RepoError> {
        let users = dao.find_all_by_field("github.id", json!(github_id)).await?;
        Ok(users.into_iter().next())
    }
}
