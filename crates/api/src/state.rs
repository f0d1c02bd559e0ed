use axum::extract::FromRef;
use common::settings::Settings;
use object_store::ObjectStore;
use repos::Repo;
use services::crash_log::CrashLogService;
use services::project::ProjectService;
use services::user::UserService;
use std::sync::Arc;

#[derive(FromRef, Debug, Clone)]
pub struct AppState {
    pub repo: Repo,
    pub settings: Arc<Settings>,
    #[from_ref(skip)]
    pub uploads: Arc<dyn ObjectStore>,
    #[from_ref(skip)]
    pub downloads: Arc<dyn ObjectStore>,
}

impl AppState {
    pub fn users(&self) -> UserService {
        UserService::new(self.repo.clone())
    }

    pub fn projects(&self) -> ProjectService {
        ProjectService::new(self.repo.clone())
    }

    pub fn crash_logs(&self) -> CrashLogService {
        CrashLogService::new(self.repo.clone())
    }
}
