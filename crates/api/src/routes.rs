use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

use crate::auth::{AuthLayer, RequiredRole};
use crate::crash_log::CrashLogApi;
use crate::projects::ProjectsApi;
use crate::state::AppState;
use crate::token::login;
use crate::users::UsersApi;

// Multipart framing and text fields around the minidump.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn routes(app_state: AppState) -> Router<AppState> {
    let authenticated = || AuthLayer::new(app_state.clone(), RequiredRole::Authenticated);
    let admin = || AuthLayer::new(app_state.clone(), RequiredRole::Admin);

    Router::new()
        // Crash reporter clients
        .route("/crash-logs/projects", post(CrashLogApi::upload_without_project))
        .route("/crash-logs/projects/", post(CrashLogApi::upload_without_project))
        .route("/crash-logs/projects/{project_id}", post(CrashLogApi::upload))
        .route("/crash-logs/downloads/{file}", get(CrashLogApi::download))
        .route("/auth/login", post(login))
        // Users
        .route("/users", get(UsersApi::list).post(UsersApi::create).layer(admin()))
        .route("/users/roles", get(UsersApi::roles))
        .route("/users/current", get(UsersApi::current).layer(authenticated()))
        .route(
            "/users/current/password",
            put(UsersApi::change_current_password).layer(authenticated()),
        )
        .route(
            "/users/current/email",
            put(UsersApi::change_current_email).layer(authenticated()),
        )
        .route("/users/{id}/password", put(UsersApi::change_password).layer(admin()))
        .route(
            "/users/{id}",
            put(UsersApi::update).delete(UsersApi::remove).layer(admin()),
        )
        // Projects
        .route("/projects", get(ProjectsApi::list).post(ProjectsApi::create).layer(admin()))
        .route(
            "/projects/{id}",
            get(ProjectsApi::get).delete(ProjectsApi::delete).layer(admin()),
        )
        .route("/projects/{id}/crash-logs", get(ProjectsApi::crash_logs).layer(admin()))
        .route("/live", get(super::health::live))
        .route("/ready", get(super::health::ready))
}

pub fn app(app_state: AppState) -> Router {
    let body_limit = usize::try_from(app_state.settings.storage.max_minidump_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .merge(routes(app_state.clone()))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
