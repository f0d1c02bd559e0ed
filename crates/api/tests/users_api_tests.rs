#![cfg(test)]

use axum::http::StatusCode;
use axum_test::TestServer;
use object_store::memory::InMemory;
use serde_json::{Value, json};
use std::sync::Arc;

use api::routes::app;
use api::state::AppState;
use api::token::generate_jwt;
use data::user::{Role, User};
use repos::Repo;
use testware::setup::TestSetup;
use testware::{
    create_external_user, create_repo, create_settings, create_test_crash_log, create_test_project,
    create_test_user,
};

struct Fixture {
    server: TestServer,
    state: AppState,
    admin: User,
    admin_token: String,
}

impl Fixture {
    fn repo(&self) -> &Repo {
        &self.state.repo
    }

    fn token_for(&self, user: &User) -> String {
        generate_jwt(&self.state.settings, user).unwrap()
    }
}

async fn setup() -> Fixture {
    TestSetup::init();

    let repo = create_repo();
    let settings = create_settings();
    let store = Arc::new(InMemory::new());
    let state = AppState {
        repo: repo.clone(),
        settings: settings.clone(),
        uploads: store.clone(),
        downloads: store,
    };

    let admin = create_test_user(&repo, "admin", Role::Admin, "admin123").await;
    let admin_token = generate_jwt(&settings, &admin).unwrap();
    let server = TestServer::new(app(state.clone())).unwrap();

    Fixture {
        server,
        state,
        admin,
        admin_token,
    }
}

#[tokio::test]
async fn test_list_users_requires_token() {
    let fixture = setup().await;

    let response = fixture.server.get("/users").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    response.assert_json(&json!({ "result": "failed", "error": "missing token" }));

    let response = fixture
        .server
        .get("/users")
        .authorization_bearer("not-a-jwt")
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_list_users_requires_admin() {
    let fixture = setup().await;
    let user = create_test_user(fixture.repo(), "alice", Role::Normal, "secret123").await;

    let response = fixture
        .server
        .get("/users")
        .authorization_bearer(fixture.token_for(&user))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_list_users_with_pagination() {
    let fixture = setup().await;
    for name in ["alice", "bob", "carol"] {
        create_test_user(fixture.repo(), name, Role::Normal, "secret123").await;
    }

    let response = fixture
        .server
        .get("/users")
        .add_query_param("limit", "2")
        .add_query_param("skip", "1")
        .add_query_param("sort", r#"{"username": "asc"}"#)
        .authorization_bearer(&fixture.admin_token)
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["total"], 4);
    let names: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["alice", "bob"]);
}

#[tokio::test]
async fn test_list_users_ignores_malformed_paging() {
    let fixture = setup().await;
    create_test_user(fixture.repo(), "alice", Role::Normal, "secret123").await;

    let response = fixture
        .server
        .get("/users")
        .add_query_param("limit", "many")
        .add_query_param("sort", "{not json")
        .authorization_bearer(&fixture.admin_token)
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["total"], 2);
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_roles_are_public() {
    let fixture = setup().await;

    let response = fixture.server.get("/users/roles").await;
    response.assert_status_ok();
    response.assert_json(&json!(["admin", "normal"]));
}

#[tokio::test]
async fn test_current_user() {
    let fixture = setup().await;

    let response = fixture
        .server
        .get("/users/current")
        .authorization_bearer(&fixture.admin_token)
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["id"], fixture.admin.id.to_string());
    assert_eq!(body["username"], "admin");
    assert_eq!(body["role"], "admin");
    assert!(body.get("local").is_none());
}

#[tokio::test]
async fn test_change_current_password() {
    let fixture = setup().await;

    let response = fixture
        .server
        .put("/users/current/password")
        .authorization_bearer(&fixture.admin_token)
        .json(&json!({ "oldPassword": "wrong-password", "newPassword": "changed123" }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    response.assert_json(&json!({ "result": "failed", "error": "Wrong old password" }));

    let response = fixture
        .server
        .put("/users/current/password")
        .authorization_bearer(&fixture.admin_token)
        .json(&json!({ "oldPassword": "admin123", "newPassword": "new" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["errors"], json!(["New password too short"]));

    let response = fixture
        .server
        .put("/users/current/password")
        .authorization_bearer(&fixture.admin_token)
        .json(&json!({ "oldPassword": "admin123", "newPassword": "changed123" }))
        .await;
    response.assert_status_ok();

    let response = fixture
        .server
        .post("/auth/login")
        .json(&json!({ "username": "admin", "password": "changed123" }))
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_change_current_password_external_user_forbidden() {
    let fixture = setup().await;
    let user = create_external_user(fixture.repo(), "4242", Role::Normal).await;

    let response = fixture
        .server
        .put("/users/current/password")
        .authorization_bearer(fixture.token_for(&user))
        .json(&json!({ "oldPassword": "whatever", "newPassword": "changed123" }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_change_current_email() {
    let fixture = setup().await;

    let response = fixture
        .server
        .put("/users/current/email")
        .authorization_bearer(&fixture.admin_token)
        .json(&json!({ "email": "not-an-email" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = fixture
        .server
        .put("/users/current/email")
        .authorization_bearer(&fixture.admin_token)
        .json(&json!({ "email": "root@example.org" }))
        .await;
    response.assert_status_ok();

    let stored = fixture
        .repo()
        .users
        .find_by_id(fixture.admin.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.email.as_deref(), Some("root@example.org"));
}

#[tokio::test]
async fn test_admin_resets_password() {
    let fixture = setup().await;
    let user = create_test_user(fixture.repo(), "alice", Role::Normal, "secret123").await;

    let response = fixture
        .server
        .put(&format!("/users/{}/password", user.id))
        .authorization_bearer(&fixture.admin_token)
        .json(&json!({ "newPassword": "reset12345" }))
        .await;
    response.assert_status_ok();

    let response = fixture
        .server
        .post("/auth/login")
        .json(&json!({ "username": "alice", "password": "reset12345" }))
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_update_user_role() {
    let fixture = setup().await;
    let user = create_test_user(fixture.repo(), "alice", Role::Normal, "secret123").await;

    let response = fixture
        .server
        .put(&format!("/users/{}", user.id))
        .authorization_bearer(&fixture.admin_token)
        .json(&json!({ "role": "admin", "email": "alice@example.org" }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["role"], "admin");
    assert_eq!(body["email"], "alice@example.org");

    let response = fixture
        .server
        .put(&format!("/users/{}", user.id))
        .authorization_bearer(&fixture.admin_token)
        .json(&json!({ "role": "superuser" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_demote_last_admin_fails() {
    let fixture = setup().await;

    let response = fixture
        .server
        .put(&format!("/users/{}", fixture.admin.id))
        .authorization_bearer(&fixture.admin_token)
        .json(&json!({ "role": "normal" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let stored = fixture
        .repo()
        .users
        .find_by_id(fixture.admin.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.role, Role::Admin);
}

#[tokio::test]
async fn test_delete_last_admin_fails() {
    let fixture = setup().await;

    let response = fixture
        .server
        .delete(&format!("/users/{}", fixture.admin.id))
        .authorization_bearer(&fixture.admin_token)
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_delete_user_removes_projects_and_minidumps() {
    let fixture = setup().await;
    let user = create_test_user(fixture.repo(), "alice", Role::Normal, "secret123").await;
    let project = create_test_project(fixture.repo(), &user, "Workrave").await;
    let crash_log = create_test_crash_log(fixture.repo(), &project, "1.0", Some("dump-1")).await;
    fixture
        .state
        .uploads
        .put(&"dump-1".into(), "MINIDUMP".into())
        .await
        .unwrap();

    let response = fixture
        .server
        .delete(&format!("/users/{}", user.id))
        .authorization_bearer(&fixture.admin_token)
        .await;
    response.assert_status(StatusCode::NO_CONTENT);

    let repo = fixture.repo();
    assert!(repo.users.find_by_id(user.id).await.unwrap().is_none());
    assert!(repo.projects.find_by_id(project.id).await.unwrap().is_none());
    assert!(repo.crash_logs.find_by_id(crash_log.id).await.unwrap().is_none());
    assert!(fixture.state.uploads.get(&"dump-1".into()).await.is_err());
}

#[tokio::test]
async fn test_delete_unknown_user_fails() {
    let fixture = setup().await;

    let response = fixture
        .server
        .delete(&format!("/users/{}", uuid::Uuid::new_v4()))
        .authorization_bearer(&fixture.admin_token)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_user() {
    let fixture = setup().await;

    let response = fixture
        .server
        .post("/users")
        .authorization_bearer(&fixture.admin_token)
        .json(&json!({
            "username": "alice",
            "password": "secret123",
            "email": "alice@example.org",
            "role": "normal"
        }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let body: Value = response.json();
    assert_eq!(body["username"], "alice");
    assert_eq!(body["role"], "normal");

    let response = fixture
        .server
        .post("/auth/login")
        .json(&json!({ "username": "alice", "password": "secret123" }))
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_create_duplicate_user_fails() {
    let fixture = setup().await;

    let response = fixture
        .server
        .post("/users")
        .authorization_bearer(&fixture.admin_token)
        .json(&json!({ "username": "admin", "password": "secret123", "role": "normal" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    response.assert_json(&json!({ "result": "failed", "error": "User already exists" }));
}

#[tokio::test]
async fn test_create_user_validation() {
    let fixture = setup().await;

    let response = fixture
        .server
        .post("/users")
        .authorization_bearer(&fixture.admin_token)
        .json(&json!({ "username": "al", "password": "123", "email": "nope", "role": "normal" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(
        body["errors"],
        json!([
            "Invalid Email",
            "Invalid Username (Minimum size error)",
            "Invalid Password (Minimum size error)"
        ])
    );

    let response = fixture
        .server
        .post("/users")
        .authorization_bearer(&fixture.admin_token)
        .json(&json!({ "username": "alice", "password": "secret123", "role": "root" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    response.assert_json(&json!({ "result": "failed", "error": "Invalid role: root" }));
}
