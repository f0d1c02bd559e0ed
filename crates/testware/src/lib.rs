pub mod setup;

use std::sync::Arc;

use common::password::{generate_salt, hash_password};
use common::settings::Settings;
use data::crash_log::{CrashLog, NewCrashLog};
use data::project::{NewProject, Project};
use data::user::{LocalCredential, NewUser, Role, User};
use repos::Repo;

pub const TEST_JWT_SECRET: &str = "test-secret-for-jwt-signing-only";
pub const TEST_BASE_URL: &str = "http://crash.example.com";

pub fn create_settings() -> Arc<Settings> {
    let mut settings = Settings::default();

    settings.server.url = TEST_BASE_URL.to_string();
    settings.auth.jwt_secret = TEST_JWT_SECRET.to_string();

    Arc::new(settings)
}

pub fn create_repo() -> Repo {
    Repo::in_memory()
}

/// Create a local user with the given password
pub async fn create_test_user(repo: &Repo, username: &str, role: Role, password: &str) -> User {
    let salt = generate_salt();
    let hash = hash_password(password, &salt).expect("Failed to hash test password");

    let user = User::from(NewUser {
        username: Some(username.to_string()),
        email: Some(format!("{username}@example.com")),
        role,
        local: LocalCredential {
            salt: Some(salt),
            hash: Some(hash),
        },
        ..Default::default()
    });

    repo.users
        .save(&user)
        .await
        .expect("Failed to insert test user")
}

/// Create a user that only has an external identity
pub async fn create_external_user(repo: &Repo, github_id: &str, role: Role) -> User {
    let mut user = User::from(NewUser {
        username: Some(format!("gh_{github_id}")),
        role,
        ..Default::default()
    });
    user.github.id = Some(github_id.to_string());

    repo.users
        .save(&user)
        .await
        .expect("Failed to insert external test user")
}

/// Create a project owned by `owner` and link it from the owner
pub async fn create_test_project(repo: &Repo, owner: &User, name: &str) -> Project {
    let project = Project::from(NewProject {
        name: name.to_string(),
        owner: owner.id,
    });
    repo.projects
        .save(&project)
        .await
        .expect("Failed to insert test project");

    let mut owner = repo
        .users
        .find_by_id(owner.id)
        .await
        .expect("Failed to retrieve project owner")
        .expect("Project owner not found");
    owner.projects.push(project.id);
    repo.users
        .update(&owner)
        .await
        .expect("Failed to link project to owner");

    project
}

/// Create a crash log in `project`
pub async fn create_test_crash_log(
    repo: &Repo,
    project: &Project,
    ver: &str,
    minidump: Option<&str>,
) -> CrashLog {
    let crash_log = CrashLog::from(NewCrashLog {
        project: project.id,
        ver: Some(ver.to_string()),
        platform: Some("linux".to_string()),
        upload_file_minidump: minidump.map(str::to_string),
        ..Default::default()
    });
    repo.crash_logs
        .save(&crash_log)
        .await
        .expect("Failed to insert test crash log");

    let mut project = repo
        .projects
        .find_by_id(project.id)
        .await
        .expect("Failed to retrieve project")
        .expect("Project not found");
    project.crash_logs.push(crash_log.id);
    repo.projects
        .update(&project)
        .await
        .expect("Failed to link crash log to project");

    crash_log
}
