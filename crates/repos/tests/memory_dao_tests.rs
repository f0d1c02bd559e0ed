use serde_json::json;
use uuid::Uuid;

use common::QueryParams;
use data::crash_log::{CrashLog, NewCrashLog};
use data::user::{LocalCredential, NewUser, Role, User};
use repos::crash_log::CrashLogRepo;
use repos::user::UserRepo;
use repos::error::RepoError;
use repos::{Dao, Repo};

fn user(username: &str, role: Role, local: bool) -> User {
    User::from(NewUser {
        username: Some(username.to_string()),
        role,
        local: LocalCredential {
            salt: local.then(|| "salt".to_string()),
            hash: local.then(|| "hash".to_string()),
        },
        ..Default::default()
    })
}

fn crash_log(project: Uuid, ver: &str) -> CrashLog {
    CrashLog::from(NewCrashLog {
        project,
        ver: Some(ver.to_string()),
        ..Default::default()
    })
}

#[tokio::test]
async fn test_save_and_find_by_id() {
    let repo = Repo::in_memory();
    let alice = user("alice", Role::Normal, true);

    repo.users.save(&alice).await.unwrap();

    let found = repo.users.find_by_id(alice.id).await.unwrap();
    assert_eq!(found, Some(alice));
    assert!(repo.users.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_only_touches_existing_documents() {
    let repo = Repo::in_memory();
    let mut alice = user("alice", Role::Normal, true);

    assert!(repo.users.update(&alice).await.unwrap().is_none());

    repo.users.save(&alice).await.unwrap();
    alice.email = Some("alice@example.com".into());
    assert!(repo.users.update(&alice).await.unwrap().is_some());

    let stored = repo.users.find_by_id(alice.id).await.unwrap().unwrap();
    assert_eq!(stored.email.as_deref(), Some("alice@example.com"));
}

#[tokio::test]
async fn test_delete() {
    let repo = Repo::in_memory();
    let alice = user("alice", Role::Normal, true);
    repo.users.save(&alice).await.unwrap();

    assert!(repo.users.delete(alice.id).await.unwrap());
    assert!(!repo.users.delete(alice.id).await.unwrap());
    assert_eq!(repo.users.count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_find_all_sorts_and_pages() {
    let repo = Repo::in_memory();
    for name in ["carol", "alice", "dave", "bob"] {
        repo.users.save(&user(name, Role::Normal, true)).await.unwrap();
    }

    let params = QueryParams::new(Some(2), Some(1), Some(r#"{"username":"asc"}"#));
    let page = repo.users.find_all(&params).await.unwrap();
    let names: Vec<_> = page.iter().filter_map(|u| u.username.clone()).collect();
    assert_eq!(names, vec!["bob", "carol"]);

    let params = QueryParams::new(None, None, Some(r#"{"username":-1}"#));
    let all = repo.users.find_all(&params).await.unwrap();
    assert_eq!(all[0].username.as_deref(), Some("dave"));
    assert_eq!(repo.users.count(None).await.unwrap(), 4);
}

#[tokio::test]
async fn test_unknown_sort_field_is_ignored() {
    let repo = Repo::in_memory();
    for name in ["bob", "alice"] {
        repo.users.save(&user(name, Role::Normal, true)).await.unwrap();
    }

    let params = QueryParams::new(None, None, Some(r#"{"local.hash":"asc"}"#));
    let all = repo.users.find_all(&params).await.unwrap();
    let names: Vec<_> = all.iter().filter_map(|u| u.username.clone()).collect();
    assert_eq!(names, vec!["bob", "alice"]);
}

#[tokio::test]
async fn test_find_all_by_field() {
    let repo = Repo::in_memory();
    repo.users.save(&user("root", Role::Admin, true)).await.unwrap();
    repo.users.save(&user("jdoe", Role::Normal, true)).await.unwrap();

    let admins = repo.users.find_all_by_field("role", json!("admin")).await.unwrap();
    assert_eq!(admins.len(), 1);
    assert_eq!(admins[0].username.as_deref(), Some("root"));
}

#[tokio::test]
async fn test_user_repo_lookups() {
    let repo = Repo::in_memory();
    let mut external = user("octocat", Role::Normal, false);
    external.github.id = Some("583231".into());
    repo.users.save(&external).await.unwrap();
    let local = user("octocat", Role::Admin, true);
    repo.users.save(&local).await.unwrap();

    let found = UserRepo::find_by_username_for_local(repo.users.as_ref(), "octocat")
        .await
        .unwrap();
    assert_eq!(found.map(|u| u.id), Some(local.id));

    let found = UserRepo::find_by_github_id(repo.users.as_ref(), "583231")
        .await
        .unwrap();
    assert_eq!(found.map(|u| u.id), Some(external.id));

    let admins = UserRepo::find_all_by_role(repo.users.as_ref(), Role::Admin)
        .await
        .unwrap();
    assert_eq!(admins.len(), 1);
}

#[tokio::test]
async fn test_crash_logs_by_project() {
    let repo = Repo::in_memory();
    let project = Uuid::new_v4();
    let other = Uuid::new_v4();
    for ver in ["1.0", "1.1", "1.2"] {
        repo.crash_logs.save(&crash_log(project, ver)).await.unwrap();
    }
    repo.crash_logs.save(&crash_log(other, "9.9")).await.unwrap();

    let params = QueryParams::new(Some(2), Some(0), Some(r#"{"ver":"desc"}"#));
    let page = CrashLogRepo::find_by_project(repo.crash_logs.as_ref(), project, params)
        .await
        .unwrap();
    let versions: Vec<_> = page.iter().filter_map(|c| c.ver.clone()).collect();
    assert_eq!(versions, vec!["1.2", "1.1"]);

    let total = CrashLogRepo::count_by_project(repo.crash_logs.as_ref(), project)
        .await
        .unwrap();
    assert_eq!(total, 3);
}

#[tokio::test]
async fn test_local_usernames_are_unique() {
    let repo = Repo::in_memory();
    let alice = user("alice", Role::Normal, true);
    repo.users.save(&alice).await.unwrap();

    let result = repo.users.save(&user("alice", Role::Admin, true)).await;
    assert!(matches!(result, Err(RepoError::UniqueViolation(_, _))));

    // Renaming onto a taken username is refused as well.
    let mut bob = user("bob", Role::Normal, true);
    repo.users.save(&bob).await.unwrap();
    bob.username = Some("alice".into());
    let result = repo.users.update(&bob).await;
    assert!(matches!(result, Err(RepoError::UniqueViolation(_, _))));

    // Resaving the holder and external users sharing the name are fine.
    repo.users.save(&alice).await.unwrap();
    repo.users.save(&user("alice", Role::Normal, false)).await.unwrap();
    assert_eq!(repo.users.count(None).await.unwrap(), 3);
}
