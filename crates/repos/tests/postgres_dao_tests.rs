use serde_json::json;
use sqlx::PgPool;

use common::QueryParams;
use data::project::{NewProject, Project};
use data::user::{LocalCredential, NewUser, Role, User};
use repos::error::RepoError;
use repos::{Dao, Repo};

fn local_user(username: &str) -> User {
    User::from(NewUser {
        username: Some(username.to_string()),
        local: LocalCredential {
            salt: Some("salt".into()),
            hash: Some("hash".into()),
        },
        ..Default::default()
    })
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_documents_round_trip(pool: PgPool) {
    let repo = Repo::new(pool);
    let user = local_user("alice");

    repo.users.save(&user).await.unwrap();
    let found = repo.users.find_by_id(user.id).await.unwrap();
    assert_eq!(found, Some(user.clone()));

    assert!(repo.users.delete(user.id).await.unwrap());
    assert!(repo.users.find_by_id(user.id).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_local_usernames_are_unique(pool: PgPool) {
    let repo = Repo::new(pool);
    repo.users.save(&local_user("alice")).await.unwrap();

    let result = repo.users.save(&local_user("alice")).await;
    assert!(matches!(result, Err(RepoError::UniqueViolation(_, _))));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_find_all_filters_sorts_and_counts(pool: PgPool) {
    let repo = Repo::new(pool);
    let owner = local_user("owner");
    repo.users.save(&owner).await.unwrap();
    for name in ["b", "c", "a"] {
        let project = Project::from(NewProject {
            name: name.to_string(),
            owner: owner.id,
        });
        repo.projects.save(&project).await.unwrap();
    }

    let params = QueryParams::new(Some(2), Some(0), Some(r#"{"name":"asc"}"#));
    let names: Vec<_> = repo
        .projects
        .find_all(&params)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec!["a", "b"]);

    let owned = repo
        .projects
        .find_all_by_field("owner", json!(owner.id))
        .await
        .unwrap();
    assert_eq!(owned.len(), 3);
    assert_eq!(repo.projects.count(None).await.unwrap(), 3);

    let admins = repo.users.find_all_by_field("role", json!(Role::Admin)).await.unwrap();
    assert!(admins.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_pages_stay_stable_after_update(pool: PgPool) {
    let repo = Repo::new(pool);
    let mut users: Vec<User> = (0..7).map(|i| local_user(&format!("u{i}"))).collect();
    for user in &users {
        repo.users.save(user).await.unwrap();
    }

    users[0].email = Some("u0@example.com".into());
    repo.users.update(&users[0]).await.unwrap();

    let mut listed = Vec::new();
    for skip in [0, 5] {
        let params = QueryParams::new(Some(5), Some(skip), None);
        listed.extend(repo.users.find_all(&params).await.unwrap().into_iter().map(|u| u.id));
    }
    let expected: Vec<_> = users.iter().map(|u| u.id).collect();
    assert_eq!(listed, expected);

    // Equal roles fall back to creation order.
    let params = QueryParams::new(Some(5), Some(5), Some(r#"{"role":"asc"}"#));
    let second_page: Vec<_> = repo
        .users
        .find_all(&params)
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.id)
        .collect();
    assert_eq!(second_page, &expected[5..]);
}
