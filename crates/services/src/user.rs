use std::str::FromStr;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::project::ProjectService;
use crate::{Page, ServiceError};
use common::QueryParams;
use common::password::{generate_salt, hash_password_async, verify_password_async};
use data::crash_log::CrashLog;
use data::user::{ExternalIdentity, LocalCredential, NewUser, Role, User};
use repos::Repo;
use repos::error::RepoError;
use repos::project::ProjectRepo;
use repos::user::UserRepo;

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin";

/// Request to create a user with local credentials.
#[derive(Debug, Clone)]
pub struct LocalUser {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub role: Role,
}

/// Profile returned by the external identity provider after login.
#[derive(Debug, Clone, Default)]
pub struct ExternalProfile {
    pub id: String,
    pub access_token: Option<String>,
    pub profile_url: Option<String>,
    pub username: Option<String>,
    pub emails: Vec<String>,
    pub photos: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct UserService {
    repo: Repo,
}

impl UserService {
    pub fn new(repo: Repo) -> Self {
        Self { repo }
    }

    /// Seeds the default administrator unless an administrator exists.
    pub async fn initialize(&self) -> Result<Option<User>, ServiceError> {
        let users = self.repo.users.as_ref();

        if UserRepo::find_by_username_for_local(users, DEFAULT_ADMIN_USERNAME)
            .await?
            .is_some()
        {
            return Ok(None);
        }

        if !UserRepo::find_all_by_role(users, Role::Admin).await?.is_empty() {
            return Ok(None);
        }

        let admin = self
            .create_new_user(LocalUser {
                username: DEFAULT_ADMIN_USERNAME.to_string(),
                password: DEFAULT_ADMIN_PASSWORD.to_string(),
                email: None,
                role: Role::Admin,
            })
            .await?;

        warn!("Created default administrator '{DEFAULT_ADMIN_USERNAME}', change its password");
        Ok(Some(admin))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<User, ServiceError> {
        self.repo
            .users
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }

    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn create_new_user(&self, request: LocalUser) -> Result<User, ServiceError> {
        let existing =
            UserRepo::find_by_username_for_local(self.repo.users.as_ref(), &request.username)
                .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict("User already exists".to_string()));
        }

        let salt = generate_salt();
        let hash = hash_password_async(request.password, salt.clone()).await?;

        let user = User::from(NewUser {
            username: Some(request.username),
            email: request.email,
            role: request.role,
            local: LocalCredential {
                salt: Some(salt),
                hash: Some(hash),
            },
            ..Default::default()
        });

        let user = self.repo.users.save(&user).await.map_err(|err| match err {
            RepoError::UniqueViolation(_, _) => {
                ServiceError::Conflict("User already exists".to_string())
            }
            err => err.into(),
        })?;

        info!("Created user {}", user.id);
        Ok(user)
    }

    /// Creates or refreshes the user linked to an external identity.
    #[instrument(skip(self, profile), fields(external_id = %profile.id))]
    pub async fn save_or_update_from_external(
        &self,
        profile: ExternalProfile,
    ) -> Result<User, ServiceError> {
        let existing = UserRepo::find_by_github_id(self.repo.users.as_ref(), &profile.id).await?;
        let email = profile.emails.into_iter().next();
        let photo = profile.photos.into_iter().next();

        let user = match existing {
            None => User::from(NewUser {
                username: profile.username,
                email,
                photo,
                role: Role::Normal,
                github: ExternalIdentity {
                    id: Some(profile.id),
                    access_token: profile.access_token,
                    profile_url: profile.profile_url,
                },
                ..Default::default()
            }),
            Some(mut user) => {
                user.github.access_token = profile.access_token;
                user.github.profile_url = profile.profile_url;
                if profile.username.is_some() {
                    user.username = profile.username;
                }
                if email.is_some() {
                    user.email = email;
                }
                if photo.is_some() {
                    user.photo = photo;
                }
                user
            }
        };

        Ok(self.repo.users.save(&user).await?)
    }

    pub async fn check_old_password_and_change_password(
        &self,
        user_id: Uuid,
        old_password: &str,
        new_password: &str,
    ) -> Result<User, ServiceError> {
        let user = self.find_by_id(user_id).await?;
        let Some(hash) = user.local.hash.clone() else {
            return Err(ServiceError::Forbidden(
                "Only local users can change their password".to_string(),
            ));
        };

        if !verify_password_async(old_password.to_string(), hash).await? {
            return Err(ServiceError::Forbidden("Wrong old password".to_string()));
        }

        self.set_password(user, new_password).await
    }

    /// Administrative password reset, no old password required.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        new_password: &str,
    ) -> Result<User, ServiceError> {
        let user = self.find_by_id(user_id).await?;
        if !user.is_local() {
            return Err(ServiceError::Forbidden(
                "Only local users have a password".to_string(),
            ));
        }

        self.set_password(user, new_password).await
    }

    async fn set_password(&self, mut user: User, password: &str) -> Result<User, ServiceError> {
        let salt = generate_salt();
        let hash = hash_password_async(password.to_string(), salt.clone()).await?;
        user.local = LocalCredential {
            salt: Some(salt),
            hash: Some(hash),
        };

        self.repo
            .users
            .update(&user)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }

    pub async fn check_is_user_last_administrator(&self, user: &User) -> Result<bool, ServiceError> {
        if !user.is_admin() {
            return Ok(false);
        }
        let admins = UserRepo::find_all_by_role(self.repo.users.as_ref(), Role::Admin).await?;
        Ok(admins.len() <= 1)
    }

    /// Changes role and/or email. Demoting the last administrator is refused.
    #[instrument(skip(self, email))]
    pub async fn update_user(
        &self,
        user_id: Uuid,
        role: Option<&str>,
        email: Option<String>,
    ) -> Result<User, ServiceError> {
        let role = role
            .map(|role| {
                Role::from_str(role)
                    .map_err(|_| ServiceError::BadRequest(format!("Invalid role: {role}")))
            })
            .transpose()?;

        let mut user = self.find_by_id(user_id).await?;

        if let Some(role) = role {
            if user.is_admin()
                && role != Role::Admin
                && self.check_is_user_last_administrator(&user).await?
            {
                return Err(ServiceError::BadRequest(
                    "Cannot remove the role of the last administrator".to_string(),
                ));
            }
            user.role = role;
        }

        if email.is_some() {
            user.email = email;
        }

        self.repo
            .users
            .update(&user)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }

    pub async fn update_email(&self, user_id: Uuid, email: String) -> Result<User, ServiceError> {
        self.update_user(user_id, None, Some(email)).await
    }

    /// Deletes a user together with the projects they own. Returns the crash
    /// logs removed with those projects.
    #[instrument(skip(self))]
    pub async fn remove_user(&self, user_id: Uuid) -> Result<Vec<CrashLog>, ServiceError> {
        let user = self.find_by_id(user_id).await?;

        if self.check_is_user_last_administrator(&user).await? {
            return Err(ServiceError::Forbidden(
                "Cannot delete the last administrator".to_string(),
            ));
        }

        let mut project_ids = user.projects.clone();
        for project in ProjectRepo::find_by_owner(self.repo.projects.as_ref(), user.id).await? {
            if !project_ids.contains(&project.id) {
                project_ids.push(project.id);
            }
        }

        let removed = ProjectService::new(self.repo.clone())
            .delete_recursively_by_ids(&project_ids)
            .await?;
        self.repo.users.delete(user.id).await?;

        info!("Deleted user {}", user.id);
        Ok(removed)
    }

    pub async fn find_all_with_pagination(
        &self,
        params: &QueryParams,
    ) -> Result<Vec<User>, ServiceError> {
        Ok(self.repo.users.find_all(params).await?)
    }

    pub async fn count_all(&self) -> Result<u64, ServiceError> {
        Ok(self.repo.users.count(None).await?)
    }

    pub async fn list(&self, params: QueryParams) -> Result<Page<User>, ServiceError> {
        let total = self.count_all().await?;
        let items = self.find_all_with_pagination(&params).await?;
        Ok(Page { total, items })
    }

    /// Checks a username/password pair against the stored local credential.
    pub async fn authenticate_local(
        &self,
        username: &str,
        password: &str,
    ) -> Result<User, ServiceError> {
        let invalid = || ServiceError::Unauthorized("Invalid username or password".to_string());

        let user = UserRepo::find_by_username_for_local(self.repo.users.as_ref(), username)
            .await?
            .ok_or_else(invalid)?;
        let hash = user.local.hash.clone().ok_or_else(invalid)?;

        if verify_password_async(password.to_string(), hash).await? {
            Ok(user)
        } else {
            Err(invalid())
        }
    }
}
