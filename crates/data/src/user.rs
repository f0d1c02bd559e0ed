use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

#[derive(
    Debug, Serialize, Deserialize, Clone, Copy, EnumString, EnumIter, Display, Default, PartialEq, Eq,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Normal,
}

impl Role {
    pub fn all() -> Vec<Role> {
        Role::iter().collect()
    }
}

/// Salt and hash of a username/password login.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct LocalCredential {
    pub salt: Option<String>,
    pub hash: Option<String>,
}

/// Reference to an account at the external OAuth provider.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ExternalIdentity {
    pub id: Option<String>,
    pub access_token: Option<String>,
    pub profile_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: uuid::Uuid,
    pub username: Option<String>,
    pub email: Option<String>,
    pub photo: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub local: LocalCredential,
    #[serde(default)]
    pub github: ExternalIdentity,
    #[serde(default)]
    pub projects: Vec<uuid::Uuid>,
    #[serde(with = "crate::timestamp")]
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_local(&self) -> bool {
        self.local.hash.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct NewUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub photo: Option<String>,
    pub role: Role,
    pub local: LocalCredential,
    pub github: ExternalIdentity,
}

impl From<NewUser> for User {
    fn from(user: NewUser) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            username: user.username,
            email: user.email,
            photo: user.photo,
            role: user.role,
            local: user.local,
            github: user.github,
            projects: Vec::new(),
            created_at: Utc::now(),
        }
    }
}
