use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use std::str::FromStr;
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::mappers::{PageResponse, UserResponse};
use crate::state::AppState;
use crate::utils::{parse_count, parse_id, remove_attachments};
use crate::validation::{PASSWORD_MIN_LENGTH, USERNAME_MIN_LENGTH, Validator};
use common::QueryParams;
use data::user::{Role, User};
use services::user::LocalUser;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<String>,
    pub skip: Option<String>,
    pub sort: Option<String>,
}

impl PageQuery {
    pub fn to_params(&self) -> QueryParams {
        QueryParams::new(
            parse_count(self.limit.as_deref()),
            parse_count(self.skip.as_deref()),
            self.sort.as_deref(),
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub new_password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub role: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

fn parse_role(role: &str) -> Result<Role, ApiError> {
    Role::from_str(role).map_err(|_| ApiError::BadRequest(format!("Invalid role: {role}")))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub struct UsersApi;

impl UsersApi {
    pub async fn list(
        State(state): State<AppState>,
        Query(query): Query<PageQuery>,
    ) -> Result<Json<PageResponse<UserResponse>>, ApiError> {
        let page = state.users().list(query.to_params()).await?;
        Ok(Json(PageResponse::from_page(&page)))
    }

    pub async fn roles() -> Json<Vec<Role>> {
        Json(Role::all())
    }

    pub async fn current(Extension(user): Extension<User>) -> Json<UserResponse> {
        Json(UserResponse::from(&user))
    }

    #[instrument(skip_all, fields(user = %user.id))]
    pub async fn change_current_password(
        State(state): State<AppState>,
        Extension(user): Extension<User>,
        payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
    ) -> Result<Json<UserResponse>, ApiError> {
        if !user.is_local() {
            return Err(ApiError::Forbidden(
                "Only local users can change their password".to_string(),
            ));
        }

        let Json(request) = payload?;
        let old_password = request.old_password.as_deref();
        let new_password = request.new_password.as_deref();
        Validator::new()
            .not_empty(old_password, "Old password empty")
            .not_empty(new_password, "New password empty")
            .min_length(old_password, PASSWORD_MIN_LENGTH, "Old password too short")
            .min_length(new_password, PASSWORD_MIN_LENGTH, "New password too short")
            .finish()?;

        let user = state
            .users()
            .check_old_password_and_change_password(
                user.id,
                old_password.unwrap_or_default(),
                new_password.unwrap_or_default(),
            )
            .await?;
        Ok(Json(UserResponse::from(&user)))
    }

    pub async fn change_current_email(
        State(state): State<AppState>,
        Extension(user): Extension<User>,
        payload: Result<Json<EmailRequest>, JsonRejection>,
    ) -> Result<Json<UserResponse>, ApiError> {
        let Json(request) = payload?;
        Validator::new()
            .not_empty(request.email.as_deref(), "Invalid Email")
            .email(request.email.as_deref(), true, "Invalid Email")
            .finish()?;

        let user = state
            .users()
            .update_email(user.id, request.email.unwrap_or_default())
            .await?;
        Ok(Json(UserResponse::from(&user)))
    }

    #[instrument(skip(state, payload))]
    pub async fn change_password(
        State(state): State<AppState>,
        Path(id): Path<String>,
        payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
    ) -> Result<Json<UserResponse>, ApiError> {
        let Json(request) = payload?;
        let new_password = request.new_password.as_deref();
        Validator::new()
            .not_empty(new_password, "New password empty")
            .min_length(new_password, PASSWORD_MIN_LENGTH, "New password too short")
            .finish()?;

        let id = parse_id(&id, "User")?;
        let user = state
            .users()
            .change_password(id, new_password.unwrap_or_default())
            .await?;
        Ok(Json(UserResponse::from(&user)))
    }

    #[instrument(skip(state, payload))]
    pub async fn update(
        State(state): State<AppState>,
        Path(id): Path<String>,
        payload: Result<Json<UpdateUserRequest>, JsonRejection>,
    ) -> Result<Json<UserResponse>, ApiError> {
        let Json(request) = payload?;
        Validator::new()
            .not_empty(request.role.as_deref(), "Invalid Role")
            .email(request.email.as_deref(), false, "Invalid Email")
            .finish()?;

        let id = parse_id(&id, "User")?;
        let user = state
            .users()
            .update_user(id, request.role.as_deref(), non_empty(request.email))
            .await?;
        Ok(Json(UserResponse::from(&user)))
    }

    #[instrument(skip(state))]
    pub async fn remove(
        State(state): State<AppState>,
        Path(id): Path<String>,
    ) -> Result<StatusCode, ApiError> {
        let id = parse_id(&id, "User")?;
        let removed = state.users().remove_user(id).await?;
        remove_attachments(&state.uploads, &removed).await;

        Ok(StatusCode::NO_CONTENT)
    }

    #[instrument(skip(state, payload))]
    pub async fn create(
        State(state): State<AppState>,
        payload: Result<Json<CreateUserRequest>, JsonRejection>,
    ) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
        let Json(request) = payload?;
        let username = request.username.as_deref();
        let password = request.password.as_deref();
        Validator::new()
            .not_empty(username, "Invalid Username")
            .not_empty(password, "Invalid Password")
            .not_empty(request.role.as_deref(), "Invalid Role")
            .email(request.email.as_deref(), false, "Invalid Email")
            .min_length(username, USERNAME_MIN_LENGTH, "Invalid Username (Minimum size error)")
            .min_length(password, PASSWORD_MIN_LENGTH, "Invalid Password (Minimum size error)")
            .finish()?;

        let role = parse_role(request.role.as_deref().unwrap_or_default())?;
        let user = state
            .users()
            .create_new_user(LocalUser {
                username: request.username.unwrap_or_default(),
                password: request.password.unwrap_or_default(),
                email: non_empty(request.email),
                role,
            })
            .await?;

        info!("Administrator created user {}", user.id);
        Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
    }
}
