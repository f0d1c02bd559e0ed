use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use tracing::instrument;

use crate::error::ApiError;
use crate::mappers::{CrashLogResponse, PageResponse, ProjectResponse};
use crate::state::AppState;
use crate::users::PageQuery;
use crate::utils::{parse_id, remove_attachments};
use crate::validation::Validator;
use data::user::User;

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: Option<String>,
}

pub struct ProjectsApi;

impl ProjectsApi {
    #[instrument(skip_all, fields(owner = %user.id))]
    pub async fn create(
        State(state): State<AppState>,
        Extension(user): Extension<User>,
        payload: Result<Json<CreateProjectRequest>, JsonRejection>,
    ) -> Result<(StatusCode, Json<ProjectResponse>), ApiError> {
        let Json(request) = payload?;
        Validator::new()
            .not_empty(request.name.as_deref(), "Invalid Name")
            .finish()?;

        let project = state
            .projects()
            .create(&user, request.name.as_deref().unwrap_or_default())
            .await?;
        Ok((StatusCode::CREATED, Json(ProjectResponse::from(&project))))
    }

    pub async fn list(
        State(state): State<AppState>,
        Query(query): Query<PageQuery>,
    ) -> Result<Json<PageResponse<ProjectResponse>>, ApiError> {
        let page = state.projects().list(query.to_params()).await?;
        Ok(Json(PageResponse::from_page(&page)))
    }

    pub async fn get(
        State(state): State<AppState>,
        Path(id): Path<String>,
    ) -> Result<Json<ProjectResponse>, ApiError> {
        let project = state.projects().find_by_id(parse_id(&id, "Project")?).await?;
        Ok(Json(ProjectResponse::from(&project)))
    }

    pub async fn crash_logs(
        State(state): State<AppState>,
        Path(id): Path<String>,
        Query(query): Query<PageQuery>,
    ) -> Result<Json<PageResponse<CrashLogResponse>>, ApiError> {
        let page = state
            .projects()
            .list_crash_logs(parse_id(&id, "Project")?, query.to_params())
            .await?;
        Ok(Json(PageResponse::from_page(&page)))
    }

    #[instrument(skip(state))]
    pub async fn delete(
        State(state): State<AppState>,
        Path(id): Path<String>,
    ) -> Result<StatusCode, ApiError> {
        let projects = state.projects();
        let project = projects.find_by_id(parse_id(&id, "Project")?).await?;

        let removed = projects.delete_recursively(&project).await?;
        remove_attachments(&state.uploads, &removed).await;

        Ok(StatusCode::NO_CONTENT)
    }
}
