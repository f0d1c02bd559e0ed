use axum::body::Body;
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use object_store::path::Path as StorePath;
use std::collections::HashMap;
use tracing::{error, info, instrument, warn};

use crate::error::ApiError;
use crate::state::AppState;
use crate::utils::{parse_id, stream_to_store};
use data::crash_log::{CRASH_LOG_FIELDS, CrashLog, MINIDUMP_FIELD, NewCrashLog};

pub struct CrashLogApi;

#[derive(Default, Debug)]
struct Submission {
    fields: HashMap<String, String>,
    minidump: Option<String>,
}

fn multipart_error(err: MultipartError, max_size: u64) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        warn!("Crash log upload exceeds the body limit");
        return ApiError::PayloadTooLarge(max_size);
    }
    error!("Failed to read multipart body: {}", err.body_text());
    ApiError::BadRequest("failed to read multipart body".to_string())
}

impl CrashLogApi {
    #[instrument(skip(field, submission, state))]
    async fn handle_minidump_upload(
        field: Field<'_>,
        submission: &mut Submission,
        state: &AppState,
    ) -> Result<(), ApiError> {
        if submission.minidump.is_some() {
            return Err(ApiError::BadRequest("only one minidump may be uploaded".to_string()));
        }

        let storage_filename = uuid::Uuid::new_v4().simple().to_string();
        submission.minidump = Some(storage_filename.clone());

        let size = stream_to_store(
            state.uploads.clone(),
            &storage_filename,
            field,
            state.settings.storage.max_minidump_size,
        )
        .await?;

        info!(storage_filename, size, "Stored minidump");
        Ok(())
    }

    async fn process_field(
        field: Field<'_>,
        submission: &mut Submission,
        state: &AppState,
    ) -> Result<(), ApiError> {
        let name = field.name().unwrap_or_default().to_string();

        if name == MINIDUMP_FIELD {
            return Self::handle_minidump_upload(field, submission, state).await;
        }

        if field.file_name().is_some() || !CRASH_LOG_FIELDS.contains(&name.as_str()) {
            warn!(name, "Dropping undeclared crash log field");
            return Ok(());
        }

        let max_size = state.settings.storage.max_minidump_size;
        let value = field
            .text()
            .await
            .map_err(|err| multipart_error(err, max_size))?;
        submission.fields.insert(name, value);
        Ok(())
    }

    async fn handle_upload(
        state: &AppState,
        project_id: &str,
        mut multipart: Multipart,
        submission: &mut Submission,
    ) -> Result<CrashLog, ApiError> {
        let max_size = state.settings.storage.max_minidump_size;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| multipart_error(err, max_size))?
        {
            Self::process_field(field, submission, state).await?;
        }

        if !NewCrashLog::has_declared_fields(&submission.fields) {
            return Err(ApiError::BadRequest("no crash log fields submitted".to_string()));
        }

        let project_id = parse_id(project_id, "Project")?;
        let crash_log = NewCrashLog::from_fields(
            project_id,
            &submission.fields,
            submission.minidump.clone(),
        );

        Ok(state.crash_logs().save_new_crash_log(crash_log).await?)
    }

    #[instrument(skip(state, multipart))]
    pub async fn upload(
        State(state): State<AppState>,
        Path(project_id): Path<String>,
        multipart: Multipart,
    ) -> Result<(StatusCode, String), ApiError> {
        if project_id.trim().is_empty() {
            return Err(ApiError::BadRequest("project id is required".to_string()));
        }

        let mut submission = Submission::default();
        match Self::handle_upload(&state, &project_id, multipart, &mut submission).await {
            Ok(crash_log) => {
                info!(crash_log = %crash_log.id, "Crash log received");
                Ok((StatusCode::CREATED, crash_log.id.to_string()))
            }
            Err(err) => {
                if let Some(minidump) = &submission.minidump {
                    info!(minidump, "Deleting minidump from storage");
                    let _ = state.uploads.delete(&StorePath::from(minidump.as_str())).await;
                }
                Err(err)
            }
        }
    }

    pub async fn upload_without_project() -> ApiError {
        ApiError::BadRequest("project id is required".to_string())
    }

    #[instrument(skip(state))]
    pub async fn download(
        State(state): State<AppState>,
        Path(file): Path<String>,
    ) -> Result<Response, ApiError> {
        if file.is_empty() || file.starts_with('.') || file.contains(['/', '\\']) {
            return Err(ApiError::BadRequest("invalid file name".to_string()));
        }

        let result = match state.downloads.get(&StorePath::from(file.as_str())).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(ApiError::NotFound("File not found".to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        let disposition = format!("attachment; filename=\"{file}\"");
        Ok((
            [
                (header::CONTENT_TYPE, "application/octet-stream".to_string()),
                (header::CONTENT_LENGTH, result.meta.size.to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            Body::from_stream(result.into_stream()),
        )
            .into_response())
    }
}
