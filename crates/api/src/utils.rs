use axum::BoxError;
use axum::body::Bytes;
use futures::{Stream, StreamExt};
use object_store::{ObjectStore, buffered::BufWriter, path::Path};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{error, warn};

use crate::error::ApiError;
use data::crash_log::CrashLog;

pub async fn stream_to_store<S, E>(
    store: Arc<dyn ObjectStore>,
    key: &str,
    stream: S,
    max_size: u64,
) -> Result<u64, ApiError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<BoxError>,
{
    futures::pin_mut!(stream);
    let mut writer = BufWriter::new(store, Path::from(key));
    let mut size = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(err) => {
                let err: BoxError = err.into();
                error!("Failed to read upload stream for {key}: {err}");
                let _ = writer.abort().await;
                return Err(ApiError::BadRequest("failed to read uploaded file".to_string()));
            }
        };

        size += chunk.len() as u64;
        if size > max_size {
            warn!("Upload {key} exceeds {max_size} bytes, aborting");
            let _ = writer.abort().await;
            return Err(ApiError::PayloadTooLarge(max_size));
        }

        writer.write_all(&chunk).await.map_err(|e| {
            error!("Failed to write upload {key}: {:?}", e);
            ApiError::InternalFailure()
        })?;
    }

    writer.shutdown().await.map_err(|e| {
        error!("Failed to shutdown buffered writer: {:?}", e);
        ApiError::InternalFailure()
    })?;

    Ok(size)
}

pub async fn remove_attachments(store: &Arc<dyn ObjectStore>, crash_logs: &[CrashLog]) {
    for name in crash_logs
        .iter()
        .filter_map(|crash_log| crash_log.upload_file_minidump.as_deref())
    {
        if let Err(err) = store.delete(&Path::from(name)).await {
            warn!("Failed to remove minidump {name}: {err}");
        }
    }
}

// A malformed id names nothing, so it is reported as not found.
pub fn parse_id(raw: &str, what: &str) -> Result<uuid::Uuid, ApiError> {
    uuid::Uuid::parse_str(raw.trim()).map_err(|_| ApiError::NotFound(format!("{what} not found")))
}

// Anything unparsable counts as absent.
pub fn parse_count(raw: Option<&str>) -> Option<usize> {
    raw.and_then(|value| value.trim().parse().ok())
}
