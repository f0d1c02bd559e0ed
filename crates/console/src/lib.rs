//! View-models behind the admin console pages.

pub mod crash_logs;
pub mod project_details;

use thiserror::Error;
use url::Url;

#[derive(Error, Debug, PartialEq)]
pub enum ConsoleError {
    #[error("invalid base url `{0}`")]
    InvalidBaseUrl(String),

    #[error("unsupported page size {0}")]
    InvalidPageSize(usize),
}

/// Appends `segments` to the public server URL, percent-encoding each one.
pub(crate) fn server_url(base: &str, segments: &[&str]) -> Result<Url, ConsoleError> {
    let invalid = || ConsoleError::InvalidBaseUrl(base.to_string());

    let mut url = Url::parse(base).map_err(|_| invalid())?;
    url.path_segments_mut()
        .map_err(|_| invalid())?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
