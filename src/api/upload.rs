// SPDX-License-Identifier: MIT OR Apache-2.0

//! File parts for multipart uploads.

use std::path::PathBuf;

use reqwest::multipart::Part;

use crate::error::{ControllerError, Result};

/// Where the bytes of an uploaded file come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadSource {
    /// Read from disk at send time. An empty path skips the part.
    Path(PathBuf),
    /// In-memory content sent under a synthetic file name.
    Content { file_name: String, content: Vec<u8> },
}

/// A single file part of a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub param_name: String,
    pub source: UploadSource,
}

impl UploadFile {
    #[must_use]
    pub fn from_path(param_name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            param_name: param_name.into(),
            source: UploadSource::Path(path.into()),
        }
    }

    #[must_use]
    pub fn from_content(
        param_name: impl Into<String>,
        file_name: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            param_name: param_name.into(),
            source: UploadSource::Content {
                file_name: file_name.into(),
                content: content.into(),
            },
        }
    }

    /// Build the multipart part, or `None` when there is nothing to send.
    pub(crate) async fn to_part(&self) -> Result<Option<Part>> {
        let (file_name, content) = match &self.source {
            UploadSource::Path(path) if path.as_os_str().is_empty() => return Ok(None),
            UploadSource::Path(path) => {
                let content = tokio::fs::read(path).await?;
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                (file_name, content)
            }
            UploadSource::Content { file_name, content } => (file_name.clone(), content.clone()),
        };

        let mime = sniff_content_type(&content);
        let part = Part::bytes(content)
            .file_name(file_name)
            .mime_str(mime)
            .map_err(|e| ControllerError::Validation(format!("invalid upload mime type: {e}")))?;
        Ok(Some(part))
    }
}

fn sniff_content_type(content: &[u8]) -> &'static str {
    if std::str::from_utf8(content).is_ok() {
        "text/plain; charset=utf-8"
    } else {
        "application/octet-stream"
    }
}
