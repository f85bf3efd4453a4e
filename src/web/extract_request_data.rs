use axum::extract::{FromRequest, Multipart, Request};
use mime::Mime;
use tracing::{debug, warn};

use super::error::ApiError;
use crate::models::{FALLBACK_FILE_NAME, FILE_FIELD, MAX_UPLOAD_SIZE_BYTES, UploadedFile};

/// Pulls the `file` part out of a multipart upload.
///
/// Requests that are not multipart at all are treated like uploads without a
/// file. Other fields, and `file` parts sent without a filename, are ignored;
/// if several `file` parts are present the last non-empty one wins.
pub async fn extract_uploaded_file(request: Request) -> Result<UploadedFile, ApiError> {
    let mut multipart = match Multipart::from_request(request, &()).await {
        Ok(multipart) => multipart,
        Err(rejection) => {
            debug!("Request is not a multipart upload: {}", rejection);
            return Err(ApiError::MissingFile);
        }
    };

    let mut uploaded: Option<UploadedFile> = None;
    let mut ignored_fields = 0;

    while let Some(field) = multipart.next_field().await? {
        // A part without a filename is a plain form value, even when named `file`.
        let Some(file_name) = field
            .file_name()
            .filter(|_| field.name() == Some(FILE_FIELD))
            .map(|name| {
                if name.is_empty() {
                    FALLBACK_FILE_NAME.to_string()
                } else {
                    name.to_string()
                }
            })
        else {
            let field_name = field.name().unwrap_or("unnamed").to_string();
            debug!("Ignoring multipart field: {}", field_name);
            ignored_fields += 1;
            continue;
        };

        let content_type = field
            .content_type()
            .and_then(|ct| ct.parse::<Mime>().ok())
            .unwrap_or(mime::APPLICATION_OCTET_STREAM);

        let data = field.bytes().await?;

        if data.is_empty() {
            debug!("Skipping empty 'file' field ({})", file_name);
            continue;
        }

        if data.len() > MAX_UPLOAD_SIZE_BYTES {
            return Err(ApiError::PayloadTooLarge(format!(
                "File size must be less than {}MB",
                MAX_UPLOAD_SIZE_BYTES / (1024 * 1024)
            )));
        }

        if uploaded.is_some() {
            warn!("Multiple 'file' fields found in multipart request, using the last one");
        }

        uploaded = Some(UploadedFile {
            file_name,
            content_type,
            data,
        });
    }

    if ignored_fields > 0 {
        debug!(
            "Ignored {} non-file fields in multipart request",
            ignored_fields
        );
    }

    uploaded.ok_or(ApiError::MissingFile)
}
