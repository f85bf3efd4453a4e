// Terminal front end: uploads a photo through the relay and saves the restored copy.

use crate::models::{
    ErrorBody, FALLBACK_FILE_NAME, FILE_FIELD, ProcessingOptions, RestoreStep, RestoredImage,
    UploadedFile,
};
use crate::session::{PROGRESS_TICK, ProgressSimulator, RelayFailure, Session, SessionError};
use crate::web::AttachmentDisposition;
use axum::body::Bytes;
use axum::http::header;
use headers::HeaderMapExt;
use mime::Mime;
use reqwest::multipart::{Form, Part};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const PROGRESS_BAR_WIDTH: usize = 30;

#[derive(clap::Args, Debug)]
pub struct RestoreArgs {
    /// Photo to restore.
    pub file: PathBuf,

    /// Base URL of the relay.
    #[arg(long, env = "PHOTO_REVIVER_RELAY_URL", default_value = "http://localhost:5000")]
    pub relay_url: String,

    /// Where to write the restored photo. Defaults to `restored_<name>` next to the input.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Run a single step of the pipeline instead of the full restoration.
    #[arg(long, value_enum)]
    pub step: Option<RestoreStep>,

    #[command(flatten)]
    pub options: ProcessingOptions,
}

#[derive(Debug)]
pub enum ClientError {
    Io(std::io::Error),
    Session(SessionError),
    /// The relay did not return a restored photo; holds the user-facing message.
    Restore(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Io(e) => write!(f, "I/O error: {}", e),
            ClientError::Session(e) => write!(f, "{}", e),
            ClientError::Restore(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Io(err)
    }
}

impl From<SessionError> for ClientError {
    fn from(err: SessionError) -> Self {
        ClientError::Session(err)
    }
}

pub async fn run(args: RestoreArgs) -> Result<PathBuf, ClientError> {
    let mut session = Session::new(args.options.clone());
    session.start_upload()?;

    let upload = load_upload(&args.file).await?;
    info!(
        "Selected {} ({}, {} bytes)",
        upload.file_name,
        upload.content_type,
        upload.len()
    );
    debug!(
        "Processing options (kept client-side): {}",
        serde_json::to_string(session.options()).unwrap_or_default()
    );
    session.select_file(upload.clone())?;

    let http = reqwest::Client::new();
    let request = post_to_relay(&http, &args.relay_url, &upload, args.step);
    tokio::pin!(request);

    let mut ticker = tokio::time::interval(PROGRESS_TICK);
    let outcome = loop {
        tokio::select! {
            outcome = &mut request => break outcome,
            _ = ticker.tick() => {
                session.tick();
                draw_progress(session.progress());
            }
        }
    };

    match outcome {
        Ok(restored) => {
            let output = args
                .output
                .clone()
                .unwrap_or_else(|| default_output_path(&args.file, &restored.file_name));
            session.complete(restored)?;
            draw_progress(session.progress());
            eprintln!();

            if let (Some(before), Some(after)) = (session.before(), session.after()) {
                info!(
                    "Restored {} ({} bytes) into {} ({} bytes, {})",
                    before.file_name,
                    before.len(),
                    after.file_name,
                    after.data.len(),
                    after.content_type
                );
                tokio::fs::write(&output, &after.data).await?;
            }
            info!("Restored photo saved to {}", output.display());
            Ok(output)
        }
        Err(failure) => {
            eprintln!();
            let message = session.fail(&failure)?;
            Err(ClientError::Restore(message))
        }
    }
}

/// Reads a photo from disk, detecting its type from the extension or, failing that, its content.
pub async fn load_upload(path: &Path) -> Result<UploadedFile, ClientError> {
    let data = tokio::fs::read(path).await?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string());

    let content_type = detect_content_type(path, &data);

    Ok(UploadedFile {
        file_name,
        content_type,
        data: Bytes::from(data),
    })
}

pub fn detect_content_type(path: &Path, data: &[u8]) -> Mime {
    image::ImageFormat::from_path(path)
        .or_else(|_| image::guess_format(data))
        .ok()
        .and_then(|format| format.to_mime_type().parse::<Mime>().ok())
        .unwrap_or(mime::APPLICATION_OCTET_STREAM)
}

pub fn default_output_path(input: &Path, restored_name: &str) -> PathBuf {
    input
        .parent()
        .map(|dir| dir.join(restored_name))
        .unwrap_or_else(|| PathBuf::from(restored_name))
}

/// Sends `file` to the relay and waits for the restored photo.
pub async fn post_to_relay(
    http: &reqwest::Client,
    relay_url: &str,
    file: &UploadedFile,
    step: Option<RestoreStep>,
) -> Result<RestoredImage, RelayFailure> {
    let relay_url = relay_url.trim_end_matches('/');
    let url = match step {
        Some(step) => format!("{}/api/restore-step?step={}", relay_url, step),
        None => format!("{}/api/restore", relay_url),
    };

    let part = Part::stream_with_length(file.data.clone(), file.len() as u64)
        .file_name(file.file_name.clone())
        .mime_str(file.content_type.as_ref())
        .map_err(|e| RelayFailure::transport(e.to_string()))?;
    let form = Form::new().part(FILE_FIELD, part);

    let response = http
        .post(&url)
        .multipart(form)
        .send()
        .await
        .map_err(|e| RelayFailure::transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => relay_error_message(body),
            Err(_) => format!(
                "Server error: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            )
            .trim_end()
            .to_string(),
        };
        return Err(RelayFailure::http(status, message));
    }

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<Mime>().ok())
        .unwrap_or(mime::IMAGE_JPEG);
    let file_name = response
        .headers()
        .typed_get::<AttachmentDisposition>()
        .map(|disposition| disposition.file_name().to_string())
        .unwrap_or_else(|| file.restored_file_name());

    let data = response
        .bytes()
        .await
        .map_err(|e| RelayFailure::transport(e.to_string()))?;

    Ok(RestoredImage {
        file_name,
        content_type,
        data,
    })
}

fn relay_error_message(body: ErrorBody) -> String {
    if !body.error.is_empty() {
        body.error
    } else {
        body.message
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| "Failed to process image".to_string())
    }
}

pub fn render_progress(progress: &ProgressSimulator) -> String {
    let filled = PROGRESS_BAR_WIDTH * progress.progress() as usize / 100;
    format!(
        "[{}{}] {:>3}% {}",
        "#".repeat(filled),
        " ".repeat(PROGRESS_BAR_WIDTH - filled),
        progress.progress(),
        progress.stage().message()
    )
}

fn draw_progress(progress: &ProgressSimulator) {
    let mut stderr = std::io::stderr();
    // Trailing spaces clear leftovers of a longer stage message.
    let _ = write!(stderr, "\r{}    ", render_progress(progress));
    let _ = stderr.flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_upload() -> UploadedFile {
        UploadedFile {
            file_name: "attic.jpg".to_string(),
            content_type: mime::IMAGE_JPEG,
            data: Bytes::from_static(b"dusty"),
        }
    }

    #[test]
    fn test_detect_content_type() {
        assert_eq!(
            detect_content_type(Path::new("old.JPG"), b""),
            mime::IMAGE_JPEG
        );
        assert_eq!(
            detect_content_type(Path::new("scan.png"), b""),
            mime::IMAGE_PNG
        );
        // No usable extension: fall back to sniffing the bytes.
        let png_magic = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0];
        assert_eq!(
            detect_content_type(Path::new("scan"), &png_magic),
            mime::IMAGE_PNG
        );
        assert_eq!(
            detect_content_type(Path::new("notes"), b"hello"),
            mime::APPLICATION_OCTET_STREAM
        );
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("photos/old.jpg"), "restored_old.jpg"),
            PathBuf::from("photos/restored_old.jpg")
        );
        assert_eq!(
            default_output_path(Path::new("old.jpg"), "restored_old.jpg"),
            PathBuf::from("restored_old.jpg")
        );
    }

    #[test]
    fn test_render_progress() {
        let mut progress = ProgressSimulator::default();
        assert_eq!(
            render_progress(&progress),
            format!("[{}]   0% Analyzing your photo...", " ".repeat(30))
        );

        for _ in 0..10 {
            progress.tick();
        }
        assert_eq!(
            render_progress(&progress),
            format!(
                "[{}{}]  30% Removing damage and scratches...",
                "#".repeat(9),
                " ".repeat(21)
            )
        );
    }

    #[test]
    fn test_relay_error_message_prefers_error_then_message() {
        assert_eq!(
            relay_error_message(ErrorBody::new("No file uploaded")),
            "No file uploaded"
        );
        assert_eq!(
            relay_error_message(ErrorBody::new("").with_message("boom")),
            "boom"
        );
        assert_eq!(
            relay_error_message(ErrorBody::new("")),
            "Failed to process image"
        );
    }

    #[tokio::test]
    async fn test_post_to_relay_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/restore"))
            .and(body_string_contains("filename=\"attic.jpg\""))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/jpeg")
                    .insert_header(
                        "content-disposition",
                        "attachment; filename=\"restored_attic.jpg\"",
                    )
                    .set_body_bytes(b"bright".to_vec()),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let restored = post_to_relay(
            &reqwest::Client::new(),
            &mock_server.uri(),
            &sample_upload(),
            None,
        )
        .await
        .unwrap();

        assert_eq!(restored.file_name, "restored_attic.jpg");
        assert_eq!(restored.content_type, mime::IMAGE_JPEG);
        assert_eq!(&restored.data[..], b"bright");
    }

    #[tokio::test]
    async fn test_post_to_relay_uses_step_endpoint() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/restore-step"))
            .and(query_param("step", "restoration"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"clean".to_vec()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let restored = post_to_relay(
            &reqwest::Client::new(),
            &format!("{}/", mock_server.uri()),
            &sample_upload(),
            Some(RestoreStep::Restoration),
        )
        .await
        .unwrap();

        // No disposition header: name derived from the upload.
        assert_eq!(restored.file_name, "restored_attic.jpg");
    }

    #[tokio::test]
    async fn test_post_to_relay_reports_error_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(504).set_body_json(serde_json::json!({
                "error": "Processing timeout - image may be too large"
            })))
            .mount(&mock_server)
            .await;

        let failure = post_to_relay(
            &reqwest::Client::new(),
            &mock_server.uri(),
            &sample_upload(),
            None,
        )
        .await
        .unwrap_err();

        assert_eq!(
            failure,
            RelayFailure::http(
                StatusCode::GATEWAY_TIMEOUT,
                "Processing timeout - image may be too large"
            )
        );
        assert_eq!(
            failure.user_message(),
            "Processing took too long. Try a smaller image or different photo."
        );
    }

    #[tokio::test]
    async fn test_post_to_relay_non_json_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
            .mount(&mock_server)
            .await;

        let failure = post_to_relay(
            &reqwest::Client::new(),
            &mock_server.uri(),
            &sample_upload(),
            None,
        )
        .await
        .unwrap_err();

        assert_eq!(failure.status, Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(failure.message, "Server error: 500 Internal Server Error");
    }

    #[tokio::test]
    async fn test_run_saves_restored_photo() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/restore"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .insert_header(
                        "content-disposition",
                        "attachment; filename=\"restored_family.png\"",
                    )
                    .set_body_bytes(b"restored family".to_vec()),
            )
            .mount(&mock_server)
            .await;

        let dir = std::env::temp_dir().join(format!("photo-reviver-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("family.png");
        std::fs::write(&input, b"faded family").unwrap();

        let output = run(RestoreArgs {
            file: input,
            relay_url: mock_server.uri(),
            output: None,
            step: None,
            options: ProcessingOptions::default(),
        })
        .await
        .unwrap();

        assert_eq!(output, dir.join("restored_family.png"));
        assert_eq!(std::fs::read(&output).unwrap(), b"restored family");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_run_rejects_non_image_before_upload() {
        let dir = std::env::temp_dir().join(format!("photo-reviver-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("notes.txt");
        std::fs::write(&input, b"not a photo").unwrap();

        let err = run(RestoreArgs {
            file: input,
            relay_url: "http://localhost:1".to_string(),
            output: None,
            step: None,
            options: ProcessingOptions::default(),
        })
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            ClientError::Session(SessionError::NotAnImage(_))
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
