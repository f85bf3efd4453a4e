// Client-side flow of a restoration: landing -> upload -> processing -> result.
// Progress shown while processing is simulated; the relay reports none.

use crate::models::{
    FALLBACK_FILE_NAME, MAX_UPLOAD_SIZE_BYTES, ProcessingOptions, RestoredImage, UploadedFile,
    restored_file_name,
};
use axum::http::StatusCode;
use std::fmt;
use std::time::Duration;

/// Interval between two simulated progress updates.
pub const PROGRESS_TICK: Duration = Duration::from_millis(200);
const PROGRESS_STEP: u8 = 3;
// Simulated progress never reaches completion on its own.
const PROGRESS_CAP: u8 = 90;

const GENERIC_FAILURE: &str = "Failed to process image";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Landing,
    Upload,
    Processing,
    Result,
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AppState::Landing => "landing",
            AppState::Upload => "upload",
            AppState::Processing => "processing",
            AppState::Result => "result",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    Analyzing,
    Restoring,
    Colorizing,
    Enhancing,
}

impl ProcessingStage {
    pub fn message(self) -> &'static str {
        match self {
            ProcessingStage::Analyzing => "Analyzing your photo...",
            ProcessingStage::Restoring => "Removing damage and scratches...",
            ProcessingStage::Colorizing => "Applying realistic colors...",
            ProcessingStage::Enhancing => "Enhancing quality and details...",
        }
    }

    /// Stage that follows once `progress` has crossed this stage's exit threshold.
    fn next(self, progress: u8) -> Option<ProcessingStage> {
        match self {
            ProcessingStage::Analyzing if progress >= 25 => Some(ProcessingStage::Restoring),
            ProcessingStage::Restoring if progress >= 50 => Some(ProcessingStage::Colorizing),
            ProcessingStage::Colorizing if progress >= 75 => Some(ProcessingStage::Enhancing),
            _ => None,
        }
    }
}

/// Cosmetic progress approximation for the processing screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSimulator {
    progress: u8,
    stage: ProcessingStage,
}

impl Default for ProgressSimulator {
    fn default() -> Self {
        Self {
            progress: 0,
            stage: ProcessingStage::Analyzing,
        }
    }
}

impl ProgressSimulator {
    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn stage(&self) -> ProcessingStage {
        self.stage
    }

    /// Advances one tick. Returns the new stage when it changed.
    /// At most one stage transition happens per tick.
    pub fn tick(&mut self) -> Option<ProcessingStage> {
        self.progress = (self.progress + PROGRESS_STEP).min(PROGRESS_CAP);
        let next = self.stage.next(self.progress)?;
        self.stage = next;
        Some(next)
    }

    pub fn finish(&mut self) {
        self.progress = 100;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Why the relay did not hand back a restored photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayFailure {
    /// `None` when the relay itself could not be reached.
    pub status: Option<StatusCode>,
    pub message: String,
}

impl RelayFailure {
    pub fn http(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    /// Message shown to the user for this failure.
    pub fn user_message(&self) -> String {
        let lower = self.message.to_lowercase();

        if self.status == Some(StatusCode::GATEWAY_TIMEOUT) || lower.contains("timeout") {
            "Processing took too long. Try a smaller image or different photo.".to_string()
        } else if self.status == Some(StatusCode::SERVICE_UNAVAILABLE)
            || lower.contains("unavailable")
            || lower.contains("service")
        {
            "AI service is currently unavailable. Please wait a moment and try again.".to_string()
        } else if self.status.is_none() {
            "Connection error. Please check your internet connection and ensure the restoration API is running.".to_string()
        } else if !self.message.is_empty() && self.message != GENERIC_FAILURE {
            self.message.clone()
        } else {
            "Failed to process image. Please try again.".to_string()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    InvalidTransition {
        from: AppState,
        action: &'static str,
    },
    NotAnImage(String),
    FileTooLarge(usize),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::InvalidTransition { from, action } => {
                write!(f, "cannot {} while in the {} state", action, from)
            }
            SessionError::NotAnImage(content_type) => {
                write!(f, "file must be an image (got {})", content_type)
            }
            SessionError::FileTooLarge(size) => write!(
                f,
                "file is {} bytes; photos must be at most {}MB",
                size,
                MAX_UPLOAD_SIZE_BYTES / (1024 * 1024)
            ),
        }
    }
}

impl std::error::Error for SessionError {}

/// One user's pass through the restoration flow.
#[derive(Debug)]
pub struct Session {
    state: AppState,
    options: ProcessingOptions,
    selected: Option<UploadedFile>,
    restored: Option<RestoredImage>,
    progress: ProgressSimulator,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(ProcessingOptions::default())
    }
}

impl Session {
    pub fn new(options: ProcessingOptions) -> Self {
        Self {
            state: AppState::Landing,
            options,
            selected: None,
            restored: None,
            progress: ProgressSimulator::default(),
        }
    }

    pub fn state(&self) -> AppState {
        self.state
    }

    pub fn options(&self) -> &ProcessingOptions {
        &self.options
    }

    pub fn progress(&self) -> &ProgressSimulator {
        &self.progress
    }

    /// The photo as uploaded (the "before" side of the comparison).
    pub fn before(&self) -> Option<&UploadedFile> {
        self.selected.as_ref()
    }

    /// The restored photo (the "after" side of the comparison).
    pub fn after(&self) -> Option<&RestoredImage> {
        self.restored.as_ref()
    }

    pub fn download_name(&self) -> String {
        restored_file_name(
            self.selected
                .as_ref()
                .map(|file| file.file_name.as_str())
                .unwrap_or(FALLBACK_FILE_NAME),
        )
    }

    fn expect_state(&self, allowed: &[AppState], action: &'static str) -> Result<(), SessionError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                from: self.state,
                action,
            })
        }
    }

    /// Opens the upload screen. From the result screen this is "restore another".
    pub fn start_upload(&mut self) -> Result<(), SessionError> {
        self.expect_state(&[AppState::Landing, AppState::Result], "start an upload")?;

        self.selected = None;
        self.restored = None;
        self.progress.reset();
        self.state = AppState::Upload;
        Ok(())
    }

    /// Accepts a photo and enters the processing screen.
    pub fn select_file(&mut self, file: UploadedFile) -> Result<(), SessionError> {
        self.expect_state(&[AppState::Upload], "select a file")?;

        if !file.is_image() {
            return Err(SessionError::NotAnImage(file.content_type.to_string()));
        }
        if file.len() > MAX_UPLOAD_SIZE_BYTES {
            return Err(SessionError::FileTooLarge(file.len()));
        }

        self.selected = Some(file);
        self.progress.reset();
        self.state = AppState::Processing;
        Ok(())
    }

    /// Advances the simulated progress. Does nothing outside the processing screen.
    pub fn tick(&mut self) -> Option<ProcessingStage> {
        if self.state != AppState::Processing {
            return None;
        }
        self.progress.tick()
    }

    /// Records the relay's result and shows the comparison.
    pub fn complete(&mut self, restored: RestoredImage) -> Result<(), SessionError> {
        self.expect_state(&[AppState::Processing], "complete processing")?;

        self.progress.finish();
        self.restored = Some(restored);
        self.state = AppState::Result;
        Ok(())
    }

    /// Returns to the upload screen after a failed relay call.
    /// Yields the message to show the user.
    pub fn fail(&mut self, failure: &RelayFailure) -> Result<String, SessionError> {
        self.expect_state(&[AppState::Processing], "report a failure")?;

        self.progress.reset();
        self.state = AppState::Upload;
        Ok(failure.user_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;

    fn photo(name: &str, content_type: mime::Mime, size: usize) -> UploadedFile {
        UploadedFile {
            file_name: name.to_string(),
            content_type,
            data: Bytes::from(vec![0u8; size]),
        }
    }

    fn restored() -> RestoredImage {
        RestoredImage {
            file_name: "restored_old.jpg".to_string(),
            content_type: mime::IMAGE_JPEG,
            data: Bytes::from_static(b"after"),
        }
    }

    #[test]
    fn test_progress_is_capped_below_completion() {
        let mut progress = ProgressSimulator::default();
        for _ in 0..100 {
            progress.tick();
            assert!(progress.progress() <= 90);
        }
        assert_eq!(progress.progress(), 90);
        assert_eq!(progress.stage(), ProcessingStage::Enhancing);

        progress.finish();
        assert_eq!(progress.progress(), 100);
    }

    #[test]
    fn test_stage_thresholds() {
        let mut progress = ProgressSimulator::default();
        let mut transitions = Vec::new();
        for _ in 0..30 {
            if let Some(stage) = progress.tick() {
                transitions.push((progress.progress(), stage));
            }
        }

        assert_eq!(
            transitions,
            vec![
                (27, ProcessingStage::Restoring),
                (51, ProcessingStage::Colorizing),
                (75, ProcessingStage::Enhancing),
            ]
        );
    }

    #[test]
    fn test_happy_path() {
        let mut session = Session::default();
        assert_eq!(session.state(), AppState::Landing);

        session.start_upload().unwrap();
        assert_eq!(session.state(), AppState::Upload);

        session
            .select_file(photo("old.jpg", mime::IMAGE_JPEG, 1024))
            .unwrap();
        assert_eq!(session.state(), AppState::Processing);
        assert_eq!(session.progress().progress(), 0);
        assert_eq!(session.progress().stage(), ProcessingStage::Analyzing);

        for _ in 0..5 {
            session.tick();
        }
        assert_eq!(session.progress().progress(), 15);

        session.complete(restored()).unwrap();
        assert_eq!(session.state(), AppState::Result);
        assert_eq!(session.progress().progress(), 100);
        assert_eq!(session.before().unwrap().file_name, "old.jpg");
        assert_eq!(&session.after().unwrap().data[..], b"after");
        assert_eq!(session.download_name(), "restored_old.jpg");
    }

    #[test]
    fn test_restore_another_clears_previous_result() {
        let mut session = Session::default();
        session.start_upload().unwrap();
        session
            .select_file(photo("old.jpg", mime::IMAGE_JPEG, 10))
            .unwrap();
        session.complete(restored()).unwrap();

        session.start_upload().unwrap();
        assert_eq!(session.state(), AppState::Upload);
        assert!(session.before().is_none());
        assert!(session.after().is_none());
        assert_eq!(session.progress().progress(), 0);
        assert_eq!(session.download_name(), "restored_photo.jpg");
    }

    #[test]
    fn test_failure_returns_to_upload() {
        let mut session = Session::default();
        session.start_upload().unwrap();
        session
            .select_file(photo("old.jpg", mime::IMAGE_JPEG, 10))
            .unwrap();
        session.tick();

        let message = session
            .fail(&RelayFailure::http(
                StatusCode::GATEWAY_TIMEOUT,
                "Processing timeout - image may be too large",
            ))
            .unwrap();

        assert_eq!(
            message,
            "Processing took too long. Try a smaller image or different photo."
        );
        assert_eq!(session.state(), AppState::Upload);
        assert_eq!(session.progress().progress(), 0);
    }

    #[test]
    fn test_invalid_transitions_leave_state_unchanged() {
        let mut session = Session::default();

        let err = session
            .select_file(photo("old.jpg", mime::IMAGE_JPEG, 10))
            .unwrap_err();
        assert_eq!(
            err,
            SessionError::InvalidTransition {
                from: AppState::Landing,
                action: "select a file",
            }
        );
        assert!(session.complete(restored()).is_err());
        assert_eq!(session.state(), AppState::Landing);

        session.start_upload().unwrap();
        assert!(session.start_upload().is_err());
        assert!(session.fail(&RelayFailure::transport("x")).is_err());
        assert_eq!(session.tick(), None);
        assert_eq!(session.state(), AppState::Upload);
    }

    #[test]
    fn test_select_file_validates_upload() {
        let mut session = Session::default();
        session.start_upload().unwrap();

        let err = session
            .select_file(photo("notes.txt", mime::TEXT_PLAIN, 10))
            .unwrap_err();
        assert_eq!(err, SessionError::NotAnImage("text/plain".to_string()));

        let err = session
            .select_file(photo("huge.png", mime::IMAGE_PNG, MAX_UPLOAD_SIZE_BYTES + 1))
            .unwrap_err();
        assert_eq!(err, SessionError::FileTooLarge(MAX_UPLOAD_SIZE_BYTES + 1));

        assert_eq!(session.state(), AppState::Upload);
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            RelayFailure::http(StatusCode::SERVICE_UNAVAILABLE, "whatever").user_message(),
            "AI service is currently unavailable. Please wait a moment and try again."
        );
        assert_eq!(
            RelayFailure::transport("error sending request").user_message(),
            "Connection error. Please check your internet connection and ensure the restoration API is running."
        );
        assert_eq!(
            RelayFailure::http(StatusCode::BAD_REQUEST, "No file uploaded").user_message(),
            "No file uploaded"
        );
        assert_eq!(
            RelayFailure::http(StatusCode::INTERNAL_SERVER_ERROR, "Failed to process image")
                .user_message(),
            "Failed to process image. Please try again."
        );
        assert_eq!(
            RelayFailure::http(StatusCode::INTERNAL_SERVER_ERROR, "").user_message(),
            "Failed to process image. Please try again."
        );
    }
}
