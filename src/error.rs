use color_eyre::Report;

use crate::error_code::ErrorCode;

pub(crate) struct Error {
    inner: color_eyre::Report,
}

impl Error {
    pub(crate) fn kind(&self) -> Option<&UploadError> {
        self.inner.downcast_ref()
    }

    pub(crate) fn root_cause(&self) -> &(dyn std::error::Error + 'static) {
        self.inner.root_cause()
    }

    pub(crate) fn error_code(&self) -> ErrorCode {
        self.kind()
            .map(|e| e.error_code())
            .unwrap_or(ErrorCode::UNKNOWN_ERROR)
    }

    pub(crate) fn category(&self) -> ErrorCategory {
        self.kind()
            .map(|e| e.category())
            .unwrap_or(ErrorCategory::IoError)
    }

    pub(crate) fn is_client_error(&self) -> bool {
        self.kind().map(|e| e.is_client_error()).unwrap_or(false)
    }

    /// The body reported back to whoever asked for the upload
    pub(crate) fn report(&self) -> ErrorReport {
        ErrorReport {
            msg: self.root_cause().to_string(),
            code: self.error_code(),
            category: self.category(),
        }
    }
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.inner, f)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.inner, f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

impl<T> From<T> for Error
where
    UploadError: From<T>,
{
    #[track_caller]
    fn from(error: T) -> Self {
        Error {
            inner: Report::from(UploadError::from(error)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum ErrorCategory {
    InvalidRequest,
    IoError,
    ProbeError,
    NormalizeError,
    UploadError,
    PersistenceError,
    DeadlineExceeded,
}

#[derive(Debug, serde::Serialize)]
pub(crate) struct ErrorReport {
    pub(crate) msg: String,
    pub(crate) code: ErrorCode,
    pub(crate) category: ErrorCategory,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum UploadError {
    #[error("Couldn't authenticate request")]
    Unauthenticated(#[from] crate::auth::AuthError),

    #[error("Requested video belongs to another user")]
    Unauthorized,

    #[error("Requested a video that doesn't exist")]
    MissingVideo,

    #[error("Unsupported content type {0:?}, only video/mp4 is accepted")]
    InvalidContentType(String),

    #[error("Error staging upload")]
    Stage(#[source] std::io::Error),

    #[error("Upload exceeded the {0} byte limit")]
    FileTooLarge(u64),

    #[error("Error probing video")]
    Probe(#[from] crate::discover::ProbeError),

    #[error("Error remuxing video")]
    Normalize(#[from] crate::faststart::NormalizeError),

    #[error("Error in store")]
    Store(#[from] crate::store::StoreError),

    #[error("Error in DB")]
    Repo(#[from] crate::repo::RepoError),

    #[error("Error interacting with filesystem")]
    Io(#[from] std::io::Error),

    #[error("Upload did not finish before its deadline")]
    DeadlineExceeded,
}

impl UploadError {
    const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Unauthenticated(e) => e.error_code(),
            Self::Unauthorized => ErrorCode::UNAUTHORIZED,
            Self::MissingVideo => ErrorCode::VIDEO_NOT_FOUND,
            Self::InvalidContentType(_) => ErrorCode::INVALID_CONTENT_TYPE,
            Self::Stage(_) | Self::Io(_) => ErrorCode::IO_ERROR,
            Self::FileTooLarge(_) => ErrorCode::VALIDATE_FILE_SIZE,
            Self::Probe(e) => e.error_code(),
            Self::Normalize(e) => e.error_code(),
            Self::Store(e) => e.error_code(),
            Self::Repo(e) => e.error_code(),
            Self::DeadlineExceeded => ErrorCode::DEADLINE_EXCEEDED,
        }
    }

    pub(crate) const fn category(&self) -> ErrorCategory {
        match self {
            Self::Unauthenticated(_)
            | Self::Unauthorized
            | Self::MissingVideo
            | Self::InvalidContentType(_) => ErrorCategory::InvalidRequest,
            Self::Stage(_) | Self::FileTooLarge(_) | Self::Io(_) => ErrorCategory::IoError,
            Self::Probe(_) => ErrorCategory::ProbeError,
            Self::Normalize(_) => ErrorCategory::NormalizeError,
            Self::Store(_) => ErrorCategory::UploadError,
            Self::Repo(_) => ErrorCategory::PersistenceError,
            Self::DeadlineExceeded => ErrorCategory::DeadlineExceeded,
        }
    }

    const fn is_client_error(&self) -> bool {
        match self {
            Self::Probe(e) => e.is_client_error(),
            Self::Normalize(e) => e.is_client_error(),
            Self::FileTooLarge(_) => true,
            other => matches!(other.category(), ErrorCategory::InvalidRequest),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorCategory, UploadError};

    #[test]
    fn report_shape() {
        let error = Error::from(UploadError::InvalidContentType(String::from("video/webm")));

        let value = serde_json::to_value(error.report()).expect("Serialized");

        assert_eq!(value["code"], "invalid-content-type");
        assert_eq!(value["category"], "invalid-request");
        assert!(value["msg"]
            .as_str()
            .expect("String msg")
            .contains("video/webm"));
        assert!(error.is_client_error());
    }

    #[test]
    fn categories() {
        let cases = [
            (Error::from(UploadError::Unauthorized), ErrorCategory::InvalidRequest),
            (Error::from(UploadError::FileTooLarge(10)), ErrorCategory::IoError),
            (
                Error::from(crate::discover::ProbeError::NoStreams),
                ErrorCategory::ProbeError,
            ),
            (
                Error::from(crate::faststart::NormalizeError::EmptyOutput),
                ErrorCategory::NormalizeError,
            ),
            (Error::from(UploadError::DeadlineExceeded), ErrorCategory::DeadlineExceeded),
        ];

        for (error, category) in cases {
            assert_eq!(error.category(), category, "{error}");
        }
    }

    #[test]
    fn root_cause_reaches_source() {
        let error = Error::from(crate::repo::RepoError::Canceled);

        assert_eq!(error.category(), ErrorCategory::PersistenceError);
        assert_eq!(error.root_cause().to_string(), "Panic in blocking operation");
    }
}
