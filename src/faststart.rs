use std::{ffi::OsStr, path::Path};

use crate::{
    error_code::ErrorCode,
    process::{Process, ProcessError},
};

#[derive(Debug, thiserror::Error)]
pub(crate) enum NormalizeError {
    #[error("Error in ffmpeg process")]
    Process(#[source] ProcessError),

    #[error("Remuxed file is empty")]
    EmptyOutput,

    #[error("Error inspecting remuxed file")]
    Stat(#[source] std::io::Error),
}

impl NormalizeError {
    pub(crate) const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Process(e) => e.error_code(),
            Self::EmptyOutput => ErrorCode::NORMALIZE_EMPTY_OUTPUT,
            Self::Stat(_) => ErrorCode::NORMALIZE_STAT_OUTPUT,
        }
    }

    pub(crate) fn diagnostics(&self) -> Option<&str> {
        match self {
            Self::Process(e) => e.diagnostics(),
            _ => None,
        }
    }

    pub(crate) const fn is_client_error(&self) -> bool {
        matches!(self, Self::Process(ProcessError::Status { .. }))
    }
}

/// Rewrites a media container so its index precedes the payload, copying every stream as-is
///
/// Implementations write to `output` and must leave `input` untouched.
#[async_trait::async_trait]
pub(crate) trait Normalize: Send + Sync {
    async fn remux(&self, input: &Path, output: &Path) -> Result<(), NormalizeError>;
}

#[derive(Debug)]
pub(crate) struct FastStart {
    timeout: u64,
}

impl FastStart {
    pub(crate) const fn new(timeout: u64) -> Self {
        Self { timeout }
    }
}

#[async_trait::async_trait]
impl Normalize for FastStart {
    #[tracing::instrument(skip(self))]
    async fn remux(&self, input: &Path, output: &Path) -> Result<(), NormalizeError> {
        Process::run(
            "ffmpeg",
            &[
                OsStr::new("-v"),
                OsStr::new("error"),
                OsStr::new("-i"),
                input.as_os_str(),
                OsStr::new("-c"),
                OsStr::new("copy"),
                OsStr::new("-movflags"),
                OsStr::new("faststart"),
                OsStr::new("-f"),
                OsStr::new("mp4"),
                OsStr::new("-y"),
                output.as_os_str(),
            ],
            self.timeout,
        )
        .map_err(NormalizeError::Process)?
        .wait()
        .await
        .map_err(NormalizeError::Process)
    }
}

/// Remux `input` into `output`, then confirm the output actually has content
///
/// Some ffmpeg builds exit cleanly after writing nothing, so a zero exit status alone is not
/// trusted.
#[tracing::instrument(level = "debug", skip(normalizer))]
pub(crate) async fn normalize(
    normalizer: &dyn Normalize,
    input: &Path,
    output: &Path,
) -> Result<(), NormalizeError> {
    normalizer.remux(input, output).await?;

    verify_output(output).await
}

async fn verify_output(output: &Path) -> Result<(), NormalizeError> {
    match tokio::fs::metadata(output).await {
        Ok(metadata) if metadata.is_file() && metadata.len() > 0 => Ok(()),
        Ok(_) => Err(NormalizeError::EmptyOutput),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(NormalizeError::EmptyOutput),
        Err(e) => Err(NormalizeError::Stat(e)),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{Normalize, NormalizeError};
    use crate::tmp_file::TmpDir;

    struct WritesNothing;

    #[async_trait::async_trait]
    impl Normalize for WritesNothing {
        async fn remux(&self, _: &Path, _: &Path) -> Result<(), NormalizeError> {
            Ok(())
        }
    }

    struct WritesEmpty;

    #[async_trait::async_trait]
    impl Normalize for WritesEmpty {
        async fn remux(&self, _: &Path, output: &Path) -> Result<(), NormalizeError> {
            tokio::fs::write(output, b"").await.map_err(NormalizeError::Stat)
        }
    }

    struct Copies;

    #[async_trait::async_trait]
    impl Normalize for Copies {
        async fn remux(&self, input: &Path, output: &Path) -> Result<(), NormalizeError> {
            tokio::fs::copy(input, output)
                .await
                .map(|_| ())
                .map_err(NormalizeError::Stat)
        }
    }

    #[tokio::test]
    async fn empty_output_is_rejected() {
        let tmp_dir = TmpDir::init(std::env::temp_dir().join("tubely-tests"))
            .await
            .expect("Created tmp dir");
        let input = tmp_dir.tmp_file(Some(".mp4"));
        let output = tmp_dir.tmp_file(Some(".mp4"));
        tokio::fs::write(&input, b"not really an mp4")
            .await
            .expect("Wrote input");

        let res = super::normalize(&WritesEmpty, &input, &output).await;
        assert!(matches!(res, Err(NormalizeError::EmptyOutput)));

        let res = super::normalize(&WritesNothing, &input, &output).await;
        assert!(matches!(res, Err(NormalizeError::EmptyOutput)));
    }

    #[tokio::test]
    async fn populated_output_is_accepted() {
        let tmp_dir = TmpDir::init(std::env::temp_dir().join("tubely-tests"))
            .await
            .expect("Created tmp dir");
        let input = tmp_dir.tmp_file(Some(".mp4"));
        let output = tmp_dir.tmp_file(Some(".mp4"));
        tokio::fs::write(&input, b"not really an mp4")
            .await
            .expect("Wrote input");

        super::normalize(&Copies, &input, &output)
            .await
            .expect("Normalized");

        assert!(input.exists());
        assert!(output.exists());
    }

    #[test]
    fn empty_output_code() {
        assert_eq!(
            NormalizeError::EmptyOutput.error_code().as_str(),
            "normalize-empty-output"
        );
        assert_eq!(NormalizeError::EmptyOutput.diagnostics(), None);
    }
}
