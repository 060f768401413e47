#[cfg(test)]
mod tests;

use std::{ffi::OsStr, path::Path};

use crate::{
    error_code::ErrorCode,
    process::{Process, ProcessError},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub(crate) struct VideoGeometry {
    width: u32,
    height: u32,
}

impl VideoGeometry {
    /// Both dimensions must be positive
    pub(crate) const fn new(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }

        Some(Self { width, height })
    }

    pub(crate) const fn width(&self) -> u32 {
        self.width
    }

    pub(crate) const fn height(&self) -> u32 {
        self.height
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum ProbeError {
    #[error("Error in ffprobe process")]
    Process(#[source] ProcessError),

    #[error("Invalid ffprobe output")]
    Json(#[source] serde_json::Error),

    #[error("No video streams found")]
    NoStreams,
}

impl ProbeError {
    pub(crate) const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Process(e) => e.error_code(),
            Self::Json(_) => ErrorCode::PROBE_INVALID_OUTPUT,
            Self::NoStreams => ErrorCode::PROBE_NO_STREAMS,
        }
    }

    /// Failing to probe a well-formed process run means the upload itself is bad
    pub(crate) const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NoStreams | Self::Process(ProcessError::Status { .. })
        )
    }
}

/// Inspects a local media file and reports the dimensions of its first video stream
#[async_trait::async_trait]
pub(crate) trait Probe: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<VideoGeometry, ProbeError>;
}

#[derive(Debug)]
pub(crate) struct FfProbe {
    timeout: u64,
}

impl FfProbe {
    pub(crate) const fn new(timeout: u64) -> Self {
        Self { timeout }
    }
}

#[derive(Debug, serde::Deserialize)]
struct FfProbeOutput {
    #[serde(default)]
    streams: Vec<FfProbeStream>,
}

#[derive(Debug, serde::Deserialize)]
struct FfProbeStream {
    width: Option<u32>,
    height: Option<u32>,
}

#[async_trait::async_trait]
impl Probe for FfProbe {
    #[tracing::instrument(skip(self))]
    async fn probe(&self, path: &Path) -> Result<VideoGeometry, ProbeError> {
        let output = Process::run(
            "ffprobe",
            &[
                OsStr::new("-v"),
                OsStr::new("error"),
                OsStr::new("-print_format"),
                OsStr::new("json"),
                OsStr::new("-show_streams"),
                path.as_os_str(),
            ],
            self.timeout,
        )
        .map_err(ProbeError::Process)?
        .read_output()
        .await
        .map_err(ProbeError::Process)?;

        let output: FfProbeOutput = serde_json::from_slice(&output).map_err(ProbeError::Json)?;

        parse_geometry(output)
    }
}

fn parse_geometry(output: FfProbeOutput) -> Result<VideoGeometry, ProbeError> {
    output
        .streams
        .into_iter()
        .find_map(|FfProbeStream { width, height }| VideoGeometry::new(width?, height?))
        .ok_or(ProbeError::NoStreams)
}
