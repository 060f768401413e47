#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub(crate) struct ErrorCode {
    code: &'static str,
}

impl ErrorCode {
    pub(crate) const fn as_str(&self) -> &'static str {
        self.code
    }

    pub(crate) const COMMAND_TIMEOUT: ErrorCode = ErrorCode {
        code: "command-timeout",
    };
    pub(crate) const COMMAND_ERROR: ErrorCode = ErrorCode {
        code: "command-error",
    };
    pub(crate) const COMMAND_FAILURE: ErrorCode = ErrorCode {
        code: "command-failure",
    };
    pub(crate) const COMMAND_NOT_FOUND: ErrorCode = ErrorCode {
        code: "command-not-found",
    };
    pub(crate) const COMMAND_PERMISSION_DENIED: ErrorCode = ErrorCode {
        code: "command-permission-denied",
    };
    pub(crate) const PROBE_NO_STREAMS: ErrorCode = ErrorCode {
        code: "probe-no-streams",
    };
    pub(crate) const PROBE_INVALID_OUTPUT: ErrorCode = ErrorCode {
        code: "probe-invalid-output",
    };
    pub(crate) const NORMALIZE_EMPTY_OUTPUT: ErrorCode = ErrorCode {
        code: "normalize-empty-output",
    };
    pub(crate) const NORMALIZE_STAT_OUTPUT: ErrorCode = ErrorCode {
        code: "normalize-stat-output",
    };
    pub(crate) const OBJECT_REQUEST_ERROR: ErrorCode = ErrorCode {
        code: "object-request-error",
    };
    pub(crate) const OBJECT_IO_ERROR: ErrorCode = ErrorCode {
        code: "object-io-error",
    };
    pub(crate) const INVALID_OBJECT_KEY: ErrorCode = ErrorCode {
        code: "invalid-object-key",
    };
    pub(crate) const OBJECT_STORE_CONFIG: ErrorCode = ErrorCode {
        code: "object-store-config",
    };
    pub(crate) const SLED_ERROR: ErrorCode = ErrorCode { code: "sled-error" };
    pub(crate) const VIDEO_NOT_FOUND: ErrorCode = ErrorCode {
        code: "video-not-found",
    };
    pub(crate) const PANIC: ErrorCode = ErrorCode { code: "panic" };
    pub(crate) const IO_ERROR: ErrorCode = ErrorCode { code: "io-error" };
    pub(crate) const UNAUTHENTICATED: ErrorCode = ErrorCode {
        code: "unauthenticated",
    };
    pub(crate) const UNAUTHORIZED: ErrorCode = ErrorCode {
        code: "unauthorized",
    };
    pub(crate) const INVALID_CONTENT_TYPE: ErrorCode = ErrorCode {
        code: "invalid-content-type",
    };
    pub(crate) const VALIDATE_FILE_SIZE: ErrorCode = ErrorCode {
        code: "validate-file-size",
    };
    pub(crate) const DEADLINE_EXCEEDED: ErrorCode = ErrorCode {
        code: "deadline-exceeded",
    };
    pub(crate) const UNKNOWN_ERROR: ErrorCode = ErrorCode {
        code: "unknown-error",
    };
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
