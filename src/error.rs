//! Error handling for mixlane
//!
//! Missing buffers or tracks during scheduling are not errors: those clips
//! are skipped. The variants here cover the operations that can genuinely
//! fail (decode, recording devices, export, configuration, project loading).

use thiserror::Error;

/// Result type alias for mixlane operations
pub type Result<T> = std::result::Result<T, MixError>;

/// Main error type for mixlane operations
#[derive(Error, Debug)]
pub enum MixError {
    // Buffer Errors
    #[error("Failed to decode audio: {reason}")]
    Decode {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Invalid audio buffer: {reason}")]
    InvalidBuffer { reason: String },

    // Export Errors
    #[error("Unsupported codec: {codec}")]
    UnsupportedCodec { codec: String },

    #[error("Encoding failed: {reason}")]
    Encode { reason: String },

    #[error("Invalid render length: {duration_secs}s")]
    InvalidDuration { duration_secs: f64 },

    // Recording Errors
    #[error("Recording device unavailable: {reason}")]
    DeviceUnavailable { reason: String },

    #[error("Recording permission denied")]
    PermissionDenied,

    #[error("Recording is already in progress")]
    AlreadyRecording,

    #[error("No recording in progress")]
    NotRecording,

    #[error("Recording captured no audio")]
    EmptyRecording,

    // Configuration / Project Errors
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Unsupported project version: {found} (expected {expected})")]
    UnsupportedProjectVersion { found: u32, expected: u32 },

    #[error("Invalid project: {reason}")]
    InvalidProject { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MixError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            MixError::Decode { .. } => "DECODE_FAILED",
            MixError::InvalidBuffer { .. } => "INVALID_BUFFER",
            MixError::UnsupportedCodec { .. } => "UNSUPPORTED_CODEC",
            MixError::Encode { .. } => "ENCODE_FAILED",
            MixError::InvalidDuration { .. } => "INVALID_DURATION",
            MixError::DeviceUnavailable { .. } => "DEVICE_UNAVAILABLE",
            MixError::PermissionDenied => "PERMISSION_DENIED",
            MixError::AlreadyRecording => "ALREADY_RECORDING",
            MixError::NotRecording => "NOT_RECORDING",
            MixError::EmptyRecording => "EMPTY_RECORDING",
            MixError::InvalidConfig { .. } => "INVALID_CONFIG",
            MixError::UnsupportedProjectVersion { .. } => "UNSUPPORTED_PROJECT_VERSION",
            MixError::InvalidProject { .. } => "INVALID_PROJECT",
            MixError::Io(_) => "IO_ERROR",
            MixError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors leave the engine in a usable state: the caller can
    /// retry with different input or simply carry on.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MixError::Decode { .. }
                | MixError::InvalidBuffer { .. }
                | MixError::UnsupportedCodec { .. }
                | MixError::InvalidDuration { .. }
                | MixError::DeviceUnavailable { .. }
                | MixError::PermissionDenied
                | MixError::AlreadyRecording
                | MixError::NotRecording
                | MixError::EmptyRecording
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            MixError::Decode { .. } => vec![
                "Check that the file is a valid WAV file",
                "Supported encodings: 8/16/24/32-bit PCM and 32-bit float",
            ],
            MixError::UnsupportedCodec { .. } => vec!["Export as WAV instead"],
            MixError::DeviceUnavailable { .. } => vec![
                "Connect an input device and try again",
                "Check that no other application holds the device exclusively",
            ],
            MixError::PermissionDenied => vec![
                "Grant microphone access in the system settings",
                "Restart recording after granting access",
            ],
            MixError::UnsupportedProjectVersion { .. } => {
                vec!["Open the project with the version of mixlane that saved it"]
            }
            _ => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = MixError::Decode {
            reason: "bad header".to_string(),
            source: None,
        };
        assert_eq!(err.error_code(), "DECODE_FAILED");
        assert_eq!(MixError::PermissionDenied.error_code(), "PERMISSION_DENIED");
    }

    #[test]
    fn test_recovery_suggestions() {
        let err = MixError::UnsupportedCodec {
            codec: "mp3".to_string(),
        };
        assert!(!err.recovery_suggestions().is_empty());
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_io_not_recoverable() {
        let err = MixError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("disk"));
    }
}
