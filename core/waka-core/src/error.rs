//! Error types for waka-core operations.
//! Keep WakaFfiError minimal and stable to avoid breaking FFI clients.

use std::path::PathBuf;

// ═══════════════════════════════════════════════════════════════════════════════
// FFI-Compatible Error (for editor hosts and other language bindings)
// ═══════════════════════════════════════════════════════════════════════════════

/// FFI-safe error type for use across language boundaries.
///
/// This simplified error type contains just an error message string,
/// making it compatible with UniFFI's error handling.
#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum WakaFfiError {
    #[error("{message}")]
    General { message: String },
}

impl From<WakaError> for WakaFfiError {
    fn from(err: WakaError) -> Self {
        WakaFfiError::General {
            message: err.to_string(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Internal Error (for Rust-only use)
// ═══════════════════════════════════════════════════════════════════════════════

/// All errors that can occur in waka-core operations.
///
/// Every variant is local to the operation that produced it. Callers log it
/// and carry on; nothing here is allowed to take the host editor down.
#[derive(Debug, thiserror::Error)]
pub enum WakaError {
    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Config read failed: {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config write failed: {path}: {details}")]
    ConfigWrite { path: PathBuf, details: String },

    // ─────────────────────────────────────────────────────────────────────
    // Provisioning Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Download failed: {url}: {details}")]
    Download { url: String, details: String },

    #[error("Extraction failed: {archive}: {details}")]
    Extract { archive: PathBuf, details: String },

    // ─────────────────────────────────────────────────────────────────────
    // Process Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ─────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience type alias for Results using WakaError.
pub type Result<T> = std::result::Result<T, WakaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ffi_error_carries_internal_message() {
        let err = WakaError::Download {
            url: "https://example.test/cli.zip".to_string(),
            details: "HTTP 404 Not Found".to_string(),
        };

        let WakaFfiError::General { message } = WakaFfiError::from(err);
        assert_eq!(
            message,
            "Download failed: https://example.test/cli.zip: HTTP 404 Not Found"
        );
    }
}
