//! Error types for the vectorizing service.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`VectorizeError`]: **Per request**: one conversion failed. Every
//!   variant belongs to exactly one [`ErrorKind`], carries an internal
//!   `detail` for the logs, and maps to a fixed public message that is the
//!   only text ever sent back to the caller.
//!
//! * [`ConfigError`]: **Start-up**: the service configuration is invalid.
//!   Raised by the config builders and never part of a request outcome.
//!
//! Collaborator failures ([`crate::pipeline::solve::SolveError`],
//! [`crate::storage::StoreError`]) are folded into
//! [`VectorizeError::Processing`] at the orchestrator boundary.

use thiserror::Error;

/// Classification of a failed conversion, without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidRequest,
    UrlRead,
    PathRead,
    Base64Read,
    ImageFormat,
    Processing,
}

impl ErrorKind {
    /// The message exposed to HTTP callers for this kind.
    pub fn public_message(self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "Invalid arguments.",
            ErrorKind::UrlRead => "Failed to read image from provided URL.",
            ErrorKind::PathRead => "Failed to read image from provided path.",
            ErrorKind::Base64Read => "Failed to read image from provided base64 string.",
            ErrorKind::ImageFormat => "Image format not supported.",
            ErrorKind::Processing => "Failed to process image.",
        }
    }
}

/// All per-request failures of the conversion pipeline.
///
/// `Display` includes the internal detail and is meant for logs. Use
/// [`VectorizeError::public_message`] for anything that leaves the process.
#[derive(Debug, Error)]
pub enum VectorizeError {
    // ── Validation ────────────────────────────────────────────────────────
    /// The payload failed request validation.
    #[error("Invalid request payload")]
    InvalidRequest,

    // ── Acquisition ───────────────────────────────────────────────────────
    /// Remote fetch failed, or an unclassified failure during acquisition.
    #[error("Failed to read image from URL '{url}': {detail}")]
    UrlRead { url: String, detail: String },

    /// Local path could not be opened or decoded.
    #[error("Failed to read image from path '{path}': {detail}")]
    PathRead { path: String, detail: String },

    /// Embedded base64 payload could not be decoded.
    #[error("Failed to read image from base64 payload: {detail}")]
    Base64Read { detail: String },

    /// Decoded image has a colour mode with no normalization mapping.
    #[error("Image colour mode '{mode}' is not supported")]
    ImageFormat { mode: String },

    // ── Processing ────────────────────────────────────────────────────────
    /// Crop, strategy, markup, persistence or bounds failed.
    #[error("Processing failed during '{stage}': {detail}")]
    Processing { stage: &'static str, detail: String },
}

impl VectorizeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VectorizeError::InvalidRequest => ErrorKind::InvalidRequest,
            VectorizeError::UrlRead { .. } => ErrorKind::UrlRead,
            VectorizeError::PathRead { .. } => ErrorKind::PathRead,
            VectorizeError::Base64Read { .. } => ErrorKind::Base64Read,
            VectorizeError::ImageFormat { .. } => ErrorKind::ImageFormat,
            VectorizeError::Processing { .. } => ErrorKind::Processing,
        }
    }

    /// Classified, caller-safe description of this failure.
    pub fn public_message(&self) -> &'static str {
        self.kind().public_message()
    }

    pub(crate) fn processing(stage: &'static str, detail: impl ToString) -> Self {
        VectorizeError::Processing {
            stage,
            detail: detail.to_string(),
        }
    }
}

/// Invalid service configuration detected at start-up.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting is missing or empty.
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    /// A setting is present but unusable.
    #[error("Invalid setting '{name}': {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_distinct_public_message() {
        let kinds = [
            ErrorKind::InvalidRequest,
            ErrorKind::UrlRead,
            ErrorKind::PathRead,
            ErrorKind::Base64Read,
            ErrorKind::ImageFormat,
            ErrorKind::Processing,
        ];
        let mut messages: Vec<_> = kinds.iter().map(|k| k.public_message()).collect();
        messages.sort_unstable();
        messages.dedup();
        assert_eq!(messages.len(), kinds.len());
    }

    #[test]
    fn public_message_hides_detail() {
        let e = VectorizeError::UrlRead {
            url: "https://internal.example/secret.png".into(),
            detail: "connection refused (os error 111)".into(),
        };
        assert_eq!(e.public_message(), "Failed to read image from provided URL.");
        assert!(!e.public_message().contains("internal.example"));
        // Display keeps the detail for logs.
        assert!(e.to_string().contains("connection refused"));
    }

    #[test]
    fn processing_helper_sets_stage() {
        let e = VectorizeError::processing("Markup Upload", "403 Forbidden");
        assert_eq!(e.kind(), ErrorKind::Processing);
        assert!(e.to_string().contains("Markup Upload"));
        assert!(e.to_string().contains("403"));
    }

    #[test]
    fn image_format_display() {
        let e = VectorizeError::ImageFormat { mode: "LA".into() };
        assert_eq!(e.kind(), ErrorKind::ImageFormat);
        assert!(e.to_string().contains("LA"));
    }

    #[test]
    fn config_error_display() {
        let e = ConfigError::Invalid {
            name: "PORT",
            reason: "must be non-zero".into(),
        };
        assert!(e.to_string().contains("PORT"));
        assert!(ConfigError::Missing("S3_BUCKET").to_string().contains("S3_BUCKET"));
    }
}
