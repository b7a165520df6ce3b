//! Kollus Core Library
//!
//! Domain models, error types, configuration and validation shared by the
//! upload client and the command-line tool.

pub mod config;
pub mod error;
pub mod format;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use config::ClientConfig;
pub use error::{LogLevel, UploadError, UploadResult};
pub use format::{format_expire_time, format_file_size};
pub use models::{
    DestinationDescriptor, DestinationRequest, ProgressSnapshot, UploadFile, UploadOutcome,
    UploadVariant,
};
pub use validation::{is_valid_media_file, validate_media_file, ValidationError};
