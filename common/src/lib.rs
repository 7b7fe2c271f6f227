//! OCR Client Common Library
//!
//! CLIとAPIクライアントで共有される型とユーティリティ

pub mod types;
pub mod error;
pub mod format;
pub mod languages;
pub mod message;
pub mod stats;
pub mod validation;

pub use types::{OcrResult, OutputFormat, SelectedFile, Step, Task, TaskStatus};
pub use error::{Error, Result};
pub use format::{format_duration, format_file_size, format_time};
pub use languages::{is_supported_language, language_name, output_format_name, OUTPUT_FORMATS, SUPPORTED_LANGUAGES};
pub use message::{parse_push_message, EventKind, PushMessage};
pub use stats::{compute_stats, Stats};
pub use validation::{
    mime_from_extension, validate_file, validate_file_size, validate_file_type,
    ALLOWED_MIME_TYPES, DEFAULT_MAX_FILE_SIZE,
};
