//! ファイル検証（送信前のクライアント側チェック）

use crate::error::{Error, Result};
use crate::format::format_file_size;
use crate::types::SelectedFile;
use std::path::Path;

/// 送信を許可するMIMEタイプ
pub const ALLOWED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "application/pdf"];

/// 既定の最大ファイルサイズ（100MB）
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

const EXTENSION_MIME_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("pdf", "application/pdf"),
    ("bmp", "image/bmp"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("webp", "image/webp"),
    ("txt", "text/plain"),
];

/// 拡張子からMIMEタイプを推定（大文字小文字は区別しない）
pub fn mime_from_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    EXTENSION_MIME_TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
        .unwrap_or("application/octet-stream")
}

pub fn validate_file_type(file: &SelectedFile) -> bool {
    ALLOWED_MIME_TYPES.contains(&file.mime_type.as_str())
}

pub fn validate_file_size(file: &SelectedFile, max_size: u64) -> bool {
    file.size <= max_size
}

/// 形式とサイズをまとめて検証し、理由付きのエラーを返す
pub fn validate_file(file: &SelectedFile, max_size: u64) -> Result<()> {
    if !validate_file_type(file) {
        return Err(Error::Validation(format!(
            "{}: サポートされていないファイル形式です ({})",
            file.name, file.mime_type
        )));
    }
    if !validate_file_size(file, max_size) {
        return Err(Error::Validation(format!(
            "{}: ファイルが大きすぎます ({} > {})",
            file.name,
            format_file_size(file.size),
            format_file_size(max_size)
        )));
    }
    Ok(())
}
