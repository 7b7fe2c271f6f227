//! 成果物の保存

use crate::error::Result;
use ocr_client_common::OutputFormat;
use std::path::{Path, PathBuf};

/// `ocr_result_<元ファイル名の拡張子なし>.<拡張子>`
pub fn default_download_name(source_name: &str, format: OutputFormat) -> String {
    let stem = Path::new(source_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".into());
    format!("ocr_result_{}.{}", stem, format.extension())
}

/// 内容を `dir/filename` に書き出す
///
/// ファイル名にディレクトリ成分が含まれていても最後の要素だけを使う。
pub fn download_file(content: &[u8], dir: &Path, filename: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let name = Path::new(filename)
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "download".into());
    let path = dir.join(name);
    std::fs::write(&path, content)?;
    Ok(path)
}
