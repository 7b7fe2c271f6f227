//! 送信前の画像再圧縮（JPEG）

use crate::error::Result;
use crate::scanner::selected_file_from_path;
use crate::utils::generate_id;
use image::codecs::jpeg::JpegEncoder;
use ocr_client_common::SelectedFile;
use std::path::Path;

/// 画像をJPEGに再エンコードする
///
/// `quality` は 0.0〜1.0（範囲外は丸める）。
pub fn compress_image(path: &Path, quality: f32) -> Result<Vec<u8>> {
    let image = image::open(path)?.to_rgb8();
    let quality = (quality.clamp(0.01, 1.0) * 100.0).round() as u8;

    let mut buffer = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    encoder.encode_image(&image)?;
    Ok(buffer)
}

/// 画像ファイルを圧縮して `dir` に書き出し、差し替え用の選択ファイルを返す
///
/// 書き出し先は呼び出しごとに一意（同名ファイルを上書きしない）。
/// 表示名は `<元の名前>.jpg`。PDFなど画像以外はそのまま返す。
pub fn compress_to(file: &SelectedFile, quality: f32, dir: &Path) -> Result<SelectedFile> {
    if !file.mime_type.starts_with("image/") {
        return Ok(file.clone());
    }

    let bytes = compress_image(&file.path, quality)?;
    std::fs::create_dir_all(dir)?;
    let stem = file
        .path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "image".into());
    let output = dir.join(format!("{}_{}.jpg", generate_id(), stem));
    std::fs::write(&output, bytes)?;

    let mut compressed = selected_file_from_path(&output)?;
    compressed.name = format!("{}.jpg", stem);
    Ok(compressed)
}
