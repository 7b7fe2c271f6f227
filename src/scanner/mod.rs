use crate::error::{OcrClientError, Result};
use ocr_client_common::{mime_from_extension, SelectedFile, ALLOWED_MIME_TYPES};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// パスから選択ファイルを作る（サイズとMIMEタイプを埋める）
pub fn selected_file_from_path(path: &Path) -> Result<SelectedFile> {
    if !path.is_file() {
        return Err(OcrClientError::FileNotFound(path.display().to_string()));
    }

    let size = std::fs::metadata(path)?.len();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    Ok(SelectedFile {
        name,
        size,
        mime_type: mime_from_extension(path).to_string(),
        path: path.to_path_buf(),
    })
}

/// 指定されたファイル・フォルダから送信対象を集める
///
/// - ファイルは拡張子に関係なくそのまま追加（検証は送信時）
/// - フォルダは対応形式の画像/PDFのみ、ファイル名順で追加
pub fn scan_paths(paths: &[PathBuf], recursive: bool) -> Result<Vec<SelectedFile>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            files.extend(scan_folder(path, recursive)?);
        } else {
            files.push(selected_file_from_path(path)?);
        }
    }

    Ok(files)
}

pub fn scan_folder(folder: &Path, recursive: bool) -> Result<Vec<SelectedFile>> {
    if !folder.exists() {
        return Err(OcrClientError::FileNotFound(folder.display().to_string()));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if !path.is_file() || !is_supported_file(path) {
            continue;
        }

        files.push(selected_file_from_path(path)?);
    }

    // ファイル名でソート
    files.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(files)
}

fn is_supported_file(path: &Path) -> bool {
    ALLOWED_MIME_TYPES.contains(&mime_from_extension(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_is_supported_file() {
        assert!(is_supported_file(Path::new("a.jpg")));
        assert!(is_supported_file(Path::new("a.JPG")));
        assert!(is_supported_file(Path::new("a.gif")));
        assert!(is_supported_file(Path::new("a.pdf")));
        assert!(!is_supported_file(Path::new("a.txt")));
        assert!(!is_supported_file(Path::new("a.webp")));
    }

    #[test]
    fn test_scan_folder_not_found() {
        let result = scan_folder(Path::new("/nonexistent/folder"), false);
        assert!(matches!(result, Err(OcrClientError::FileNotFound(_))));
    }

    #[test]
    fn test_scan_folder_with_images() {
        let dir = tempdir().unwrap();

        File::create(dir.path().join("test1.jpg")).unwrap().write_all(b"dummy").unwrap();
        File::create(dir.path().join("test2.PNG")).unwrap().write_all(b"dummy").unwrap();
        File::create(dir.path().join("scan.pdf")).unwrap().write_all(b"%PDF").unwrap();
        File::create(dir.path().join("readme.txt")).unwrap().write_all(b"text").unwrap();

        let result = scan_folder(dir.path(), false).unwrap();
        assert_eq!(result.len(), 3);
        assert_eq!(result[0].name, "scan.pdf");
        assert_eq!(result[0].mime_type, "application/pdf");
        assert_eq!(result[1].name, "test1.jpg");
        assert_eq!(result[1].size, 5);
        assert_eq!(result[2].mime_type, "image/png");
    }

    #[test]
    fn test_scan_recursive() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir_all(&sub).unwrap();
        File::create(dir.path().join("a.jpg")).unwrap();
        File::create(sub.join("b.jpg")).unwrap();

        assert_eq!(scan_folder(dir.path(), false).unwrap().len(), 1);
        assert_eq!(scan_folder(dir.path(), true).unwrap().len(), 2);
    }

    #[test]
    fn test_scan_paths_keeps_explicit_files() {
        let dir = tempdir().unwrap();
        let note = dir.path().join("note.txt");
        fs::write(&note, "hello").unwrap();

        let result = scan_paths(&[note], false).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].mime_type, "text/plain");
    }
}
