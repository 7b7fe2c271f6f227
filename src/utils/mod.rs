//! 補助関数群

pub mod clipboard;
pub mod debounce;
pub mod download;
pub mod compress;
pub mod notice;

pub use clipboard::copy_to_clipboard;
pub use debounce::Debouncer;
pub use download::{default_download_name, download_file};
pub use compress::{compress_image, compress_to};
pub use notice::{handle_error, ErrorKind, ErrorNotice};

/// 一意なIDを生成（時刻のbase36 + 乱数）
pub fn generate_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis().max(0) as u64;
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("{}{}", to_base36(millis), &random[..10])
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".into();
    }
    let mut buf = Vec::new();
    while value > 0 {
        buf.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    buf.reverse();
    String::from_utf8_lossy(&buf).into_owned()
}
