//! 表示用フォーマット関数

use chrono::{DateTime, TimeZone};

const SIZE_UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// バイト数を人が読める形式に変換（1024基準）
///
/// 小数点以下は最大2桁、末尾の0は落とす。GBより大きい値もGBで表す。
///
/// # Examples
/// ```
/// use ocr_client_common::format_file_size;
///
/// assert_eq!(format_file_size(0), "0 B");
/// assert_eq!(format_file_size(1536), "1.5 KB");
/// ```
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".into();
    }

    let mut unit = 0;
    let mut divisor = 1u64;
    while unit < SIZE_UNITS.len() - 1 && bytes >= divisor * 1024 {
        divisor *= 1024;
        unit += 1;
    }

    let value = format!("{:.2}", bytes as f64 / divisor as f64);
    let value = value.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", value, SIZE_UNITS[unit])
}

/// 時刻を `HH:MM:SS` 形式に変換
pub fn format_time<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    time.format("%H:%M:%S").to_string()
}

/// 処理時間（秒）を表示用に変換
pub fn format_duration(seconds: f64) -> String {
    if seconds < 60.0 {
        format!("{:.1}秒", seconds)
    } else {
        let minutes = (seconds / 60.0).floor();
        format!("{}分{:.0}秒", minutes, seconds - minutes * 60.0)
    }
}
