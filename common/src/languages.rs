//! 対応言語と出力形式の一覧

use crate::types::OutputFormat;

/// 対応言語（コード, 表示名）。`auto` は自動検出。
pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("auto", "自動検出"),
    ("eng", "English"),
    ("chi_sim", "简体中文"),
    ("chi_tra", "繁體中文"),
    ("jpn", "日本語"),
    ("kor", "한국어"),
    ("fra", "Français"),
    ("deu", "Deutsch"),
    ("spa", "Español"),
    ("ita", "Italiano"),
    ("por", "Português"),
    ("rus", "Русский"),
    ("ara", "العربية"),
];

/// 出力形式（形式, 表示名）
pub const OUTPUT_FORMATS: &[(OutputFormat, &str)] = &[
    (OutputFormat::Text, "プレーンテキスト"),
    (OutputFormat::Word, "Word文書"),
    (OutputFormat::Pdf, "PDF文書"),
];

pub fn language_name(code: &str) -> Option<&'static str> {
    SUPPORTED_LANGUAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

pub fn is_supported_language(code: &str) -> bool {
    language_name(code).is_some()
}

pub fn output_format_name(format: OutputFormat) -> &'static str {
    OUTPUT_FORMATS
        .iter()
        .find(|(f, _)| *f == format)
        .map(|(_, name)| *name)
        .unwrap_or("")
}
