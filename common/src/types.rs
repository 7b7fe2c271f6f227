//! OCRクライアントの型定義
//!
//! CLIとAPIクライアントで共有される型:
//! - SelectedFile: ユーザーが選択したファイル
//! - Task: 1ファイル分の処理状況
//! - OcrResult: 確定したOCR結果

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// 画面遷移の段階（upload → processing → results）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    #[default]
    Upload,
    Processing,
    Results,
}

/// タスク状態
///
/// `waiting → processing → {completed | error}`。completed/errorは終端。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    #[serde(alias = "pending", alias = "queued")]
    Waiting,
    #[serde(alias = "running")]
    Processing,
    #[serde(alias = "done", alias = "success")]
    Completed,
    #[serde(alias = "failed")]
    Error,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Waiting => "waiting",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Word,
    Pdf,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Word => "word",
            OutputFormat::Pdf => "pdf",
        }
    }

    /// word/pdfはバイナリ、textはJSONで返ってくる
    pub fn is_binary(&self) -> bool {
        matches!(self, OutputFormat::Word | OutputFormat::Pdf)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Word => "docx",
            OutputFormat::Pdf => "pdf",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Text => "text/plain",
            OutputFormat::Word => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            OutputFormat::Pdf => "application/pdf",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "word" | "docx" => Ok(OutputFormat::Word),
            "pdf" => Ok(OutputFormat::Pdf),
            _ => Err(format!("Unknown format: {}. Use text, word, or pdf", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ユーザーが選択したファイル
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectedFile {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    /// 送信時に読み込むローカルパス
    #[serde(default)]
    pub path: PathBuf,
}

/// 1ファイル分の処理タスク
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub filename: String,
    pub status: TaskStatus,
    pub progress: u8,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Task {
    pub fn new(id: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            filename: filename.into(),
            ..Default::default()
        }
    }

    /// 状態・進捗を更新する。終端状態のタスクは変更しない。
    ///
    /// # Returns
    /// 更新が適用された場合 true
    pub fn apply_update(&mut self, status: Option<TaskStatus>, progress: Option<u8>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        if let Some(status) = status {
            match status {
                TaskStatus::Completed => {
                    self.complete(None);
                    return true;
                }
                TaskStatus::Error => {
                    self.fail("処理に失敗しました");
                    return true;
                }
                _ => self.status = status,
            }
        }
        if let Some(progress) = progress {
            self.progress = progress.min(100);
        }
        true
    }

    pub fn complete(&mut self, result: Option<Value>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = TaskStatus::Completed;
        self.progress = 100;
        if result.is_some() {
            self.result = result;
        }
        true
    }

    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = TaskStatus::Error;
        self.error = Some(message.into());
        true
    }
}

fn default_language() -> String {
    "auto".into()
}

fn default_accuracy() -> f64 {
    85.0
}

fn default_processing_time() -> f64 {
    1.0
}

/// 確定したOCR結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrResult {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub filename: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(
        default = "default_language",
        alias = "detected_language",
        deserialize_with = "deserialize_language"
    )]
    pub language: String,
    #[serde(default = "default_accuracy", deserialize_with = "deserialize_accuracy")]
    pub accuracy: f64,
    #[serde(
        default = "default_processing_time",
        deserialize_with = "deserialize_processing_time"
    )]
    pub processing_time: f64,

    // 表示用フラグ（処理ロジックには影響しない）
    #[serde(default, deserialize_with = "null_as_default")]
    pub expanded: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub editing: bool,
}

// サーバーは欠損値を null で返すことがあるため、null も既定値として扱う

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn deserialize_language<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|s| !s.is_empty())
        .unwrap_or_else(default_language))
}

/// 0以下も未設定扱い
fn deserialize_accuracy<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?
        .filter(|a| *a > 0.0)
        .unwrap_or_else(default_accuracy))
}

fn deserialize_processing_time<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?
        .filter(|t| *t > 0.0)
        .unwrap_or_else(default_processing_time))
}

impl OcrResult {
    /// 単一ファイルOCRのJSONレスポンスから結果を組み立てる
    ///
    /// 欠けている項目は既定値で補う（言語: auto, 精度: 85, 処理時間: 1.0秒）。
    /// レスポンスが文字列そのものの場合はそれを本文とみなす。
    pub fn from_response(id: impl Into<String>, filename: impl Into<String>, value: &Value) -> Self {
        let text = match value {
            Value::String(s) => s.clone(),
            other => match other.get("text") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(v) => v.to_string(),
            },
        };

        let language = ["language", "detected_language"]
            .iter()
            .filter_map(|key| value.get(key).and_then(Value::as_str))
            .find(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(default_language);

        let accuracy = value
            .get("accuracy")
            .and_then(Value::as_f64)
            .filter(|a| *a > 0.0)
            .unwrap_or_else(default_accuracy);

        let processing_time = value
            .get("processing_time")
            .and_then(Value::as_f64)
            .filter(|t| *t > 0.0)
            .unwrap_or_else(default_processing_time);

        Self {
            id: id.into(),
            filename: filename.into(),
            text,
            language,
            accuracy,
            processing_time,
            expanded: false,
            editing: false,
        }
    }

    /// 文字数（バイト数ではなくUnicodeスカラー値の数）
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// 文字列・数値どちらのIDも文字列として受け取る
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserialize_opt_id(deserializer)?.unwrap_or_default())
}

pub fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "IDは文字列か数値である必要があります: {}",
                other
            )))
        }
    })
}
