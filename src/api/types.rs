//! バックエンドAPIのレスポンス型

use crate::error::{OcrClientError, Result};
use ocr_client_common::types::{deserialize_id, deserialize_opt_id};
use ocr_client_common::{OcrResult, OutputFormat, TaskStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `POST /upload` のレスポンス
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(deserialize_with = "deserialize_id")]
    pub task_id: String,
    /// ファイルごとのタスクID（サーバーが割り当てた場合のみ）
    #[serde(default)]
    pub tasks: Vec<UploadedTask>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadedTask {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub filename: String,
}

/// `GET /status/{id}` のレスポンス
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub task_id: Option<String>,
    /// バッチ全体の状態
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub tasks: Vec<TaskSnapshot>,
    #[serde(default)]
    pub error: Option<String>,
}

/// ステータス応答に含まれる個別タスクの状態
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskSnapshot {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

/// `GET /results/{id}` は `{results: [...]}` と配列そのものの両方を受け付ける
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum ResultsResponse {
    Wrapped { results: Vec<OcrResult> },
    Bare(Vec<OcrResult>),
}

impl ResultsResponse {
    pub(crate) fn into_results(self) -> Vec<OcrResult> {
        match self {
            ResultsResponse::Wrapped { results } | ResultsResponse::Bare(results) => results,
        }
    }
}

/// バイナリで受け取った成果物（Word/PDF）
#[derive(Debug, Clone, Default)]
pub struct DownloadedFile {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    /// Content-Dispositionで指定されたファイル名
    pub filename: Option<String>,
}

/// OCR/ダウンロード結果: textはJSON、word/pdfはバイナリ
#[derive(Debug, Clone)]
pub enum OcrOutput {
    Json(Value),
    File(DownloadedFile),
}

impl OcrOutput {
    pub fn format_matches(&self, format: OutputFormat) -> bool {
        matches!(
            (self, format.is_binary()),
            (OcrOutput::Json(_), false) | (OcrOutput::File(_), true)
        )
    }

    pub fn into_json(self) -> Result<Value> {
        match self {
            OcrOutput::Json(value) => Ok(value),
            OcrOutput::File(file) => Err(OcrClientError::Decode(format!(
                "JSONを期待しましたがバイナリを受信しました ({} bytes)",
                file.bytes.len()
            ))),
        }
    }

    pub fn into_file(self) -> Result<DownloadedFile> {
        match self {
            OcrOutput::File(file) => Ok(file),
            OcrOutput::Json(_) => Err(OcrClientError::Decode(
                "バイナリを期待しましたがJSONを受信しました".into(),
            )),
        }
    }
}
