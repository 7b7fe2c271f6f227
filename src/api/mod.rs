//! OCRバックエンドAPIクライアント
//!
//! 2系統のエンドポイントを扱う:
//! - 同期OCR: `POST /api/ocr/`, `POST /api/ocr/auto/`（1ファイルずつ即時処理）
//! - タスク: `POST /upload` → `POST /process/{id}` → `GET /status/{id}` / `GET /results/{id}`
//!   進捗は `ws(s)://.../ws/{id}` でも受け取れる

pub mod push;
mod types;

pub use push::{EventDispatcher, PushChannel, PushTransport};
pub use types::{
    DownloadedFile, OcrOutput, StatusResponse, TaskSnapshot, UploadResponse, UploadedTask,
};

use crate::config::Config;
use crate::error::{OcrClientError, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use ocr_client_common::{OcrResult, OutputFormat, SelectedFile};
use regex::Regex;
use reqwest::multipart::{Form, Part};
use reqwest::{header, Client, Response};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};
use types::ResultsResponse;

lazy_static! {
    static ref FILENAME_RE: Regex =
        Regex::new(r#"filename\*?=(?:UTF-8'')?"?([^";]+)"?"#).expect("valid regex");
}

/// ストアが利用するバックエンド操作
///
/// 実体は [`ApiClient`]。テストではモックに差し替える。
#[async_trait]
pub trait OcrBackend: Send + Sync {
    /// 言語を指定して1ファイルをOCR
    async fn ocr_image(&self, file: &SelectedFile, lang: &str, format: OutputFormat) -> Result<OcrOutput>;

    /// 言語を自動検出して1ファイルをOCR
    async fn ocr_auto_detect(&self, file: &SelectedFile, format: OutputFormat) -> Result<OcrOutput>;

    async fn upload_files(&self, files: &[SelectedFile]) -> Result<UploadResponse>;

    /// サーバー側の処理を開始する（結果はプッシュかポーリングで受け取る）
    async fn start_processing(&self, batch_id: &str) -> Result<()>;

    async fn get_task_status(&self, batch_id: &str) -> Result<StatusResponse>;

    async fn get_results(&self, batch_id: &str) -> Result<Vec<OcrResult>>;

    async fn open_push(&self, batch_id: &str) -> Result<Box<dyn PushTransport>>;
}

pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let base_url = config.base_url();
        debug!("API Base URL: {}", base_url);
        Self::new(&base_url, config.timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// http(s)をws(s)に置き換えたWebSocket URL
    pub fn ws_url(&self, batch_id: &str) -> String {
        let ws_base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            self.base_url.clone()
        };
        format!("{}/ws/{}", ws_base, batch_id)
    }

    pub async fn health_check(&self) -> Result<Value> {
        let response = self.client.get(self.url("/api/")).send().await?;
        let response = check_response(response).await?;
        Ok(response.json().await?)
    }

    /// 処理済みバッチの成果物を取得（textはJSON、word/pdfはバイナリ）
    pub async fn download_results(&self, batch_id: &str, format: OutputFormat) -> Result<OcrOutput> {
        let response = self
            .client
            .get(self.url(&format!("/download/{}", batch_id)))
            .query(&[("format", format.as_str())])
            .send()
            .await?;
        let response = check_response(response).await?;
        read_output(response, format).await
    }

    pub async fn connect_push(&self, batch_id: &str) -> Result<PushChannel> {
        PushChannel::connect(&self.ws_url(batch_id)).await
    }

    async fn post_ocr(&self, path: &str, form: Form, format: OutputFormat) -> Result<OcrOutput> {
        let response = self.client.post(self.url(path)).multipart(form).send().await?;
        let response = check_response(response).await?;
        read_output(response, format).await
    }
}

#[async_trait]
impl OcrBackend for ApiClient {
    async fn ocr_image(&self, file: &SelectedFile, lang: &str, format: OutputFormat) -> Result<OcrOutput> {
        info!("OCR: {} (lang={}, format={})", file.name, lang, format);
        let form = Form::new()
            .part("file", file_part(file).await?)
            .text("lang", lang.to_string())
            .text("output_format", format.as_str());
        self.post_ocr("/api/ocr/", form, format).await
    }

    async fn ocr_auto_detect(&self, file: &SelectedFile, format: OutputFormat) -> Result<OcrOutput> {
        info!("OCR(自動検出): {} (format={})", file.name, format);
        let form = Form::new()
            .part("file", file_part(file).await?)
            .text("output_format", format.as_str());
        self.post_ocr("/api/ocr/auto/", form, format).await
    }

    async fn upload_files(&self, files: &[SelectedFile]) -> Result<UploadResponse> {
        let mut form = Form::new();
        for file in files {
            form = form.part("files[]", file_part(file).await?);
        }

        let response = self.client.post(self.url("/upload")).multipart(form).send().await?;
        let response = check_response(response).await?;
        let upload: UploadResponse = response.json().await?;
        info!("アップロード完了: task_id={} ({}件)", upload.task_id, files.len());
        Ok(upload)
    }

    async fn start_processing(&self, batch_id: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url(&format!("/process/{}", batch_id)))
            .send()
            .await?;
        check_response(response).await?;
        Ok(())
    }

    async fn get_task_status(&self, batch_id: &str) -> Result<StatusResponse> {
        let response = self
            .client
            .get(self.url(&format!("/status/{}", batch_id)))
            .send()
            .await?;
        let response = check_response(response).await?;
        Ok(response.json().await?)
    }

    async fn get_results(&self, batch_id: &str) -> Result<Vec<OcrResult>> {
        let response = self
            .client
            .get(self.url(&format!("/results/{}", batch_id)))
            .send()
            .await?;
        let response = check_response(response).await?;
        let results: ResultsResponse = response.json().await?;
        Ok(results.into_results())
    }

    async fn open_push(&self, batch_id: &str) -> Result<Box<dyn PushTransport>> {
        Ok(Box::new(self.connect_push(batch_id).await?))
    }
}

async fn file_part(file: &SelectedFile) -> Result<Part> {
    let bytes = tokio::fs::read(&file.path)
        .await
        .map_err(|_| OcrClientError::FileNotFound(file.path.display().to_string()))?;
    let part = Part::bytes(bytes)
        .file_name(file.name.clone())
        .mime_str(&file.mime_type)?;
    Ok(part)
}

/// 2xx以外はサーバーエラーとして返す
///
/// 本文の `error`（FastAPIの場合は `detail`）をメッセージに使う。
/// 取り出せない場合は `Request failed: <status>`。
async fn check_response(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message_from_body(&body)
        .unwrap_or_else(|| format!("Request failed: {}", status.as_u16()));

    Err(OcrClientError::Server {
        status: status.as_u16(),
        message,
    })
}

fn error_message_from_body(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["error", "detail", "message"]
        .iter()
        .filter_map(|key| value.get(key))
        .find_map(|v| match v {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Null => None,
            Value::String(_) => None,
            other => Some(other.to_string()),
        })
}

async fn read_output(response: Response, format: OutputFormat) -> Result<OcrOutput> {
    if !format.is_binary() {
        return Ok(OcrOutput::Json(response.json().await?));
    }

    let headers = response.headers();
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let filename = headers
        .get(header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .and_then(filename_from_disposition);

    let bytes = response.bytes().await?.to_vec();
    Ok(OcrOutput::File(DownloadedFile {
        bytes,
        content_type,
        filename,
    }))
}

fn filename_from_disposition(disposition: &str) -> Option<String> {
    FILENAME_RE
        .captures(disposition)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|name| !name.is_empty())
}
