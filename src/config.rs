use crate::error::{OcrClientError, Result};
use clap::ValueEnum;
use ocr_client_common::{OutputFormat, DEFAULT_MAX_FILE_SIZE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 接続先の既定値（ローカル開発サーバー）
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// 接続先を上書きする環境変数（実行時・ビルド時の両方で参照）
pub const BASE_URL_ENV: &str = "OCR_API_BASE_URL";

/// 処理モード
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    /// 1ファイルずつ同期OCR APIを呼ぶ
    #[default]
    Direct,
    /// 一括アップロード後、WebSocketで進捗を受け取る
    Push,
}

impl std::fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingMode::Direct => write!(f, "direct"),
            ProcessingMode::Push => write!(f, "push"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: Option<String>,
    pub default_lang: String,
    pub output_format: OutputFormat,
    pub mode: ProcessingMode,
    pub timeout_seconds: u64,
    pub poll_interval_ms: u64,
    pub max_file_size: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: None,
            default_lang: "auto".into(),
            output_format: OutputFormat::Text,
            mode: ProcessingMode::Direct,
            timeout_seconds: 120,
            poll_interval_ms: 1000,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| OcrClientError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("ocr-client").join("config.json"))
    }

    /// 接続先URLを決定する
    ///
    /// 優先順位: 実行時の環境変数 → ビルド時の環境変数 → 設定ファイル → 既定値
    pub fn base_url(&self) -> String {
        let runtime = std::env::var(BASE_URL_ENV).ok();
        let build_time = option_env!("OCR_API_BASE_URL").map(str::to_string);
        resolve_base_url(runtime, build_time, self.base_url.clone())
    }

    pub fn set_base_url(&mut self, url: String) -> Result<()> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(OcrClientError::Config(format!(
                "URLは http:// か https:// で始めてください: {}",
                url
            )));
        }
        self.base_url = Some(url);
        self.save()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.max(1))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(50))
    }
}

fn resolve_base_url(
    runtime: Option<String>,
    build_time: Option<String>,
    configured: Option<String>,
) -> String {
    [runtime, build_time, configured]
        .into_iter()
        .flatten()
        .map(|url| url.trim().trim_end_matches('/').to_string())
        .find(|url| !url.is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}
