use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrClientError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("ファイルが選択されていません")]
    NoFilesSelected,

    /// 現在の画面段階では実行できない操作
    #[error("{0}")]
    InvalidState(String),

    /// リクエストがサーバーに届かなかった
    #[error("ネットワークエラー: {0}")]
    Network(String),

    /// サーバーが2xx以外を返した（メッセージはレスポンス本文の `error`）
    #[error("{message}")]
    Server { status: u16, message: String },

    #[error("タイムアウト: {0}")]
    Timeout(String),

    #[error("レスポンスのデコードに失敗: {0}")]
    Decode(String),

    #[error("WebSocketエラー: {0}")]
    WebSocket(String),

    #[error("画像処理エラー: {0}")]
    Image(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] ocr_client_common::Error),
}

impl From<reqwest::Error> for OcrClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            OcrClientError::Timeout(e.to_string())
        } else if e.is_decode() {
            OcrClientError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            OcrClientError::Server {
                status: status.as_u16(),
                message: format!("Request failed: {}", status.as_u16()),
            }
        } else {
            OcrClientError::Network(e.to_string())
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for OcrClientError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        OcrClientError::WebSocket(e.to_string())
    }
}

impl From<image::ImageError> for OcrClientError {
    fn from(e: image::ImageError) -> Self {
        OcrClientError::Image(e.to_string())
    }
}

impl OcrClientError {
    /// ファイル検証で弾かれたエラーか
    pub fn is_validation(&self) -> bool {
        matches!(self, OcrClientError::Common(ocr_client_common::Error::Validation(_)))
    }
}

pub type Result<T> = std::result::Result<T, OcrClientError>;
