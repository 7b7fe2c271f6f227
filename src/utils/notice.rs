//! エラーをユーザー向けの通知に変換する

use crate::error::OcrClientError;
use serde::Serialize;
use tracing::error;

/// 失敗の分類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// サーバーがエラーを返した
    ServerResponded,
    /// リクエストは送ったが応答がない
    NoResponse,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorNotice {
    #[serde(rename = "type")]
    pub notice_type: &'static str,
    pub kind: ErrorKind,
    pub title: String,
    pub message: String,
}

pub fn classify(err: &OcrClientError) -> ErrorKind {
    match err {
        OcrClientError::Server { .. } => ErrorKind::ServerResponded,
        OcrClientError::Network(_) | OcrClientError::Timeout(_) => ErrorKind::NoResponse,
        _ => ErrorKind::Other,
    }
}

pub fn handle_error(err: &OcrClientError, context: &str) -> ErrorNotice {
    error!("Error in {}: {}", context, err);

    let kind = classify(err);
    let message = match (kind, err) {
        (ErrorKind::ServerResponded, OcrClientError::Server { status, message }) => {
            if message.is_empty() {
                format!("リクエストに失敗しました ({})", status)
            } else {
                message.clone()
            }
        }
        (ErrorKind::NoResponse, _) => {
            "ネットワーク接続に失敗しました。ネットワーク状態を確認してください".to_string()
        }
        _ => {
            let message = err.to_string();
            if message.is_empty() {
                "操作に失敗しました".to_string()
            } else {
                message
            }
        }
    };

    ErrorNotice {
        notice_type: "error",
        kind,
        title: "操作に失敗しました".into(),
        message,
    }
}
