//! WebSocketプッシュ通知のメッセージ定義
//!
//! 受信メッセージの形: `{type, task_id, status?, progress?, result?, error?}`

use crate::error::{Error, Result};
use crate::types::{deserialize_opt_id, TaskStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// イベント種別。未知の種別は `Unknown` に落とす。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    TaskUpdate,
    TaskCompleted,
    #[serde(other)]
    Unknown,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::TaskUpdate => "task_update",
            EventKind::TaskCompleted => "task_completed",
            EventKind::Unknown => "unknown",
        }
    }
}

/// サーバーからのプッシュ通知
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushMessage {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub task_id: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl PushMessage {
    pub fn new(kind: EventKind, task_id: impl Into<String>) -> Self {
        Self {
            kind,
            task_id: Some(task_id.into()),
            status: None,
            progress: None,
            result: None,
            error: None,
        }
    }

    /// 進捗（0〜100に丸める）
    pub fn progress_percent(&self) -> Option<u8> {
        self.progress
            .filter(|p| p.is_finite())
            .map(|p| p.round().clamp(0.0, 100.0) as u8)
    }
}

/// 受信テキストをパース
pub fn parse_push_message(text: &str) -> Result<PushMessage> {
    serde_json::from_str(text)
        .map_err(|e| Error::Parse(format!("プッシュ通知のパースエラー: {}", e)))
}
