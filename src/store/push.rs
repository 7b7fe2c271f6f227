//! プッシュモード: 一括アップロード → サーバー処理 → WebSocketで進捗受信
//!
//! WebSocketが開けない、または途中で閉じた場合はステータスAPIのポーリングに切り替える。
//! 通知は順不同・重複ありで届く前提で、タスクIDで照合して反映する（後勝ち）。

use super::{AppState, AppStore, ProcessOptions};
use crate::api::{OcrBackend, StatusResponse};
use crate::error::Result;
use ocr_client_common::{PushMessage, Step, TaskStatus};
use tracing::{debug, info, warn};

const DEFAULT_TASK_ERROR: &str = "処理に失敗しました";

/// `task_update`: 状態と進捗を更新
pub(super) fn on_task_update(state: &mut AppState, msg: &PushMessage) {
    let Some(task) = msg.task_id.as_deref().and_then(|id| state.find_task_mut(id)) else {
        warn!("不明なタスクへの更新を無視: {:?}", msg.task_id);
        return;
    };

    if msg.status == Some(TaskStatus::Error) {
        task.fail(msg.error.clone().unwrap_or_else(|| DEFAULT_TASK_ERROR.into()));
        return;
    }
    if msg.status == Some(TaskStatus::Completed) {
        task.complete(msg.result.clone());
        return;
    }
    task.apply_update(msg.status, msg.progress_percent());
}

/// `task_completed`: 終端状態にして結果を保持
pub(super) fn on_task_completed(state: &mut AppState, msg: &PushMessage) {
    let Some(task) = msg.task_id.as_deref().and_then(|id| state.find_task_mut(id)) else {
        warn!("不明なタスクの完了通知を無視: {:?}", msg.task_id);
        return;
    };

    if msg.status == Some(TaskStatus::Error) || msg.error.is_some() {
        task.fail(msg.error.clone().unwrap_or_else(|| DEFAULT_TASK_ERROR.into()));
    } else {
        task.complete(msg.result.clone());
    }
}

/// ポーリング結果を反映
///
/// 個別タスクの状態が無く、バッチ全体が終端状態の場合は全タスクをその状態にする。
pub(super) fn apply_status(state: &mut AppState, status: &StatusResponse) {
    for snapshot in &status.tasks {
        let Some(task) = state.find_task_mut(&snapshot.id) else {
            debug!("不明なタスクのステータスを無視: {}", snapshot.id);
            continue;
        };
        let progress = snapshot
            .progress
            .filter(|p| p.is_finite())
            .map(|p| p.round().clamp(0.0, 100.0) as u8);

        match snapshot.status {
            TaskStatus::Completed => {
                task.complete(snapshot.result.clone());
            }
            TaskStatus::Error => {
                task.fail(snapshot.error.clone().unwrap_or_else(|| DEFAULT_TASK_ERROR.into()));
            }
            other => {
                task.apply_update(Some(other), progress);
            }
        }
    }

    if status.tasks.is_empty() {
        match status.status {
            Some(TaskStatus::Completed) => {
                for task in &mut state.tasks {
                    task.complete(None);
                }
            }
            Some(TaskStatus::Error) => {
                let message = status.error.clone().unwrap_or_else(|| DEFAULT_TASK_ERROR.into());
                for task in &mut state.tasks {
                    task.fail(message.clone());
                }
            }
            _ => {}
        }
    }
}

impl AppStore {
    /// 選択中のファイルをアップロードし、プッシュ通知（またはポーリング）で完了を待つ
    pub async fn start_push_processing(&mut self, backend: &dyn OcrBackend, options: &ProcessOptions) -> Result<()> {
        let outcome = self.run_push(backend, options).await;
        if let Err(e) = &outcome {
            self.fail_action(e);
            self.disconnect().await;
        }
        outcome
    }

    async fn run_push(&mut self, backend: &dyn OcrBackend, options: &ProcessOptions) -> Result<()> {
        self.begin_processing()?;

        let upload = backend.upload_files(&self.state.selected_files).await?;
        self.state.upload_progress = 100;
        self.state.current_task_id = Some(upload.task_id.clone());
        self.assign_server_task_ids(&upload);

        match backend.open_push(&upload.task_id).await {
            Ok(channel) => self.channel = Some(channel),
            Err(e) => warn!("プッシュ通知が使えないためポーリングに切り替え: {}", e),
        }

        backend.start_processing(&upload.task_id).await?;

        if self.channel.is_some() {
            self.drive_push(backend, options).await
        } else {
            self.poll_until_done(backend, options).await
        }
    }

    async fn drive_push(&mut self, backend: &dyn OcrBackend, options: &ProcessOptions) -> Result<()> {
        while self.state.current_step == Step::Processing {
            let Some(channel) = self.channel.as_mut() else {
                break;
            };

            let next = match channel.next_message().await {
                Ok(next) => next,
                Err(e) => {
                    warn!("プッシュチャネルの受信に失敗: {}", e);
                    None
                }
            };

            match next {
                Some(msg) => {
                    if self.apply_push_message(&msg) {
                        self.finish_batch(backend).await?;
                    }
                }
                None => {
                    self.channel = None;
                    if self.state.all_done() {
                        self.finish_batch(backend).await?;
                    } else {
                        warn!("プッシュチャネルが閉じたためポーリングに切り替え");
                        return self.poll_until_done(backend, options).await;
                    }
                }
            }
        }
        Ok(())
    }

    async fn poll_until_done(&mut self, backend: &dyn OcrBackend, options: &ProcessOptions) -> Result<()> {
        let Some(batch_id) = self.state.current_task_id.clone() else {
            return Ok(());
        };

        while self.state.current_step == Step::Processing {
            let status = backend.get_task_status(&batch_id).await?;
            if self.apply_status(&status) {
                self.finish_batch(backend).await?;
                break;
            }
            tokio::time::sleep(options.poll_interval).await;
        }
        Ok(())
    }

    /// 全タスク完了後: 結果を取得して集計し、結果画面へ進む
    ///
    /// processing段階でのみ動作するので、完了通知が何度届いても遷移は1回だけ。
    pub async fn finish_batch(&mut self, backend: &dyn OcrBackend) -> Result<()> {
        if self.state.current_step != Step::Processing {
            return Ok(());
        }
        let Some(batch_id) = self.state.current_task_id.clone() else {
            return Ok(());
        };

        let mut results = backend.get_results(&batch_id).await?;
        for result in &mut results {
            result.expanded = false;
            result.editing = false;
        }
        info!("結果取得: {}件", results.len());

        self.state.results = results;
        self.update_stats();
        self.advance_to(Step::Results);
        self.state.loading = false;
        self.disconnect().await;
        Ok(())
    }
}
