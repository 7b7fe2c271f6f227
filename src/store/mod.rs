//! アプリケーション状態と処理フロー
//!
//! 状態は [`AppStore`] が所有し、各アクションは `&mut self` で呼ぶ。
//! 画面段階は upload → processing → results の順にだけ進み、
//! 戻るのは [`AppStore::reset`] のときだけ。

mod direct;
mod push;

use crate::api::{EventDispatcher, PushTransport, StatusResponse, UploadResponse};
use crate::error::{OcrClientError, Result};
use ocr_client_common::{compute_stats, OcrResult, PushMessage, SelectedFile, Stats, Step, Task, TaskStatus};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// 画面に見える状態一式
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppState {
    pub current_step: Step,
    pub selected_files: Vec<SelectedFile>,
    pub upload_progress: u8,
    /// サーバーが割り当てたバッチID（プッシュモードのみ）
    pub current_task_id: Option<String>,
    pub tasks: Vec<Task>,
    pub results: Vec<OcrResult>,
    pub loading: bool,
    pub error: Option<String>,
    pub stats: Stats,
}

impl AppState {
    pub fn find_task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// 全タスクが終端状態か（タスクが無ければ false）
    pub fn all_done(&self) -> bool {
        !self.tasks.is_empty() && self.tasks.iter().all(|t| t.status.is_terminal())
    }

    pub fn count_status(&self, status: TaskStatus) -> usize {
        self.tasks.iter().filter(|t| t.status == status).count()
    }
}

/// 処理の実行オプション
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// OCR言語。`None` または `auto` なら自動検出
    pub lang: Option<String>,
    /// プッシュが使えない場合のポーリング間隔
    pub poll_interval: Duration,
    pub max_file_size: u64,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            lang: None,
            poll_interval: Duration::from_secs(1),
            max_file_size: ocr_client_common::DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl ProcessOptions {
    /// 明示された言語（autoは除く）
    pub fn explicit_lang(&self) -> Option<&str> {
        self.lang.as_deref().filter(|l| !l.is_empty() && *l != "auto")
    }
}

/// 状態が変わるたびに呼ばれる進捗通知
pub type ProgressListener = Box<dyn FnMut(&AppState) + Send>;

pub struct AppStore {
    state: AppState,
    channel: Option<Box<dyn PushTransport>>,
    dispatcher: EventDispatcher<AppState>,
    progress_listener: Option<ProgressListener>,
}

impl Default for AppStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AppStore {
    pub fn new() -> Self {
        let mut dispatcher = EventDispatcher::new();
        dispatcher.on(ocr_client_common::EventKind::TaskUpdate, push::on_task_update);
        dispatcher.on(ocr_client_common::EventKind::TaskCompleted, push::on_task_completed);

        Self {
            state: AppState::default(),
            channel: None,
            dispatcher,
            progress_listener: None,
        }
    }

    /// タスクの進捗が変わるたびに `listener` を呼ぶ（resetしても保持される）
    pub fn set_progress_listener<F>(&mut self, listener: F)
    where
        F: FnMut(&AppState) + Send + 'static,
    {
        self.progress_listener = Some(Box::new(listener));
    }

    pub fn clear_progress_listener(&mut self) {
        self.progress_listener = None;
    }

    fn notify_progress(&mut self) {
        if let Some(listener) = self.progress_listener.as_mut() {
            listener(&self.state);
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// 状態の複製（以後のストア操作の影響を受けない）
    pub fn snapshot(&self) -> AppState {
        self.state.clone()
    }

    pub fn has_open_channel(&self) -> bool {
        self.channel.as_ref().is_some_and(|c| c.is_open())
    }

    // ---- ファイル操作 ----

    pub fn set_selected_files(&mut self, files: Vec<SelectedFile>) {
        self.state.selected_files = files;
        self.state.stats.total_files = self.state.selected_files.len();
    }

    pub fn add_files(&mut self, files: impl IntoIterator<Item = SelectedFile>) {
        self.state.selected_files.extend(files);
        self.state.stats.total_files = self.state.selected_files.len();
    }

    /// 範囲外のインデックスは無視
    pub fn remove_file(&mut self, index: usize) -> Option<SelectedFile> {
        if index >= self.state.selected_files.len() {
            return None;
        }
        let removed = self.state.selected_files.remove(index);
        self.state.stats.total_files = self.state.selected_files.len();
        Some(removed)
    }

    pub fn clear_files(&mut self) {
        self.state.selected_files.clear();
        self.state.stats.total_files = 0;
    }

    // ---- 状態操作 ----

    pub fn update_stats(&mut self) {
        self.state.stats = compute_stats(self.state.stats.total_files, &self.state.results);
    }

    /// 結果は処理中に設定済み。集計して結果画面へ進む
    pub fn load_results(&mut self) {
        self.update_stats();
        self.advance_to(Step::Results);
        self.state.loading = false;
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.state.error = Some(message.into());
        self.state.loading = false;
    }

    pub fn clear_error(&mut self) {
        self.state.error = None;
    }

    /// 全状態を初期化し、開いているプッシュチャネルを閉じる。何度呼んでもよい
    pub async fn reset(&mut self) {
        self.disconnect().await;
        self.state = AppState::default();
    }

    pub async fn disconnect(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            if let Err(e) = channel.disconnect().await {
                warn!("プッシュチャネルの切断に失敗: {}", e);
            }
        }
    }

    /// プッシュ通知を1件反映する
    ///
    /// # Returns
    /// 反映後に全タスクが終端状態なら true
    pub fn apply_push_message(&mut self, msg: &PushMessage) -> bool {
        if !self.dispatcher.dispatch(&mut self.state, msg) {
            debug!("未対応のイベントを無視: {}", msg.kind.as_str());
        }
        self.notify_progress();
        self.state.all_done()
    }

    /// ステータス応答（ポーリング）を反映する
    ///
    /// # Returns
    /// 反映後に全タスクが終端状態なら true
    pub fn apply_status(&mut self, status: &StatusResponse) -> bool {
        push::apply_status(&mut self.state, status);
        self.notify_progress();
        self.state.all_done()
    }

    // ---- 内部 ----

    /// 処理開始時の共通初期化: タスクを作り processing へ進む
    ///
    /// upload段階以外からは開始できない（やり直すには先に [`AppStore::reset`]）。
    fn begin_processing(&mut self) -> Result<()> {
        if self.state.current_step != Step::Upload {
            return Err(OcrClientError::InvalidState(format!(
                "{}段階では処理を開始できません。reset後にやり直してください",
                step_name(self.state.current_step)
            )));
        }
        if self.state.selected_files.is_empty() {
            return Err(OcrClientError::NoFilesSelected);
        }

        self.state.loading = true;
        self.state.error = None;
        self.state.results.clear();
        self.state.tasks = self
            .state
            .selected_files
            .iter()
            .enumerate()
            .map(|(i, file)| Task::new((i + 1).to_string(), file.name.clone()))
            .collect();
        self.advance_to(Step::Processing);
        Ok(())
    }

    /// サーバーがファイルごとのIDを返した場合はそれに置き換える
    fn assign_server_task_ids(&mut self, upload: &UploadResponse) {
        if upload.tasks.len() != self.state.tasks.len() {
            if !upload.tasks.is_empty() {
                warn!(
                    "タスク数が一致しないため連番IDを使用 (送信 {}件, 応答 {}件)",
                    self.state.tasks.len(),
                    upload.tasks.len()
                );
            }
            return;
        }
        for (task, uploaded) in self.state.tasks.iter_mut().zip(&upload.tasks) {
            task.id = uploaded.id.clone();
            if !uploaded.filename.is_empty() {
                task.filename = uploaded.filename.clone();
            }
        }
    }

    /// 段階は前にしか進めない
    fn advance_to(&mut self, step: Step) -> bool {
        if step_rank(step) <= step_rank(self.state.current_step) {
            return false;
        }
        self.state.current_step = step;
        true
    }

    fn fail_action(&mut self, err: &OcrClientError) {
        warn!("処理失敗: {}", err);
        self.set_error(err.to_string());
    }
}

fn step_name(step: Step) -> &'static str {
    match step {
        Step::Upload => "upload",
        Step::Processing => "processing",
        Step::Results => "results",
    }
}

fn step_rank(step: Step) -> u8 {
    match step {
        Step::Upload => 0,
        Step::Processing => 1,
        Step::Results => 2,
    }
}
