//! 処理フローのテスト
//!
//! モックバックエンドで同期モード・プッシュモード・ポーリングの状態遷移を検証

use async_trait::async_trait;
use ocr_client::api::{OcrBackend, OcrOutput, PushTransport, StatusResponse, TaskSnapshot, UploadResponse, UploadedTask};
use ocr_client::error::{OcrClientError, Result};
use ocr_client::store::{AppStore, ProcessOptions};
use ocr_client_common::{EventKind, OcrResult, OutputFormat, PushMessage, SelectedFile, Step, TaskStatus};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct ScriptedTransport {
    messages: VecDeque<PushMessage>,
    open: bool,
    disconnects: Arc<AtomicUsize>,
}

#[async_trait]
impl PushTransport for ScriptedTransport {
    async fn next_message(&mut self) -> Result<Option<PushMessage>> {
        match self.messages.pop_front() {
            Some(msg) => Ok(Some(msg)),
            None => {
                self.open = false;
                Ok(None)
            }
        }
    }

    async fn disconnect(&mut self) -> Result<()> {
        if self.open {
            self.open = false;
            self.disconnects.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

#[derive(Default)]
struct MockBackend {
    /// OCRが失敗するファイル名
    fail_names: Vec<String>,
    /// Noneならプッシュ接続に失敗する
    push_script: Mutex<Option<Vec<PushMessage>>>,
    statuses: Mutex<VecDeque<StatusResponse>>,
    upload_tasks: Vec<UploadedTask>,
    upload_error: Option<String>,
    results: Vec<OcrResult>,
    results_calls: AtomicUsize,
    disconnects: Arc<AtomicUsize>,
    calls: Mutex<Vec<String>>,
}

impl MockBackend {
    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn ocr(&self, file: &SelectedFile) -> Result<OcrOutput> {
        if self.fail_names.contains(&file.name) {
            return Err(OcrClientError::Server {
                status: 500,
                message: "OCR識別に失敗しました".into(),
            });
        }
        Ok(OcrOutput::Json(json!({
            "text": format!("text of {}", file.name),
            "detected_language": "en",
            "accuracy": 90.0
        })))
    }
}

#[async_trait]
impl OcrBackend for MockBackend {
    async fn ocr_image(&self, file: &SelectedFile, lang: &str, _format: OutputFormat) -> Result<OcrOutput> {
        self.record(format!("ocr_image:{}:{}", file.name, lang));
        self.ocr(file)
    }

    async fn ocr_auto_detect(&self, file: &SelectedFile, _format: OutputFormat) -> Result<OcrOutput> {
        self.record(format!("ocr_auto:{}", file.name));
        self.ocr(file)
    }

    async fn upload_files(&self, files: &[SelectedFile]) -> Result<UploadResponse> {
        self.record(format!("upload:{}", files.len()));
        if let Some(message) = &self.upload_error {
            return Err(OcrClientError::Server {
                status: 400,
                message: message.clone(),
            });
        }
        Ok(UploadResponse {
            task_id: "batch-1".into(),
            tasks: self.upload_tasks.clone(),
        })
    }

    async fn start_processing(&self, batch_id: &str) -> Result<()> {
        self.record(format!("process:{}", batch_id));
        Ok(())
    }

    async fn get_task_status(&self, batch_id: &str) -> Result<StatusResponse> {
        self.record(format!("status:{}", batch_id));
        let mut statuses = self.statuses.lock().unwrap();
        Ok(statuses.pop_front().unwrap_or_default())
    }

    async fn get_results(&self, batch_id: &str) -> Result<Vec<OcrResult>> {
        self.record(format!("results:{}", batch_id));
        self.results_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.results.clone())
    }

    async fn open_push(&self, _batch_id: &str) -> Result<Box<dyn PushTransport>> {
        match self.push_script.lock().unwrap().take() {
            Some(messages) => Ok(Box::new(ScriptedTransport {
                messages: messages.into(),
                open: true,
                disconnects: Arc::clone(&self.disconnects),
            })),
            None => Err(OcrClientError::WebSocket("connection refused".into())),
        }
    }
}

fn file(name: &str) -> SelectedFile {
    SelectedFile {
        name: name.into(),
        size: 1024,
        mime_type: "image/png".into(),
        ..Default::default()
    }
}

fn server_result(id: &str, text: &str, accuracy: f64) -> OcrResult {
    let mut result = OcrResult::from_response(id, format!("{}.png", id), &json!({ "text": text }));
    result.accuracy = accuracy;
    result.expanded = true;
    result
}

fn update(id: &str, progress: f64) -> PushMessage {
    PushMessage {
        status: Some(TaskStatus::Processing),
        progress: Some(progress),
        ..PushMessage::new(EventKind::TaskUpdate, id)
    }
}

fn completed(id: &str) -> PushMessage {
    PushMessage {
        result: Some(json!({ "text": format!("result {}", id) })),
        ..PushMessage::new(EventKind::TaskCompleted, id)
    }
}

fn fast_options() -> ProcessOptions {
    ProcessOptions {
        poll_interval: Duration::from_millis(10),
        ..Default::default()
    }
}

/// 3ファイル中2番目が失敗しても残りは処理される
#[tokio::test]
async fn test_direct_mode_partial_failure() {
    let backend = MockBackend {
        fail_names: vec!["b.png".into()],
        ..Default::default()
    };
    let mut store = AppStore::new();
    store.set_selected_files(vec![file("a.png"), file("b.png"), file("c.png")]);

    store.start_processing(&backend, &fast_options()).await.unwrap();

    let state = store.state();
    assert_eq!(state.count_status(TaskStatus::Error), 1);
    assert_eq!(state.count_status(TaskStatus::Completed), 2);
    assert_eq!(state.tasks[1].status, TaskStatus::Error);
    assert_eq!(state.tasks[1].error.as_deref(), Some("OCR識別に失敗しました"));
    assert_eq!(state.results.len(), 2);
    assert_eq!(state.results[0].filename, "a.png");
    assert_eq!(state.results[1].id, "3");
    assert_eq!(state.current_step, Step::Results);
    assert!(!state.loading);

    assert_eq!(state.stats.total_files, 3);
    assert_eq!(state.stats.processed_files, 2);
    assert_eq!(state.stats.average_accuracy, 90.0);

    // 1ファイルずつ順番に呼ばれる
    assert_eq!(
        backend.calls(),
        vec!["ocr_auto:a.png", "ocr_auto:b.png", "ocr_auto:c.png"]
    );
}

/// 言語を指定すると言語指定APIを使う
#[tokio::test]
async fn test_direct_mode_with_language() {
    let backend = MockBackend::default();
    let mut store = AppStore::new();
    store.set_selected_files(vec![file("a.png")]);

    let options = ProcessOptions {
        lang: Some("jpn".into()),
        ..fast_options()
    };
    store.start_processing(&backend, &options).await.unwrap();

    assert_eq!(backend.calls(), vec!["ocr_image:a.png:jpn"]);
    assert_eq!(store.state().results[0].language, "en");
}

/// 対応外の形式は送信せずにそのタスクだけ失敗させる
#[tokio::test]
async fn test_direct_mode_rejects_invalid_file() {
    let backend = MockBackend::default();
    let mut store = AppStore::new();
    let mut note = file("note.txt");
    note.mime_type = "text/plain".into();
    store.set_selected_files(vec![note, file("a.png")]);

    store.start_processing(&backend, &fast_options()).await.unwrap();

    let state = store.state();
    assert_eq!(state.tasks[0].status, TaskStatus::Error);
    assert!(state.tasks[0].error.as_deref().unwrap().contains("text/plain"));
    assert_eq!(state.results.len(), 1);
    assert_eq!(backend.calls(), vec!["ocr_auto:a.png"]);
}

/// ファイル未選択で開始するとエラーを記録する
#[tokio::test]
async fn test_start_without_files() {
    let backend = MockBackend::default();
    let mut store = AppStore::new();

    let err = store.start_processing(&backend, &fast_options()).await.unwrap_err();
    assert!(matches!(err, OcrClientError::NoFilesSelected));
    assert_eq!(store.state().error.as_deref(), Some("ファイルが選択されていません"));
    assert_eq!(store.state().current_step, Step::Upload);
}

/// 完了通知がどの順で届いても結果画面への遷移は1回だけ
#[tokio::test]
async fn test_push_mode_single_transition_any_order() {
    let orders: [[&str; 3]; 3] = [["1", "2", "3"], ["3", "1", "2"], ["2", "3", "1"]];

    for order in orders {
        let mut script = vec![update("1", 30.0), update("2", 60.0)];
        script.extend(order.iter().map(|id| completed(id)));
        // 重複した完了通知
        script.push(completed(order[0]));

        let backend = MockBackend {
            push_script: Mutex::new(Some(script)),
            results: vec![
                server_result("1", "abc", 90.0),
                server_result("2", "de", 80.0),
                server_result("3", "", 70.0),
            ],
            ..Default::default()
        };

        let mut store = AppStore::new();
        store.set_selected_files(vec![file("a.png"), file("b.png"), file("c.png")]);
        store.start_push_processing(&backend, &fast_options()).await.unwrap();

        assert_eq!(backend.results_calls.load(Ordering::SeqCst), 1, "order {:?}", order);
        let state = store.state();
        assert_eq!(state.current_step, Step::Results);
        assert_eq!(state.current_task_id.as_deref(), Some("batch-1"));
        assert_eq!(state.upload_progress, 100);
        assert!(state.all_done());
        assert_eq!(state.results.len(), 3);
        assert!(state.results.iter().all(|r| !r.expanded));
        assert_eq!(state.stats.total_characters, 5);
        assert_eq!(state.stats.average_accuracy, 80.0);
        assert!(!state.loading);

        // 完了後にチャネルを閉じる
        assert_eq!(backend.disconnects.load(Ordering::SeqCst), 1);
        assert!(!store.has_open_channel());
    }
}

/// 同じバッチに対してfinish_batchを繰り返しても結果取得は1回
#[tokio::test]
async fn test_finish_batch_is_idempotent() {
    let backend = MockBackend {
        push_script: Mutex::new(Some(vec![completed("1")])),
        results: vec![server_result("1", "x", 95.0)],
        ..Default::default()
    };
    let mut store = AppStore::new();
    store.set_selected_files(vec![file("a.png")]);
    store.start_push_processing(&backend, &fast_options()).await.unwrap();

    store.finish_batch(&backend).await.unwrap();
    store.finish_batch(&backend).await.unwrap();
    assert_eq!(backend.results_calls.load(Ordering::SeqCst), 1);
}

/// 失敗通知はタスクをerrorにする
#[tokio::test]
async fn test_push_mode_task_error() {
    let failed = PushMessage {
        status: Some(TaskStatus::Error),
        error: Some("画像が壊れています".into()),
        ..PushMessage::new(EventKind::TaskCompleted, "2")
    };
    let backend = MockBackend {
        push_script: Mutex::new(Some(vec![completed("1"), failed])),
        results: vec![server_result("1", "ok", 90.0)],
        ..Default::default()
    };
    let mut store = AppStore::new();
    store.set_selected_files(vec![file("a.png"), file("b.png")]);
    store.start_push_processing(&backend, &fast_options()).await.unwrap();

    let state = store.state();
    assert_eq!(state.tasks[1].status, TaskStatus::Error);
    assert_eq!(state.tasks[1].error.as_deref(), Some("画像が壊れています"));
    assert_eq!(state.stats.processed_files, 1);
    assert_eq!(state.current_step, Step::Results);
}

/// サーバーが割り当てたタスクIDで照合する
#[tokio::test]
async fn test_push_mode_server_task_ids() {
    let backend = MockBackend {
        upload_tasks: vec![
            UploadedTask { id: "f-10".into(), filename: "a.png".into() },
            UploadedTask { id: "f-11".into(), filename: "b.png".into() },
        ],
        push_script: Mutex::new(Some(vec![completed("f-11"), completed("1"), completed("f-10")])),
        ..Default::default()
    };
    let mut store = AppStore::new();
    store.set_selected_files(vec![file("a.png"), file("b.png")]);
    store.start_push_processing(&backend, &fast_options()).await.unwrap();

    let state = store.state();
    assert_eq!(state.tasks[0].id, "f-10");
    assert_eq!(state.tasks[1].id, "f-11");
    assert_eq!(state.current_step, Step::Results);
}

/// プッシュ接続に失敗したらポーリングで完了を待つ
#[tokio::test]
async fn test_polling_fallback() {
    let processing = StatusResponse {
        task_id: Some("batch-1".into()),
        status: Some(TaskStatus::Processing),
        tasks: vec![
            TaskSnapshot { id: "1".into(), status: TaskStatus::Completed, ..Default::default() },
            TaskSnapshot { id: "2".into(), status: TaskStatus::Processing, progress: Some(40.0), ..Default::default() },
        ],
        ..Default::default()
    };
    let done = StatusResponse {
        task_id: Some("batch-1".into()),
        status: Some(TaskStatus::Completed),
        ..Default::default()
    };

    let backend = MockBackend {
        statuses: Mutex::new(VecDeque::from(vec![processing, done])),
        results: vec![server_result("1", "a", 90.0), server_result("2", "b", 90.0)],
        ..Default::default()
    };
    let mut store = AppStore::new();
    store.set_selected_files(vec![file("a.png"), file("b.png")]);
    store.start_push_processing(&backend, &fast_options()).await.unwrap();

    let state = store.state();
    assert_eq!(state.current_step, Step::Results);
    assert_eq!(state.count_status(TaskStatus::Completed), 2);
    assert_eq!(backend.results_calls.load(Ordering::SeqCst), 1);

    let status_calls = backend.calls().iter().filter(|c| c.starts_with("status:")).count();
    assert_eq!(status_calls, 2);
}

/// 完了前にチャネルが閉じたらポーリングに切り替える
#[tokio::test]
async fn test_channel_closed_early_falls_back_to_polling() {
    let done = StatusResponse {
        tasks: vec![TaskSnapshot { id: "2".into(), status: TaskStatus::Completed, ..Default::default() }],
        ..Default::default()
    };
    let backend = MockBackend {
        push_script: Mutex::new(Some(vec![completed("1")])),
        statuses: Mutex::new(VecDeque::from(vec![done])),
        ..Default::default()
    };
    let mut store = AppStore::new();
    store.set_selected_files(vec![file("a.png"), file("b.png")]);
    store.start_push_processing(&backend, &fast_options()).await.unwrap();

    assert_eq!(store.state().current_step, Step::Results);
    assert_eq!(backend.results_calls.load(Ordering::SeqCst), 1);
}

/// アップロード失敗はエラーとして記録し、ローディングを止める
#[tokio::test]
async fn test_push_mode_upload_error() {
    let backend = MockBackend {
        upload_error: Some("ファイルが大きすぎます".into()),
        ..Default::default()
    };
    let mut store = AppStore::new();
    store.set_selected_files(vec![file("a.png")]);

    let err = store.start_push_processing(&backend, &fast_options()).await.unwrap_err();
    assert!(matches!(err, OcrClientError::Server { status: 400, .. }));

    let state = store.state();
    assert_eq!(state.error.as_deref(), Some("ファイルが大きすぎます"));
    assert!(!state.loading);

    // リセットで最初からやり直せる
    store.reset().await;
    store.reset().await;
    assert_eq!(store.state().current_step, Step::Upload);
    assert!(store.state().error.is_none());
}

/// 結果画面のまま再実行しても通信せずにエラーを返す
#[tokio::test]
async fn test_rerun_without_reset_is_rejected() {
    let backend = MockBackend {
        push_script: Mutex::new(Some(vec![completed("1")])),
        results: vec![server_result("1", "x", 90.0)],
        ..Default::default()
    };
    let mut store = AppStore::new();
    store.set_selected_files(vec![file("a.png")]);
    store.start_push_processing(&backend, &fast_options()).await.unwrap();
    assert_eq!(store.state().current_step, Step::Results);
    let calls_before = backend.calls();

    *backend.push_script.lock().unwrap() = Some(vec![completed("1")]);
    let err = store.start_push_processing(&backend, &fast_options()).await.unwrap_err();
    assert!(matches!(err, OcrClientError::InvalidState(_)));

    // アップロードもサーバー処理も呼ばれていない
    assert_eq!(backend.calls(), calls_before);
    assert_eq!(backend.results_calls.load(Ordering::SeqCst), 1);

    let state = store.state();
    assert_eq!(state.current_step, Step::Results);
    assert!(!state.loading);
    assert!(state.error.is_some());
    assert_eq!(state.tasks[0].status, TaskStatus::Completed);
    assert!(!store.has_open_channel());

    // 同期モードも同様
    let err = store.start_processing(&backend, &fast_options()).await.unwrap_err();
    assert!(matches!(err, OcrClientError::InvalidState(_)));

    // reset後はやり直せる
    store.reset().await;
    store.set_selected_files(vec![file("a.png")]);
    store.start_push_processing(&backend, &fast_options()).await.unwrap();
    assert_eq!(store.state().current_step, Step::Results);
    assert_eq!(backend.results_calls.load(Ordering::SeqCst), 2);
}

/// ファイルごと・通知ごとに進捗が通知される
#[tokio::test]
async fn test_progress_listener() {
    let seen = Arc::new(Mutex::new(Vec::new()));

    let backend = MockBackend {
        fail_names: vec!["b.png".into()],
        ..Default::default()
    };
    let mut store = AppStore::new();
    let sink = Arc::clone(&seen);
    store.set_progress_listener(move |state| {
        let done = state.tasks.iter().filter(|t| t.status.is_terminal()).count();
        sink.lock().unwrap().push(done);
    });
    store.set_selected_files(vec![file("a.png"), file("b.png"), file("c.png")]);
    store.start_processing(&backend, &fast_options()).await.unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);

    // resetしてもリスナーは残り、プッシュ通知ごとに呼ばれる
    store.reset().await;
    seen.lock().unwrap().clear();
    let backend = MockBackend {
        push_script: Mutex::new(Some(vec![update("1", 50.0), completed("1")])),
        ..Default::default()
    };
    store.set_selected_files(vec![file("a.png")]);
    store.start_push_processing(&backend, &fast_options()).await.unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![0, 1]);

    store.clear_progress_listener();
    store.apply_push_message(&completed("1"));
    assert_eq!(seen.lock().unwrap().len(), 2);
}

/// addFiles → clearFiles で選択が空になる
#[test]
fn test_add_then_clear_files() {
    let mut store = AppStore::new();
    store.add_files(vec![file("a.png"), file("b.png")]);
    store.clear_files();

    assert!(store.state().selected_files.is_empty());
    assert_eq!(store.state().stats.total_files, 0);
}
