//! 同期OCRモード: 1ファイルずつ順番に処理する
//!
//! 1ファイルの失敗はそのタスクにだけ記録し、残りのファイルは続行する。

use super::{AppStore, ProcessOptions};
use crate::api::OcrBackend;
use crate::error::Result;
use ocr_client_common::{validate_file, OcrResult, OutputFormat, Step, TaskStatus};
use tracing::{info, warn};

impl AppStore {
    /// 選択中のファイルを同期OCRで処理して結果画面へ進む
    pub async fn start_processing(&mut self, backend: &dyn OcrBackend, options: &ProcessOptions) -> Result<()> {
        if let Err(e) = self.begin_processing() {
            self.fail_action(&e);
            return Err(e);
        }
        self.process_files_directly(backend, options).await;
        Ok(())
    }

    pub(crate) async fn process_files_directly(&mut self, backend: &dyn OcrBackend, options: &ProcessOptions) {
        let mut results = Vec::new();

        for index in 0..self.state.selected_files.len() {
            let file = self.state.selected_files[index].clone();
            {
                let task = &mut self.state.tasks[index];
                task.status = TaskStatus::Processing;
                task.progress = 50;
            }

            let outcome = match validate_file(&file, options.max_file_size) {
                Err(e) => Err(e.into()),
                Ok(()) => match options.explicit_lang() {
                    Some(lang) => backend.ocr_image(&file, lang, OutputFormat::Text).await,
                    None => backend.ocr_auto_detect(&file, OutputFormat::Text).await,
                },
            }
            .and_then(|output| output.into_json());

            let task = &mut self.state.tasks[index];
            match outcome {
                Ok(value) => {
                    results.push(OcrResult::from_response(task.id.clone(), file.name.clone(), &value));
                    task.complete(Some(value));
                    info!("完了: {}", file.name);
                }
                Err(e) => {
                    warn!("失敗: {}: {}", file.name, e);
                    task.fail(e.to_string());
                }
            }
            self.notify_progress();
        }

        self.state.results = results;
        self.update_stats();
        self.advance_to(Step::Results);
        self.state.loading = false;
    }
}
