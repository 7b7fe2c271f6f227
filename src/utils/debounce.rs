//! デバウンス: 呼ぶたびに保留中の実行を取り消し、静止期間の後に最後の呼び出しだけを実行する

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub struct Debouncer<T: Send + 'static> {
    wait: Duration,
    callback: Arc<dyn Fn(T) + Send + Sync>,
    pending: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new<F>(wait: Duration, callback: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self {
            wait,
            callback: Arc::new(callback),
            pending: None,
        }
    }

    /// tokioランタイム上で呼ぶこと
    pub fn call(&mut self, arg: T) {
        self.cancel();
        let callback = Arc::clone(&self.callback);
        let wait = self.wait;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            callback(arg);
        }));
    }

    fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    #[cfg(test)]
    fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

/// 破棄時に保留中の呼び出しも取り消す
impl<T: Send + 'static> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.cancel();
    }
}
