//! クリップボードへのコピー
//!
//! システムのクリップボードが使えない環境（SSH先など）では
//! OSC 52エスケープシーケンスで端末側のクリップボードに送る。

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::io::Write;
use tracing::debug;

/// コピーに成功したら true
pub fn copy_to_clipboard(text: &str) -> bool {
    match arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text)) {
        Ok(()) => true,
        Err(e) => {
            debug!("クリップボードが使えないためOSC 52で送信: {}", e);
            copy_via_terminal(text)
        }
    }
}

fn copy_via_terminal(text: &str) -> bool {
    let mut stdout = std::io::stdout();
    stdout
        .write_all(osc52_sequence(text).as_bytes())
        .and_then(|_| stdout.flush())
        .is_ok()
}

pub fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", STANDARD.encode(text))
}
