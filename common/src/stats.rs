//! 集計情報

use crate::types::OcrResult;
use serde::{Deserialize, Serialize};

/// 結果一覧から導出される集計値
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub total_files: usize,
    pub processed_files: usize,
    pub total_characters: usize,
    /// 平均精度（小数点以下1桁に丸め）。結果が0件なら0.0
    pub average_accuracy: f64,
}

/// 結果一覧から集計値を再計算する
pub fn compute_stats(total_files: usize, results: &[OcrResult]) -> Stats {
    let processed_files = results.len();
    let total_characters = results.iter().map(OcrResult::char_count).sum();

    let average_accuracy = if results.is_empty() {
        0.0
    } else {
        let sum: f64 = results.iter().map(|r| r.accuracy).sum();
        round_one_decimal(sum / processed_files as f64)
    };

    Stats {
        total_files,
        processed_files,
        total_characters,
        average_accuracy,
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
