use crate::config::ProcessingMode;
use clap::{Parser, Subcommand};
use ocr_client_common::OutputFormat;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ocr-client")]
#[command(about = "OCR Webサービス用クライアント", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 接続先URL（設定ファイル・環境変数より優先）
    #[arg(long, global = true)]
    pub base_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// サーバーの稼働確認
    Health,

    /// 1ファイルずつ同期OCRを実行
    Ocr {
        /// 画像/PDFファイルまたはフォルダ
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// 言語コード（省略時は設定の既定値）
        #[arg(short, long, conflicts_with = "auto")]
        lang: Option<String>,

        /// 言語を自動検出する
        #[arg(long)]
        auto: bool,

        /// 出力形式 (text/word/pdf)
        #[arg(short, long)]
        format: Option<OutputFormat>,

        /// word/pdfの保存先フォルダ
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// サブフォルダも再帰的にスキャン
        #[arg(short = 'r', long)]
        recursive: bool,

        /// 送信前にJPEG再圧縮する（品質 0.0-1.0）
        #[arg(long)]
        compress: Option<f32>,

        /// 認識テキストをクリップボードにコピー
        #[arg(long)]
        copy: bool,
    },

    /// 選択ファイルを一括処理して結果と集計を表示
    Run {
        /// 画像/PDFファイルまたはフォルダ
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// 処理モード (direct/push)
        #[arg(short, long, value_enum)]
        mode: Option<ProcessingMode>,

        /// 言語コード（directモードのみ、省略時は自動検出）
        #[arg(short, long)]
        lang: Option<String>,

        /// 最終状態をJSONで保存
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// サブフォルダも再帰的にスキャン
        #[arg(short = 'r', long)]
        recursive: bool,

        /// 送信前にJPEG再圧縮する（品質 0.0-1.0）
        #[arg(long)]
        compress: Option<f32>,

        /// 全結果のテキストをクリップボードにコピー
        #[arg(long)]
        copy: bool,
    },

    /// バッチの処理状況を表示
    Status {
        /// アップロード時に返されたタスクID
        #[arg(required = true)]
        batch_id: String,
    },

    /// バッチの成果物をダウンロード
    Download {
        /// アップロード時に返されたタスクID
        #[arg(required = true)]
        batch_id: String,

        /// 出力形式 (text/word/pdf)
        #[arg(short, long, default_value = "pdf")]
        format: OutputFormat,

        /// 保存先フォルダ
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 対応言語と出力形式の一覧
    Languages,

    /// 設定を表示/編集
    Config {
        /// 接続先URLを設定
        #[arg(long)]
        set_base_url: Option<String>,

        /// 既定の処理モードを設定
        #[arg(long, value_enum)]
        set_mode: Option<ProcessingMode>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}
