use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use ocr_client::api::{ApiClient, OcrBackend, OcrOutput};
use ocr_client::config::{Config, ProcessingMode};
use ocr_client::error::{OcrClientError, Result};
use ocr_client::store::{AppState, AppStore, ProcessOptions};
use ocr_client::{cli, scanner, utils};
use ocr_client_common::{
    format_duration, format_file_size, format_time, is_supported_language, language_name,
    output_format_name, validate_file, SelectedFile, TaskStatus, OUTPUT_FORMATS, SUPPORTED_LANGUAGES,
};
use cli::{Cli, Commands};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        let notice = utils::handle_error(&e, "ocr-client");
        eprintln!("✖ {}: {}", notice.title, notice.message);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(url) = cli.base_url.clone() {
        config.base_url = Some(url);
    }

    match cli.command {
        Commands::Health => {
            let client = ApiClient::from_config(&config)?;
            println!("🔎 接続確認: {}", client.base_url());
            let body = client.health_check().await?;
            println!("✔ 応答: {}", body);
        }

        Commands::Ocr { files, lang, auto, format, output, recursive, compress, copy } => {
            println!("📝 ocr-client - 同期OCR\n");

            let client = ApiClient::from_config(&config)?;
            let format = format.unwrap_or(config.output_format);
            let lang = if auto {
                "auto".to_string()
            } else {
                lang.unwrap_or_else(|| config.default_lang.clone())
            };
            let output_dir = output.unwrap_or_else(|| PathBuf::from("."));
            if !is_supported_language(&lang) {
                warn!("一覧にない言語コードです: {}", lang);
            }

            let (files, _workdir) = prepare_files(&files, recursive, compress)?;
            let mut texts = Vec::new();

            for file in &files {
                if let Err(e) = validate_file(file, config.max_file_size) {
                    println!("✖ {}", e);
                    continue;
                }

                let spinner = start_spinner(&format!("{} ({})", file.name, format_file_size(file.size)));
                let outcome = if lang == "auto" {
                    client.ocr_auto_detect(file, format).await
                } else {
                    client.ocr_image(file, &lang, format).await
                };
                spinner.finish_and_clear();

                match outcome {
                    Ok(OcrOutput::Json(value)) => {
                        let result = ocr_client_common::OcrResult::from_response("1", file.name.clone(), &value);
                        let lang_label = language_name(&result.language).unwrap_or(result.language.as_str());
                        println!("✔ {} [{}]", file.name, lang_label);
                        println!("{}\n", result.text);
                        texts.push(result.text);
                    }
                    Ok(OcrOutput::File(downloaded)) => {
                        let name = downloaded
                            .filename
                            .clone()
                            .unwrap_or_else(|| utils::default_download_name(&file.name, format));
                        let path = utils::download_file(&downloaded.bytes, &output_dir, &name)?;
                        println!("✔ {} → {}", file.name, path.display());
                    }
                    Err(e) => {
                        let notice = utils::handle_error(&e, &file.name);
                        println!("✖ {}: {}", file.name, notice.message);
                    }
                }
            }

            if copy && !texts.is_empty() {
                copy_texts(&texts);
            }
        }

        Commands::Run { files, mode, lang, output, recursive, compress, copy } => {
            let mode = mode.unwrap_or(config.mode);
            println!("🚀 ocr-client - 一括処理 ({})\n", mode);

            let client = ApiClient::from_config(&config)?;

            println!("[1/3] ファイルを確認中...");
            let (files, _workdir) = prepare_files(&files, recursive, compress)?;
            if files.is_empty() {
                return Err(OcrClientError::NoFilesSelected);
            }
            let total_size: u64 = files.iter().map(|f| f.size).sum();
            println!("✔ {}件 ({})\n", files.len(), format_file_size(total_size));

            let mut store = AppStore::new();
            store.set_selected_files(files);

            let options = ProcessOptions {
                lang: lang.or_else(|| Some(config.default_lang.clone())),
                poll_interval: config.poll_interval(),
                max_file_size: config.max_file_size,
            };

            println!("[2/3] OCR処理中...");
            let spinner = start_spinner("サーバーで処理中");
            let bar = spinner.clone();
            let mut debouncer = utils::Debouncer::new(Duration::from_millis(150), move |message: String| {
                bar.set_message(message)
            });
            store.set_progress_listener(move |state| {
                let done = state.tasks.iter().filter(|t| t.status.is_terminal()).count();
                debouncer.call(format!("サーバーで処理中 {}/{}", done, state.tasks.len()));
            });

            let outcome = match mode {
                ProcessingMode::Direct => store.start_processing(&client, &options).await,
                ProcessingMode::Push => store.start_push_processing(&client, &options).await,
            };
            store.clear_progress_listener();
            spinner.finish_and_clear();
            outcome?;

            println!("[3/3] 結果");
            print_summary(store.state());

            if let Some(path) = output {
                let json = serde_json::to_string_pretty(&store.snapshot())?;
                std::fs::write(&path, json)?;
                println!("✔ 結果を保存: {}", path.display());
            }

            if copy {
                let texts: Vec<String> = store.state().results.iter().map(|r| r.text.clone()).collect();
                copy_texts(&texts);
            }

            store.reset().await;
            println!("\n✅ 完了");
        }

        Commands::Status { batch_id } => {
            let client = ApiClient::from_config(&config)?;
            let status = client.get_task_status(&batch_id).await?;

            println!("バッチ {}:", batch_id);
            if let Some(s) = status.status {
                println!("  状態: {}", s);
            }
            if let Some(p) = status.progress {
                println!("  進捗: {:.0}%", p);
            }
            for task in &status.tasks {
                println!(
                    "  - [{}] {} {} {:.0}%",
                    task.id,
                    task.filename.as_deref().unwrap_or(""),
                    task.status,
                    task.progress.unwrap_or(0.0)
                );
            }
        }

        Commands::Download { batch_id, format, output } => {
            let client = ApiClient::from_config(&config)?;
            let output_dir = output.unwrap_or_else(|| PathBuf::from("."));

            let spinner = start_spinner(&format!("{} をダウンロード中", output_format_name(format)));
            let downloaded = client.download_results(&batch_id, format).await;
            spinner.finish_and_clear();

            let path = match downloaded? {
                OcrOutput::File(file) => {
                    let name = file
                        .filename
                        .clone()
                        .unwrap_or_else(|| utils::default_download_name(&batch_id, format));
                    utils::download_file(&file.bytes, &output_dir, &name)?
                }
                OcrOutput::Json(value) => {
                    let name = utils::default_download_name(&batch_id, format);
                    let content = match value.get("text").and_then(|t| t.as_str()) {
                        Some(text) => text.to_string(),
                        None => serde_json::to_string_pretty(&value)?,
                    };
                    utils::download_file(content.as_bytes(), &output_dir, &name)?
                }
            };
            println!("✔ 保存しました: {}", path.display());
        }

        Commands::Languages => {
            println!("対応言語:");
            for (code, name) in SUPPORTED_LANGUAGES {
                println!("  {:<8} {}", code, name);
            }
            println!("\n出力形式:");
            for (format, name) in OUTPUT_FORMATS {
                println!("  {:<8} {}", format.as_str(), name);
            }
        }

        Commands::Config { set_base_url, set_mode, show } => {
            let mut config = Config::load()?;

            if let Some(url) = set_base_url {
                config.set_base_url(url)?;
                println!("✔ 接続先を設定しました");
            }

            if let Some(mode) = set_mode {
                config.mode = mode;
                config.save()?;
                println!("✔ 処理モードを設定しました");
            }

            if show {
                println!("設定:");
                println!("  接続先: {}", config.base_url());
                println!("  既定の言語: {}", config.default_lang);
                println!("  出力形式: {}", config.output_format);
                println!("  処理モード: {}", config.mode);
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  ポーリング間隔: {}ms", config.poll_interval_ms);
                println!("  最大ファイルサイズ: {}", format_file_size(config.max_file_size));
            }
        }
    }

    Ok(())
}

/// 送信対象を集める。圧縮した場合は一時フォルダも返すので、処理が終わるまで保持すること
fn prepare_files(
    paths: &[PathBuf],
    recursive: bool,
    compress: Option<f32>,
) -> Result<(Vec<SelectedFile>, Option<TempDir>)> {
    let files = scanner::scan_paths(paths, recursive)?;
    let Some(quality) = compress else {
        return Ok((files, None));
    };

    let workdir = tempfile::Builder::new().prefix("ocr-client-").tempdir()?;
    let compressed = files
        .iter()
        .map(|file| {
            let compressed = utils::compress_to(file, quality, workdir.path())?;
            if compressed.size != file.size {
                println!(
                    "- 圧縮: {} {} → {}",
                    file.name,
                    format_file_size(file.size),
                    format_file_size(compressed.size)
                );
            }
            Ok(compressed)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok((compressed, Some(workdir)))
}

fn start_spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} ({elapsed})") {
        bar.set_style(style);
    }
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

fn print_summary(state: &AppState) {
    let now = chrono::Local::now();
    for task in &state.tasks {
        let mark = match task.status {
            TaskStatus::Completed => "✔",
            TaskStatus::Error => "✖",
            _ => "…",
        };
        match &task.error {
            Some(error) => println!("  {} {} - {}", mark, task.filename, error),
            None => println!("  {} {}", mark, task.filename),
        }
    }

    for result in &state.results {
        println!(
            "\n--- {} [{}] 精度 {:.1}% / {} ---",
            result.filename,
            result.language,
            result.accuracy,
            format_duration(result.processing_time)
        );
        println!("{}", result.text);
    }

    let stats = &state.stats;
    println!("\n集計 ({}):", format_time(&now));
    println!("  ファイル数: {}", stats.total_files);
    println!("  処理済み: {}", stats.processed_files);
    println!("  総文字数: {}", stats.total_characters);
    println!("  平均精度: {:.1}%", stats.average_accuracy);
    println!("  失敗: {}", state.count_status(TaskStatus::Error));
}

fn copy_texts(texts: &[String]) {
    if utils::copy_to_clipboard(&texts.join("\n\n")) {
        println!("✔ クリップボードにコピーしました");
    } else {
        println!("✖ クリップボードへのコピーに失敗しました");
    }
}
