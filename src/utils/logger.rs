use crate::utils::error::{EtlError, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn default_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("drilling_etl=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("drilling_etl=info"))
    }
}

/// 在 dir 建立 `drilling-etl_<時間戳>.log`，目錄不存在時會一併建立
pub fn build_file_appender(dir: &Path) -> Result<RollingFileAppender> {
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(format!("drilling-etl_{}", timestamp))
        .filename_suffix("log")
        .build(dir)
        .map_err(|e| EtlError::InvalidConfigValueError {
            field: "log_dir".to_string(),
            value: dir.display().to_string(),
            reason: format!("cannot create log file: {}", e),
        })
}

/// 初始化 CLI 日誌：終端輸出，並可選擇寫入帶時間戳的日誌檔
///
/// 回傳的 guard 必須存活到程式結束，否則檔案日誌可能遺失。
pub fn init_cli_logger(verbose: bool, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let (writer, guard) = tracing_appender::non_blocking(build_file_appender(dir)?);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(default_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}

/// JSON 格式輸出，方便交給日誌收集系統
pub fn init_json_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(default_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .json(),
        )
        .init();
}
