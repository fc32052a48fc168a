use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
};

use chrono::Local;
use color_eyre::eyre::{self, WrapErr};
use tracing_appender::non_blocking;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// 로그 writer 스레드의 guard. main이 끝날 때 drop되면서 남은 로그를 비운다.
pub struct TracingGuards {
    _file: WorkerGuard,
    _stdout: WorkerGuard,
}

/// `{log_dir}/mep.YYYY-MM-DD.log` 와 콘솔에 동시에 기록한다.
/// 콘솔 수준은 RUST_LOG (기본 info), 파일은 항상 info 이상.
pub fn init_tracing(log_dir: &Path) -> eyre::Result<TracingGuards> {
    let (file_writer, file_guard) = daily_file_appender(log_dir, "mep")?;
    let (stdout_writer, stdout_guard) = non_blocking(std::io::stdout());

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file_filter = EnvFilter::new("info");

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer)
                .with_filter(file_filter),
        )
        .with(fmt::layer().with_writer(stdout_writer).with_ansi(true))
        .try_init()
        .wrap_err("tracing subscriber already set")?;

    Ok(TracingGuards {
        _file: file_guard,
        _stdout: stdout_guard,
    })
}

/// `logs/mep.2025-11-29.log` 형식의 경로
pub fn log_file_path(base_dir: &Path, prefix: &str) -> PathBuf {
    let date = Local::now().format("%Y-%m-%d");
    base_dir.join(format!("{prefix}.{date}.log"))
}

/// 로그 폴더를 만들고 오늘 날짜 파일을 append 모드로 연다
fn daily_file_appender(base_dir: &Path, prefix: &str) -> eyre::Result<(NonBlocking, WorkerGuard)> {
    fs::create_dir_all(base_dir)
        .wrap_err_with(|| format!("cannot create log directory {}", base_dir.display()))?;

    let path = log_file_path(base_dir, prefix);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .wrap_err_with(|| format!("cannot open log file {}", path.display()))?;

    Ok(non_blocking(file))
}
