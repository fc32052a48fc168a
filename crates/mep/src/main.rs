use std::path::PathBuf;

use color_eyre::eyre;
use structopt::StructOpt;
use tracing::{info, warn};

use mep::{logger, pipeline, AppConfig};

// lib.rs에서 자동으로 dotenv가 로드됨

#[derive(Debug, StructOpt)]
#[structopt(name = "mep", about = "아르헨티나 채권 시세 수집 및 달러 MEP 계산")]
struct Opt {
    /// 없으면 전체 실행 (수집 + 저장 + MEP)
    #[structopt(subcommand)]
    cmd: Option<Command>,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// 국채, 단기 증권, 회사채 시세를 수집해서 CSV로 저장
    Bonds,
    /// 국채 시세로 달러 MEP 계산
    Mep {
        /// 실시간 조회 대신 저장된 시세 CSV 사용
        #[structopt(long, parse(from_os_str))]
        input: Option<PathBuf>,
    },
    /// BYMA 웹 페이지(실패 시 IOL)에서 국채 목록 스크래핑
    Scrape,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> eyre::Result<()> {
    // init error reporting
    color_eyre::install()?;

    let opt = Opt::from_args();
    let config = AppConfig::from_env();

    // init logging, guards는 main이 끝날 때까지 유지
    let _guards = logger::init_tracing(&config.log_dir)?;

    for issue in &config.issues {
        warn!("설정 오류: {}", issue);
    }
    info!(
        "실행 시작: 채권 폴더 {}, 결과 폴더 {}, 매칭 정책 {}",
        config.bonds_dir.display(),
        config.results_dir.display(),
        config.match_policy
    );

    match opt.cmd {
        None => pipeline::run_all(&config).await,
        Some(Command::Bonds) => pipeline::run_bonds(&config).await,
        Some(Command::Mep { input }) => pipeline::run_mep(&config, input.as_deref()).await,
        Some(Command::Scrape) => pipeline::run_scrape(&config).await,
    }

    info!("실행 종료");
    Ok(())
}
