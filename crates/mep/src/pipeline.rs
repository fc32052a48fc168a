use std::{path::Path, sync::Arc};

use chrono::{Local, NaiveDate, NaiveDateTime};
use tracing::{error, info, warn};

use interface::{InstrumentCategory, MepError, MepSummary, QuoteTable};
use sources::{default_chain, web_chain, Session};

use crate::{
    calculator,
    collector::{self, Collected},
    config::AppConfig,
    matcher::{self, TickerRules},
    report::{self, ReportError},
};

const COMBINED_STEM: &str = "todos_bonos";
const SCRAPE_STEM: &str = "bonos_byma";
const PESO_STEM: &str = "bonos_pesos";
const DOLLAR_STEM: &str = "bonos_dolares";
const MEP_STEM: &str = "dolar_mep";
const SUMMARY_STEM: &str = "cotizacion_mep";

/// 전체 실행: 세 카테고리 수집, CSV 저장, 이미 받은 국채 표로 MEP 계산
pub async fn run_all(config: &AppConfig) {
    let run_at = Local::now().naive_local();
    let Some(session) = open_session(config).await else {
        return;
    };

    let collected = collect_and_export(&session, config, run_at.date()).await;

    let outcome = match collected
        .iter()
        .find(|c| c.category == InstrumentCategory::SovereignBonds)
    {
        Some(sovereign) => compute_mep(&sovereign.table, config, run_at),
        None => {
            warn!("국채 데이터가 없어 MEP를 계산할 수 없습니다");
            Err(MepError::InsufficientData)
        }
    };

    info!(
        "실행 결과: {}/{}개 카테고리 수집",
        collected.len(),
        InstrumentCategory::ALL.len()
    );
    log_mep_outcome(&outcome);
}

/// 채권 데이터만 수집해서 저장
pub async fn run_bonds(config: &AppConfig) {
    let run_at = Local::now().naive_local();
    let Some(session) = open_session(config).await else {
        return;
    };

    let collected = collect_and_export(&session, config, run_at.date()).await;
    info!(
        "실행 결과: {}/{}개 카테고리 수집",
        collected.len(),
        InstrumentCategory::ALL.len()
    );
}

/// MEP만 계산. `input`이 있으면 저장된 CSV를, 없으면 실시간 국채 시세를 쓴다.
pub async fn run_mep(config: &AppConfig, input: Option<&Path>) {
    let run_at = Local::now().naive_local();

    let table = match input {
        Some(path) => match report::read_quotes(path) {
            Ok(table) => {
                info!("{}에서 {}건 읽음", path.display(), table.len());
                table
            }
            Err(e) => {
                error!("CSV 읽기 실패 ({}): {}", path.display(), e);
                return;
            }
        },
        None => {
            let Some(session) = open_session(config).await else {
                return;
            };
            let chain = default_chain(session.clone());
            match chain.fetch_with_source(InstrumentCategory::SovereignBonds).await {
                Ok((source, table)) => {
                    info!("국채 시세 {}건 ({} 소스)", table.len(), source);
                    report::print_preview(&session, InstrumentCategory::SovereignBonds, &table);
                    table
                }
                Err(e) => {
                    error!("국채 시세를 가져오지 못했습니다: {}", e);
                    return;
                }
            }
        }
    };

    log_mep_outcome(&compute_mep(&table, config, run_at));
}

/// 웹 페이지만으로 국채 목록을 받아 저장
pub async fn run_scrape(config: &AppConfig) {
    let run_at = Local::now().naive_local();
    let Some(session) = open_session(config).await else {
        return;
    };

    let chain = web_chain(session.clone());
    match chain.fetch_with_source(InstrumentCategory::SovereignBonds).await {
        Ok((source, table)) => {
            info!("웹 스크래핑 성공: {} 소스, {}건", source, table.len());
            report::print_preview(&session, InstrumentCategory::SovereignBonds, &table);
            let path = report::dated_path(&config.bonds_dir, SCRAPE_STEM, run_at.date(), "csv");
            log_report("스크래핑 CSV", report::write_quotes(&path, &table));
        }
        Err(e) => error!("웹 스크래핑 실패: {}", e),
    }
}

async fn open_session(config: &AppConfig) -> Option<Arc<Session>> {
    match Session::connect(config.sources.clone()).await {
        Ok(session) => {
            info!("세션 준비 완료 (번역 사전 {}개 항목)", session.dictionary_len());
            Some(Arc::new(session))
        }
        Err(e) => {
            error!("HTTP 세션을 만들 수 없습니다: {}", e);
            None
        }
    }
}

async fn collect_and_export(
    session: &Arc<Session>,
    config: &AppConfig,
    date: NaiveDate,
) -> Vec<Collected> {
    let chain = default_chain(session.clone());
    let collected = collector::collect(&chain, &InstrumentCategory::ALL).await;
    for c in &collected {
        report::print_preview(session, c.category, &c.table);
    }
    export_bonds(&collected, &config.bonds_dir, date);
    collected
}

/// 카테고리별 CSV와 통합 CSV를 저장한다
pub fn export_bonds(collected: &[Collected], dir: &Path, date: NaiveDate) {
    for c in collected {
        let path = report::dated_path(dir, c.category.file_stem(), date, "csv");
        log_report(c.category.label(), report::write_quotes(&path, &c.table));
    }

    let tables: Vec<(InstrumentCategory, QuoteTable)> = collected
        .iter()
        .map(|c| (c.category, c.table.clone()))
        .collect();
    let path = report::dated_path(dir, COMBINED_STEM, date, "csv");
    log_report("통합 CSV", report::write_combined(&path, &tables));
}

fn compute_mep(
    table: &QuoteTable,
    config: &AppConfig,
    run_at: NaiveDateTime,
) -> Result<MepSummary, MepError> {
    match config.ticker_rules() {
        Ok(rules) => mep_from_table(table, config, &rules, run_at),
        Err(e) => {
            error!("종목 코드 규칙 오류: {}", e);
            Err(MepError::NoPairs)
        }
    }
}

/// 국채 시세표에서 MEP를 계산하고 결과 파일을 남긴다.
/// 파일 저장 실패는 로그만 남기고 계산 결과는 그대로 돌려준다.
pub fn mep_from_table(
    table: &QuoteTable,
    config: &AppConfig,
    rules: &TickerRules,
    run_at: NaiveDateTime,
) -> Result<MepSummary, MepError> {
    let date = run_at.date();
    let dir = &config.results_dir;

    let candidates = matcher::partition(table, rules);
    info!(
        "페소 채권 {}개, 달러 채권 {}개 발견",
        candidates.pesos.len(),
        candidates.dollars.len()
    );

    log_report(
        "페소 채권 CSV",
        report::write_quotes(
            &report::dated_path(dir, PESO_STEM, date, "csv"),
            &candidates.pesos,
        ),
    );
    log_report(
        "달러 채권 CSV",
        report::write_quotes(
            &report::dated_path(dir, DOLLAR_STEM, date, "csv"),
            &candidates.dollars,
        ),
    );

    let pairs = matcher::pair(&candidates, rules, config.match_policy);
    if pairs.is_empty() {
        warn!("MEP 계산에 쓸 채권 쌍이 없습니다");
        return Err(MepError::NoPairs);
    }

    let rates = calculator::rates(pairs);
    report::print_mep_table(&rates);

    let summary = calculator::summarize(&rates)?;
    report::print_summary(&summary);

    log_report(
        "MEP 결과 CSV",
        report::write_mep(&report::dated_path(dir, MEP_STEM, date, "csv"), &rates),
    );
    log_report(
        "MEP 요약",
        report::write_summary(
            &report::dated_path(dir, SUMMARY_STEM, date, "txt"),
            &summary,
            &rates,
            run_at,
        ),
    );

    Ok(summary)
}

fn log_report<T>(what: &str, result: Result<T, ReportError>) {
    if let Err(e) = result {
        error!("{} 저장 실패: {}", what, e);
    }
}

fn log_mep_outcome(outcome: &Result<MepSummary, MepError>) {
    match outcome {
        Ok(summary) => info!(
            "MEP 평균 {:.2} (최소 {:.2}, 최대 {:.2}, {}개 쌍)",
            summary.mean, summary.min, summary.max, summary.count
        ),
        Err(e) => warn!("MEP를 계산하지 못했습니다: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use interface::{Quote, SourceId};

    use super::*;

    fn quote(symbol: &str, last: Option<f64>) -> Quote {
        Quote {
            last,
            ..Quote::new(symbol)
        }
    }

    fn config_in(dir: &Path) -> AppConfig {
        AppConfig {
            bonds_dir: dir.join("datos_bonos"),
            results_dir: dir.join("resultados_mep"),
            ..AppConfig::default()
        }
    }

    fn run_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 10)
            .and_then(|d| d.and_hms_opt(15, 0, 0))
            .unwrap()
    }

    #[test]
    fn test_mep_from_table_writes_results() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let table = vec![
            quote("AL30", Some(65.0)),
            quote("AL35", Some(70.0)),
            quote("AL30D", Some(0.065)),
            quote("GD30", Some(66.0)),
            quote("AL29", Some(0.0)),
        ];

        let summary =
            mep_from_table(&table, &config, &TickerRules::default(), run_at()).unwrap();
        assert_eq!(summary.count, 1);
        assert!((summary.mean - 1000.0).abs() < 1e-9);

        let results = dir.path().join("resultados_mep");
        assert!(results.join("bonos_pesos_20240510.csv").exists());
        assert!(results.join("bonos_dolares_20240510.csv").exists());
        assert!(results.join("dolar_mep_20240510.csv").exists());
        assert!(results.join("cotizacion_mep_20240510.txt").exists());

        let pesos = report::read_quotes(&results.join("bonos_pesos_20240510.csv")).unwrap();
        let symbols: Vec<&str> = pesos.iter().map(|q| q.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AL30", "AL35"]);
    }

    #[test]
    fn test_mep_from_table_without_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let table = vec![quote("AL30", Some(65.0)), quote("AL35D", Some(0.07))];

        let err = mep_from_table(&table, &config, &TickerRules::default(), run_at()).unwrap_err();
        assert_eq!(err, MepError::NoPairs);

        let results = dir.path().join("resultados_mep");
        assert!(!results.join("dolar_mep_20240510.csv").exists());
        assert!(!results.join("cotizacion_mep_20240510.txt").exists());
    }

    #[test]
    fn test_mep_from_reexported_csv() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let path = dir.path().join("bonos_publicos.csv");
        report::write_quotes(
            &path,
            &vec![quote("AL30", Some(65.0)), quote("AL30D", Some(0.065))],
        )
        .unwrap();

        let table = report::read_quotes(&path).unwrap();
        let summary =
            mep_from_table(&table, &config, &TickerRules::default(), run_at()).unwrap();
        assert!((summary.mean - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_export_bonds_writes_category_and_combined_files() {
        let dir = tempfile::tempdir().unwrap();
        let date = run_at().date();
        let collected = vec![
            Collected {
                category: InstrumentCategory::SovereignBonds,
                source: SourceId::BymaApi,
                table: vec![quote("AL30", Some(65.0))],
            },
            Collected {
                category: InstrumentCategory::CorporateNotes,
                source: SourceId::BymaApi,
                table: Vec::new(),
            },
        ];

        export_bonds(&collected, dir.path(), date);

        assert!(dir.path().join("bonos_publicos_20240510.csv").exists());
        assert!(!dir.path().join("obligaciones_negociables_20240510.csv").exists());
        assert!(dir.path().join("todos_bonos_20240510.csv").exists());
    }
}
