use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use interface::{InstrumentCategory, MepRate, MepSummary, Quote, QuoteTable};
use sources::Session;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// 파일 이름에 붙는 날짜 (YYYYMMDD)
pub fn date_stamp(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// `{dir}/{stem}_{YYYYMMDD}.{ext}`
pub fn dated_path(dir: &Path, stem: &str, date: NaiveDate, ext: &str) -> PathBuf {
    dir.join(format!("{stem}_{}.{ext}", date_stamp(date)))
}

/// 시세표를 CSV로 저장한다. 빈 표는 파일을 만들지 않고 0을 돌려준다.
pub fn write_quotes(path: &Path, table: &QuoteTable) -> Result<usize, ReportError> {
    if table.is_empty() {
        warn!("저장할 데이터가 없습니다: {}", path.display());
        return Ok(0);
    }
    ensure_parent(path)?;

    let mut writer = csv::Writer::from_path(path)?;
    for quote in table {
        writer.serialize(quote)?;
    }
    writer.flush()?;

    info!("{}건 저장: {}", table.len(), path.display());
    Ok(table.len())
}

pub fn read_quotes(path: &Path) -> Result<QuoteTable, ReportError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut table = Vec::new();
    for record in reader.deserialize() {
        let quote: Quote = record?;
        table.push(quote);
    }
    Ok(table)
}

/// 통합 CSV 한 행: 시세 컬럼 + instrument_type
#[derive(Debug, Serialize)]
struct CombinedRow<'a> {
    symbol: &'a str,
    settlement: Option<&'a str>,
    bid_size: Option<f64>,
    bid: Option<f64>,
    ask: Option<f64>,
    ask_size: Option<f64>,
    last: Option<f64>,
    close: Option<f64>,
    change: Option<f64>,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    previous_close: Option<f64>,
    turnover: Option<f64>,
    volume: Option<f64>,
    operations: Option<f64>,
    datetime: Option<NaiveDateTime>,
    group: Option<&'a str>,
    expiration: Option<NaiveDate>,
    instrument_type: &'static str,
}

impl<'a> CombinedRow<'a> {
    fn new(q: &'a Quote, category: InstrumentCategory) -> Self {
        Self {
            symbol: &q.symbol,
            settlement: q.settlement.as_deref(),
            bid_size: q.bid_size,
            bid: q.bid,
            ask: q.ask,
            ask_size: q.ask_size,
            last: q.last,
            close: q.close,
            change: q.change,
            open: q.open,
            high: q.high,
            low: q.low,
            previous_close: q.previous_close,
            turnover: q.turnover,
            volume: q.volume,
            operations: q.operations,
            datetime: q.datetime,
            group: q.group.as_deref(),
            expiration: q.expiration,
            instrument_type: category.label(),
        }
    }
}

/// 카테고리별 표를 하나의 CSV로 합친다
pub fn write_combined(
    path: &Path,
    tables: &[(InstrumentCategory, QuoteTable)],
) -> Result<usize, ReportError> {
    let total: usize = tables.iter().map(|(_, t)| t.len()).sum();
    if total == 0 {
        warn!("통합할 데이터가 없습니다");
        return Ok(0);
    }
    ensure_parent(path)?;

    let mut writer = csv::Writer::from_path(path)?;
    for (category, table) in tables {
        for quote in table {
            writer.serialize(CombinedRow::new(quote, *category))?;
        }
    }
    writer.flush()?;

    info!("통합 데이터 {}건 저장: {}", total, path.display());
    Ok(total)
}

/// MEP 결과 CSV 한 행
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MepRow {
    pub peso_ticker: String,
    pub peso_price: f64,
    pub dollar_ticker: String,
    pub dollar_price: f64,
    pub mep: f64,
    pub id: String,
}

impl From<&MepRate> for MepRow {
    fn from(rate: &MepRate) -> Self {
        let pair = rate.pair();
        Self {
            peso_ticker: pair.peso().symbol.clone(),
            peso_price: pair.peso_price(),
            dollar_ticker: pair.dollar().symbol.clone(),
            dollar_price: pair.dollar_price(),
            mep: rate.ratio(),
            id: pair.id().to_string(),
        }
    }
}

pub fn write_mep(path: &Path, rates: &[MepRate]) -> Result<usize, ReportError> {
    if rates.is_empty() {
        warn!("저장할 MEP 결과가 없습니다");
        return Ok(0);
    }
    ensure_parent(path)?;

    let mut writer = csv::Writer::from_path(path)?;
    for rate in rates {
        writer.serialize(MepRow::from(rate))?;
    }
    writer.flush()?;

    info!("MEP 결과 {}건 저장: {}", rates.len(), path.display());
    Ok(rates.len())
}

/// 요약 텍스트. 소수점 둘째 자리 반올림은 여기서만 한다.
pub fn render_summary(summary: &MepSummary, rates: &[MepRate], run_at: NaiveDateTime) -> String {
    let mut out = format!(
        "Fecha: {}\n\
         Cotización promedio Dólar MEP: ${:.2}\n\
         Cotización mínima: ${:.2}\n\
         Cotización máxima: ${:.2}\n",
        run_at.format("%Y-%m-%d %H:%M:%S"),
        summary.mean,
        summary.min,
        summary.max
    );
    if let Some(weighted) = summary.volume_weighted {
        out.push_str(&format!("Cotización ponderada por volumen: ${weighted:.2}\n"));
    }
    out.push_str(&format!("Cantidad de pares: {}\n", summary.count));
    out.push_str("\nPares de bonos utilizados:\n");
    for rate in rates {
        let pair = rate.pair();
        out.push_str(&format!(
            "{} (${:.2}) / {} (${:.2}) = ${:.2}\n",
            pair.peso().symbol,
            pair.peso_price(),
            pair.dollar().symbol,
            pair.dollar_price(),
            rate.ratio()
        ));
    }
    out
}

pub fn write_summary(
    path: &Path,
    summary: &MepSummary,
    rates: &[MepRate],
    run_at: NaiveDateTime,
) -> Result<(), ReportError> {
    ensure_parent(path)?;
    let mut file = File::create(path)?;
    file.write_all(render_summary(summary, rates, run_at).as_bytes())?;
    info!("요약 저장: {}", path.display());
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<(), ReportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

const PREVIEW_ROWS: usize = 5;

/// 미리보기 컬럼: (BYMA 원본 키, 기본 라벨)
const PREVIEW_COLUMNS: [(&str, &str); 6] = [
    ("symbol", "symbol"),
    ("settlementPrice", "last"),
    ("imbalance", "change"),
    ("bidPrice", "bid"),
    ("offerPrice", "ask"),
    ("volume", "volume"),
];

/// 받아온 표의 앞부분을 콘솔에 찍는다. 헤더는 번역 사전에 있으면 그 값을 쓴다.
pub fn print_preview(session: &Session, category: InstrumentCategory, table: &QuoteTable) {
    println!("\n[{}] {} ({}건)", category.label(), category, table.len());

    let headers: Vec<&str> = PREVIEW_COLUMNS
        .iter()
        .map(|&(key, label)| session.translate(key).unwrap_or(label))
        .collect();
    println!(
        "  {:<12} {:>12} {:>8} {:>12} {:>12} {:>14}",
        headers[0], headers[1], headers[2], headers[3], headers[4], headers[5]
    );

    for q in table.iter().take(PREVIEW_ROWS) {
        println!(
            "  {:<12} {:>12} {:>8} {:>12} {:>12} {:>14}",
            q.symbol,
            cell(q.last),
            cell(q.change),
            cell(q.bid),
            cell(q.ask),
            cell(q.volume)
        );
    }
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".to_string())
}

pub fn print_mep_table(rates: &[MepRate]) {
    println!("\nCálculo de Dólar MEP por pares de bonos:");
    println!(
        "  {:<10} {:>14} {:<10} {:>14} {:>12}",
        "peso", "precio", "dolar", "precio", "mep"
    );
    for rate in rates {
        let pair = rate.pair();
        println!(
            "  {:<10} {:>14.2} {:<10} {:>14.2} {:>12.2}",
            pair.peso().symbol,
            pair.peso_price(),
            pair.dollar().symbol,
            pair.dollar_price(),
            rate.ratio()
        );
    }
}

pub fn print_summary(summary: &MepSummary) {
    println!("\nEstadísticas del Dólar MEP:");
    println!("  Promedio: {:.2}", summary.mean);
    println!("  Mínimo: {:.2}", summary.min);
    println!("  Máximo: {:.2}", summary.max);
    if let Some(weighted) = summary.volume_weighted {
        println!("  Ponderado por volumen: {:.2}", weighted);
    }
}
