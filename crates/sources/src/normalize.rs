use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use tracing::debug;

use interface::{Quote, QuoteTable, SchemaError};

use crate::table::RawTable;

/// 정규화된 Quote의 필드
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Symbol,
    Settlement,
    BidSize,
    Bid,
    Ask,
    AskSize,
    Last,
    Close,
    Change,
    Open,
    High,
    Low,
    PreviousClose,
    Turnover,
    Volume,
    Operations,
    Datetime,
    Group,
    Expiration,
}

/// 숫자 표기 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberFormat {
    /// JSON 숫자 또는 "65.5" 같은 문자열
    Plain,
    /// 아르헨티나 웹 페이지 표기: "1.234,56", "-0,35%", "$ 65.100"
    Localized,
}

/// 헤더 이름 비교 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderMatch {
    Exact,
    /// 대소문자, 악센트, 공백 차이를 무시
    Loose,
}

/// 원본 컬럼 -> 정규화 필드 규칙. `sources`는 후보 이름들이다.
#[derive(Debug, Clone)]
pub struct ColumnRule {
    pub sources: &'static [&'static str],
    pub field: Field,
    pub required: bool,
}

const fn rule(sources: &'static [&'static str], field: Field, required: bool) -> ColumnRule {
    ColumnRule {
        sources,
        field,
        required,
    }
}

#[derive(Debug, Clone)]
pub struct ColumnMapping {
    pub rules: Vec<ColumnRule>,
    pub numbers: NumberFormat,
    pub headers: HeaderMatch,
}

impl ColumnMapping {
    /// BYMA open data API 렌타 피하 응답. 19개 컬럼 모두 필수.
    pub fn byma_api() -> Self {
        Self {
            rules: vec![
                rule(&["symbol"], Field::Symbol, true),
                rule(&["settlementType"], Field::Settlement, true),
                rule(&["quantityBid"], Field::BidSize, true),
                rule(&["bidPrice"], Field::Bid, true),
                rule(&["offerPrice"], Field::Ask, true),
                rule(&["quantityOffer"], Field::AskSize, true),
                rule(&["settlementPrice"], Field::Last, true),
                rule(&["closingPrice"], Field::Close, true),
                rule(&["imbalance"], Field::Change, true),
                rule(&["openingPrice"], Field::Open, true),
                rule(&["tradingHighPrice"], Field::High, true),
                rule(&["tradingLowPrice"], Field::Low, true),
                rule(&["previousClosingPrice"], Field::PreviousClose, true),
                rule(&["volumeAmount"], Field::Turnover, true),
                rule(&["volume"], Field::Volume, true),
                rule(&["numberOfOrders"], Field::Operations, true),
                rule(&["tradeHour"], Field::Datetime, true),
                rule(&["securityType"], Field::Group, true),
                rule(&["maturityDate"], Field::Expiration, true),
            ],
            numbers: NumberFormat::Plain,
            headers: HeaderMatch::Exact,
        }
    }

    /// BYMA / IOL 채권 목록 HTML 표. 종목과 최종가만 필수.
    pub fn html_listing() -> Self {
        Self {
            rules: vec![
                rule(&["Símbolo", "Especie", "Ticker", "Symbol"], Field::Symbol, true),
                rule(
                    &["Último Operado", "Último", "Ultimo Precio", "Precio", "Last"],
                    Field::Last,
                    true,
                ),
                rule(&["Plazo", "Liquidación"], Field::Settlement, false),
                rule(&["Cantidad Compra", "Cant. Compra"], Field::BidSize, false),
                rule(&["Precio Compra", "Compra"], Field::Bid, false),
                rule(&["Precio Venta", "Venta"], Field::Ask, false),
                rule(&["Cantidad Venta", "Cant. Venta"], Field::AskSize, false),
                rule(&["Cierre"], Field::Close, false),
                rule(&["Variación Diaria", "Variación", "Var. %", "Var %"], Field::Change, false),
                rule(&["Apertura"], Field::Open, false),
                rule(&["Máximo"], Field::High, false),
                rule(&["Mínimo"], Field::Low, false),
                rule(&["Último Cierre", "Cierre Anterior"], Field::PreviousClose, false),
                rule(&["Monto Operado", "Monto"], Field::Turnover, false),
                rule(&["Volumen", "Volumen Nominal"], Field::Volume, false),
                rule(&["Operaciones", "Cantidad de Operaciones"], Field::Operations, false),
                rule(&["Hora", "Fecha"], Field::Datetime, false),
                rule(&["Vencimiento"], Field::Expiration, false),
            ],
            numbers: NumberFormat::Localized,
            headers: HeaderMatch::Loose,
        }
    }

    fn find_column(&self, raw: &RawTable, rule: &ColumnRule) -> Option<usize> {
        rule.sources.iter().find_map(|name| {
            raw.columns.iter().position(|c| match self.headers {
                HeaderMatch::Exact => c == name,
                HeaderMatch::Loose => fold_header(c) == fold_header(name),
            })
        })
    }
}

/// 원본 표를 정규화된 QuoteTable로 바꾼다.
///
/// 필수 컬럼이 하나라도 없으면 실제 컬럼 목록과 함께 에러를 돌려준다.
/// 값 변환 실패는 None 으로 남기고 행은 버리지 않는다 (종목 코드가 빈 행만 제외).
pub fn normalize(
    raw: &RawTable,
    mapping: &ColumnMapping,
    today: NaiveDate,
) -> Result<QuoteTable, SchemaError> {
    let mut resolved: Vec<(usize, Field)> = Vec::new();
    let mut missing: Vec<String> = Vec::new();

    for rule in &mapping.rules {
        match mapping.find_column(raw, rule) {
            Some(idx) => resolved.push((idx, rule.field)),
            // 종목 코드 없이는 Quote를 만들 수 없다
            None if rule.required || rule.field == Field::Symbol => {
                missing.push(rule.sources.join("|"))
            }
            None => {}
        }
    }

    if !missing.is_empty() {
        return Err(SchemaError::Mismatch {
            missing,
            present: raw.columns.clone(),
        });
    }

    let mut out = Vec::with_capacity(raw.rows.len());
    for (i, row) in raw.rows.iter().enumerate() {
        let mut quote = Quote::new(String::new());
        for &(idx, field) in &resolved {
            let cell = row.get(idx).unwrap_or(&Value::Null);
            apply(&mut quote, field, cell, mapping.numbers, today);
        }
        if quote.symbol.is_empty() {
            debug!("종목 코드가 없는 행 건너뜀: {}", i);
            continue;
        }
        out.push(quote);
    }

    Ok(out)
}

fn apply(quote: &mut Quote, field: Field, cell: &Value, numbers: NumberFormat, today: NaiveDate) {
    let num = || parse_number(cell, numbers).filter(|v| *v >= 0.0);
    match field {
        Field::Symbol => {
            quote.symbol = parse_text(cell)
                .and_then(|s| s.split_whitespace().next().map(str::to_string))
                .unwrap_or_default()
        }
        Field::Settlement => quote.settlement = parse_text(cell),
        Field::BidSize => quote.bid_size = num(),
        Field::Bid => quote.bid = num(),
        Field::Ask => quote.ask = num(),
        Field::AskSize => quote.ask_size = num(),
        Field::Last => quote.last = num(),
        Field::Close => quote.close = num(),
        // 일간 변동은 음수가 정상
        Field::Change => quote.change = parse_number(cell, numbers),
        Field::Open => quote.open = num(),
        Field::High => quote.high = num(),
        Field::Low => quote.low = num(),
        Field::PreviousClose => quote.previous_close = num(),
        Field::Turnover => quote.turnover = num(),
        Field::Volume => quote.volume = num(),
        Field::Operations => quote.operations = num(),
        Field::Datetime => quote.datetime = parse_datetime(cell, today),
        Field::Group => quote.group = parse_text(cell),
        Field::Expiration => quote.expiration = parse_date(cell),
    }
}

fn parse_text(cell: &Value) -> Option<String> {
    match cell {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// 숫자 변환. 실패하거나 유한하지 않으면 None.
pub fn parse_number(cell: &Value, format: NumberFormat) -> Option<f64> {
    let v = match cell {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => match format {
            NumberFormat::Plain => s.trim().parse::<f64>().ok(),
            NumberFormat::Localized => parse_localized(s),
        },
        _ => None,
    }?;
    v.is_finite().then_some(v)
}

fn parse_localized(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim()
        .trim_start_matches("US$")
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '$' | '%' | '\u{a0}'))
        .collect();
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }

    let canonical = if cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else if cleaned.matches('.').count() > 1 {
        cleaned.replace('.', "")
    } else if let Some((int, frac)) = cleaned.split_once('.') {
        // "65.100" 은 천 단위 구분, "0.065" 는 소수점
        let int_digits = int.trim_start_matches(|c| c == '-' || c == '+');
        if frac.len() == 3 && !int_digits.is_empty() && int_digits.chars().any(|c| c != '0') {
            format!("{int}{frac}")
        } else {
            cleaned
        }
    } else {
        cleaned
    };

    canonical.parse::<f64>().ok()
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y%m%d"];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

/// 시세 시각. "HH:MM:SS"만 있으면 오늘 날짜를 붙인다.
pub fn parse_datetime(cell: &Value, today: NaiveDate) -> Option<NaiveDateTime> {
    let s = cell.as_str()?.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
    {
        return Some(dt);
    }
    if let Some(d) = DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
    {
        return d.and_hms_opt(0, 0, 0);
    }
    TIME_FORMATS
        .iter()
        .find_map(|f| NaiveTime::parse_from_str(s, f).ok())
        .map(|t| today.and_time(t))
}

/// 만기일
pub fn parse_date(cell: &Value) -> Option<NaiveDate> {
    let s = cell.as_str()?.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(d) = DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
    {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .map(|dt| dt.date())
}

fn fold_header(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' => 'a',
            'é' | 'è' | 'ë' => 'e',
            'í' | 'ì' | 'ï' => 'i',
            'ó' | 'ò' | 'ö' => 'o',
            'ú' | 'ù' | 'ü' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}
