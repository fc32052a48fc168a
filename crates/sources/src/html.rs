use std::{collections::HashMap, time::Duration};

use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::{info, warn};

use interface::FetchError;

use crate::{session::Session, table::RawTable};

const HTML_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8";

/// 채권 목록 페이지를 받아서 선택 규칙에 맞는 표 하나를 돌려준다.
/// 발견한 표마다 행/열 수를 로그로 남긴다.
pub(crate) async fn fetch_listing(
    session: &Session,
    url: &str,
    timeout: Duration,
    selection: TableSelection,
) -> Result<RawTable, FetchError> {
    let response = session
        .http
        .get(url)
        .header("Accept", HTML_ACCEPT)
        .timeout(timeout)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        warn!("페이지 응답 오류: {} ({})", status, url);
        return Err(FetchError::Unavailable {
            status: status.as_u16(),
        });
    }
    info!("페이지 접속 성공: {}", url);

    let body = response.text().await?;
    let tables = extract_tables(&body);
    if tables.is_empty() {
        warn!("표를 찾지 못했습니다 (본문 {}바이트)", body.len());
        return Err(FetchError::Unparseable(format!(
            "no <table> found in {} bytes of html",
            body.len()
        )));
    }

    info!("{}개의 표 발견", tables.len());
    for (i, t) in tables.iter().enumerate() {
        let (rows, cols) = t.shape();
        info!("표 {}: {}행 x {}열", i + 1, rows, cols);
    }

    let count = tables.len();
    selection.pick(tables).ok_or_else(|| {
        FetchError::Unparseable(format!("no usable table among {count} ({selection:?})"))
    })
}

/// 여러 표 중 어떤 것을 쓸지
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableSelection {
    /// 3행 3열을 넘는 첫 표, 없으면 첫 번째 표 (행이 있을 때만)
    FirstSubstantial,
    /// 행이 가장 많은 표. 행 수가 `min_rows`를 넘어야 한다
    Largest { min_rows: usize },
}

impl TableSelection {
    pub fn pick(&self, tables: Vec<RawTable>) -> Option<RawTable> {
        match *self {
            TableSelection::FirstSubstantial => {
                let idx = tables
                    .iter()
                    .position(|t| {
                        let (rows, cols) = t.shape();
                        rows > 3 && cols > 3
                    })
                    .or_else(|| tables.first().filter(|t| !t.rows.is_empty()).map(|_| 0))?;
                info!("{}번째 표를 데이터로 사용", idx + 1);
                tables.into_iter().nth(idx)
            }
            TableSelection::Largest { min_rows } => {
                let mut best: Option<(usize, usize)> = None;
                for (i, t) in tables.iter().enumerate() {
                    // 같은 크기면 앞의 표 유지
                    if best.map(|(_, rows)| t.rows.len() > rows).unwrap_or(true) {
                        best = Some((i, t.rows.len()));
                    }
                }
                let (idx, rows) = best?;
                if rows <= min_rows {
                    return None;
                }
                info!("가장 큰 표 사용: {}행", rows);
                tables.into_iter().nth(idx)
            }
        }
    }
}

/// HTML 문서의 모든 `<table>`을 RawTable로 추출한다.
///
/// 헤더는 `<th>` 셀, 없으면 첫 행의 `<td>` 셀을 쓴다.
pub fn extract_tables(html: &str) -> Vec<RawTable> {
    let document = Html::parse_document(html);
    let table_sel = selector("table");
    document
        .select(&table_sel)
        .map(extract_table)
        .collect()
}

fn extract_table(table: ElementRef<'_>) -> RawTable {
    let tr_sel = selector("tr");
    let th_sel = selector("th");
    let td_sel = selector("td");

    let rows: Vec<ElementRef<'_>> = table.select(&tr_sel).collect();

    let header_from_th: Vec<String> = table.select(&th_sel).map(cell_text).collect();
    let (mut header, data_rows) = if !header_from_th.is_empty() {
        let data: Vec<ElementRef<'_>> = rows
            .iter()
            .copied()
            .filter(|tr| tr.select(&td_sel).next().is_some())
            .collect();
        (header_from_th, data)
    } else if let Some((first, rest)) = rows.split_first() {
        (first.select(&td_sel).map(cell_text).collect(), rest.to_vec())
    } else {
        (Vec::new(), Vec::new())
    };

    dedupe_header(&mut header);

    let width = header.len();
    let cells: Vec<Vec<Value>> = data_rows
        .iter()
        .map(|tr| {
            let mut row: Vec<Value> = tr
                .select(&td_sel)
                .map(|td| Value::String(cell_text(td)))
                .take(width)
                .collect();
            row.resize(width, Value::Null);
            row
        })
        .filter(|row| row.iter().any(|v| !v.is_null()))
        .collect();

    RawTable::new(header, cells)
}

fn cell_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// 빈 헤더는 "Unnamed: n", 중복 헤더는 ".1", ".2" 접미사
fn dedupe_header(header: &mut [String]) {
    // 원래 이름 기준 등장 횟수
    let mut seen: HashMap<String, usize> = HashMap::new();
    for (i, name) in header.iter_mut().enumerate() {
        if name.is_empty() {
            *name = format!("Unnamed: {i}");
        }
        let count = seen.entry(name.clone()).or_insert(0);
        if *count > 0 {
            *name = format!("{name}.{count}");
        }
        *count += 1;
    }
}

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static css selector")
}
