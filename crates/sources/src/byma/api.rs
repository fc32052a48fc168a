use async_trait::async_trait;
use chrono::Local;
use serde_json::Value;
use tracing::{info, warn};

use interface::{FetchError, InstrumentCategory, QuoteTable, SourceId};

use super::ByMaApiClient;
use crate::normalize::{normalize, ColumnMapping};
use crate::table::RawTable;
use crate::QuoteSource;

const FIXED_INCOME_PATH: &str = "/vanoms-be-core/rest/api/bymadata/free";

/// T1 결제 기준 시세만 요청하는 고정 필터
const REQUEST_BODY: &str =
    r#"{"excludeZeroPxAndQty":false,"T2":false,"T1":true,"T0":false,"Content-Type":"application/json"}"#;

/// 응답 형태: `{"data": [...]}` 또는 배열 그대로
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Envelope {
    Data,
    Bare,
}

fn envelope(category: InstrumentCategory) -> Envelope {
    match category {
        InstrumentCategory::SovereignBonds | InstrumentCategory::ShortTermNotes => Envelope::Data,
        InstrumentCategory::CorporateNotes => Envelope::Bare,
    }
}

fn extract_records(body: &Value, envelope: Envelope) -> Result<&Vec<Value>, FetchError> {
    match envelope {
        Envelope::Data => match body.get("data") {
            Some(Value::Array(records)) => Ok(records),
            Some(other) => Err(FetchError::Unparseable(format!(
                "'data' is not an array: {}",
                kind(other)
            ))),
            None => {
                let keys: Vec<&String> = body
                    .as_object()
                    .map(|o| o.keys().collect())
                    .unwrap_or_default();
                Err(FetchError::Unparseable(format!(
                    "missing 'data' in {} response (keys: {:?})",
                    kind(body),
                    keys
                )))
            }
        },
        Envelope::Bare => body.as_array().ok_or_else(|| {
            FetchError::Unparseable(format!("expected an array, got {}", kind(body)))
        }),
    }
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[async_trait]
impl QuoteSource for ByMaApiClient {
    fn id(&self) -> SourceId {
        SourceId::BymaApi
    }

    async fn fetch(&self, category: InstrumentCategory) -> Result<QuoteTable, FetchError> {
        info!("{} 데이터 가져오는 중...", category);

        let url = format!("{}{FIXED_INCOME_PATH}/{}", self.base_url, category.endpoint());
        let response = self
            .session
            .http
            .post(&url)
            .header("Accept", "application/json, text/plain, */*")
            .header("Content-Type", "application/json")
            .header("Origin", self.base_url.as_str())
            .header("Referer", format!("{}/", self.base_url))
            .header("Sec-Fetch-Site", "same-origin")
            .header("Sec-Fetch-Mode", "cors")
            .header("Sec-Fetch-Dest", "empty")
            .timeout(self.session.config.api_timeout)
            .body(REQUEST_BODY)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("{} 응답 오류: 코드 {}", category, status);
            return Err(FetchError::Unavailable {
                status: status.as_u16(),
            });
        }

        let response_text = response.text().await?;
        let body: Value = serde_json::from_str(&response_text).map_err(|e| {
            FetchError::Unparseable(format!(
                "{}, response: {}",
                e,
                response_text.chars().take(200).collect::<String>()
            ))
        })?;

        let records = extract_records(&body, envelope(category))?;
        let raw = RawTable::from_records(records)?;
        let (rows, cols) = raw.shape();
        if raw.is_empty() {
            warn!("{}: 데이터가 없습니다", category);
            return Err(FetchError::Empty);
        }

        let table = normalize(&raw, &ColumnMapping::byma_api(), Local::now().date_naive())
            .map_err(|e| {
                warn!("{}: 원본 {}행 x {}열, 컬럼 매핑 실패", category, rows, cols);
                e
            })?;
        if table.is_empty() {
            return Err(FetchError::Empty);
        }

        info!("{}: {}건 수신", category, table.len());
        Ok(table)
    }
}
