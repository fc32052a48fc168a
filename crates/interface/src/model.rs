use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceId {
    BymaApi,
    BymaWeb,
    Iol,
    /// 여러 소스를 묶은 fallback 체인
    Chain,
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceId::BymaApi => "byma-api",
            SourceId::BymaWeb => "byma-web",
            SourceId::Iol => "iol",
            SourceId::Chain => "chain",
        };
        f.write_str(s)
    }
}

/// BYMA 렌타 피하(fixed income) 카테고리
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstrumentCategory {
    /// 국채 (bonos soberanos)
    SovereignBonds,
    /// 단기 재무부 증권 (letras)
    ShortTermNotes,
    /// 회사채 (obligaciones negociables)
    CorporateNotes,
}

impl InstrumentCategory {
    pub const ALL: [InstrumentCategory; 3] = [
        InstrumentCategory::SovereignBonds,
        InstrumentCategory::ShortTermNotes,
        InstrumentCategory::CorporateNotes,
    ];

    /// BYMA open data API 엔드포인트 이름
    pub fn endpoint(&self) -> &'static str {
        match self {
            InstrumentCategory::SovereignBonds => "public-bonds",
            InstrumentCategory::ShortTermNotes => "lebacs",
            InstrumentCategory::CorporateNotes => "negociable-obligations",
        }
    }

    /// 통합 CSV의 instrument_type 컬럼 값
    pub fn label(&self) -> &'static str {
        match self {
            InstrumentCategory::SovereignBonds => "BONOS SOBERANOS",
            InstrumentCategory::ShortTermNotes => "LETRAS DEL TESORO",
            InstrumentCategory::CorporateNotes => "OBLIGACIONES NEGOCIABLES",
        }
    }

    pub fn file_stem(&self) -> &'static str {
        match self {
            InstrumentCategory::SovereignBonds => "bonos_publicos",
            InstrumentCategory::ShortTermNotes => "letras_tesoro",
            InstrumentCategory::CorporateNotes => "obligaciones_negociables",
        }
    }
}

impl fmt::Display for InstrumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint())
    }
}

/// 종목 하나의 시세 스냅샷.
/// 필드 순서가 곧 CSV 컬럼 순서다.
///
/// 숫자 필드는 유한한 값이거나 None. 파싱 실패를 0으로 바꾸지 않는다.
/// `change`를 제외한 숫자 필드는 음수가 될 수 없다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub settlement: Option<String>,
    pub bid_size: Option<f64>,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub ask_size: Option<f64>,
    pub last: Option<f64>,
    pub close: Option<f64>,
    pub change: Option<f64>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub previous_close: Option<f64>,
    pub turnover: Option<f64>,
    pub volume: Option<f64>,
    pub operations: Option<f64>,
    pub datetime: Option<NaiveDateTime>,
    pub group: Option<String>,
    pub expiration: Option<NaiveDate>,
}

impl Quote {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            settlement: None,
            bid_size: None,
            bid: None,
            ask: None,
            ask_size: None,
            last: None,
            close: None,
            change: None,
            open: None,
            high: None,
            low: None,
            previous_close: None,
            turnover: None,
            volume: None,
            operations: None,
            datetime: None,
            group: None,
            expiration: None,
        }
    }
}

/// 한 번의 fetch 결과. 매번 새로 만들어지는 값이다.
pub type QuoteTable = Vec<Quote>;

/// 같은 번호를 가진 페소 채권과 달러 채권의 쌍 (예: AL30 / AL30D)
#[derive(Debug, Clone, PartialEq)]
pub struct BondPair {
    id: String,
    peso: Quote,
    dollar: Quote,
}

impl BondPair {
    /// 양쪽 모두 last > 0 인 경우에만 만들어진다
    pub fn new(id: impl Into<String>, peso: Quote, dollar: Quote) -> Option<Self> {
        let positive = |q: &Quote| q.last.map(|p| p.is_finite() && p > 0.0).unwrap_or(false);
        if !positive(&peso) || !positive(&dollar) {
            return None;
        }
        Some(Self {
            id: id.into(),
            peso,
            dollar,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn peso(&self) -> &Quote {
        &self.peso
    }

    pub fn dollar(&self) -> &Quote {
        &self.dollar
    }

    pub fn peso_price(&self) -> f64 {
        self.peso.last.unwrap_or_default()
    }

    pub fn dollar_price(&self) -> f64 {
        self.dollar.last.unwrap_or_default()
    }
}

/// 채권 쌍 하나로부터 계산한 MEP 환율. 만들어진 뒤에는 바뀌지 않는다.
#[derive(Debug, Clone, PartialEq)]
pub struct MepRate {
    pair: BondPair,
    ratio: f64,
}

impl MepRate {
    pub fn new(pair: BondPair) -> Self {
        // BondPair가 dollar_price > 0 을 보장한다
        let ratio = pair.peso_price() / pair.dollar_price();
        Self { pair, ratio }
    }

    pub fn pair(&self) -> &BondPair {
        &self.pair
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MepSummary {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
    /// 달러 쪽 거래량 가중 평균. 거래량 정보가 없으면 None
    pub volume_weighted: Option<f64>,
}
