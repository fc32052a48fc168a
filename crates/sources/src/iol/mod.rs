use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use tracing::info;

use interface::{FetchError, InstrumentCategory, QuoteTable, SourceId};

use crate::html::{fetch_listing, TableSelection};
use crate::normalize::{normalize, ColumnMapping};
use crate::session::Session;
use crate::QuoteSource;

pub const IOL_URL: &str = "https://www.invertironline.com";

const BONDS_PAGE_PATH: &str = "/mercado/cotizaciones/argentina/bonos/todos";

/// InvertirOnline 채권 시세 페이지 (BYMA 웹의 대체 소스)
#[derive(Clone)]
pub struct IolClient {
    pub(crate) session: Arc<Session>,
    pub(crate) base_url: String,
}

impl IolClient {
    pub fn new(session: Arc<Session>) -> Self {
        Self::with_base_url(session, IOL_URL)
    }

    pub fn with_base_url(session: Arc<Session>, base_url: impl Into<String>) -> Self {
        Self {
            session,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl QuoteSource for IolClient {
    fn id(&self) -> SourceId {
        SourceId::Iol
    }

    async fn fetch(&self, category: InstrumentCategory) -> Result<QuoteTable, FetchError> {
        if category != InstrumentCategory::SovereignBonds {
            return Err(FetchError::Unsupported {
                source_id: self.id(),
                category,
            });
        }

        info!("IOL에서 채권 데이터 가져오는 중...");
        let url = format!("{}{BONDS_PAGE_PATH}", self.base_url);
        // 본 표가 보통 가장 크다
        let raw = fetch_listing(
            &self.session,
            &url,
            self.session.config.iol_timeout,
            TableSelection::Largest { min_rows: 5 },
        )
        .await?;

        let table = normalize(&raw, &ColumnMapping::html_listing(), Local::now().date_naive())?;
        if table.is_empty() {
            return Err(FetchError::Empty);
        }
        info!("IOL: {}건 수신", table.len());
        Ok(table)
    }
}
