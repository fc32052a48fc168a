use async_trait::async_trait;
use chrono::Local;
use tracing::info;

use interface::{FetchError, InstrumentCategory, QuoteTable, SourceId};

use super::ByMaWebClient;
use crate::html::{fetch_listing, TableSelection};
use crate::normalize::{normalize, ColumnMapping};
use crate::QuoteSource;

const BONDS_PAGE_PATH: &str = "/productos/bonos/";

#[async_trait]
impl QuoteSource for ByMaWebClient {
    fn id(&self) -> SourceId {
        SourceId::BymaWeb
    }

    async fn fetch(&self, category: InstrumentCategory) -> Result<QuoteTable, FetchError> {
        // 홈페이지에는 국채 목록만 있다
        if category != InstrumentCategory::SovereignBonds {
            return Err(FetchError::Unsupported {
                source_id: self.id(),
                category,
            });
        }

        info!("BYMA 웹 페이지에서 채권 데이터 가져오는 중...");
        let url = format!("{}{BONDS_PAGE_PATH}", self.base_url);
        let raw = fetch_listing(
            &self.session,
            &url,
            self.session.config.web_timeout,
            TableSelection::FirstSubstantial,
        )
        .await?;

        let table = normalize(&raw, &ColumnMapping::html_listing(), Local::now().date_naive())?;
        if table.is_empty() {
            return Err(FetchError::Empty);
        }
        info!("BYMA 웹: {}건 수신", table.len());
        Ok(table)
    }
}
