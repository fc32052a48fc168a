use std::sync::Arc;

use async_trait::async_trait;

use interface::{FetchError, InstrumentCategory, QuoteTable, SourceId};

pub mod byma;
pub mod chain;
pub mod html;
pub mod iol;
pub mod normalize;
pub mod session;
pub mod table;

/// 카테고리 하나의 시세표를 가져오는 공통 인터페이스
#[async_trait]
pub trait QuoteSource: Send + Sync {
    fn id(&self) -> SourceId;

    async fn fetch(&self, category: InstrumentCategory) -> Result<QuoteTable, FetchError>;
}

// Convenience re-exports
pub use byma::{ByMaApiClient, ByMaWebClient};
pub use chain::SourceChain;
pub use iol::IolClient;
pub use session::{Session, SourceConfig};

/// 기본 우선순위: BYMA API -> BYMA 웹 -> IOL
pub fn default_chain(session: Arc<Session>) -> SourceChain {
    let sources: Vec<Arc<dyn QuoteSource>> = vec![
        Arc::new(ByMaApiClient::new(session.clone())),
        Arc::new(ByMaWebClient::new(session.clone())),
        Arc::new(IolClient::new(session)),
    ];
    SourceChain::new(sources)
}

/// 웹 페이지만 쓰는 체인: BYMA 웹 -> IOL
pub fn web_chain(session: Arc<Session>) -> SourceChain {
    let sources: Vec<Arc<dyn QuoteSource>> = vec![
        Arc::new(ByMaWebClient::new(session.clone())),
        Arc::new(IolClient::new(session)),
    ];
    SourceChain::new(sources)
}
