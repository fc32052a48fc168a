use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use interface::{FetchError, InstrumentCategory, QuoteTable, SourceId};

use crate::QuoteSource;

/// 우선순위 순서대로 소스를 시도하고, 비어 있지 않은 표를 처음 돌려준 소스에서 멈춘다.
pub struct SourceChain {
    sources: Vec<Arc<dyn QuoteSource>>,
}

impl SourceChain {
    pub fn new(sources: Vec<Arc<dyn QuoteSource>>) -> Self {
        Self { sources }
    }

    pub fn ids(&self) -> Vec<SourceId> {
        self.sources.iter().map(|s| s.id()).collect()
    }

    /// 성공한 소스의 id와 표를 돌려준다
    pub async fn fetch_with_source(
        &self,
        category: InstrumentCategory,
    ) -> Result<(SourceId, QuoteTable), FetchError> {
        let mut attempts: Vec<(SourceId, String)> = Vec::new();

        for source in &self.sources {
            let id = source.id();
            match source.fetch(category).await {
                Ok(table) if !table.is_empty() => {
                    info!("{}: {} 소스에서 {}건 확보", category, id, table.len());
                    return Ok((id, table));
                }
                Ok(_) => {
                    warn!("{}: {} 소스가 빈 표를 돌려줌, 다음 소스 시도", category, id);
                    attempts.push((id, FetchError::Empty.to_string()));
                }
                Err(e @ FetchError::Schema(_)) => {
                    // 컬럼 구성이 다르면 재시도하지 않고 보고만 한다
                    error!("{}: {} 소스 스키마 불일치: {}", category, id, e);
                    attempts.push((id, e.to_string()));
                }
                Err(FetchError::Unsupported { .. }) => {
                    attempts.push((id, format!("does not serve {category}")));
                }
                Err(e) => {
                    warn!("{}: {} 소스 실패: {}, 다음 소스 시도", category, id, e);
                    attempts.push((id, e.to_string()));
                }
            }
        }

        Err(FetchError::Exhausted(attempts))
    }
}

/// 체인 자체도 하나의 소스로 쓸 수 있다 (체인 안의 체인 포함)
#[async_trait]
impl QuoteSource for SourceChain {
    fn id(&self) -> SourceId {
        SourceId::Chain
    }

    async fn fetch(&self, category: InstrumentCategory) -> Result<QuoteTable, FetchError> {
        self.fetch_with_source(category).await.map(|(_, table)| table)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use interface::{Quote, SchemaError};

    use super::*;

    enum Outcome {
        Rows(Vec<&'static str>),
        Unavailable,
        Schema,
    }

    struct StaticSource {
        id: SourceId,
        outcome: Outcome,
        calls: AtomicUsize,
    }

    impl StaticSource {
        fn new(id: SourceId, outcome: Outcome) -> Arc<Self> {
            Arc::new(Self {
                id,
                outcome,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl QuoteSource for StaticSource {
        fn id(&self) -> SourceId {
            self.id
        }

        async fn fetch(&self, _category: InstrumentCategory) -> Result<QuoteTable, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.outcome {
                Outcome::Rows(symbols) => Ok(symbols.iter().map(|s| Quote::new(*s)).collect()),
                Outcome::Unavailable => Err(FetchError::Unavailable { status: 502 }),
                Outcome::Schema => Err(FetchError::Schema(SchemaError::Mismatch {
                    missing: vec!["symbol".into()],
                    present: vec!["foo".into()],
                })),
            }
        }
    }

    #[tokio::test]
    async fn test_first_non_empty_source_wins() {
        let api = StaticSource::new(SourceId::BymaApi, Outcome::Unavailable);
        let web = StaticSource::new(SourceId::BymaWeb, Outcome::Rows(vec![]));
        let iol = StaticSource::new(SourceId::Iol, Outcome::Rows(vec!["AL30", "AL30D"]));
        let sources: Vec<Arc<dyn QuoteSource>> = vec![api.clone(), web.clone(), iol];
        let chain = SourceChain::new(sources);

        let (id, table) = chain.fetch_with_source(InstrumentCategory::SovereignBonds).await.unwrap();
        assert_eq!(id, SourceId::Iol);
        assert_eq!(table.len(), 2);
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
        assert_eq!(web.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_later_sources_are_not_called_after_success() {
        let api = StaticSource::new(SourceId::BymaApi, Outcome::Rows(vec!["AL30"]));
        let iol = StaticSource::new(SourceId::Iol, Outcome::Rows(vec!["AL35"]));
        let sources: Vec<Arc<dyn QuoteSource>> = vec![api, iol.clone()];
        let chain = SourceChain::new(sources);

        let (id, _) = chain.fetch_with_source(InstrumentCategory::SovereignBonds).await.unwrap();
        assert_eq!(id, SourceId::BymaApi);
        assert_eq!(iol.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_schema_mismatch_moves_on_and_all_failures_exhaust() {
        let api = StaticSource::new(SourceId::BymaApi, Outcome::Schema);
        let web = StaticSource::new(SourceId::BymaWeb, Outcome::Unavailable);
        let sources: Vec<Arc<dyn QuoteSource>> = vec![api, web];
        let chain = SourceChain::new(sources);

        let err = chain.fetch_with_source(InstrumentCategory::SovereignBonds).await.unwrap_err();
        match err {
            FetchError::Exhausted(attempts) => {
                assert_eq!(attempts.len(), 2);
                assert_eq!(attempts[0].0, SourceId::BymaApi);
                assert!(attempts[0].1.contains("schema mismatch"));
                assert_eq!(attempts[1].0, SourceId::BymaWeb);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_chain_is_exhausted() {
        let chain = SourceChain::new(vec![]);
        assert!(chain.ids().is_empty());
        assert!(matches!(
            chain.fetch_with_source(InstrumentCategory::CorporateNotes).await,
            Err(FetchError::Exhausted(a)) if a.is_empty()
        ));
    }

    #[tokio::test]
    async fn test_chain_nested_inside_chain() {
        let api = StaticSource::new(SourceId::BymaApi, Outcome::Unavailable);
        let web = StaticSource::new(SourceId::BymaWeb, Outcome::Rows(vec!["AL30"]));
        let inner_sources: Vec<Arc<dyn QuoteSource>> = vec![web.clone()];
        let inner = Arc::new(SourceChain::new(inner_sources));
        assert_eq!(inner.id(), SourceId::Chain);

        let sources: Vec<Arc<dyn QuoteSource>> = vec![api.clone(), inner];
        let outer = SourceChain::new(sources);
        assert_eq!(outer.ids(), vec![SourceId::BymaApi, SourceId::Chain]);

        let (id, table) = outer
            .fetch_with_source(InstrumentCategory::SovereignBonds)
            .await
            .unwrap();
        assert_eq!(id, SourceId::Chain);
        assert_eq!(table[0].symbol, "AL30");
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
        assert_eq!(web.calls.load(Ordering::SeqCst), 1);

        // 트레이트로 호출하면 표만 돌려준다
        let table = QuoteSource::fetch(&outer, InstrumentCategory::SovereignBonds)
            .await
            .unwrap();
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_inner_chain_is_recorded_by_outer() {
        let inner_sources: Vec<Arc<dyn QuoteSource>> =
            vec![StaticSource::new(SourceId::Iol, Outcome::Unavailable)];
        let sources: Vec<Arc<dyn QuoteSource>> = vec![Arc::new(SourceChain::new(inner_sources))];
        let outer = SourceChain::new(sources);

        match outer.fetch(InstrumentCategory::SovereignBonds).await.unwrap_err() {
            FetchError::Exhausted(attempts) => {
                assert_eq!(attempts.len(), 1);
                assert_eq!(attempts[0].0, SourceId::Chain);
                assert!(attempts[0].1.contains("iol: source unavailable"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
