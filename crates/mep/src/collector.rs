use tracing::{info, warn};

use interface::{InstrumentCategory, QuoteTable, SourceId};
use sources::SourceChain;

/// 카테고리 하나의 수집 결과
#[derive(Debug, Clone)]
pub struct Collected {
    pub category: InstrumentCategory,
    pub source: SourceId,
    pub table: QuoteTable,
}

/// 카테고리를 순서대로 하나씩 수집한다. 실패한 카테고리는 로그만 남기고 건너뛴다.
pub async fn collect(chain: &SourceChain, categories: &[InstrumentCategory]) -> Vec<Collected> {
    info!(
        "데이터 수집 시작: {}개 카테고리, 소스 순서 {:?}",
        categories.len(),
        chain.ids()
    );

    let mut collected = Vec::new();
    for &category in categories {
        match chain.fetch_with_source(category).await {
            Ok((source, table)) => collected.push(Collected {
                category,
                source,
                table,
            }),
            Err(e) => {
                warn!("{} 수집 실패: {}", category.label(), e);
            }
        }
    }

    info!(
        "데이터 수집 완료: {}/{}개 카테고리",
        collected.len(),
        categories.len()
    );
    collected
}
