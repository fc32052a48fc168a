use thiserror::Error;

use crate::model::{InstrumentCategory, SourceId};

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("source unavailable: status {status}")]
    Unavailable { status: u16 },
    #[error("unparseable response: {0}")]
    Unparseable(String),
    #[error("empty response")]
    Empty,
    #[error("{source_id} does not serve {category}")]
    Unsupported {
        source_id: SourceId,
        category: InstrumentCategory,
    },
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("all sources failed: {}", describe_attempts(.0))]
    Exhausted(Vec<(SourceId, String)>),
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Unparseable(e.to_string())
    }
}

fn describe_attempts(attempts: &[(SourceId, String)]) -> String {
    if attempts.is_empty() {
        return "no sources configured".to_string();
    }
    attempts
        .iter()
        .map(|(id, reason)| format!("{id}: {reason}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// 필수 컬럼이 없을 때. 부분 결과를 돌려주지 않는다.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("schema mismatch: missing columns {missing:?}, present columns {present:?}")]
    Mismatch {
        missing: Vec<String>,
        present: Vec<String>,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MepError {
    #[error("no matchable bond pairs")]
    NoPairs,
    #[error("insufficient data: cannot summarize an empty set of rates")]
    InsufficientData,
}
