use std::sync::Arc;

use crate::session::{Session, BYMA_OPEN_DATA_URL};

pub mod api;
pub mod web;

pub const BYMA_WEB_URL: &str = "https://www.byma.com.ar";

/// BYMA open data API 클라이언트 (렌타 피하 3개 카테고리 모두 지원)
#[derive(Clone)]
pub struct ByMaApiClient {
    pub(crate) session: Arc<Session>,
    pub(crate) base_url: String,
}

impl ByMaApiClient {
    pub fn new(session: Arc<Session>) -> Self {
        Self::with_base_url(session, BYMA_OPEN_DATA_URL)
    }

    pub fn with_base_url(session: Arc<Session>, base_url: impl Into<String>) -> Self {
        Self {
            session,
            base_url: base_url.into(),
        }
    }
}

/// BYMA 공개 홈페이지의 채권 표 (국채만)
#[derive(Clone)]
pub struct ByMaWebClient {
    pub(crate) session: Arc<Session>,
    pub(crate) base_url: String,
}

impl ByMaWebClient {
    pub fn new(session: Arc<Session>) -> Self {
        Self::with_base_url(session, BYMA_WEB_URL)
    }

    pub fn with_base_url(session: Arc<Session>, base_url: impl Into<String>) -> Self {
        Self {
            session,
            base_url: base_url.into(),
        }
    }
}
