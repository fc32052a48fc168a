use std::{collections::HashMap, time::Duration};

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, USER_AGENT};
use serde_json::Value;
use tracing::{info, warn};

use interface::FetchError;

pub const BYMA_OPEN_DATA_URL: &str = "https://open.bymadata.com.ar";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/96.0.4664.93 Safari/537.36";

/// 소스별 요청 설정
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// BYMA open data API 요청 타임아웃
    pub api_timeout: Duration,
    /// BYMA 웹 페이지 요청 타임아웃
    pub web_timeout: Duration,
    /// IOL 페이지 요청 타임아웃
    pub iol_timeout: Duration,
    pub connect_timeout: Duration,
    /// 공개 엔드포인트의 자체 서명 인증서를 허용할지 여부
    pub accept_invalid_certs: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_timeout: Duration::from_secs(15),
            web_timeout: Duration::from_secs(10),
            iol_timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(10),
            accept_invalid_certs: true,
        }
    }
}

/// 익명 세션 컨텍스트.
/// 쿠키를 들고 있는 HTTP 클라이언트와 번역 사전을 한 번 만들어서 각 소스에 넘긴다.
pub struct Session {
    pub(crate) http: reqwest::Client,
    pub(crate) config: SourceConfig,
    dictionary: HashMap<String, String>,
}

impl Session {
    /// 네트워크 호출 없이 클라이언트만 만든다
    pub fn new(config: SourceConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("es-US,es-419;q=0.9,es;q=0.8,en;q=0.7"),
        );

        let http = reqwest::Client::builder()
            .cookie_store(true)
            .default_headers(headers)
            .connect_timeout(config.connect_timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self {
            http,
            config,
            dictionary: HashMap::new(),
        })
    }

    /// BYMA open data에 연결해서 세션 쿠키와 번역 사전을 받아온다
    pub async fn connect(config: SourceConfig) -> Result<Self, FetchError> {
        let mut session = Self::new(config)?;
        session.warm_up(BYMA_OPEN_DATA_URL).await;
        Ok(session)
    }

    /// 대시보드 GET으로 쿠키를 받고 번역 사전을 읽는다.
    /// 둘 다 실패해도 세션은 그대로 쓸 수 있다.
    pub async fn warm_up(&mut self, base_url: &str) {
        let dashboard = self
            .http
            .get(format!("{base_url}/"))
            .timeout(self.config.api_timeout)
            .send()
            .await;
        match dashboard {
            Ok(resp) if resp.status().is_success() => info!("BYMA 세션 초기화 완료"),
            Ok(resp) => warn!("BYMA 대시보드 응답 오류: {}", resp.status()),
            Err(e) => warn!("BYMA 대시보드 접속 실패: {}", e),
        }

        match self.fetch_dictionary(base_url).await {
            Ok(dictionary) => {
                info!("번역 사전 로드: {}개 항목", dictionary.len());
                self.dictionary = dictionary;
            }
            Err(e) => {
                warn!("번역 사전을 가져오지 못했습니다: {}", e);
                self.dictionary.clear();
            }
        }
    }

    async fn fetch_dictionary(&self, base_url: &str) -> Result<HashMap<String, String>, FetchError> {
        let response = self
            .http
            .get(format!("{base_url}/assets/api/langs/es.json"))
            .header("Accept", "application/json, text/plain, */*")
            .timeout(self.config.api_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Unavailable {
                status: status.as_u16(),
            });
        }

        let body: Value = serde_json::from_str(&response.text().await?)?;
        let mut out = HashMap::new();
        flatten_dictionary("", &body, &mut out);
        Ok(out)
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// 사전 키는 점으로 이어진 경로 (예: "fixedIncome.symbol")
    /// 최상위 키로도 찾을 수 있게 마지막 구간만으로도 조회한다.
    pub fn translate(&self, key: &str) -> Option<&str> {
        if let Some(v) = self.dictionary.get(key) {
            return Some(v.as_str());
        }
        let suffix = format!(".{key}");
        let mut matches: Vec<(&String, &String)> = self
            .dictionary
            .iter()
            .filter(|(k, _)| k.ends_with(&suffix))
            .collect();
        matches.sort_by(|a, b| a.0.cmp(b.0));
        matches.first().map(|(_, v)| v.as_str())
    }

    pub fn dictionary_len(&self) -> usize {
        self.dictionary.len()
    }
}

fn flatten_dictionary(prefix: &str, value: &Value, out: &mut HashMap<String, String>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                let key = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{prefix}.{k}")
                };
                flatten_dictionary(&key, v, out);
            }
        }
        Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        // 숫자/배열 등은 번역 대상이 아님
        _ => {}
    }
}
