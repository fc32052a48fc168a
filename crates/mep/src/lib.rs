pub mod calculator;
pub mod collector;
pub mod config;
pub mod logger;
pub mod matcher;
pub mod pipeline;
pub mod report;

pub use config::AppConfig;

use std::sync::Once;

static INIT: Once = Once::new();

/// .env 파일에서 환경 변수를 읽는다. 라이브러리가 로드될 때 한 번 호출된다.
fn init() {
    INIT.call_once(|| {
        dotenv::dotenv().ok();
    });
}

#[ctor::ctor]
fn setup() {
    init();
}
