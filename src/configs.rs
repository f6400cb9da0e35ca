use mongodb::Client;
use serde::Deserialize;
use std::env;
use tracing_appender::non_blocking::WorkerGuard;

mod logging;

/// 실행 환경에 따라 .env 파일을 로드한다.
pub fn load_dotenv() {
    let env_filename = env::var("RUN_MODE")
        .map(|env| format!(".env.{}", env))
        .unwrap_or_else(|_| ".env".into());

    dotenvy::from_filename(env_filename).ok();
}

/// 도서 저장소(MongoDB) 연결 설정
#[derive(Debug, Deserialize)]
pub struct Store {
    url: String,
    database: String,
    collection: String,
}

impl Store {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    store: Store,
    log: Option<logging::Config>,
}

impl AppConfig {
    pub fn store(&self) -> &Store {
        &self.store
    }
}

/// `config/{RUN_MODE}.json` 파일에서 설정을 읽어온다.
/// `RUN_MODE`가 없으면 development 설정을 사용한다.
pub fn load_config() -> Result<AppConfig, config::ConfigError> {
    let env = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
    let config = config::Config::builder()
        .add_source(config::File::with_name(&format!("config/{}.json", env)))
        .build()?;

    config.try_deserialize()
}

/// 설정된 URL로 MongoDB 클라이언트를 생성한다.
///
/// 프로세스 시작 시 한 번 호출하고, 생성된 클라이언트를 저장소에 주입한다.
/// 클라이언트는 프로세스 종료 시 함께 정리된다.
pub async fn connect_to_store(store: &Store) -> Client {
    Client::with_uri_str(store.url())
        .await
        .expect("Could not connect to MongoDB")
}

/// 프로그램 전역 로깅 설정을 초기화한다.
///
/// 반환된 가드는 파일 로깅 워커의 수명을 관리하므로 프로세스가 종료될
/// 때까지 보관해야 한다. 로깅 설정이 없으면 아무것도 하지 않는다.
pub fn set_global_logging_config(config: &AppConfig) -> Option<WorkerGuard> {
    config.log
        .as_ref()
        .map(logging::set_global_logging_config)
}
