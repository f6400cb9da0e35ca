use serde::Deserialize;
use time::macros::format_description;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// 로깅 설정
#[derive(Debug, Deserialize)]
pub struct Config {
    dir: String,
    name: String,

    /// 보관할 최대 로그 파일 개수로 로그 파일이 설정한 개수보다 많아지면
    /// 오래된 파일부터 삭제된다. 설정하지 않으면 삭제하지 않는다.
    keep: Option<usize>,

    /// 파일과 stdout에 출력할 최소 로그 레벨. 설정하지 않으면 DEBUG.
    ///
    /// 이 값은 [`tracing::Level`]로 변환된다.
    level: Option<String>,

    /// 로그 파일이 분리되는 주기. 설정하지 않으면 DAILY.
    ///
    /// 이 값은 [`rolling::Rotation`]으로 변환된다.
    rotation: Option<String>,
}

/// 전역 tracing 구독자를 설치하고 파일 로깅 워커의 가드를 반환한다.
/// 가드가 드롭되면 파일 로깅이 중단되므로 호출자가 보관해야 한다.
pub fn set_global_logging_config(c: &Config) -> WorkerGuard {
    let rotation = c.rotation
        .as_deref()
        .map(parse_rotation)
        .unwrap_or(rolling::Rotation::DAILY);

    let mut file_appender = rolling::RollingFileAppender::builder()
        .filename_prefix(c.name.clone())
        .filename_suffix(".log")
        .rotation(rotation);

    if let Some(keep) = c.keep {
        file_appender = file_appender.max_log_files(keep);
    }

    let file_appender = file_appender.build(c.dir.clone()).unwrap();

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let writer = std::io::stdout.and(non_blocking);

    let level = c.level
        .as_deref()
        .map(parse_level)
        .unwrap_or(tracing::Level::DEBUG);

    tracing_subscriber::fmt()
        .json()
        .with_file(true)
        .with_line_number(true)
        .with_current_span(true)
        .with_span_list(true)
        .with_timer(LocalTime::new(format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]")))
        .with_writer(writer)
        .with_max_level(level)
        .init();

    guard
}

fn parse_rotation(s: &str) -> rolling::Rotation {
    match s.to_uppercase().as_str() {
        "DAILY" => rolling::Rotation::DAILY,
        "HOURLY" => rolling::Rotation::HOURLY,
        "MINUTELY" => rolling::Rotation::MINUTELY,
        "NEVER" => rolling::Rotation::NEVER,
        _ => panic!("로깅 파일 분리 주기(rotation)는 \"DAILY\", \"HOURLY\", \"MINUTELY\", \"NEVER\"만 가능 합니다. 입력 값: {}", s)
    }
}

fn parse_level(l: &str) -> tracing::Level {
    match l.to_uppercase().as_str() {
        "TRACE" => tracing::Level::TRACE,
        "DEBUG" => tracing::Level::DEBUG,
        "INFO" => tracing::Level::INFO,
        "WARN" => tracing::Level::WARN,
        "ERROR" => tracing::Level::ERROR,
        _ => panic!("로그 레벨(level)은 \"TRACE\", \"DEBUG\", \"INFO\", \"WARN\", \"ERROR\"만 가능 합니다. 입력 값: {}", l)
    }
}
