//! log4rs wiring for the builder's application and query logs.
//!
//! Compiled requests are written on the `nexusqb::query` target, developer traces
//! emitted through `dev6!` on `nexusqb::dev6`. Everything else goes to the root
//! `app` appender.

use log::LevelFilter;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::append::rolling_file::policy::compound::{
    CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
};
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::{Path, PathBuf};

pub const QUERY_TARGET: &str = "nexusqb::query";
pub const DEV6_TARGET: &str = "nexusqb::dev6";

const ENCODER_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {t} - {m}{n}";
const ROLL_SIZE: u64 = 10 * 1024 * 1024;

/// Initializes the logging system from a log4rs YAML file.
pub fn init_path(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    log4rs::init_file(path, log4rs::config::Deserializers::default())?;
    Ok(())
}

fn parse_level(level: Option<&str>) -> LevelFilter {
    match level.unwrap_or("info").to_ascii_lowercase().as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Info,
    }
}

fn rolling(
    base: &Path,
    stem: &str,
    keep: u32,
) -> Result<RollingFileAppender, Box<dyn std::error::Error>> {
    let roller = FixedWindowRoller::builder()
        .build(&format!("{}", base.join(format!("{stem}.{{}}.log")).display()), keep)?;
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(ROLL_SIZE)), Box::new(roller));
    let appender = RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(ENCODER_PATTERN)))
        .build(base.join(format!("{stem}.log")), Box::new(policy))?;
    Ok(appender)
}

/// Builds the log4rs config without installing it.
///
/// - `dir`: base directory for log files; current directory if `None`.
/// - `level`: error|warn|info|debug|trace|off
/// - `retention`: rolled files to keep per log (default 7)
/// - `enable_dev6`: also persist `dev6!` traces to `dev6.log`
pub fn build_config(
    dir: Option<&Path>,
    level: Option<&str>,
    retention: Option<usize>,
    enable_dev6: bool,
) -> Result<Config, Box<dyn std::error::Error>> {
    let base = match dir {
        Some(d) => PathBuf::from(d),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };
    std::fs::create_dir_all(&base)?;
    let keep = u32::try_from(retention.unwrap_or(7)).unwrap_or(7);
    let lvl = parse_level(level);

    let mut builder = Config::builder()
        .appender(Appender::builder().build("app", Box::new(rolling(&base, "app", keep)?)))
        .appender(Appender::builder().build("query", Box::new(rolling(&base, "query", keep)?)))
        .logger(Logger::builder().appender("query").additive(false).build(QUERY_TARGET, lvl));

    if enable_dev6 {
        builder = builder
            .appender(Appender::builder().build("dev6", Box::new(rolling(&base, "dev6", keep)?)))
            .logger(
                Logger::builder()
                    .appender("dev6")
                    .additive(false)
                    .build(DEV6_TARGET, LevelFilter::Trace),
            );
    } else {
        builder = builder.logger(Logger::builder().additive(false).build(DEV6_TARGET, LevelFilter::Off));
    }

    Ok(builder.build(Root::builder().appender("app").build(lvl))?)
}

/// Configure logging globally for the process.
///
/// # Errors
/// Returns an error if the log directory cannot be created, an appender cannot be
/// built, or a global logger is already installed.
pub fn configure_logging(
    dir: Option<&Path>,
    level: Option<&str>,
    retention: Option<usize>,
    enable_dev6: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(dir, level, retention, enable_dev6)?;
    log4rs::init_config(config)?;
    Ok(())
}

/// Configure logging from environment variables if present:
/// - `NEXUSQB_LOG_DIR`
/// - `NEXUSQB_LOG_LEVEL`
/// - `NEXUSQB_LOG_RETENTION`
/// - `NEXUSQB_DEV6` (1|true|yes)
pub fn configure_from_env() -> Result<(), Box<dyn std::error::Error>> {
    let dir = std::env::var("NEXUSQB_LOG_DIR").ok().map(PathBuf::from);
    let level = std::env::var("NEXUSQB_LOG_LEVEL").ok();
    let retention =
        std::env::var("NEXUSQB_LOG_RETENTION").ok().and_then(|s| s.parse::<usize>().ok());
    let dev6_enabled = std::env::var("NEXUSQB_DEV6")
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);
    configure_logging(dir.as_deref(), level.as_deref(), retention, dev6_enabled)
}
