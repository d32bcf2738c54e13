use anyhow::Context;
use log::LevelFilter;
use log4rs::{
    append::{
        console::{ConsoleAppender, Target},
        file::FileAppender,
    },
    config::{Appender, Config, Root},
    encode::{Encode, pattern::PatternEncoder},
    filter::threshold::ThresholdFilter,
};
use std::{backtrace, env};

pub mod properties;
pub mod string_operations;

const LOGGING_PATTERN: &str = "{d} {l} {t} - {m}{n}";

#[derive(Debug)]
struct BacktracePatternEncoder {
    pattern_encoder: PatternEncoder,
    is_backtrace_enabled: bool,
}

impl BacktracePatternEncoder {
    fn new(pattern: &str) -> Self {
        BacktracePatternEncoder {
            pattern_encoder: PatternEncoder::new(pattern),
            is_backtrace_enabled: env::var("RUST_BACKTRACE").is_ok()
                || env::var("RUST_LIB_BACKTRACE").is_ok(),
        }
    }
}

impl Encode for BacktracePatternEncoder {
    fn encode(
        &self,
        w: &mut dyn log4rs::encode::Write,
        record: &log::Record<'_>,
    ) -> anyhow::Result<()> {
        if record.level() == log::Level::Error && self.is_backtrace_enabled {
            let args = format_args!(
                "{}\nBacktrace:\n{}",
                record.args(),
                backtrace::Backtrace::capture()
            );
            let new_record = log::Record::builder()
                .args(args)
                .level(record.level())
                .target(record.target())
                .module_path(record.module_path())
                .file(record.file())
                .line(record.line())
                .build();
            self.pattern_encoder.encode(w, &new_record)?;
        } else {
            self.pattern_encoder.encode(w, record)?;
        }
        Ok(())
    }
}

/// Parses a textual log level (`off`, `error`, `warn`, `info`, ...).
pub fn parse_log_level(value: &str) -> Option<LevelFilter> {
    match value.trim().to_lowercase().as_str() {
        "off" => Some(LevelFilter::Off),
        "error" => Some(LevelFilter::Error),
        "warn" | "warning" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}

/// Reads a log level from `var`, falling back to `Info`.
pub fn resolve_log_level(var: &str) -> LevelFilter {
    env::var(var)
        .ok()
        .as_deref()
        .and_then(parse_log_level)
        .unwrap_or(LevelFilter::Info)
}

/// Reads an optional log file path from `var`. Unset, empty and `none`
/// all mean console-only logging.
pub fn resolve_log_file(var: &str) -> Option<String> {
    let value = env::var(var).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Installs the process-wide log4rs logger.
///
/// Records at or above `log_level` go to stderr. When `file_path` is given
/// the same records are also appended to that file.
pub fn initialize_logger(log_level: LevelFilter, file_path: Option<&str>) -> anyhow::Result<()> {
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(BacktracePatternEncoder::new(LOGGING_PATTERN)))
        .build();

    let mut config_builder = Config::builder().appender(
        Appender::builder()
            .filter(Box::new(ThresholdFilter::new(log_level)))
            .build("stderr", Box::new(stderr)),
    );
    let mut root = Root::builder().appender("stderr");

    if let Some(path) = file_path {
        let logfile = FileAppender::builder()
            .encoder(Box::new(BacktracePatternEncoder::new(LOGGING_PATTERN)))
            .build(path)
            .with_context(|| format!("cannot open log file {path}"))?;

        config_builder =
            config_builder.appender(Appender::builder().build("logfile", Box::new(logfile)));
        root = root.appender("logfile");
    }

    let config = config_builder
        .build(root.build(log_level))
        .context("invalid logger configuration")?;

    log4rs::init_config(config)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_levels_case_insensitively() {
        assert_eq!(parse_log_level("WARN"), Some(LevelFilter::Warn));
        assert_eq!(parse_log_level("warning"), Some(LevelFilter::Warn));
        assert_eq!(parse_log_level(" debug "), Some(LevelFilter::Debug));
        assert_eq!(parse_log_level("off"), Some(LevelFilter::Off));
    }

    #[test]
    fn rejects_unknown_level() {
        assert_eq!(parse_log_level("verbose"), None);
    }
}
