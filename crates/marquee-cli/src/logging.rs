use anyhow::Result;
use media_compose_config::LoggingConfig;
use std::io;
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::{self, time::ChronoUtc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// 0 = configured level, 1 = debug (hyper noise suppressed), 2+ = trace.
fn filter_directive(verbose_level: u8, quiet: bool, configured: &str) -> String {
    if quiet {
        return "error".to_string();
    }
    match verbose_level {
        0 => configured.to_string(),
        1 => "debug,hyper::proto::h1=warn,hyper::client::pool=warn".to_string(),
        _ => "trace".to_string(),
    }
}

fn json_requested(configured: bool) -> bool {
    std::env::var("RUST_LOG_JSON")
        .map(|v| v == "true")
        .unwrap_or(configured)
}

pub fn init_logging(verbose_level: u8, quiet: bool, config: &LoggingConfig) -> Result<()> {
    let directive = filter_directive(verbose_level, quiet, &config.level);
    // RUST_LOG wins unless the user asked for quiet output
    let filter = if quiet {
        EnvFilter::new(directive)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive))
    };

    let json = json_requested(config.json);
    let registry = Registry::default().with(filter);

    if let Some(log_path) = &config.file {
        let file_appender = rolling_appender(log_path)?;
        if json {
            let json_layer = fmt::layer()
                .json()
                .with_timer(ChronoUtc::rfc_3339())
                .with_writer(file_appender);
            registry.with(json_layer).init();
        } else {
            let fmt_layer = fmt::layer()
                .with_timer(ChronoUtc::rfc_3339())
                .with_ansi(false)
                .with_writer(file_appender);
            registry.with(fmt_layer).init();
        }
    } else if json {
        let json_layer = fmt::layer()
            .json()
            .with_timer(ChronoUtc::rfc_3339())
            .with_writer(io::stderr);
        registry.with(json_layer).init();
    } else {
        let fmt_layer = fmt::layer()
            .with_timer(ChronoUtc::rfc_3339())
            .with_writer(io::stderr);
        registry.with(fmt_layer).init();
    }

    Ok(())
}

/// Daily rotation: marquee.log becomes marquee.2026-01-17 and so on.
fn rolling_appender(log_path: &Path) -> Result<RollingFileAppender> {
    let log_dir = log_path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("Log file path has no parent directory"))?;
    std::fs::create_dir_all(log_dir)?;

    let log_filename = log_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid log filename"))?;
    let log_prefix = log_filename.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(log_filename);

    Ok(RollingFileAppender::new(Rotation::DAILY, log_dir, log_prefix))
}
