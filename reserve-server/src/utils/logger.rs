//! Logging Infrastructure
//!
//! `RUST_LOG` wins over the configured level. With a log directory, JSON
//! lines also go to daily-rolling files: `app/` for everything except the
//! `security` target, `security/` for that target alone.

use std::fs;
use std::path::Path;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

const SECURITY_TARGET: &str = "security";

/// Install the global subscriber
///
/// ```no_run
/// // console only
/// reserve_server::init_logger("debug", false, None)?;
/// // console plus rolling files
/// reserve_server::init_logger("info", true, Some("./logs"))?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn init_logger(level: &str, json_format: bool, log_dir: Option<&str>) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| anyhow::anyhow!("Invalid log level {level:?}: {e}"))?;

    let console = if json_format {
        fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .boxed()
    } else {
        fmt::layer().with_target(true).boxed()
    };

    let (app_file, security_file) = match log_dir {
        Some(dir) => {
            let app_dir = Path::new(dir).join("app");
            let security_dir = Path::new(dir).join("security");
            fs::create_dir_all(&app_dir)?;
            fs::create_dir_all(&security_dir)?;

            let app_log = RollingFileAppender::new(Rotation::DAILY, app_dir, "app");
            let app_layer = fmt::layer()
                .json()
                .with_target(true)
                .with_writer(app_log)
                .with_filter(filter_fn(|meta| meta.target() != SECURITY_TARGET))
                .boxed();

            let security_log =
                RollingFileAppender::new(Rotation::DAILY, security_dir, SECURITY_TARGET);
            let security_layer = fmt::layer()
                .json()
                .with_target(true)
                .with_writer(security_log)
                .with_filter(filter_fn(|meta| meta.target() == SECURITY_TARGET))
                .boxed();

            (Some(app_layer), Some(security_layer))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(app_file)
        .with(security_file)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install logger: {e}"))?;

    Ok(())
}
