use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use human_panic::setup_panic;
use log::{debug, error, info, log, warn, Level};

use crate::helpers::logging;

/// Open WebSocket closes and pending log writes get this long after the command returned.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Identifies the binary in the startup log line.
pub struct Tool {
    pub name: &'static str,
    pub version: &'static str,
}

/// Common entry point for the binaries: panic hook, `.env`, logging and a Tokio runtime that
/// stays entered while `fn_run` executes. `fn_run` itself is synchronous and may block on
/// futures, e.g. via `futures::executor::block_on`.
pub fn run<CliType>(
    tool: Tool,
    fn_cli_parse: fn() -> CliType,
    fn_extract_logging: fn(&CliType) -> &logging::Params,
    fn_run: fn(CliType) -> Result<()>,
) -> Result<()> {
    setup_panic!();
    let env_result = dotenvy::dotenv();

    let cli = fn_cli_parse();
    let logger_handle = logging::configure_from(fn_extract_logging(&cli))?;
    info!("{} v{} starting", tool.name, tool.version);

    // Reported only now, the logger wasn't up before
    match (env_report_level(&env_result), env_result) {
        (_, Ok(path)) => debug!("Loaded environment from {:?}", path),
        (Some(level), Err(_)) => log!(
            level,
            "No `.env` file found (recursively), using CLI and environment only"
        ),
        (None, Err(env_err)) => {
            logger_handle.flush();
            return Err(env_err).context("Failed to load `.env` file");
        }
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start Tokio runtime")?;
    let _guard = runtime.enter();

    let command_result = fn_run(cli);
    if let Err(e) = &command_result {
        error!("{} failed: {:#}", tool.name, e);
    }

    debug!("Waiting up to {:?} for remaining tasks to finish", SHUTDOWN_GRACE);
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    if command_result.is_ok() {
        info!("{} done", tool.name);
    } else {
        warn!("{} stopped after an error", tool.name);
    }

    // Async write mode, the handle must live until here
    logger_handle.flush();

    command_result
}

/// Level a `.env` lookup is reported at. None if the failure must abort startup.
fn env_report_level(env_result: &dotenvy::Result<PathBuf>) -> Option<Level> {
    match env_result {
        Ok(_) => Some(Level::Debug),
        Err(env_err) if env_err.not_found() => Some(Level::Warn),
        Err(_) => None,
    }
}
