//! Log filtering for the brickcast crates.
//!
//! [`filter_directives`] builds one directive string that both `env_logger`
//! and `tracing_subscriber::EnvFilter` understand. The `brickcast*` targets
//! log at the requested level while third-party targets (image decoders,
//! the OpenCV bindings) stay at `warn` or quieter. `RUST_LOG` replaces the
//! directives when set.

use std::fmt::Write;

use log::LevelFilter;

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

/// Log targets of the workspace crates.
pub const LOG_TARGETS: [&str; 5] = [
    "brickcast",
    "brickcast_core",
    "brickcast_board",
    "brickcast_pose",
    "brickcast_render",
];

/// Directives enabling `level` for [`LOG_TARGETS`] and at most `warn`
/// for everything else.
pub fn filter_directives(level: LevelFilter) -> String {
    let others = level.min(LevelFilter::Warn);
    let mut out = others.as_str().to_ascii_lowercase();
    let level = level.as_str().to_ascii_lowercase();
    for target in LOG_TARGETS {
        let _ = write!(out, ",{target}={level}");
    }
    out
}

/// Install a `tracing` subscriber on stderr and route `log` records into it.
///
/// Span closes are reported with their busy time, which gives per-frame
/// timings for the instrumented pipeline stages.
#[cfg(feature = "tracing")]
pub fn init_tracing(level: LevelFilter, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(level)));
    if json {
        let _ = fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .with_writer(std::io::stderr)
            .json()
            .flatten_event(true)
            .finish()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .with_writer(std::io::stderr)
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init();
    }
    let _ = tracing_log::LogTracer::init();
}
