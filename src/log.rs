use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

use crate::env::ENV_CONFIG;

pub fn init() {
    // Without RUST_LOG the job should still report its progress.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);

    let builder = if ENV_CONFIG.log_perf {
        builder.with_span_events(FmtSpan::CLOSE)
    } else {
        builder
    };

    if ENV_CONFIG.log_json {
        builder.json().init();
    } else {
        builder.init();
    };
}
