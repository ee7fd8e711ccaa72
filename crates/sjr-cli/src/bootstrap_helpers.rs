use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

pub fn tracing_default_level(debug: bool) -> LevelFilter {
    if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    }
}

/// Installs the global subscriber. `RUST_LOG` overrides the default level.
pub fn init_tracing(debug: bool) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(tracing_default_level(debug).into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
