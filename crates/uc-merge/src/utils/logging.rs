use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

pub type LogHandle = reload::Handle<EnvFilter, Registry>;

fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "uc_merge=debug,ucm_merge=debug"
    } else {
        "uc_merge=info,ucm_merge=info"
    }
}

/// Install the global subscriber. Logs go to stderr so stdout stays clean for
/// command output. `RUST_LOG` overrides the default filter.
pub fn init_logging(verbose: bool) -> LogHandle {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(verbose).into());
    let (filter, handle) = reload::Layer::new(env_filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    handle
}

/// Switch to debug output for a profile with `verbose = true`, unless
/// `RUST_LOG` is set.
pub fn enable_verbose(handle: &LogHandle) {
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        return;
    }
    if let Err(e) = handle.reload(EnvFilter::new(default_filter(true))) {
        tracing::warn!("Failed to raise log level: {}", e);
    }
}
