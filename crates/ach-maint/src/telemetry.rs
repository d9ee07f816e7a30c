use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` wins over `default_filter`.
pub fn init(default_filter: &str, json: bool) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_filter))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder
            .json()
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install subscriber: {e}"))
    } else {
        builder
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install subscriber: {e}"))
    }
}
