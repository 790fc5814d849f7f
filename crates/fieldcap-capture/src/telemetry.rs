use fieldcap_core::CaptureConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_FILTER: &str = "fieldcap=debug";

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// filter; production environments log JSON lines.
///
/// Returns an error instead of panicking when a subscriber is already set.
pub fn init_telemetry(
    config: &CaptureConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    if config.is_production() {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?;
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()?;
    }

    tracing::debug!(
        environment = %config.environment,
        platform = %config.platform,
        "Tracing initialized"
    );
    Ok(())
}
