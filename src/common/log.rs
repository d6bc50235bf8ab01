use tracing::trace;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_tree::HierarchicalLayer;

const DEFAULT_FILTER: &str = "warn,panel_tiler=info";

/// Installs the global subscriber. `RUST_LOG` overrides the default filter.
/// If a subscriber is already installed it stays in place.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(
            HierarchicalLayer::default()
                .with_indent_amount(2)
                .with_indent_lines(true)
                .with_targets(true),
        )
        .try_init();
    if let Err(err) = installed {
        trace!(%err, "keeping the existing global subscriber");
    }
}
