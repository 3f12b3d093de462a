use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, registry};
use tracing_tree::HierarchicalLayer;

const DEFAULT_DIRECTIVES: &str = "canopy_wm=info,canopy=info,warn";

/// Installs the global subscriber. `RUST_LOG` overrides the default filter.
/// Calling this again is a no-op.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "canopy_wm=debug,canopy=debug,info" } else { DEFAULT_DIRECTIVES };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let tree = HierarchicalLayer::default()
        .with_writer(std::io::stderr)
        .with_indent_lines(true)
        .with_targets(true)
        .with_bracketed_fields(true);
    let _ = registry().with(filter).with(tree).try_init();
}
