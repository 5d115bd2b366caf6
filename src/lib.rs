//! # MapMerge
//!
//! Conflation tools for bringing imported buildings and address points into
//! an upstream map layer without breaking shared-vertex topology.
//!
//! ## Architecture
//!
//! MapMerge is organized as a workspace with multiple crates:
//!
//! 1. **mapmerge-core** - Identifiers, coordinates, geometry kernel, errors
//! 2. **mapmerge-graph** - Feature graph, layers, commands, history, queries
//! 3. **mapmerge-settings** - Configuration files
//! 4. **mapmerge-conflate** - Association, tag merging, conflation scripts
//! 5. **mapmerge** - Workspace documents and the command-line binary

pub mod cli;
pub mod document;

pub use mapmerge_conflate::{Conflator, OperationOutcome};
pub use mapmerge_core::{Coord, EntityId, EntityRef, Error, LayerId, Result, TagMap};
pub use mapmerge_graph::{Graph, History, TermQueryCompiler, Workspace};
pub use mapmerge_settings::Config;

pub use document::{load_workspace, save_workspace, workspace_to_json, DocumentError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Logs go to stderr so that a workspace written to stdout stays parseable.
/// `RUST_LOG` overrides the default INFO level.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
