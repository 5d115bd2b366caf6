//! Command-line interface.

use crate::document::{load_workspace, save_workspace, workspace_to_json};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mapmerge_conflate::{Conflator, OperationOutcome};
use mapmerge_core::{LayerId, OperationError};
use mapmerge_graph::{History, TermQueryCompiler, Workspace};
use mapmerge_settings::Config;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

const LONG_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_DATE"), ")");

#[derive(Parser, Debug)]
#[command(
    name = "mapmerge",
    version,
    long_version = LONG_VERSION,
    about = "Conflate imported buildings and addresses into an upstream layer"
)]
pub struct Cli {
    /// Configuration file (.toml or .json)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Workspace document to read
    #[arg(long)]
    pub input: PathBuf,

    /// Where to write the resulting workspace; stdout when omitted
    #[arg(long)]
    pub output: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Move selected buildings that overlap no building in the destination
    TransferBuildings {
        #[arg(long)]
        source: String,
        /// Defaults to the upstream layer
        #[arg(long)]
        dest: Option<String>,
    },
    /// Move selected address points the destination does not already have
    TransferAddresses {
        #[arg(long)]
        source: String,
        /// Defaults to the upstream layer
        #[arg(long)]
        dest: Option<String>,
    },
    /// Merge selected address points into the building around them
    MergeAddresses {
        /// Defaults to the active layer
        #[arg(long)]
        layer: Option<String>,
    },
    /// Replace selected buildings by points at their centroids
    ConvertBuildings {
        /// Defaults to the active layer
        #[arg(long)]
        layer: Option<String>,
    },
}

fn layer_named(ws: &Workspace, name: &str) -> Result<LayerId> {
    ws.layer_by_name(name)
        .ok_or_else(|| OperationError::LayerUnavailable { query: name.to_string() }.into())
}

fn layer_or_active(ws: &Workspace, name: Option<&str>) -> Result<LayerId> {
    match name {
        Some(name) => layer_named(ws, name),
        None => ws
            .active_layer()
            .context("the workspace has no active layer; pass --layer"),
    }
}

/// Runs one script against a workspace.
pub fn execute(
    conflator: &Conflator,
    ws: &mut Workspace,
    history: &mut History,
    command: &Command,
) -> Result<OperationOutcome> {
    let outcome = match command {
        Command::TransferBuildings { source, dest } | Command::TransferAddresses { source, dest } => {
            let source = layer_named(ws, source)?;
            let dest = match dest {
                Some(name) => layer_named(ws, name)?,
                None => conflator.upstream_layer(ws)?,
            };
            if matches!(command, Command::TransferBuildings { .. }) {
                conflator.transfer_selected_nonintersecting_buildings(ws, history, source, dest)?
            } else {
                conflator.transfer_selected_nonduplicate_addresses(ws, history, source, dest)?
            }
        }
        Command::MergeAddresses { layer } => {
            let layer = layer_or_active(ws, layer.as_deref())?;
            conflator.merge_selected_addresses_to_buildings(ws, history, layer)?
        }
        Command::ConvertBuildings { layer } => {
            let layer = layer_or_active(ws, layer.as_deref())?;
            conflator.convert_selected_buildings_to_points(ws, history, layer)?
        }
    };
    Ok(outcome)
}

/// Loads configuration and workspace, runs the command and writes the result.
pub fn run(cli: &Cli) -> Result<OperationOutcome> {
    let config = Config::load_or_default(cli.config.as_deref())?;
    let mut ws = load_workspace(&cli.input)
        .with_context(|| format!("failed to load {}", cli.input.display()))?;
    let conflator = Conflator::new(Box::new(TermQueryCompiler), &config);

    let outcome = {
        let mut history = History::global().lock();
        history.set_max_depth(config.history.max_depth);
        execute(&conflator, &mut ws, &mut history, &cli.command)?
    };

    match &outcome {
        OperationOutcome::Noop => info!("nothing to do"),
        OperationOutcome::Applied { name, affected } => info!(command = %name, affected, "done"),
    }

    match &cli.output {
        Some(path) => save_workspace(&ws, path)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", workspace_to_json(&ws)?)?;
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    fn test_parse_transfer() {
        let cli = Cli::try_parse_from([
            "mapmerge",
            "--input",
            "ws.json",
            "transfer-buildings",
            "--source",
            "import",
        ])
        .unwrap();
        assert_eq!(cli.input, PathBuf::from("ws.json"));
        assert!(cli.output.is_none());
        assert_eq!(
            cli.command,
            Command::TransferBuildings {
                source: "import".to_string(),
                dest: None
            }
        );
    }

    #[test]
    fn test_parse_merge_with_layer() {
        let cli = Cli::try_parse_from([
            "mapmerge",
            "--config",
            "c.toml",
            "--input",
            "ws.json",
            "--output",
            "out.json",
            "merge-addresses",
            "--layer",
            "import",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
        assert_eq!(
            cli.command,
            Command::MergeAddresses {
                layer: Some("import".to_string())
            }
        );
    }

    #[test]
    fn test_long_version_carries_build_date() {
        let date = crate::BUILD_DATE;
        assert_eq!(date.len(), 10);
        assert_eq!(date.split('-').count(), 3);
        assert!(LONG_VERSION.starts_with(crate::VERSION));
        assert!(LONG_VERSION.contains(date));
    }

    #[test]
    fn test_input_is_required() {
        assert!(Cli::try_parse_from(["mapmerge", "convert-buildings"]).is_err());
    }

    #[test]
    fn test_unknown_layer() {
        let mut ws = Workspace::new();
        let mut history = History::new();
        let err = execute(
            &Conflator::default(),
            &mut ws,
            &mut history,
            &Command::ConvertBuildings {
                layer: Some("nope".to_string()),
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    const WORKSPACE: &str = r#"{
      "layers": [
        {
          "name": "import",
          "active": true,
          "nodes": [
            { "id": -1, "x": 0.0, "y": 0.0 },
            { "id": -2, "x": 10.0, "y": 0.0 },
            { "id": -3, "x": 10.0, "y": 10.0 },
            { "id": -4, "x": 0.0, "y": 10.0 },
            { "id": -5, "x": 15.0, "y": 5.0, "tags": { "addr:housenumber": "10" } },
            { "id": -6, "x": 100.0, "y": 0.0 },
            { "id": -7, "x": 110.0, "y": 0.0 },
            { "id": -8, "x": 110.0, "y": 10.0 },
            { "id": -9, "x": 100.0, "y": 10.0 }
          ],
          "ways": [
            { "id": -10, "nodes": [-1, -2, -3, -4, -1], "tags": { "building": "yes" } },
            { "id": -11, "nodes": [-6, -7, -8, -9, -6], "tags": { "building": "house" } }
          ],
          "selected": [
            { "type": "node", "ref": -5 },
            { "type": "way", "ref": -11 }
          ]
        },
        { "name": "osm", "origin": "openstreetmap-cgimap 2.0.1" }
      ]
    }"#;

    fn setup(config: &str) -> (TempDir, std::path::PathBuf, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("workspace.json");
        std::fs::write(&input, WORKSPACE).unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, config).unwrap();
        (dir, input, config_path)
    }

    fn cli(config: &Path, input: &Path, output: &Path, command: &[&str]) -> Cli {
        let mut args = vec![
            "mapmerge".to_string(),
            "--config".to_string(),
            config.display().to_string(),
            "--input".to_string(),
            input.display().to_string(),
            "--output".to_string(),
            output.display().to_string(),
        ];
        args.extend(command.iter().map(|s| s.to_string()));
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_run_merge_addresses_writes_result() {
        let (dir, input, config) = setup("");
        let output = dir.path().join("out/merged.json");

        let outcome = run(&cli(&config, &input, &output, &["merge-addresses"])).unwrap();
        assert_eq!(
            outcome,
            OperationOutcome::Applied {
                name: "Merge selected addresses to buildings".to_string(),
                affected: 1,
            }
        );

        let ws = load_workspace(&output).unwrap();
        let graph = ws.graph(ws.layer_by_name("import").unwrap()).unwrap();
        let buildings: Vec<_> = graph
            .polylines()
            .filter(|p| p.tags.get("addr:housenumber").map(String::as_str) == Some("10"))
            .collect();
        assert_eq!(buildings.len(), 1);
        assert_eq!(buildings[0].tags["building"], "yes");
        assert!(graph.vertices().all(|v| v.tags.is_empty()));
    }

    #[test]
    fn test_configured_distance_limits_merge() {
        let (dir, input, config) = setup("[conflation]\nmerge_distance = 2.0\n");
        let output = dir.path().join("merged.json");

        let outcome = run(&cli(&config, &input, &output, &["merge-addresses", "--layer", "import"])).unwrap();
        assert!(outcome.is_noop());

        let ws = load_workspace(&output).unwrap();
        let graph = ws.graph(ws.layer_by_name("import").unwrap()).unwrap();
        assert_eq!(graph.len(), 11);
    }

    #[test]
    fn test_transfer_buildings_to_upstream() {
        let (dir, input, config) = setup("");
        let output = dir.path().join("transferred.json");

        let outcome = run(&cli(
            &config,
            &input,
            &output,
            &["transfer-buildings", "--source", "import"],
        ))
        .unwrap();
        assert_eq!(
            outcome,
            OperationOutcome::Applied {
                name: "Transfer".to_string(),
                affected: 1,
            }
        );

        let ws = load_workspace(&output).unwrap();
        let osm = ws.layer_by_name("osm").unwrap();
        assert_eq!(ws.active_layer(), Some(osm));
        let dest = ws.graph(osm).unwrap();
        assert_eq!(dest.polylines().count(), 1);
        assert_eq!(dest.vertices().count(), 4);
        assert_eq!(dest.polylines().next().unwrap().tags["building"], "house");
        let source = ws.graph(ws.layer_by_name("import").unwrap()).unwrap();
        assert_eq!(source.polylines().count(), 1);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let (dir, input, config) = setup("[conflation]\nmerge_distance = -1.0\n");
        let output = dir.path().join("never.json");

        assert!(run(&cli(&config, &input, &output, &["convert-buildings"])).is_err());
        assert!(!output.exists());
    }
}
