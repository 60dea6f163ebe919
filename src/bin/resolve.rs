use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use schema_loom::{resolve_schemas_detailed, Granularity, ResolveOptions, SchemaSource};

#[derive(Parser)]
#[command(name = "schema-loom")]
#[command(about = "Resolve interdependent schema definition files into an emission order")]
struct Cli {
    /// Directory containing .avsc/.avpr definition files
    #[arg(default_value = ".")]
    schema_dir: PathBuf,

    /// Options file (TOML); flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Graph granularity: "document" or "type"
    #[arg(short, long)]
    granularity: Option<String>,

    /// Parser worker pool size
    #[arg(short, long)]
    workers: Option<usize>,

    /// Write the dependency graph in GraphViz DOT format to this path
    #[arg(long)]
    dot: Option<PathBuf>,

    /// Emit the full report as JSON on stdout
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut options = match &cli.config {
        Some(path) => ResolveOptions::from_file(path)
            .with_context(|| format!("loading options from {}", path.display()))?,
        None => ResolveOptions::default(),
    };
    if let Some(granularity) = &cli.granularity {
        options.granularity = match granularity.as_str() {
            "document" => Granularity::Document,
            "type" => Granularity::Type,
            other => anyhow::bail!(
                "unknown granularity {:?} (expected \"document\" or \"type\")",
                other
            ),
        };
    }
    if let Some(workers) = cli.workers {
        options.workers = workers.max(1);
    }

    let sources = discover_sources(&cli.schema_dir)?;
    if sources.is_empty() {
        anyhow::bail!(
            "no .avsc or .avpr files found under {}",
            cli.schema_dir.display()
        );
    }

    let (report, graph) = resolve_schemas_detailed(&sources, &options);

    if let Some(path) = &cli.dot {
        std::fs::write(path, graph.to_dot())
            .with_context(|| format!("writing {}", path.display()))?;
        eprintln!("wrote dependency graph to {}", path.display());
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for diagnostic in &report.diagnostics {
            eprintln!("{}", diagnostic);
        }
        match &report.plan {
            Some(plan) => {
                println!("emission order ({} nodes, input hash {}):", plan.len(), &report.content_hash[..12]);
                for (index, name) in plan.order.iter().enumerate() {
                    println!("{:4}. {}", index + 1, name);
                }
            }
            None => {
                eprintln!(
                    "no emission plan: {} error(s)",
                    report.diagnostics.errors().count()
                );
            }
        }
    }

    Ok(if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Walk the schema directory and collect definition files, classified by
/// extension. Sorted traversal keeps source ids stable across platforms;
/// the emission order itself never depends on it.
fn discover_sources(root: &Path) -> anyhow::Result<Vec<SchemaSource>> {
    let mut sources = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if extension != "avsc" && extension != "avpr" {
            continue;
        }
        let id = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        sources.push(SchemaSource::new(id, text));
    }
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn discovery_picks_up_definition_files_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.avsc"),
            r#"{"type": "record", "name": "ns.A", "fields": []}"#,
        )
        .unwrap();
        fs::write(dir.path().join("service.avpr"), r#"{"protocol": "P"}"#).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

        let sources = discover_sources(dir.path()).unwrap();
        let ids: Vec<&str> = sources.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a.avsc", "service.avpr"]);
    }

    #[test]
    fn discovery_recurses_into_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(
            dir.path().join("nested/b.avsc"),
            r#"{"type": "record", "name": "ns.B", "fields": []}"#,
        )
        .unwrap();

        let sources = discover_sources(dir.path()).unwrap();
        assert_eq!(sources[0].id, "nested/b.avsc");
    }
}
