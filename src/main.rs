use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use vk_layer_gen::config::Config;
use vk_layer_gen::gen::{Generator, Target};
use vk_layer_gen::{model, FatalError, Registry};

/// Generates Vulkan interception layer sources from registry documents.
#[derive(Debug, Parser)]
#[command(name = "vk-layer-gen", version)]
struct Cli {
    /// Output to generate: cpp, hpp, struct_json_hpp or struct_json_cpp.
    /// Repeat to select several; all outputs are written when omitted.
    #[arg(short, long = "target", value_name = "TARGET")]
    targets: Vec<Target>,

    /// TOML file overriding the built-in generation options.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Also write the resolved model as RON.
    #[arg(long, value_name = "FILE")]
    dump_model: Option<PathBuf>,

    /// Directory receiving the generated files.
    #[arg(short, long, value_name = "DIR")]
    output: PathBuf,

    /// Registry documents, merged in the given order.
    #[arg(required = true, value_name = "REGISTRY")]
    registries: Vec<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?,
        None => Config::default(),
    };

    let mut registry = Registry::default();
    for path in &cli.registries {
        let document = vk_layer_gen::parse_file(path)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        info!(path = %path.display(), "parsed registry");
        registry.extend(document);
    }

    let model = model::build(&registry, &config).map_err(FatalError::from)?;
    info!(
        commands = model.commands.len(),
        structs = model.structs.len(),
        "built model"
    );

    if let Some(path) = &cli.dump_model {
        dump_model(&model, path)?;
    }

    let targets = if cli.targets.is_empty() {
        Target::ALL.to_vec()
    } else {
        cli.targets.clone()
    };
    Generator::new(&model, &config)
        .write_targets(&targets, &cli.output)
        .with_context(|| format!("failed to write outputs to {}", cli.output.display()))?;

    Ok(())
}

#[cfg(feature = "serialize")]
fn dump_model(model: &model::Model, path: &Path) -> Result<()> {
    let text = ron::ser::to_string_pretty(
        model,
        ron::ser::PrettyConfig::new().indentor(String::from("\t")),
    )
    .context("failed to serialize model")?;
    std::fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "wrote model");
    Ok(())
}

#[cfg(not(feature = "serialize"))]
fn dump_model(_model: &model::Model, _path: &Path) -> Result<()> {
    anyhow::bail!("--dump-model requires the `serialize` feature")
}
