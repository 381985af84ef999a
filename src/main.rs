use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use sigil_component::Param;
use sigil_config::{EffectRecord, RunnerConfig};
use sigil_effect::{ChannelNotifier, EffectRunner, SingleEffect};
use sigil_registry::TypeRegistry;
use tokio_util::sync::CancellationToken;

mod demo;

/// Sigil - typed component graphs for game effects
#[derive(Parser)]
#[command(name = "sigil")]
#[command(version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Build the sample graph and print its record (or its validation failures)
  Demo {
    /// Write the record here instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,

    /// Leave one slot unwired to see the failure report
    #[arg(long)]
    incomplete: bool,
  },

  /// Restore a record and fire it once
  Fire {
    /// Path to the effect record (JSON)
    record_file: PathBuf,

    /// Trigger values as a JSON array, typed in the trigger's declared order
    #[arg(long, default_value = "[]")]
    values: String,
  },

  /// Print the combined description of a record
  Describe {
    /// Path to the effect record (JSON)
    record_file: PathBuf,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let registry = Arc::new(demo::registry().context("failed to build the demo registry")?);

  match cli.command {
    Some(Commands::Demo { out, incomplete }) => run_demo(registry, out, incomplete)?,
    Some(Commands::Fire {
      record_file,
      values,
    }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(async { fire(&registry, &record_file, &values).await })?;
    }
    Some(Commands::Describe { record_file }) => describe(&registry, &record_file)?,
    None => {
      println!("sigil - use --help to see available commands");
    }
  }

  Ok(())
}

fn run_demo(registry: Arc<TypeRegistry>, out: Option<PathBuf>, incomplete: bool) -> Result<()> {
  let mut combination = demo::combination(registry, incomplete)?;

  if combination.check().is_err() {
    for failure in combination.failures() {
      eprintln!("  {failure}");
    }
    bail!(
      "sample graph has {} failing component(s)",
      combination.failures().len()
    );
  }

  let effect = combination
    .get_result()
    .context("failed to produce the sample graph")?;
  let json = serde_json::to_string_pretty(&effect.to_record())?;

  match out {
    Some(path) => {
      std::fs::write(&path, json)
        .with_context(|| format!("failed to write record: {}", path.display()))?;
      eprintln!("Wrote record to {}", path.display());
    }
    None => println!("{json}"),
  }
  Ok(())
}

fn load(registry: &TypeRegistry, record_file: &Path) -> Result<SingleEffect> {
  let content = std::fs::read_to_string(record_file)
    .with_context(|| format!("failed to read record file: {}", record_file.display()))?;
  let record: EffectRecord = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse record file: {}", record_file.display()))?;
  SingleEffect::from_record(&record, registry, &[])
    .with_context(|| format!("failed to restore effect graph: {}", record.effect_id))
}

async fn fire(registry: &TypeRegistry, record_file: &Path, values: &str) -> Result<()> {
  let effect = load(registry, record_file)?;
  let raw: Vec<serde_json::Value> =
    serde_json::from_str(values).context("trigger values must be a JSON array")?;

  let types = effect
    .trigger()
    .map(|trigger| trigger.kind().provided_types())
    .unwrap_or_default();
  if raw.len() != types.len() {
    bail!(
      "trigger expects {} value(s), got {}",
      types.len(),
      raw.len()
    );
  }
  let trigger_values: Vec<Param> = types
    .into_iter()
    .zip(raw)
    .map(|(ty, value)| Param::new(ty, value))
    .collect();

  effect.init();
  let (notifier, mut outcomes) = ChannelNotifier::new();
  let runner = EffectRunner::new(Arc::new(effect), RunnerConfig::default())
    .with_notifier(Arc::new(notifier));
  runner
    .fire(trigger_values)
    .await
    .context("failed to queue the firing")?;
  runner.start(CancellationToken::new()).await;

  while let Ok(outcome) = outcomes.try_recv() {
    println!("{outcome:#?}");
  }
  Ok(())
}

fn describe(registry: &TypeRegistry, record_file: &Path) -> Result<()> {
  let effect = load(registry, record_file)?;
  match effect.describe() {
    Some(description) => println!("{description}"),
    None => eprintln!("{} has no description combiner", effect.effect_id()),
  }
  Ok(())
}
