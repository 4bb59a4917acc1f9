use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use nlp_insights_core::{discover_insights, NlpConfig, NlpServiceRegistry, RegistrySettings};
use nlp_insights_nlp::{DictionaryAnnotator, PrecomputedNlpService};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nlp-insights")]
#[command(about = "Discover NLP insights in FHIR resources")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive and enrich resources; prints the response JSON
    #[command(group(ArgGroup::new("nlp").required(true).multiple(true).args(["nlp_response", "dictionary"])))]
    Discover {
        /// FHIR resource or bundle (JSON)
        #[arg(long)]
        resource: PathBuf,
        /// Precomputed NLP response (ACD container or QuickUMLS match list)
        #[arg(long)]
        nlp_response: Option<PathBuf>,
        /// Dictionary annotator definition (JSON)
        #[arg(long)]
        dictionary: Option<PathBuf>,
        /// Registry settings: default service, overrides, insight id start
        #[arg(long)]
        settings: Option<PathBuf>,
        /// Configuration preset for the dictionary annotator
        #[arg(long, value_enum, default_value_t = Preset::QuickUmls)]
        dictionary_preset: Preset,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Preset {
    Acd,
    QuickUmls,
}

impl From<Preset> for NlpConfig {
    fn from(preset: Preset) -> Self {
        match preset {
            Preset::Acd => NlpConfig::acd(),
            Preset::QuickUmls => NlpConfig::quick_umls(),
        }
    }
}

fn read(path: &PathBuf) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Discover {
            resource,
            nlp_response,
            dictionary,
            settings,
            dictionary_preset,
        } => {
            let mut registry = NlpServiceRegistry::new();

            if let Some(path) = &dictionary {
                let annotator = DictionaryAnnotator::from_json(&read(path)?)
                    .with_context(|| format!("parsing dictionary {}", path.display()))?;
                let name = annotator.name.clone();
                registry.register(Arc::new(annotator), dictionary_preset.into());
                registry.set_default(&name)?;
            }

            if let Some(path) = &nlp_response {
                let raw = read(path)?;
                let config = if raw.trim_start().starts_with('[') {
                    NlpConfig::quick_umls()
                } else {
                    NlpConfig::acd()
                };
                let service = PrecomputedNlpService::from_json("precomputed", &raw)
                    .with_context(|| format!("parsing NLP response {}", path.display()))?;
                registry.register(Arc::new(service), config);
                registry.set_default("precomputed")?;
            }

            if let Some(path) = &settings {
                let settings = RegistrySettings::load(path)
                    .with_context(|| format!("loading settings {}", path.display()))?;
                registry.apply_settings(&settings)?;
            }

            info!(services = ?registry.names().collect::<Vec<_>>(), "registry ready");

            let payload = read(&resource)?;
            let outcome = discover_insights(&registry, &payload)?;
            println!("{}", outcome.to_json()?);
        }
    }

    Ok(())
}
