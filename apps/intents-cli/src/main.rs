use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use intent_model::{Expression, Intents, IntentsBuilder, SlotList};

#[derive(Parser, Debug)]
#[command(
    name = "intents",
    version,
    about = "Inspect intent definition files",
    disable_help_subcommand = true
)]
struct Cli {
    /// Treat every list value as literal text
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    no_templates: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Merge and build the files, then print a summary
    Check {
        /// YAML files, merged in order
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print an intent's sentences in match-priority order
    Sentences {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Intent name
        #[arg(long)]
        intent: String,
    },
    /// Resolve an entity list and print the surviving values as JSON lines
    Filter {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Entity list name
        #[arg(long)]
        list: String,
    },
}

fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { files } => check(&load(&files, cli.no_templates)?),
        Commands::Sentences { files, intent } => {
            sentences(&load(&files, cli.no_templates)?, &intent)
        }
        Commands::Filter { files, list } => filter(&load(&files, cli.no_templates)?, &list),
    }
}

fn setup_tracing() {
    // Best-effort; avoid panics if already set
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn load(files: &[PathBuf], no_templates: bool) -> Result<Intents> {
    let doc = intent_model::load_files(files).context("loading intent files")?;
    let intents = IntentsBuilder::default()
        .allow_template(!no_templates)
        .build(doc)
        .context("building intents")?;
    info!(files = files.len(), language = %intents.language, "loaded intents");
    Ok(intents)
}

fn check(intents: &Intents) -> Result<()> {
    println!("language: {}", intents.language);
    println!("ignore_whitespace: {}", intents.settings.ignore_whitespace);
    println!("skip_words: {}", intents.skip_words.len());
    println!("expansion_rules: {}", intents.expansion_rules.len());

    let mut names: Vec<_> = intents.intents.keys().collect();
    names.sort();
    println!("intents: {}", names.len());
    for name in names {
        let intent = &intents.intents[name];
        let sentence_count: usize = intent.data.iter().map(|d| d.sentence_texts.len()).sum();
        for data in &intent.data {
            data.sentences()
                .with_context(|| format!("parsing sentences of {name}"))?;
        }
        println!(
            "  {name}\tblocks={}\tsentences={sentence_count}",
            intent.data.len()
        );
    }

    let mut lists: Vec<_> = intents.slot_lists.iter().collect();
    lists.sort_by(|a, b| a.0.cmp(b.0));
    println!("lists: {}", lists.len());
    for (name, list) in lists {
        let detail = match list {
            SlotList::Text(text) => format!("values={}", text.len()),
            SlotList::Range(range) => format!(
                "from={} to={} step={} type={:?}",
                range.start(),
                range.stop(),
                range.step(),
                range.range_type()
            ),
            SlotList::Wildcard(_) => String::new(),
            SlotList::Entity(entity) => format!(
                "target={} filters={}",
                entity.target_name,
                entity.filters.len()
            ),
        };
        println!("  {name}\t{}\t{detail}", list.kind_name());
    }
    Ok(())
}

fn sentences(intents: &Intents, intent_name: &str) -> Result<()> {
    let intent = intents
        .intents
        .get(intent_name)
        .ok_or_else(|| anyhow::anyhow!("intent not found: {intent_name}"))?;
    for (index, data) in intent.data.iter().enumerate() {
        println!("# block {index}");
        for sentence in data.sentences()? {
            println!("{}", sentence.text.as_deref().unwrap_or_default());
        }
    }
    Ok(())
}

fn filter(intents: &Intents, list_name: &str) -> Result<()> {
    let filtered = intents
        .resolve_entity_list(list_name)
        .with_context(|| format!("resolving entity list {list_name}"))?;
    for value in &filtered.values {
        let text_in = match &value.text_in {
            Expression::Text(chunk) => serde_json::Value::String(chunk.text.clone()),
            _ => serde_json::Value::Null,
        };
        let line = serde_json::json!({
            "in": text_in,
            "out": serde_json::to_value(&value.value_out)?,
            "context": serde_json::to_value(&value.context)?,
        });
        println!("{line}");
    }
    info!(list = list_name, values = filtered.len(), "filtered entity list");
    Ok(())
}
