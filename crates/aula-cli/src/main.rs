use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use aula_core::{AulaConfig, Engine};
use aula_memory::ConversationStore;
use aula_schema::{ConversationKey, InboundTurn};

#[derive(Parser)]
#[command(name = "aula", version, about = "aula university assistant")]
struct Cli {
    #[arg(long, default_value = "aula.yaml", help = "Path to the config file")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Local REPL for testing (no channel connector needed)")]
    Chat {
        #[arg(long, default_value = "local", help = "Conversation scope to use")]
        conversation: String,
    },
    #[command(about = "Validate the config file")]
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let Cli { config, command } = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let Some(command) = command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    match command {
        Commands::Validate => {
            let config = AulaConfig::load(&config)?;
            println!(
                "Config valid. store_path={} recognizer={} knowledge_base={} notifier={}",
                config.store_path,
                configured(config.recognizer.is_some()),
                configured(config.knowledge_base.is_some()),
                configured(config.notifier.is_some()),
            );
        }
        Commands::Chat { conversation } => {
            run_repl(&config, &conversation).await?;
        }
    }

    Ok(())
}

fn configured(present: bool) -> &'static str {
    if present {
        "configured"
    } else {
        "absent"
    }
}

/// Missing config file means an all-defaults setup: in-process state store
/// path, null external services, degraded routing.
fn load_or_default(path: &Path) -> Result<AulaConfig> {
    if path.exists() {
        AulaConfig::load(path)
    } else {
        tracing::info!(path = %path.display(), "no config file, using defaults");
        Ok(AulaConfig::default())
    }
}

async fn run_repl(config_path: &Path, conversation: &str) -> Result<()> {
    let config = load_or_default(config_path)?;
    let store = ConversationStore::open(&config.store_path)?;
    let engine = Engine::new(store, config.build_services()?);
    let key = ConversationKey::new("repl", conversation);

    println!("aula REPL. Type 'quit' to exit.");
    println!("---");

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let mut input = String::new();
        if stdin.read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input == "quit" || input == "exit" {
            break;
        }
        if input.is_empty() {
            continue;
        }

        let turn = InboundTurn::new(key.clone(), input);
        match engine.process_turn(&turn).await {
            Ok(output) => {
                for reply in &output.replies {
                    println!("{}", reply.text);
                    if !reply.suggested_replies.is_empty() {
                        println!("  [{}]", reply.suggested_replies.join(" | "));
                    }
                }
            }
            Err(err) => eprintln!("Error: {err:#}"),
        }
    }

    Ok(())
}
