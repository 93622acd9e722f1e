//! # kb CLI
//!
//! The `kb` binary drives the knowledge-base service from the shell: query
//! and save through the configured backend, maintain the feature diagram,
//! manage markdown knowledge files, and start the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! kb --config ./config/kb.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `kb query "<text>"` | Query the backend (blocking, retried) |
//! | `kb save "<text>"` | Save text to the backend |
//! | `kb ask "<text>"` | Query through the agent facade |
//! | `kb remember "<text>"` | Save to the graph and markdown files |
//! | `kb features show` | Print the feature diagram |
//! | `kb features update <name> <description>` | Merge a feature into the diagram |
//! | `kb markdown save/get/list/delete` | Manage markdown knowledge |
//! | `kb serve` | Start the HTTP server |
//! | `kb completions <shell>` | Print shell completions |

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use kb_service::config::{self, Config};
use kb_service::markdown::KnowledgeType;
use kb_service::service::{KnowledgeBaseService, SaveKnowledge};
use kb_service::{bridge, logging, server};
use kb_service_core::{Domain, QueryOptions};

/// kb: a knowledge-base service for AI agents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. Environment variables override file values.
#[derive(Parser)]
#[command(
    name = "kb",
    about = "Knowledge-base service with pluggable RAG-server and graph backends",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). A missing file means defaults.
    #[arg(long, global = true, default_value = "./config/kb.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query the configured backend.
    Query {
        text: String,

        /// Retrieval mode (`local`, `global`, `hybrid`, `naive`, `mix`,
        /// `bypass` for the RAG server; `deep` or `broad` for the graph).
        #[arg(long)]
        mode: Option<String>,

        /// Number of top items to retrieve.
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Save text to the configured backend.
    Save {
        text: String,

        /// Episode name for the graph backend.
        #[arg(long)]
        name: Option<String>,

        /// `tech` or `business`.
        #[arg(long, default_value = "business")]
        domain: Domain,
    },

    /// Query through the agent facade; errors are printed as text.
    Ask { text: String },

    /// Save knowledge to the graph and to markdown files.
    Remember {
        text: String,

        /// Feature path, e.g. `payments/checkout`.
        #[arg(long, default_value = "general")]
        feature: String,

        /// `business` or `technical`.
        #[arg(long = "type", default_value = "business")]
        knowledge_type: KnowledgeType,

        /// Markdown file name instead of the knowledge type.
        #[arg(long)]
        source_id: Option<String>,

        #[arg(long)]
        no_markdown: bool,

        #[arg(long)]
        no_graph: bool,
    },

    /// Feature-hierarchy diagram.
    Features {
        #[command(subcommand)]
        action: FeaturesAction,
    },

    /// Markdown knowledge files.
    Markdown {
        #[command(subcommand)]
        action: MarkdownAction,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,

    /// Print shell completions to stdout.
    Completions { shell: Shell },
}

#[derive(Subcommand)]
enum FeaturesAction {
    /// Print the current diagram.
    Show,
    /// Ask the completion model to merge a feature into the diagram.
    Update {
        name: String,
        description: String,
        /// Parent node; the feature goes at root level when omitted.
        #[arg(long)]
        parent: Option<String>,
    },
}

#[derive(Subcommand)]
enum MarkdownAction {
    /// Write a markdown knowledge file without touching the graph.
    Save {
        text: String,
        feature: String,
        #[arg(long = "type", default_value = "business")]
        knowledge_type: KnowledgeType,
        #[arg(long)]
        source_id: Option<String>,
    },
    Get {
        team: String,
        feature: String,
        #[arg(long = "type", default_value = "business")]
        knowledge_type: KnowledgeType,
    },
    List {
        #[arg(long)]
        team: Option<String>,
    },
    /// Delete one knowledge file, or the whole feature without `--type`.
    Delete {
        team: String,
        feature: String,
        #[arg(long = "type")]
        knowledge_type: Option<KnowledgeType>,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "kb", &mut std::io::stdout());
        return Ok(ExitCode::SUCCESS);
    }

    let cfg = config::load_config(&cli.config)?;
    logging::init(&cfg.logging);

    if let Commands::Serve = cli.command {
        bridge::runtime().block_on(server::run_server(&cfg))?;
        return Ok(ExitCode::SUCCESS);
    }

    let service = KnowledgeBaseService::new(&cfg)?;
    run(cli.command, &cfg, &service)
}

fn run(
    command: Commands,
    cfg: &Config,
    service: &KnowledgeBaseService,
) -> anyhow::Result<ExitCode> {
    let rt = bridge::runtime();

    match command {
        Commands::Query { text, mode, top_k } => {
            let options = QueryOptions {
                top_k,
                ..QueryOptions::default()
            };
            let response = service.graph().query(&text, mode.as_deref(), &options);
            if !response.is_success() {
                eprintln!("Error: {}", response.error_message.unwrap_or_default());
                return Ok(ExitCode::FAILURE);
            }
            println!("{}", response.response);
        }
        Commands::Save { text, name, domain } => {
            let response = service.graph().save(&text, name.as_deref(), domain);
            println!("{}", serde_json::to_string_pretty(&response)?);
            if !response.is_success() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Ask { text } => {
            println!("{}", rt.block_on(service.query_knowledge(&text)));
        }
        Commands::Remember {
            text,
            feature,
            knowledge_type,
            source_id,
            no_markdown,
            no_graph,
        } => {
            let request = SaveKnowledge {
                feature,
                knowledge_type,
                source_id,
                save_to_markdown: !no_markdown,
                save_to_graph: !no_graph,
                ..SaveKnowledge::new(text)
            };
            if !rt.block_on(service.save_knowledge(&request)) {
                eprintln!("Failed to save knowledge.");
                return Ok(ExitCode::FAILURE);
            }
            println!("Knowledge saved.");
        }
        Commands::Features { action } => match action {
            FeaturesAction::Show => {
                let diagram = service.get_features_list();
                if diagram.is_empty() {
                    eprintln!("No features list at {}", cfg.features.path.display());
                    return Ok(ExitCode::FAILURE);
                }
                println!("{}", diagram);
            }
            FeaturesAction::Update {
                name,
                description,
                parent,
            } => {
                let response = rt.block_on(service.update_features_list(
                    &name,
                    &description,
                    parent.as_deref(),
                ));
                println!("{}", response.message);
                if !response.is_success() {
                    return Ok(ExitCode::FAILURE);
                }
            }
        },
        Commands::Markdown { action } => match action {
            MarkdownAction::Save {
                text,
                feature,
                knowledge_type,
                source_id,
            } => {
                let path = service.markdown().save(
                    &text,
                    &feature,
                    knowledge_type,
                    source_id.as_deref(),
                )?;
                println!("{}", path.display());
            }
            MarkdownAction::Get {
                team,
                feature,
                knowledge_type,
            } => {
                let body = service.get_markdown_knowledge(&team, &feature, knowledge_type)?;
                if body.is_empty() {
                    eprintln!("No {} knowledge for {}/{}", knowledge_type, team, feature);
                    return Ok(ExitCode::FAILURE);
                }
                println!("{}", body);
            }
            MarkdownAction::List { team } => {
                let features = service.list_markdown_features(team.as_deref())?;
                println!("{}", serde_json::to_string_pretty(&features)?);
            }
            MarkdownAction::Delete {
                team,
                feature,
                knowledge_type,
            } => {
                if !service.delete_markdown_knowledge(&team, &feature, knowledge_type)? {
                    eprintln!("Nothing to delete for {}/{}", team, feature);
                    return Ok(ExitCode::FAILURE);
                }
                println!("Deleted.");
            }
        },
        Commands::Serve | Commands::Completions { .. } => unreachable!("handled in main"),
    }

    Ok(ExitCode::SUCCESS)
}
