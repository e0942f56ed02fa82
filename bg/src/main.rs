//! bookgraph - CLI entry point

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info};

use bookgraph::catalog::{self, BookSearch};
use bookgraph::cli::{Cli, Command};
use bookgraph::config::Config;
use bookgraph::llm::{self, SYSTEM_PROMPT};
use bookgraph::orchestrator::{Orchestrator, generate_graph};
use bookgraph::render::{self, MermaidRenderer, TrustedSvg};
use bookgraph::tui;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bookgraph")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("bookgraph.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(model = %config.llm.model, catalog = %config.catalog.base_url, "bookgraph loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Search { query }) => {
            debug!(%query, "main: matched Search command");
            cmd_search(&config, &query).await
        }
        Some(Command::Generate { title, output }) => {
            debug!(%title, ?output, "main: matched Generate command");
            cmd_generate(&config, &title, output.as_deref()).await
        }
        Some(Command::Render { file, output }) => {
            debug!(?file, ?output, "main: matched Render command");
            cmd_render(&config, &file, output.as_deref())
        }
        Some(Command::Prompt) => {
            debug!("main: matched Prompt command");
            println!("{}", SYSTEM_PROMPT);
            Ok(())
        }
        None => {
            debug!("main: no command, launching TUI");
            cmd_tui(&config).await
        }
    }
}

/// Launch the interactive TUI
async fn cmd_tui(config: &Config) -> Result<()> {
    let search = catalog::create_client(&config.catalog).context("Failed to create book search client")?;
    let generator = llm::create_client(&config.llm).context("Failed to create graph generator")?;
    let renderer = render::create_renderer(config.renderer());

    let orchestrator_config = config.orchestrator();
    let min_query_len = orchestrator_config.min_query_len;
    let (handle, task) = Orchestrator::spawn(orchestrator_config, search, generator, renderer);

    let result = tui::run(handle, min_query_len).await;

    // The TUI sent shutdown (or the orchestrator already stopped); wait for teardown
    if let Err(e) = task.await {
        debug!(error = %e, "cmd_tui: orchestrator task ended abnormally");
    }
    result
}

/// One-shot book lookup
async fn cmd_search(config: &Config, query: &str) -> Result<()> {
    let search = catalog::create_client(&config.catalog).context("Failed to create book search client")?;
    let candidates = search.search(query).await.context("Book search failed")?;

    if candidates.is_empty() {
        println!("{}", "No Result!".dimmed());
        return Ok(());
    }

    for candidate in candidates {
        if candidate.authors.is_empty() {
            println!("{}", candidate.title.bold());
        } else {
            println!("{} — {}", candidate.title.bold(), candidate.authors_display().cyan());
        }
    }
    Ok(())
}

/// One-shot generate, render and sanitize
async fn cmd_generate(config: &Config, title: &str, output: Option<&Path>) -> Result<()> {
    let generator = llm::create_client(&config.llm).context("Failed to create graph generator")?;
    let renderer = render::create_renderer(config.renderer());

    eprintln!("{} {}", "Generating graph for".dimmed(), title.bold());
    let graph = generate_graph(generator.as_ref(), renderer.as_ref(), title)
        .await
        .with_context(|| format!("Graph generation failed for '{}'", title))?;

    eprintln!(
        "{} {} nodes, {} edges",
        "Done:".green().bold(),
        graph.node_count,
        graph.edge_count
    );
    write_output(graph.visual.as_str(), output)
}

/// Render a local diagram file without any network access
fn cmd_render(config: &Config, file: &Path, output: Option<&Path>) -> Result<()> {
    let source = fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;

    let renderer = MermaidRenderer::new(config.renderer());
    let render_id = file
        .file_stem()
        .and_then(|s| s.to_str())
        .map(|s| format!("graph_{}", s.replace(|c: char| !c.is_ascii_alphanumeric(), "_")))
        .unwrap_or_else(|| "graph".to_string());

    let rendered = renderer
        .render_source(&render_id, &source)
        .with_context(|| format!("Failed to render {}", file.display()))?;
    let svg = TrustedSvg::sanitize(&rendered.svg).context("Rendered markup failed sanitization")?;

    write_output(svg.as_str(), output)
}

fn write_output(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, svg).with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("{} {}", "Wrote".green(), path.display());
        }
        None => println!("{}", svg),
    }
    Ok(())
}
