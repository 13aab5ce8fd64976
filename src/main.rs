use anyhow::{Context, Result};
use clap::Parser;
use class_enhancer::agent::AgentTransformer;
use class_enhancer::builder::{BuildOrchestrator, BuildRequest, ResourceDelta};
use class_enhancer::classpath::resolve_classpath;
use class_enhancer::cli::{Cli, Commands};
use class_enhancer::config::EnhancerConfig;
use class_enhancer::probe;
use class_enhancer::transform::CombinedTransform;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let project_root = resolve_project_root(&cli)?;
    let config = EnhancerConfig::load_for_project(&project_root, cli.config.as_deref())?;

    match cli.command.clone() {
        Commands::Probe { class_file } => {
            let bytes = std::fs::read(&class_file)
                .with_context(|| format!("Failed to read class file: {}", class_file.display()))?;
            println!("{}", probe::class_name(&bytes)?);
        }
        Commands::Classpath => {
            let entries = resolve_classpath(&project_root, &config)?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        Commands::Build { full, delta } => {
            let transform = build_transform(&config)?;
            let request = build_request(full, delta.as_deref())?;
            let mut orchestrator = BuildOrchestrator::new(project_root, config, transform);
            let summary = orchestrator.run(&request)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_project_root(cli: &Cli) -> Result<PathBuf> {
    match cli.project.clone() {
        Some(p) => Ok(p),
        None => std::env::current_dir().context("Failed to resolve current directory"),
    }
}

fn build_transform(config: &EnhancerConfig) -> Result<CombinedTransform> {
    let entity_jar = config
        .agents
        .entity_jar
        .clone()
        .context("agents.entity-jar is not configured")?;
    let query_bean_jar = config
        .agents
        .query_bean_jar
        .clone()
        .context("agents.query-bean-jar is not configured")?;

    let debug = config.debug.enhance;
    Ok(CombinedTransform::new(
        Box::new(AgentTransformer::entity(entity_jar, debug)),
        Box::new(AgentTransformer::query_bean(query_bean_jar, debug)),
    ))
}

fn build_request(full: bool, delta: Option<&Path>) -> Result<BuildRequest> {
    if full {
        return Ok(BuildRequest::full());
    }
    match delta {
        Some(path) => Ok(BuildRequest::incremental(Some(ResourceDelta::from_json_file(
            path,
        )?))),
        // no change-set available: the orchestrator falls back to full
        None => Ok(BuildRequest::incremental(None)),
    }
}
