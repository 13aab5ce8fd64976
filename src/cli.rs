use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "class-enhancer")]
#[command(about = "Enhance compiled entity and query-bean class files as part of the project build")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, value_name = "DIR")]
    pub project: Option<PathBuf>,

    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Run one build pass; incremental when a delta file is given,
    /// falling back to a full traversal otherwise.
    Build {
        #[arg(long)]
        full: bool,

        #[arg(long, value_name = "FILE")]
        delta: Option<PathBuf>,
    },
    /// Print the binary name probed from a class file.
    Probe {
        class_file: PathBuf,
    },
    /// Print the resolved runtime classpath.
    Classpath,
}
