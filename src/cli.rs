use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Clone(CloneArgs),
    Serve(ServeArgs),
}

#[derive(Debug, Args)]
pub struct CloneArgs {
    /// Target URL to clone (repeatable; bare domains are upgraded to https).
    #[arg(long = "url", required = true)]
    pub urls: Vec<String>,

    /// Directory that receives the project folder.
    #[arg(long, default_value = ".")]
    pub out: PathBuf,

    /// Folder name for the clone output (default: random UUID).
    #[arg(long)]
    pub project_id: Option<String>,

    /// User-agent header sent with every request.
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Proxy for all requests, e.g. http://127.0.0.1:8080.
    #[arg(long)]
    pub proxy: Option<String>,

    /// Pre-seeded cookie as `name=value` (repeatable).
    #[arg(long = "cookie")]
    pub cookies: Vec<String>,

    /// Maximum project folder size in bytes (0 = unlimited).
    #[arg(long, default_value_t = 0)]
    pub max_folder_size: u64,

    /// Serve the first cloned project once the batch finishes.
    #[arg(long)]
    pub serve: bool,

    /// Redirect target returned by the submission endpoint.
    #[arg(long)]
    pub redirect: Option<String>,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Project directory produced by `clone`.
    #[arg(long)]
    pub project: PathBuf,

    /// Redirect target returned by the submission endpoint.
    #[arg(long)]
    pub redirect: Option<String>,
}
