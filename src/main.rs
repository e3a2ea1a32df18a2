use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use hubget::{
    CachePaths, DownloadOptions, HubClient, RepoId, SnapshotOptions, SymlinkPolicy,
};

#[derive(Parser)]
#[command(
    name = "hubget",
    about = "Download and cache files from a Huggingface-style model hub"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CommonArgs {
    /// Branch, tag or commit hash to resolve
    #[arg(long, default_value = "main")]
    revision: String,

    /// Cache root (defaults to the platform cache directory)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Place the result in this directory instead of the cache
    #[arg(long)]
    local_dir: Option<PathBuf>,

    /// Symlink policy for --local-dir: auto, always or never
    #[arg(long, default_value = "auto")]
    local_dir_use_symlinks: String,

    /// Re-download even if the file is already cached
    #[arg(long)]
    force: bool,

    /// Never touch the network; serve from the cache or fail
    #[arg(long)]
    offline: bool,

    /// Bearer token for private repos
    #[arg(long)]
    token: Option<String>,

    /// Override the hub endpoint
    #[arg(long)]
    endpoint: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a single file from a repository
    Get {
        /// Repository in owner/name format
        repo: RepoId,

        /// Name of the file in the repo
        filename: String,

        /// Folder inside the repo the file lives under
        #[arg(long)]
        subfolder: Option<String>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Download every file of a revision
    Snapshot {
        /// Repository in owner/name format
        repo: RepoId,

        /// Concurrency bound for parallel file fetches
        #[arg(long, default_value_t = 4)]
        max_workers: usize,

        #[command(flatten)]
        common: CommonArgs,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Get {
            repo,
            filename,
            subfolder,
            common,
        } => cmd_get(&repo, &filename, subfolder, &common),
        Commands::Snapshot {
            repo,
            max_workers,
            common,
        } => cmd_snapshot(&repo, max_workers, &common),
    };

    match result {
        Ok(path) => println!("{}", path.display()),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn build_client(common: &CommonArgs) -> HubClient {
    let cache = match &common.cache_dir {
        Some(dir) => CachePaths::new(dir),
        None => CachePaths::default(),
    };
    let client = HubClient::new(cache);
    match &common.endpoint {
        Some(endpoint) => client.with_endpoint(endpoint.as_str()),
        None => client,
    }
}

fn parse_policy(value: &str) -> Result<SymlinkPolicy, String> {
    match value {
        "auto" => Ok(SymlinkPolicy::Auto),
        "always" | "true" => Ok(SymlinkPolicy::Always),
        "never" | "false" => Ok(SymlinkPolicy::Never),
        other => Err(format!(
            "invalid symlink policy '{}' (expected auto, always or never)",
            other
        )),
    }
}

fn download_options(
    common: &CommonArgs,
    subfolder: Option<String>,
) -> Result<DownloadOptions, Box<dyn std::error::Error>> {
    Ok(DownloadOptions {
        revision: common.revision.clone(),
        subfolder,
        force_download: common.force,
        local_files_only: common.offline,
        token: common.token.clone(),
        local_dir: common.local_dir.clone(),
        local_dir_use_symlinks: parse_policy(&common.local_dir_use_symlinks)?,
        ..Default::default()
    })
}

fn cmd_get(
    repo: &RepoId,
    filename: &str,
    subfolder: Option<String>,
    common: &CommonArgs,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let client = build_client(common);
    let opts = download_options(common, subfolder)?;

    let path = client.download_file(repo, filename, &opts, None)?;
    Ok(path)
}

fn cmd_snapshot(
    repo: &RepoId,
    max_workers: usize,
    common: &CommonArgs,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let client = build_client(common);
    let opts = SnapshotOptions {
        download: download_options(common, None)?,
        max_workers,
    };

    let path = client.snapshot_download(repo, &opts, None)?;
    Ok(path)
}
