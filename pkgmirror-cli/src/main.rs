//! pkgmirror — local mirror of a remote package index.
//!
//! Supports:
//! - Seed-archive bootstrap (init)
//! - Incremental catch-up against the index changelog (update)
//! - Full enumeration with trailing catch-up (full-download)
//!
//! # Usage
//!
//! ```bash
//! # Bootstrap a mirror from the pregenerated seed archive
//! pkgmirror init /path/to/mirror
//!
//! # Catch up to the live index
//! pkgmirror update /path/to/mirror
//!
//! # Download every record from scratch (prompts for confirmation)
//! pkgmirror full-download /path/to/mirror
//! ```

mod remote;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pkgmirror_core::{ArchiveImporter, FsStore, SyncEngine};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::info;

use remote::{HttpIndexClient, download_archive};

const DEFAULT_INDEX_URL: &str = "https://pypi.org";
const DEFAULT_ARCHIVE_URL: &str = "https://s3.amazonaws.com/pypi-data/data.tar.bz2";

#[derive(Parser, Debug)]
#[command(name = "pkgmirror")]
#[command(author = "PkgMirror Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Local mirror of a remote package index")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Base URL of the remote index
    #[arg(long, global = true, default_value = DEFAULT_INDEX_URL)]
    index_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bootstrap a mirror from a pregenerated seed archive
    Init {
        /// Mirror directory
        path: PathBuf,
        /// Seed archive URL
        #[arg(long, default_value = DEFAULT_ARCHIVE_URL)]
        archive_url: String,
    },

    /// Incrementally catch up to the live index
    Update {
        /// Mirror directory
        path: PathBuf,
    },

    /// Download ALL metadata from the index (slow; prompts first)
    #[command(name = "full-download")]
    FullDownload {
        /// Mirror directory
        path: PathBuf,
        /// Skip the confirmation prompt
        #[arg(long)]
        confirm: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("pkgmirror_cli={level}").parse().unwrap())
                .add_directive(format!("pkgmirror_core={level}").parse().unwrap()),
        )
        .init();

    let client = HttpIndexClient::new(&cli.index_url);

    match cli.command {
        Commands::Init { path, archive_url } => cmd_init(path, archive_url, client).await,
        Commands::Update { path } => cmd_update(path, client).await,
        Commands::FullDownload { path, confirm } => cmd_full_download(path, confirm, client).await,
    }
}

async fn cmd_init(path: PathBuf, archive_url: String, client: HttpIndexClient) -> Result<()> {
    let store = FsStore::new(&path);
    let engine = SyncEngine::new(&store, &client);

    info!("Downloading from {}", archive_url);
    let file = download_archive(&archive_url).await?;

    let mut importer = ArchiveImporter::new(file);
    engine
        .bootstrap_from_archive(importer.entries()?)
        .await
        .context("Bootstrap from archive failed")?;
    Ok(())
}

async fn cmd_update(path: PathBuf, client: HttpIndexClient) -> Result<()> {
    let store = FsStore::new(&path);
    SyncEngine::new(&store, &client)
        .update()
        .await
        .with_context(|| format!("Update of {} failed", path.display()))?;
    Ok(())
}

async fn cmd_full_download(path: PathBuf, confirmed: bool, client: HttpIndexClient) -> Result<()> {
    if !confirmed && !prompt_for_download()? {
        eprintln!("Aborting");
        return Ok(());
    }

    let store = FsStore::new(&path);
    SyncEngine::new(&store, &client)
        .full_download()
        .await
        .context("Full download failed")?;
    Ok(())
}

/// Interactive gate in front of the index-wide download.
fn prompt_for_download() -> Result<bool> {
    eprintln!(
        "WARNING: Will download ALL metadata.\n\
         \x20        This is time-consuming, and places a load on the index servers.\n\
         \n\
         Alternatively, you can use `pkgmirror init` to download a pregenerated\n\
         archive.\n\
         \n\
         If you definitely want to download ALL metadata, type 'download' below,\n\
         or anything else to abort.\n"
    );
    eprint!("> ");
    std::io::stderr().flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(is_download_confirmation(&line))
}

fn is_download_confirmation(line: &str) -> bool {
    line.trim() == "download"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_confirmation() {
        assert!(is_download_confirmation("download\n"));
        assert!(is_download_confirmation("  download  "));
        assert!(!is_download_confirmation("yes\n"));
        assert!(!is_download_confirmation(""));
        assert!(!is_download_confirmation("exit\n"));
    }
}
