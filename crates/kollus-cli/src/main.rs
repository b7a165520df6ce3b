//! Kollus CLI: create upload destinations, transfer files, follow processing.
//!
//! Set KOLLUS_ACCESS_TOKEN (and optionally KOLLUS_API_URL, KOLLUS_UPLOAD_URL).

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use kollus_api_client::{ProgressMonitor, UploadClient};
use kollus_cli::{init_tracing, read_upload_file, watch_progress};
use kollus_core::{
    format_file_size, validate_media_file, ClientConfig, DestinationRequest, UploadVariant,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "kollus", about = "Kollus upload CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DestinationArgs {
    /// Seconds until the upload address expires
    #[arg(long, default_value = "600")]
    expire: u64,
    /// Category key
    #[arg(long)]
    category: Option<String>,
    /// Title for the uploaded media
    #[arg(long)]
    title: Option<String>,
    /// Upload variant: normal, passthrough, filelive
    #[arg(long, default_value = "normal")]
    variant: UploadVariant,
    /// Transcoding profile key (passthrough only)
    #[arg(long)]
    profile: Option<String>,
}

impl DestinationArgs {
    fn into_request(self) -> DestinationRequest {
        let mut request = DestinationRequest::new(self.expire, self.variant);
        if let Some(category) = self.category {
            request = request.with_category_key(category);
        }
        if let Some(title) = self.title {
            request = request.with_title(title);
        }
        if let Some(profile) = self.profile {
            request = request.with_profile_key(profile);
        }
        request
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create an upload destination and print it
    CreateUrl {
        #[command(flatten)]
        destination: DestinationArgs,
    },
    /// Upload a media file and follow its processing
    Upload {
        /// Path to the file to upload
        file: PathBuf,
        #[command(flatten)]
        destination: DestinationArgs,
        /// Address the service redirects to after receiving the file
        #[arg(long)]
        return_url: Option<String>,
        /// Exit after the transfer without polling progress
        #[arg(long)]
        no_watch: bool,
        /// Poll interval in milliseconds (defaults to KOLLUS_POLL_INTERVAL_MS)
        #[arg(long)]
        interval_ms: Option<u64>,
    },
    /// Fetch one progress snapshot
    Progress {
        /// Progress URL returned by create-url
        url: String,
    },
    /// Poll a progress URL until processing completes
    Watch {
        /// Progress URL returned by create-url
        url: String,
        /// Poll interval in milliseconds (defaults to KOLLUS_POLL_INTERVAL_MS)
        #[arg(long)]
        interval_ms: Option<u64>,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

fn poll_interval(config: &ClientConfig, interval_ms: Option<u64>) -> Duration {
    interval_ms
        .map(Duration::from_millis)
        .unwrap_or(config.poll_interval)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = ClientConfig::from_env()
        .context("Failed to load configuration. Set KOLLUS_ACCESS_TOKEN")?;
    let client = UploadClient::from_config(&config).context("Failed to create upload client")?;

    match cli.command {
        Commands::CreateUrl { destination } => {
            let descriptor = client
                .create_destination(&destination.into_request())
                .await?;
            if let Some(expiry) = descriptor.formatted_expiry() {
                tracing::info!(expires = %expiry, "Destination expires");
            }
            print_json(&descriptor)?;
        }
        Commands::Upload {
            file,
            destination,
            return_url,
            no_watch,
            interval_ms,
        } => {
            let upload = read_upload_file(&file).await?;
            validate_media_file(&upload.file_name, upload.content_type.as_deref(), upload.len())?;
            tracing::info!(
                file_name = %upload.file_name,
                size = %format_file_size(upload.len() as u64),
                "Uploading file"
            );

            let descriptor = client
                .create_destination(&destination.into_request())
                .await?;
            let outcome = client
                .transfer_file(&descriptor.upload_url, upload, return_url.as_deref())
                .await?;
            print_json(&outcome)?;

            if outcome.success() == Some(false) {
                anyhow::bail!(
                    "Upload rejected: {}",
                    outcome.message().unwrap_or("no message")
                );
            }

            if !no_watch {
                let monitor =
                    ProgressMonitor::new(Arc::new(client.clone()), descriptor.progress_url);
                watch_progress(&monitor, poll_interval(&config, interval_ms)).await?;
            }
        }
        Commands::Progress { url } => {
            let snapshot = client.fetch_progress(&url).await?;
            print_json(&snapshot)?;
        }
        Commands::Watch { url, interval_ms } => {
            let monitor = ProgressMonitor::new(Arc::new(client.clone()), url);
            watch_progress(&monitor, poll_interval(&config, interval_ms)).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn help_needs_no_configuration() {
        let err = match Cli::try_parse_from(["kollus", "--help"]) {
            Err(err) => err,
            Ok(_) => panic!("--help should stop parsing"),
        };
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn upload_arguments_build_request() {
        let cli = Cli::try_parse_from([
            "kollus",
            "upload",
            "clip.mp4",
            "--variant",
            "passthrough",
            "--profile",
            "profile-hd",
            "--no-watch",
        ])
        .unwrap();

        let Commands::Upload {
            file,
            destination,
            no_watch,
            interval_ms,
            ..
        } = cli.command
        else {
            panic!("expected upload command");
        };
        assert_eq!(file, PathBuf::from("clip.mp4"));
        assert!(no_watch);
        assert_eq!(interval_ms, None);

        let request = destination.into_request();
        assert_eq!(request.expire_time, 600);
        assert_eq!(request.variant, UploadVariant::Passthrough);
        assert_eq!(request.profile_key(), Some("profile-hd"));
    }

    #[test]
    fn unknown_variant_is_rejected() {
        assert!(Cli::try_parse_from(["kollus", "create-url", "--variant", "live"]).is_err());
    }
}
