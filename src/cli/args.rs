//! Command-line argument parsing

use crate::config::DEFAULT_TIMEOUT_SECS;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "manifest-pusher")]
#[command(about = "Create, push and inspect multi-architecture Docker manifest lists")]
#[command(version)]
pub struct Args {
    /// Registry username
    #[arg(
        long = "username",
        short = 'u',
        global = true,
        help = "Username to access the registry"
    )]
    pub username: Option<String>,

    /// Registry password
    #[arg(
        long = "password",
        short = 'p',
        global = true,
        help = "Password to access the registry"
    )]
    pub password: Option<String>,

    #[arg(
        long = "cfg",
        global = true,
        help = "Docker configuration directory or config.json holding registry credentials"
    )]
    pub cfg: Option<PathBuf>,

    #[arg(long = "debug", global = true, help = "Enable debug output")]
    pub debug: bool,

    #[arg(
        long = "plain-http",
        global = true,
        help = "Talk to registries over plain HTTP instead of HTTPS"
    )]
    pub plain_http: bool,

    #[arg(
        long = "timeout",
        short = 't',
        global = true,
        default_value_t = DEFAULT_TIMEOUT_SECS,
        help = "Timeout for each registry request in seconds"
    )]
    pub timeout: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create a manifest list named as the target from source images, then push it
    #[command(visible_alias = "create")]
    Push {
        /// Target image, e.g. registry.example.com/app:latest
        target: String,
        /// Single-platform source images, in list order
        #[arg(required = true, num_args = 1..)]
        sources: Vec<String>,
    },
    /// Show the manifests behind an image and their platforms
    Inspect {
        /// Image to inspect, e.g. registry.example.com/app:latest
        image: String,
    },
}

impl Args {
    pub fn parse_args() -> Self {
        Args::parse()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.timeout == 0 {
            return Err("Timeout must be greater than 0".to_string());
        }
        if self.password.is_some() && self.username.is_none() {
            return Err("--password requires --username".to_string());
        }
        Ok(())
    }
}
