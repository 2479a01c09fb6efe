use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "groupperms", version, about = "Inspect group-based permissions")]
pub struct Cli {
    /// Directory holding settings.toml and the permissions document
    #[arg(short, long, global = true, env = "GROUPPERMS_DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the resolved permissions of a subject
    Resolve {
        subject: String,
        #[arg(long)]
        world: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Print the resolved permissions of a group
    Group {
        name: String,
        #[arg(long)]
        world: Option<String>,
    },
    /// List the groups that inherit from a group, directly or transitively
    Closure { group: String },
    /// List all defined groups
    Groups,
    /// List subjects that list a group directly
    Members { group: String },
    /// Show the resolved value of one node for a subject
    Check {
        subject: String,
        node: String,
        #[arg(long)]
        world: Option<String>,
    },
}
