use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "navsync",
    version,
    about = "Keeps a navigation layout in sync with its screen files and imports"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(long, global = true, help = "Project root (default: auto-detect from cwd)")]
    pub root: Option<PathBuf>,

    #[arg(
        long,
        short = 'y',
        global = true,
        help = "Never prompt, accept every default answer"
    )]
    pub yes: bool,

    #[arg(
        short,
        long,
        global = true,
        action = ArgAction::Count,
        help = "More log output (-v debug, -vv trace)"
    )]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Watch the layout and sync on every change (default)")]
    Watch,
    #[command(about = "Add screens to the layout and generate their files")]
    Add {
        #[arg(required = true, help = "Screen names (e.g., settings)")]
        names: Vec<String>,
        #[arg(long, short, help = "Target navigator (e.g., '(drawer)')")]
        parent: Option<String>,
        #[arg(long, help = "Print the layout diff without writing anything")]
        dry_run: bool,
    },
    #[command(about = "Remove screens from the layout and delete their files")]
    Delete {
        #[arg(required = true, help = "Screen names (e.g., settings)")]
        names: Vec<String>,
        #[arg(long, short, help = "Navigator to delete from")]
        parent: Option<String>,
        #[arg(long, help = "Print the layout diff without writing anything")]
        dry_run: bool,
    },
    #[command(about = "Set a navigator's initial route")]
    InitialRoute {
        #[arg(help = "Navigator name (e.g., '(tabs)')")]
        navigator: String,
        #[arg(help = "Screen or navigator to start on")]
        route: String,
        #[arg(long, help = "Print the layout diff without writing anything")]
        dry_run: bool,
    },
    #[command(about = "Check the layout against files and imports")]
    Audit {
        #[arg(long, help = "Apply every proposed fix without asking")]
        fix: bool,
    },
    #[command(about = "Show recent units of work")]
    Journal {
        #[arg(long, short, default_value = "20", help = "Number of units to show")]
        limit: usize,
    },
    #[command(about = "Serve the HTTP control panel")]
    Serve {
        #[arg(long, help = "Port (default: from navsync.toml)")]
        port: Option<u16>,
    },
}
