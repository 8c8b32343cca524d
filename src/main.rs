use anyhow::Result;
use clap::Parser;
use srfpfs::cli::{Cli, Commands};
use srfpfs::commands;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so `cat` output on stdout stays clean.
    let use_color = atty::is(atty::Stream::Stderr);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_target(true)
        .with_ansi(use_color)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.cmd {
        Commands::Mount(args) => commands::cmd_mount(args),
        Commands::Ls(args) => commands::cmd_ls(args),
        Commands::Stat(args) => commands::cmd_stat(args),
        Commands::Cat(args) => commands::cmd_cat(args),
        Commands::Version(args) => commands::cmd_version(args),
    };

    if let Err(e) = &result {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }

    result
}
