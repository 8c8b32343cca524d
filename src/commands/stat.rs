use anyhow::{Context, Result};

use super::common::{self, format_time};
use crate::cli::StatArgs;

pub fn cmd_stat(args: StatArgs) -> Result<()> {
    let fs = common::connect(&args.connect)?;
    let meta = fs
        .stat(&args.path)
        .with_context(|| format!("stat {}", args.path.display()))?;
    fs.unmount();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&meta)?);
        return Ok(());
    }

    println!("  Path: {}", args.path.display());
    println!("  Kind: {}", if meta.is_file { "file" } else { "directory" });
    println!("  Size: {}", meta.size);
    println!("Create: {}", format_time(meta.created));
    println!("Access: {}", format_time(meta.accessed));
    println!("Modify: {}", format_time(meta.modified));
    Ok(())
}
