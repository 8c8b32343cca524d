use anyhow::{Context, Result};

use super::common;
use crate::cli::VersionArgs;

pub fn cmd_version(args: VersionArgs) -> Result<()> {
    let fs = common::connect(&args.connect)?;
    let version = fs.version().context("querying device version")?;
    fs.unmount();
    println!("{}", version);
    Ok(())
}
