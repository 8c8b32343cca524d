use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use super::common;
use crate::cli::LsArgs;

#[derive(Debug, Serialize)]
struct EntryInfo {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
}

pub fn cmd_ls(args: LsArgs) -> Result<()> {
    // Only log in non-JSON mode to avoid mixing logs with JSON output
    if !args.json {
        info!("srfpfs ls {}", args.path.display());
    }
    let fs = common::connect(&args.connect)?;
    let names = fs
        .list_directory(&args.path)
        .with_context(|| format!("listing {}", args.path.display()))?;

    let mut entries = Vec::with_capacity(names.len());
    for name in names {
        let mut entry = EntryInfo {
            name: name.to_string_lossy().into_owned(),
            kind: None,
            size: None,
        };
        if args.long {
            match fs.stat(args.path.join(&name)) {
                Ok(meta) => {
                    entry.kind = Some(if meta.is_file { "file" } else { "dir" });
                    entry.size = Some(meta.size);
                }
                Err(e) => warn!("stat {}: {}", entry.name, e),
            }
        }
        entries.push(entry);
    }
    fs.unmount();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if args.long {
        println!("{:<6} {:>10}  {}", "KIND", "SIZE", "NAME");
        for entry in entries {
            let size = entry.size.map_or("-".to_string(), |s| s.to_string());
            println!("{:<6} {:>10}  {}", entry.kind.unwrap_or("?"), size, entry.name);
        }
    } else {
        for entry in entries {
            println!("{}", entry.name);
        }
    }

    Ok(())
}
