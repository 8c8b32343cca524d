use anyhow::{Context, Result};
use std::io::{self, Read, Seek, SeekFrom, Write};

use super::common;
use crate::cli::CatArgs;

pub fn cmd_cat(args: CatArgs) -> Result<()> {
    let fs = common::connect(&args.connect)?;
    let mut file = fs
        .open(&args.path, "rb")
        .with_context(|| format!("opening {}", args.path.display()))?;
    if args.offset > 0 {
        file.seek(SeekFrom::Start(args.offset))?;
    }

    let mut remaining = args.length.unwrap_or(usize::MAX);
    let mut buf = vec![0u8; fs.config().max_chunk_size as usize];
    let stdout = io::stdout();
    let mut out = stdout.lock();
    while remaining > 0 {
        let want = remaining.min(buf.len());
        let n = file
            .read(&mut buf[..want])
            .with_context(|| format!("reading {}", args.path.display()))?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n])?;
        remaining -= n;
    }
    out.flush()?;
    Ok(())
}
