//! Line-oriented control session.

use anyhow::Context;
use clap::Args;
use crossbar_config::RouterConfig;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use super::common::RouterSource;
use crate::script::parse_line;

#[derive(Args)]
pub struct RunArgs {
    /// Event script to read (default: stdin)
    #[arg(value_name = "SCRIPT")]
    script: Option<PathBuf>,

    #[command(flatten)]
    source: RouterSource,

    /// Write the final router state to this config file
    #[arg(long, value_name = "FILE")]
    save: Option<PathBuf>,

    /// Print a full dump after the last event
    #[arg(long)]
    dump: bool,
}

pub fn run(args: RunArgs) -> anyhow::Result<()> {
    let (_, mut router) = args.source.build()?;

    let mut input: Box<dyn BufRead> = match &args.script {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    let mut write_err = None;
    let mut emit = |response: crossbar_core::Response| {
        if write_err.is_none()
            && let Err(e) = writeln!(out, "{response}")
        {
            write_err = Some(e);
        }
    };

    let mut applied = 0usize;
    let mut skipped = 0usize;
    let mut raw = Vec::new();
    let mut idx = 0usize;
    loop {
        raw.clear();
        if input.read_until(b'\n', &mut raw).context("reading events")? == 0 {
            break;
        }
        idx += 1;
        let Ok(line) = std::str::from_utf8(&raw) else {
            tracing::warn!(line = idx, "skipping line that is not valid UTF-8");
            skipped += 1;
            continue;
        };
        match parse_line(line) {
            Ok(Some((_, event))) => {
                router.handle(&event, &mut emit);
                applied += 1;
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(line = idx, "skipping '{}': {err}", line.trim());
                skipped += 1;
            }
        }
    }

    if args.dump {
        router.dump(&mut emit);
    }
    drop(emit);
    if let Some(e) = write_err {
        return Err(e).context("writing responses");
    }
    out.flush().context("writing responses")?;

    tracing::info!(applied, skipped, active = router.store().active_count(), "session done");

    if let Some(path) = &args.save {
        RouterConfig::capture(&router)
            .save(path)
            .with_context(|| format!("saving {}", path.display()))?;
        tracing::info!("saved state to {}", path.display());
    }

    Ok(())
}
