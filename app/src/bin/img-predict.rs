use std::io::Write;

use anyhow::Context;
use clap::Parser;
use img_predict_core::{Classifier, Config, Fetch, Fetcher, InferenceSession};
use tracing::{error, info};

#[derive(Parser)]
struct Args {
    /// Images to classify.
    urls: Vec<String>,

    /// TOML file overriding the default settings.
    #[arg(long)]
    config: Option<String>,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Summary {
    classified: usize,
    no_result: usize,
    failed: usize,
}

impl Summary {
    fn exit_code(&self) -> i32 {
        if self.failed > 0 {
            1
        } else {
            0
        }
    }
}

fn load_config(path: Option<&str>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("read config {path}"))?;
    toml::from_str(&text).with_context(|| format!("parse config {path}"))
}

fn write_usage<W: Write>(prog: &str, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "Usage: {prog} <url>")
}

/// Classifies each url in turn. A failing url is logged and skipped.
fn run<C: Classifier, F: Fetch, W: Write>(
    urls: &[String],
    session: &InferenceSession<C>,
    fetcher: &F,
    out: &mut W,
) -> anyhow::Result<Summary> {
    let mut summary = Summary::default();
    for url in urls {
        match session.predict(fetcher, url) {
            Ok(Some(preds)) => {
                writeln!(out, "{url}")?;
                for p in preds {
                    writeln!(out, "{p}")?;
                }
                summary.classified += 1;
            }
            Ok(None) => {
                writeln!(out, "failed to download {url}")?;
                writeln!(out, "{url}")?;
                writeln!(out, "no result")?;
                summary.no_result += 1;
            }
            Err(e) => {
                error!("{url}: {e:#}");
                summary.failed += 1;
            }
        }
    }
    info!(
        "{} of {} images classified, {} without result, {} failed",
        summary.classified,
        urls.len(),
        summary.no_result,
        summary.failed
    );
    Ok(summary)
}

pub fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt::init();
    let mut out = std::io::stdout();

    if args.urls.is_empty() {
        let prog = std::env::args().next().unwrap_or_else(|| "img-predict".to_string());
        write_usage(&prog, &mut out)?;
        return Ok(());
    }

    let config = load_config(args.config.as_deref())?;
    let session = img_predict_core::load_session(&config)?;
    let fetcher = Fetcher::new(&config.cache_dir);

    let summary = run(&args.urls, &session, &fetcher, &mut out)?;
    out.flush()?;
    let code = summary.exit_code();
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
