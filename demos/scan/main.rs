//! CimBar Live-Scan Replay Utility
//!
//! Replays a directory of captured frames (sorted by file name) through a
//! live-scan session, as if they had come off a camera. Useful for
//! debugging captures offline.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example scan -- captures/ payload.bin
//!
//! # With a tuning override file:
//! cargo run --example scan -- captures/ payload.bin --tuning tuning.toml
//! ```

use anyhow::{Context, Result, bail};
use clap::Parser;
use cimbar_rs::prelude::*;
use log::{debug, info};
use std::fs;
use std::path::PathBuf;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "scan")]
#[command(author = "cimbar-rs project")]
#[command(version = "1.0")]
#[command(about = "Replay captured frames through a live-scan session", long_about = None)]
struct Cli {
	/// Directory of captured frames
	#[arg(value_name = "CAPTURE_DIR")]
	captures: PathBuf,

	/// Output payload file
	#[arg(value_name = "OUTPUT")]
	output: PathBuf,

	/// Optional TOML file overriding tuning options
	#[arg(short, long)]
	tuning: Option<PathBuf>,
}

fn load_tuning(path: Option<&PathBuf>) -> Result<Tuning> {
	let Some(path) = path else {
		return Ok(Tuning::default());
	};

	let tuning = config::Config::builder()
		.add_source(config::File::from(path.as_path()))
		.build()
		.with_context(|| format!("reading {}", path.display()))?
		.try_deserialize::<Tuning>()?;
	Ok(tuning)
}

fn load_bitmap(path: &PathBuf) -> Result<Bitmap> {
	let img = image::open(path).with_context(|| format!("reading {}", path.display()))?;
	let rgba = img.to_rgba8();
	let (w, h) = rgba.dimensions();
	Ok(Bitmap::from_rgba(w as usize, h as usize, rgba.into_raw())?)
}

fn main() -> Result<()> {
	env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
	let cli = Cli::parse();

	let tuning = load_tuning(cli.tuning.as_ref())?;
	let mut session = LiveSession::new(tuning);

	let mut paths: Vec<PathBuf> = WalkDir::new(&cli.captures)
		.into_iter()
		.filter_map(Result::ok)
		.filter(|e| e.file_type().is_file())
		.map(|e| e.into_path())
		.collect();
	paths.sort();

	for path in &paths {
		let bitmap = match load_bitmap(path) {
			Ok(bitmap) => bitmap,
			Err(err) => {
				debug!("skipping {}: {err}", path.display());
				continue;
			}
		};

		if let Some(payload) = session.submit(&bitmap) {
			let digest = hex::encode(&payload[..8.min(payload.len())]);
			info!(
				"complete after {}: {} bytes (leading bytes {digest})",
				path.display(),
				payload.len()
			);
			fs::write(&cli.output, &payload)?;
			return Ok(());
		}
	}

	bail!("captures exhausted without completing the scan ({} files)", paths.len());
}
