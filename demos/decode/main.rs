//! CimBar Photo Decoder CLI Utility
//!
//! Decodes a single-frame cimbar photo back into its payload bytes and
//! prints a JSON summary of the decode.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example decode -- photo.png payload.bin
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use cimbar_rs::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "decode")]
#[command(author = "cimbar-rs project")]
#[command(version = "1.0")]
#[command(about = "Decode a single-frame cimbar photo", long_about = None)]
struct Cli {
	/// Input photo (any format the image crate reads)
	#[arg(value_name = "PHOTO")]
	input: PathBuf,

	/// Output payload file
	#[arg(value_name = "OUTPUT")]
	output: PathBuf,

	/// Disable the two-pass hash detector
	#[arg(long)]
	no_hash_detection: bool,

	/// Disable white balancing
	#[arg(long)]
	no_white_balance: bool,
}

#[derive(Serialize)]
struct Summary {
	payload_bytes: usize,
	finder_corners: bool,
	crop: (usize, usize, usize, usize),
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

	let bitmap = load_bitmap(&cli.input)?;
	let tuning = Tuning {
		use_hash_detection: !cli.no_hash_detection,
		enable_white_balance: !cli.no_white_balance,
		..Tuning::default()
	};

	let located = locate(&bitmap);
	let payload = decode_photo(&bitmap, &tuning)?;
	fs::write(&cli.output, &payload)?;

	let summary = Summary {
		payload_bytes: payload.len(),
		finder_corners: located.corners.is_some(),
		crop: (located.bounds.x, located.bounds.y, located.bounds.w, located.bounds.h),
	};
	println!("{}", serde_json::to_string_pretty(&summary)?);
	Ok(())
}
