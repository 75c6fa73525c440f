//! CimBar Encoder CLI Utility
//!
//! Encodes an (already encrypted) payload file into a sequence of PNG
//! frames.
//!
//! # Usage
//!
//! ```bash
//! # Encode payload.bin into out/frame_000.png, out/frame_001.png, ...
//! cargo run --example encode -- payload.bin out/ --frame-size 256
//! ```

use anyhow::{Context, Result, bail};
use clap::Parser;
use cimbar_rs::prelude::*;
use image::{ImageBuffer, RgbaImage};
use log::info;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "encode")]
#[command(author = "cimbar-rs project")]
#[command(version = "1.0")]
#[command(about = "Encode a payload file into cimbar PNG frames", long_about = None)]
struct Cli {
	/// Input payload file (encrypted wire bytes)
	#[arg(value_name = "INPUT")]
	input: PathBuf,

	/// Output directory for the rendered frames
	#[arg(value_name = "OUTPUT_DIR")]
	output: PathBuf,

	/// Frame size in pixels (128, 192, 256 or 384)
	#[arg(short = 's', long, default_value_t = 256)]
	frame_size: u32,
}

fn save_frame(path: &PathBuf, bitmap: &Bitmap) -> Result<()> {
	let (w, h) = (bitmap.width() as u32, bitmap.height() as u32);
	let img: RgbaImage = ImageBuffer::from_raw(w, h, bitmap.pixels().to_vec())
		.context("frame buffer does not match its dimensions")?;
	img.save(path).with_context(|| format!("saving {}", path.display()))?;
	Ok(())
}

fn main() -> Result<()> {
	env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
	let cli = Cli::parse();

	let size = FrameSize::try_from(cli.frame_size)?;
	let payload = fs::read(&cli.input).with_context(|| format!("reading {}", cli.input.display()))?;
	if payload.len() < 32 {
		bail!("payload too small to be wire format ({} bytes)", payload.len());
	}

	let frames = encode(&payload, size)?;
	fs::create_dir_all(&cli.output)?;
	for (index, frame) in frames.iter().enumerate() {
		let path = cli.output.join(format!("frame_{index:03}.png"));
		save_frame(&path, frame)?;
	}

	info!(
		"encoded {} bytes into {} {} frame(s) ({} data bytes per frame)",
		payload.len(),
		frames.len(),
		size,
		size.data_bytes()
	);
	Ok(())
}
