//! Von Kries white balance from the finder white samples.
//!
//! The outer corner cell of each 3x3 finder is pure white in the rendered
//! frame, so whatever color it captured as is the illuminant. A diagonal
//! scale per channel maps that observed white back to (255, 255, 255).

use log::debug;

use crate::bitmap::{Bitmap, luma_of};
use crate::frame::{CELL_SIZE, FrameSize};

/// Observed white is ignored below this luma; such a sample is shadow or
/// background, not the finder ring.
const MIN_WHITE_LUMA: u8 = 30;

/// Mean RGB of a 4x4 patch centered on a cell.
fn patch_mean(bmp: &Bitmap, cx: usize, cy: usize) -> [u32; 3] {
	let x0 = cx * CELL_SIZE + CELL_SIZE / 2 - 2;
	let y0 = cy * CELL_SIZE + CELL_SIZE / 2 - 2;

	let mut sum = [0u32; 3];
	for y in y0..y0 + 4 {
		for x in x0..x0 + 4 {
			let [r, g, b] = bmp.rgb(x.min(bmp.width() - 1), y.min(bmp.height() - 1));
			sum[0] += u32::from(r);
			sum[1] += u32::from(g);
			sum[2] += u32::from(b);
		}
	}
	[sum[0] / 16, sum[1] / 16, sum[2] / 16]
}

/// Applies white balance to a canonical (warped) frame in place.
///
/// Samples the four outer finder corner cells, takes the per-channel
/// maximum and rescales every pixel so that maximum becomes full white.
/// Skipped when the observed white is too dark to be trusted.
pub(crate) fn apply_white_balance(bmp: &mut Bitmap, size: FrameSize) {
	let far = size.cols() - 1;
	let corners = [(0, 0), (far, 0), (0, far), (far, far)];

	let mut white = [0u32; 3];
	for (cx, cy) in corners {
		let mean = patch_mean(bmp, cx, cy);
		for (w, m) in white.iter_mut().zip(mean.iter()) {
			*w = (*w).max(*m);
		}
	}

	if luma_of(white[0] as u8, white[1] as u8, white[2] as u8) < MIN_WHITE_LUMA {
		debug!("white sample too dark ({white:?}), skipping white balance");
		return;
	}

	let scale = [
		255.0 / white[0].max(1) as f32,
		255.0 / white[1].max(1) as f32,
		255.0 / white[2].max(1) as f32,
	];
	debug!("white balance scale: {scale:?}");

	for y in 0..bmp.height() {
		for x in 0..bmp.width() {
			let [r, g, b] = bmp.rgb(x, y);
			bmp.set_rgb(x, y, [
				(f32::from(r) * scale[0]).min(255.0) as u8,
				(f32::from(g) * scale[1]).min(255.0) as u8,
				(f32::from(b) * scale[2]).min(255.0) as u8,
			]);
		}
	}
}
