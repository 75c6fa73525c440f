//! Finder-pattern localization.
//!
//! The locator works on a 2x-downsampled luma image. A horizontal scan
//! every other row looks for bright-dark-bright run triples whose lengths
//! agree within tolerance: the cross-section of a finder's white ring and
//! gray center. Hits are confirmed vertically, merged, then classified
//! into the four corners using the asymmetric top-left finder (its center
//! cell has no inner white dot, so its 5x5 luma patch is the darkest).

use log::debug;

use crate::bitmap::Bitmap;
use crate::frame::FINDER_SPAN;
use crate::warp::Point;

/// Luma at or above this is "bright" (finder white); every palette color
/// stays below it.
const BRIGHT_MIN: u8 = 180;

/// Luma above this counts as content for the bounding-box fallback.
const CONTENT_MIN: u8 = 30;

/// Minimum TL-vs-rest patch luma gap before falling back to coordinate
/// extremes for classification.
const TL_GAP_MIN: i32 = 20;

/// One located finder candidate.
#[derive(Debug, Clone, Copy)]
struct Candidate {
	/// Center in full-resolution coordinates.
	x: f64,
	y: f64,
	/// Full span of the bright-dark-bright triple, half-resolution pixels.
	span: f64,
	/// Number of raw hits merged into this candidate.
	weight: usize,
}

/// Classified finder centers. `tr`/`bl` stay `None` when only a diagonal
/// pair was found.
#[derive(Debug, Clone, Copy)]
pub struct Corners {
	/// Top-left finder center (the one without an inner dot).
	pub tl: Point,
	/// Top-right finder center, if located.
	pub tr: Option<Point>,
	/// Bottom-left finder center, if located.
	pub bl: Option<Point>,
	/// Bottom-right finder center.
	pub br: Point,
}

/// Axis-aligned region of the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
	/// Left edge in pixels.
	pub x: usize,
	/// Top edge in pixels.
	pub y: usize,
	/// Width in pixels.
	pub w: usize,
	/// Height in pixels.
	pub h: usize,
}

/// Result of finder localization.
#[derive(Debug, Clone)]
pub struct LocateResult {
	/// Crop of the source around the detected code, for the no-warp
	/// fallback strategy.
	pub cropped: Bitmap,
	/// Bounding region of the crop within the source image.
	pub bounds: Region,
	/// Classified finder centers in source coordinates, when at least a
	/// diagonal pair was confirmed.
	pub corners: Option<Corners>,
	/// Estimated cell size in source pixels.
	pub cell_size_hint: f64,
	/// Number of finder candidates that survived confirmation.
	pub finders_found: usize,
}

/// Half-resolution luma image.
struct LumaHalf {
	w: usize,
	h: usize,
	data: Vec<u8>,
}

impl LumaHalf {
	fn build(bmp: &Bitmap) -> Self {
		let w = (bmp.width() / 2).max(1);
		let h = (bmp.height() / 2).max(1);
		let mut data = Vec::with_capacity(w * h);
		for y in 0..h {
			for x in 0..w {
				// Average the 2x2 block, clamped to the source.
				let mut sum = 0u32;
				let mut count = 0u32;
				for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
					let sx = 2 * x + dx;
					let sy = 2 * y + dy;
					if sx < bmp.width() && sy < bmp.height() {
						sum += u32::from(bmp.luma(sx, sy));
						count += 1;
					}
				}
				data.push((sum / count.max(1)) as u8);
			}
		}
		Self {
			w,
			h,
			data,
		}
	}

	#[inline]
	fn at(&self, x: usize, y: usize) -> u8 {
		self.data[y * self.w + x]
	}
}

/// Locates the finder patterns of a frame in a photo.
///
/// Never fails outright: with fewer than two confirmed finders the result
/// degrades to a bright-content bounding box with `corners: None`, and the
/// caller's crop-resize strategy still gets a chance.
pub fn locate(bmp: &Bitmap) -> LocateResult {
	let half = LumaHalf::build(bmp);
	let hits = scan_rows(&half);
	let mut candidates = merge_hits(hits, bmp.width().max(bmp.height()));
	for candidate in &mut candidates {
		// Two passes: the first recenters the window enough that the
		// second sees the whole center cell.
		refine_center(candidate, bmp);
		refine_center(candidate, bmp);
	}
	debug!("finder scan: {} merged candidate(s)", candidates.len());

	if candidates.len() < 2 {
		return fallback_bounding_box(bmp, candidates.len());
	}

	let corners = classify(&candidates, bmp);
	let span = candidates.iter().map(|c| c.span).fold(0.0, f64::max);
	// Span covers three cells at half resolution.
	let cell = (span * 2.0 / FINDER_SPAN as f64).max(1.0);

	let mut xs: Vec<f64> = candidates.iter().map(|c| c.x).collect();
	let mut ys: Vec<f64> = candidates.iter().map(|c| c.y).collect();
	xs.sort_by(f64::total_cmp);
	ys.sort_by(f64::total_cmp);

	// Pad by 1.5 cells (finder centers sit that far inside the frame) plus
	// a 2% margin.
	let pad = cell * 1.5 + bmp.width().max(bmp.height()) as f64 * 0.02;
	let x0 = (xs[0] - pad).max(0.0) as usize;
	let y0 = (ys[0] - pad).max(0.0) as usize;
	let x1 = ((xs[xs.len() - 1] + pad) as usize).min(bmp.width());
	let y1 = ((ys[ys.len() - 1] + pad) as usize).min(bmp.height());

	let bounds = Region {
		x: x0,
		y: y0,
		w: (x1 - x0).max(1),
		h: (y1 - y0).max(1),
	};

	LocateResult {
		cropped: bmp.crop(bounds.x, bounds.y, bounds.w, bounds.h),
		bounds,
		corners: Some(corners),
		cell_size_hint: cell,
		finders_found: candidates.len(),
	}
}

/// Raw hit from the horizontal scan: dark-run center plus triple span.
#[derive(Debug, Clone, Copy)]
struct Hit {
	x: usize,
	y: usize,
	span: usize,
}

fn scan_rows(half: &LumaHalf) -> Vec<Hit> {
	let mut hits = Vec::new();
	for y in (0..half.h).step_by(2) {
		// Collect maximal runs of bright / non-bright pixels.
		let mut runs: Vec<(bool, usize, usize)> = Vec::new(); // (bright, start, len)
		let mut x = 0;
		while x < half.w {
			let bright = half.at(x, y) >= BRIGHT_MIN;
			let start = x;
			while x < half.w && (half.at(x, y) >= BRIGHT_MIN) == bright {
				x += 1;
			}
			runs.push((bright, start, x - start));
		}

		for window in runs.windows(3) {
			let [(b1, _, l1), (dark, dark_start, dark_len), (b2, _, l2)] = window else {
				continue;
			};
			if !b1 || *dark || !b2 {
				continue;
			}
			if !runs_match(*dark_len, *l1) || !runs_match(*dark_len, *l2) {
				continue;
			}
			let x_center = dark_start + dark_len / 2;
			if confirm_vertical(half, x_center, y, *dark_len) {
				hits.push(Hit {
					x: x_center,
					y,
					span: l1 + dark_len + l2,
				});
			}
		}
	}
	hits
}

/// Run lengths agree within a factor of two, and the dark run is wide
/// enough to be a cell.
fn runs_match(dark: usize, bright: usize) -> bool {
	dark >= 2 && bright * 2 >= dark && bright <= dark * 2
}

/// Checks the column through a hit for the same white-gray-white structure.
///
/// The inner white dot of three finders splits the vertical dark run, so
/// only about half the center-cell rows need to be dark.
fn confirm_vertical(half: &LumaHalf, x: usize, y: usize, cell: usize) -> bool {
	let cell = cell.max(2);
	let y0 = y.saturating_sub(cell);
	let y1 = (y + cell).min(half.h - 1);
	if y1 - y0 < cell {
		return false;
	}

	let dark_count =
		(y0..=y1).filter(|&yy| half.at(x, yy) < BRIGHT_MIN).count();
	let ends_bright = half.at(x, y0) >= BRIGHT_MIN || half.at(x, y1) >= BRIGHT_MIN;
	ends_bright && dark_count >= cell / 2 && dark_count <= 2 * cell
}

/// Merges nearby hits (within `imageSize / 30`) into weighted candidates.
fn merge_hits(hits: Vec<Hit>, image_size: usize) -> Vec<Candidate> {
	let radius = (image_size as f64 / 30.0).max(4.0);
	let mut candidates: Vec<Candidate> = Vec::new();

	for hit in hits {
		// Full-resolution coordinates.
		let hx = (hit.x * 2) as f64;
		let hy = (hit.y * 2) as f64;

		if let Some(found) = candidates
			.iter_mut()
			.find(|c| (c.x - hx).hypot(c.y - hy) <= radius)
		{
			// Running average keeps the center stable as hits accumulate.
			let w = found.weight as f64;
			found.x = (found.x * w + hx) / (w + 1.0);
			found.y = (found.y * w + hy) / (w + 1.0);
			found.span = found.span.max(hit.span as f64);
			found.weight += 1;
		} else {
			candidates.push(Candidate {
				x: hx,
				y: hy,
				span: hit.span as f64,
				weight: 1,
			});
		}
	}

	// Keep the four best-supported candidates.
	candidates.sort_by(|a, b| b.weight.cmp(&a.weight));
	candidates.truncate(4);
	candidates
}

/// Snaps a merged candidate onto the centroid of the finder's gray center
/// cell.
///
/// The scan hits cluster on the gray rows above and below the inner dot,
/// which biases the merged center upward by a pixel or two. The centroid
/// of the non-bright pixels in a window of three quarters of a cell is
/// symmetric around the true center even when the white dot punches a hole
/// in the middle, so it removes the bias. Skipped when the window holds
/// too few dark pixels to be a finder at all.
fn refine_center(candidate: &mut Candidate, bmp: &Bitmap) {
	let radius = (candidate.span * 2.0 / FINDER_SPAN as f64 * 0.75).max(2.0) as i64;
	let cx = candidate.x as i64;
	let cy = candidate.y as i64;

	let mut sum_x = 0f64;
	let mut sum_y = 0f64;
	let mut count = 0usize;
	for y in cy - radius..=cy + radius {
		for x in cx - radius..=cx + radius {
			if bmp.contains(x, y) && bmp.luma(x as usize, y as usize) < BRIGHT_MIN {
				sum_x += x as f64;
				sum_y += y as f64;
				count += 1;
			}
		}
	}

	if count >= 4 {
		candidate.x = sum_x / count as f64;
		candidate.y = sum_y / count as f64;
	}
}

/// Mean luma of a 5x5 patch in the full-resolution image.
fn patch_luma(bmp: &Bitmap, cx: f64, cy: f64) -> i32 {
	let mut sum = 0i64;
	let mut count = 0i64;
	for dy in -2i64..=2 {
		for dx in -2i64..=2 {
			let x = cx as i64 + dx;
			let y = cy as i64 + dy;
			if bmp.contains(x, y) {
				sum += i64::from(bmp.luma(x as usize, y as usize));
				count += 1;
			}
		}
	}
	if count == 0 { 0 } else { (sum / count) as i32 }
}

/// Classifies candidates into corners.
///
/// TL is the candidate with the darkest center patch (no inner dot), BR
/// the one farthest from it. The remaining candidates split into TR and BL
/// by the sign of the cross product `(BR - TL) x (C - TL)`: with y growing
/// downward, negative means TR and positive means BL. This survives any
/// multiple-of-90-degree rotation and small shears.
fn classify(candidates: &[Candidate], bmp: &Bitmap) -> Corners {
	let lumas: Vec<i32> = candidates.iter().map(|c| patch_luma(bmp, c.x, c.y)).collect();

	let mut order: Vec<usize> = (0..candidates.len()).collect();
	order.sort_by_key(|&i| lumas[i]);

	let tl_confident =
		order.len() < 2 || lumas[order[1]] - lumas[order[0]] >= TL_GAP_MIN;
	if !tl_confident {
		debug!("TL patch gap below threshold, classifying by coordinate extremes");
		return classify_by_extremes(candidates);
	}

	let tl_index = order[0];
	let tl = Point::new(candidates[tl_index].x, candidates[tl_index].y);

	let br_index = (0..candidates.len())
		.filter(|&i| i != tl_index)
		.max_by(|&a, &b| {
			let da = (candidates[a].x - tl.x).hypot(candidates[a].y - tl.y);
			let db = (candidates[b].x - tl.x).hypot(candidates[b].y - tl.y);
			da.total_cmp(&db)
		})
		.unwrap_or(tl_index);
	let br = Point::new(candidates[br_index].x, candidates[br_index].y);

	let mut tr = None;
	let mut bl = None;
	for (i, c) in candidates.iter().enumerate() {
		if i == tl_index || i == br_index {
			continue;
		}
		let cross = (br.x - tl.x) * (c.y - tl.y) - (br.y - tl.y) * (c.x - tl.x);
		if cross < 0.0 {
			tr = Some(Point::new(c.x, c.y));
		} else {
			bl = Some(Point::new(c.x, c.y));
		}
	}

	Corners {
		tl,
		tr,
		bl,
		br,
	}
}

/// Fallback classification by coordinate extremes, used when the TL patch
/// is not clearly the darkest.
fn classify_by_extremes(candidates: &[Candidate]) -> Corners {
	let by = |f: fn(&Candidate) -> f64| {
		move |a: &&Candidate, b: &&Candidate| f(a).total_cmp(&f(b))
	};

	let tl = candidates.iter().min_by(by(|c| c.x + c.y)).copied();
	let br = candidates.iter().max_by(by(|c| c.x + c.y)).copied();
	let tr = candidates.iter().max_by(by(|c| c.x - c.y)).copied();
	let bl = candidates.iter().min_by(by(|c| c.x - c.y)).copied();

	let tl = tl.map(|c| Point::new(c.x, c.y)).unwrap_or(Point::new(0.0, 0.0));
	let br = br.map(|c| Point::new(c.x, c.y)).unwrap_or(tl);
	Corners {
		tl,
		tr: tr.map(|c| Point::new(c.x, c.y)).filter(|p| *p != tl && *p != br),
		bl: bl.map(|c| Point::new(c.x, c.y)).filter(|p| *p != tl && *p != br),
		br,
	}
}

/// Bounding box of bright-enough content, for images where the finder scan
/// came up short.
fn fallback_bounding_box(bmp: &Bitmap, found: usize) -> LocateResult {
	debug!("finder patterns not found ({found} candidates), using luma bounding box");

	let mut x0 = bmp.width();
	let mut y0 = bmp.height();
	let mut x1 = 0usize;
	let mut y1 = 0usize;
	for y in 0..bmp.height() {
		for x in 0..bmp.width() {
			if bmp.luma(x, y) > CONTENT_MIN {
				x0 = x0.min(x);
				y0 = y0.min(y);
				x1 = x1.max(x + 1);
				y1 = y1.max(y + 1);
			}
		}
	}

	let bounds = if x0 < x1 && y0 < y1 {
		Region {
			x: x0,
			y: y0,
			w: x1 - x0,
			h: y1 - y0,
		}
	} else {
		Region {
			x: 0,
			y: 0,
			w: bmp.width(),
			h: bmp.height(),
		}
	};

	LocateResult {
		cropped: bmp.crop(bounds.x, bounds.y, bounds.w, bounds.h),
		bounds,
		corners: None,
		cell_size_hint: (bounds.w.min(bounds.h) as f64 / 32.0).max(1.0),
		finders_found: found,
	}
}
