//! Byte-stride block interleaving.
//!
//! Byte `j` of block `i` lands at output position `j * N + i`. Positions
//! where a shortened block has no byte `j` are skipped, keeping the output
//! dense. The permutation spreads a burst of damaged bytes across all
//! blocks so no single block exceeds the RS correction radius.

/// Interleaves RS blocks into one dense raw stream.
pub fn interleave(blocks: &[Vec<u8>]) -> Vec<u8> {
	let total: usize = blocks.iter().map(Vec::len).sum();
	let longest = blocks.iter().map(Vec::len).max().unwrap_or(0);

	let mut out = Vec::with_capacity(total);
	for j in 0..longest {
		for block in blocks {
			if let Some(&byte) = block.get(j) {
				out.push(byte);
			}
		}
	}
	out
}

/// Splits a raw stream back into blocks of the given sizes.
///
/// Exact inverse of [`interleave`]; `sizes` must sum to `raw.len()`.
pub fn deinterleave(raw: &[u8], sizes: &[usize]) -> Vec<Vec<u8>> {
	debug_assert_eq!(sizes.iter().sum::<usize>(), raw.len());

	let longest = sizes.iter().copied().max().unwrap_or(0);
	let mut blocks: Vec<Vec<u8>> = sizes.iter().map(|&len| Vec::with_capacity(len)).collect();

	let mut cursor = 0;
	for j in 0..longest {
		for (i, block) in blocks.iter_mut().enumerate() {
			if j < sizes[i] {
				block.push(raw[cursor]);
				cursor += 1;
			}
		}
	}
	blocks
}
