//! Systematic RS(255,191) encoder.
//!
//! The codeword is the message followed by the 64-byte remainder of
//! `m(x) * x^64` divided by the generator polynomial
//! `g(x) = (x - alpha^0)(x - alpha^1) ... (x - alpha^63)`.
//!
//! Shortened blocks need no special casing here: leading zero data bytes
//! leave the division register untouched, so encoding a short message is
//! identical to encoding it zero-padded to full length.

use crate::gf256;

use super::{BLOCK_DATA, ECC_LEN};

/// Generator polynomial, descending coefficients, leading coefficient 1.
const fn generator_poly() -> [u8; ECC_LEN + 1] {
	let mut g = [0u8; ECC_LEN + 1];
	g[0] = 1;

	// Multiply the accumulated polynomial by (x - alpha^i), in place,
	// highest-degree term first so each old coefficient is read before it
	// is overwritten.
	let mut i = 0;
	while i < ECC_LEN {
		let root = gf256::EXP[i];
		let mut j = i + 1;
		while j >= 1 {
			g[j] = g[j] ^ gf256::mul(root, g[j - 1]);
			j -= 1;
		}
		i += 1;
	}
	g
}

pub(crate) const GENERATOR: [u8; ECC_LEN + 1] = generator_poly();

/// Computes the 64 parity bytes for a message of at most [`BLOCK_DATA`]
/// bytes.
pub fn parity(data: &[u8]) -> [u8; ECC_LEN] {
	debug_assert!(data.len() <= BLOCK_DATA);

	// LFSR form of the polynomial division: the register holds the current
	// remainder, highest power at index 0.
	let mut remainder = [0u8; ECC_LEN];
	for &byte in data {
		let factor = byte ^ remainder[0];
		remainder.copy_within(1.., 0);
		remainder[ECC_LEN - 1] = 0;
		if factor != 0 {
			for (r, &g) in remainder.iter_mut().zip(GENERATOR[1..].iter()) {
				*r ^= gf256::mul(factor, g);
			}
		}
	}
	remainder
}

/// Encodes a message into a systematic codeword: `data || parity`.
pub fn encode(data: &[u8]) -> Vec<u8> {
	let mut codeword = Vec::with_capacity(data.len() + ECC_LEN);
	codeword.extend_from_slice(data);
	codeword.extend_from_slice(&parity(data));
	codeword
}
