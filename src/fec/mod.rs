//! Application-layer forward error correction.
//!
//! LDGM-shaped scheme: the payload is split into `k` equal data symbols and
//! extended with `m` parity symbols. Parity `j` is the XOR of `c` data
//! symbols drawn from a seeded pseudo-random graph, chained to parity `j-1`
//! (staircase). Both sides derive the identical graph from `(k, m, c, seed)`,
//! so only those four values travel on the wire. Recovery is iterative
//! peeling: any equation with exactly one missing member yields that member.
//!
//! Layout of a protected buffer: `[payload_len: u32 BE][payload][zero pad]`
//! occupying `k` symbols, followed by `m` parity symbols. The symbol size is
//! implied by `buffer_len / (k + m)`.

pub mod fec_error;

pub use fec_error::FecError;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// FEC parameters carried in every packet of a protected frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FecParams {
    /// Data symbol count, 13 bits on the wire.
    pub k: u16,
    /// Parity symbol count, 13 bits on the wire.
    pub m: u16,
    /// Edges per parity symbol, 6 bits on the wire.
    pub c: u8,
    pub seed: u32,
}

impl FecParams {
    pub fn new(k: u16, m: u16, c: u8, seed: u32) -> Self {
        Self { k, m, c, seed }
    }

    fn validate(&self) -> Result<(), FecError> {
        if self.k == 0 || self.m == 0 || self.c == 0 || u16::from(self.c) > self.k {
            return Err(FecError::BadGeometry {
                k: self.k,
                m: self.m,
                c: self.c,
            });
        }
        Ok(())
    }

    fn symbol_count(&self) -> usize {
        usize::from(self.k) + usize::from(self.m)
    }

    /// Data-symbol neighbors of every parity equation, in graph order.
    fn edges(&self) -> Vec<Vec<usize>> {
        let mut rng = StdRng::seed_from_u64(u64::from(self.seed));
        let k = usize::from(self.k);
        let c = usize::from(self.c);
        (0..usize::from(self.m))
            .map(|_| {
                let mut neighbors = Vec::with_capacity(c);
                while neighbors.len() < c {
                    let idx = rng.gen_range(0..k);
                    if !neighbors.contains(&idx) {
                        neighbors.push(idx);
                    }
                }
                neighbors
            })
            .collect()
    }
}

fn xor_into(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= *s;
    }
}

/// Wrap `payload` into a protected buffer of `k + m` symbols.
pub fn encode(payload: &[u8], params: &FecParams) -> Result<Vec<u8>, FecError> {
    params.validate()?;
    let k = usize::from(params.k);
    let ss = (payload.len() + 4).div_ceil(k);
    let mut out = vec![0u8; params.symbol_count() * ss];
    out[..4].copy_from_slice(&(payload.len() as u32).to_be_bytes());
    out[4..4 + payload.len()].copy_from_slice(payload);

    let edges = params.edges();
    for (j, neighbors) in edges.iter().enumerate() {
        let parity_start = (k + j) * ss;
        for &n in neighbors {
            let (data_part, parity_part) = out.split_at_mut(k * ss);
            xor_into(
                &mut parity_part[j * ss..(j + 1) * ss],
                &data_part[n * ss..(n + 1) * ss],
            );
        }
        if j > 0 {
            let (before, rest) = out.split_at_mut(parity_start);
            let prev = &before[parity_start - ss..];
            xor_into(&mut rest[..ss], prev);
        }
    }
    Ok(out)
}

/// Which symbols of a protected buffer arrived in full.
///
/// `fragments` are `(offset, length)` byte ranges that were received.
pub fn symbol_presence(
    fragments: &[(u32, u32)],
    symbol_size: usize,
    symbol_count: usize,
) -> Vec<bool> {
    // Received bytes per symbol; a symbol is present when fully covered.
    let mut covered = vec![0usize; symbol_count];
    for &(off, len) in fragments {
        let mut start = off as usize;
        let end = start + len as usize;
        while start < end {
            let sym = start / symbol_size;
            if sym >= symbol_count {
                break;
            }
            let sym_end = (sym + 1) * symbol_size;
            let take = sym_end.min(end) - start;
            covered[sym] += take;
            start += take;
        }
    }
    covered.iter().map(|&c| c >= symbol_size).collect()
}

/// Recover the original payload from a partially received protected buffer.
///
/// `buffer` holds `k + m` symbols with missing regions in arbitrary state;
/// `present` flags which symbols arrived (see [`symbol_presence`]).
pub fn recover(
    buffer: &mut [u8],
    present: &[bool],
    params: &FecParams,
) -> Result<Vec<u8>, FecError> {
    params.validate()?;
    let symbols = params.symbol_count();
    if buffer.is_empty() || buffer.len() % symbols != 0 || present.len() != symbols {
        return Err(FecError::BadBufferLength {
            len: buffer.len(),
            symbols,
        });
    }
    let ss = buffer.len() / symbols;
    let k = usize::from(params.k);

    let mut have = present.to_vec();
    // Zero missing symbols so XOR accumulation starts clean.
    for (i, ok) in have.iter().enumerate() {
        if !ok {
            buffer[i * ss..(i + 1) * ss].fill(0);
        }
    }

    // Equation j touches data neighbors, parity j and (staircase) parity j-1.
    let edges = params.edges();
    let mut members: Vec<Vec<usize>> = edges
        .iter()
        .enumerate()
        .map(|(j, neighbors)| {
            let mut eq = neighbors.clone();
            eq.push(k + j);
            if j > 0 {
                eq.push(k + j - 1);
            }
            eq
        })
        .collect();

    loop {
        let mut progressed = false;
        for eq in members.iter_mut() {
            let missing: Vec<usize> = eq.iter().copied().filter(|&s| !have[s]).collect();
            if missing.len() != 1 {
                continue;
            }
            let target = missing[0];
            let mut acc = vec![0u8; ss];
            for &s in eq.iter() {
                if s != target {
                    xor_into(&mut acc, &buffer[s * ss..(s + 1) * ss]);
                }
            }
            buffer[target * ss..(target + 1) * ss].copy_from_slice(&acc);
            have[target] = true;
            progressed = true;
        }
        if !progressed {
            break;
        }
    }

    let missing_data = have[..k].iter().filter(|&&ok| !ok).count();
    if missing_data > 0 {
        return Err(FecError::Unrecoverable {
            missing: missing_data,
        });
    }

    if k * ss < 4 {
        return Err(FecError::CorruptLengthField {
            claimed: 0,
            available: 0,
        });
    }
    let claimed = u32::from_be_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) as usize;
    let available = k * ss - 4;
    if claimed > available {
        return Err(FecError::CorruptLengthField { claimed, available });
    }
    Ok(buffer[4..4 + claimed].to_vec())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    // c == k makes every parity equation cover all data symbols, so any
    // single missing symbol is recoverable regardless of the seed.
    fn params() -> FecParams {
        FecParams::new(8, 4, 8, 0x5EED)
    }

    fn payload() -> Vec<u8> {
        (0..=255u8).cycle().take(1000).collect()
    }

    #[test]
    fn encode_geometry() {
        let p = params();
        let wire = encode(&payload(), &p).unwrap();
        assert_eq!(wire.len() % (8 + 4), 0);
        // length field survives in the first data symbol
        assert_eq!(
            u32::from_be_bytes([wire[0], wire[1], wire[2], wire[3]]),
            1000
        );
    }

    #[test]
    fn intact_buffer_recovers_verbatim() {
        let p = params();
        let mut wire = encode(&payload(), &p).unwrap();
        let present = vec![true; 12];
        let out = recover(&mut wire, &present, &p).unwrap();
        assert_eq!(out, payload());
    }

    #[test]
    fn single_missing_symbol_recovers() {
        let p = params();
        let reference = encode(&payload(), &p).unwrap();
        let ss = reference.len() / 12;
        for lost in 0..8 {
            let mut wire = reference.clone();
            wire[lost * ss..(lost + 1) * ss].fill(0xAA);
            let mut present = vec![true; 12];
            present[lost] = false;
            let out = recover(&mut wire, &present, &p).unwrap();
            assert_eq!(out, payload(), "lost symbol {lost}");
        }
    }

    #[test]
    fn too_many_losses_reports_unrecoverable() {
        let p = FecParams::new(8, 1, 2, 7);
        let mut wire = encode(&payload(), &p).unwrap();
        let mut present = vec![true; 9];
        present[0] = false;
        present[1] = false;
        present[2] = false;
        match recover(&mut wire, &present, &p) {
            Err(FecError::Unrecoverable { missing }) => assert!(missing > 0),
            other => panic!("expected Unrecoverable, got {other:?}"),
        }
    }

    #[test]
    fn zero_c_is_rejected() {
        let p = FecParams::new(4, 2, 0, 1);
        assert!(matches!(
            encode(b"x", &p),
            Err(FecError::BadGeometry { .. })
        ));
    }

    #[test]
    fn presence_from_fragments() {
        // 4 symbols of 10 bytes; fragments cover symbols 0 and 2 fully,
        // symbol 1 only partially.
        let frags = [(0u32, 15u32), (20, 10)];
        let present = symbol_presence(&frags, 10, 4);
        assert_eq!(present, vec![true, false, true, false]);
    }
}
