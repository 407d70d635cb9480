// Variant Forest
// Copyright (C) 2023 Krzysztof Piwoński <piwonski.kris@gmail.com>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Deterministic random number generation for candidate draws.
//!
//! Only rank 0 ever consumes an [`Rng`] for drawing candidate split points
//! (see [`crate::coordinator`]); other ranks hold an unused generator seeded
//! identically, purely for symmetry with rank 0's construction path.

const MULTIPLIER: u64 = 6364136223846793005;
const ROTATE: u32 = 59;
const XSHIFT: u32 = 18;
const SPARE: u32 = 27;

const SALT: u64 = match cfg!(test) {
    false => 77585124950184,
    true => 0,
};

/// PCG32 random number generator with increment = 1.
///
/// Based on Melissa E. O'Neill. PCG: A Family of Simple Fast Space-Efficient
/// Statistically Good Algorithms for Random Number Generation. Harvey Mudd
/// College, 2014.
#[derive(Clone, Copy, Debug)]
pub struct Rng {
    state: u64,
    increment: u64,
}

impl Rng {
    pub fn new(seed: u64, increment: u64) -> Self {
        if increment == 0 {
            panic!("Increment must be larger than 0.");
        }

        let mut pcg = Rng { state: seed + SALT, increment };
        pcg.state = pcg.state.wrapping_add(pcg.increment);
        pcg.step();
        pcg
    }

    #[inline]
    fn step(&mut self) {
        self.state = self.state.wrapping_mul(MULTIPLIER).wrapping_add(self.increment);
    }

    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        let state = self.state;
        self.step();

        let rot = (state >> ROTATE) as u32;
        let xsh = (((state >> XSHIFT) ^ state) >> SPARE) as u32;
        xsh.rotate_right(rot)
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let mut res = self.next_u32() as u64;
        res <<= 32;
        res += self.next_u32() as u64;
        res
    }

    #[inline]
    pub fn next_usize(&mut self, up_to: u32) -> usize {
        assert!(up_to > 0);

        if up_to == 1 {
            return 0;
        }

        let mut m: u64 = u64::from(self.next_u32()) * u64::from(up_to);
        let mut leftover: u32 = (m & 0xFFFF_FFFF) as u32;

        if leftover < up_to {
            let threshold: u32 = up_to.wrapping_neg() % up_to;
            while leftover < threshold {
                m = u64::from(self.next_u32()).wrapping_mul(u64::from(up_to));
                leftover = (m & 0xFFFF_FFFF) as u32;
            }
        }
        (m >> 32) as usize
    }

    #[inline]
    pub fn rand_uni(&mut self) -> f64 {
        loop {
            let res = self.next_u64() as f64 / u64::MAX as f64;
            if res != 0. {
                break res;
            }
        }
    }

    /// Picks a uniformly random index in `[0, len)`.
    #[inline]
    pub fn rand_index(&mut self, len: usize) -> usize {
        self.next_usize(len as u32)
    }
}

/// Seeds per-tree [`Rng`]s deterministically from a forest-wide base seed.
///
/// Tree `i` is seeded with `base_seed ^ i`, so that re-running the
/// forest driver with the same base seed reproduces the same candidate-draw
/// stream on rank 0 for every tree, independent of how many workers are
/// cooperating.
#[derive(Clone, Copy, Debug)]
pub struct RngFactory {
    base_seed: u64,
}

impl RngFactory {
    pub fn new(base_seed: u64) -> Self {
        RngFactory { base_seed }
    }

    #[inline]
    pub fn new_rng_for_tree(&self, tree_index: usize) -> Rng {
        let seed = self.base_seed ^ (tree_index as u64);
        Rng::new(seed, 1)
    }
}
