// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::hash::Hasher;

use crate::hash::HashStrategy;

/// Offset basis of the sketch's FNV-1a variant.
///
/// This is `0xcbf29ce484222349`, which differs from the published FNV-1a basis
/// (`0xcbf29ce484222325`) in its low byte. Existing sketch files were built
/// with this value, so it must not be changed.
pub const FNV_OFFSET_BASIS: u64 = 14695981039346656073;
/// FNV-1a 64-bit prime.
pub const FNV_PRIME: u64 = 1099511628211;

/// The 64-bit FNV-1a hash, fed byte by byte: xor the byte in, then multiply by
/// the prime modulo 2^64.
#[derive(Debug, Clone, Copy)]
pub struct Fnv1a64 {
    state: u64,
}

impl Fnv1a64 {
    pub fn new() -> Self {
        Fnv1a64 {
            state: FNV_OFFSET_BASIS,
        }
    }
}

impl Default for Fnv1a64 {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for Fnv1a64 {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state ^= b as u64;
            self.state = self.state.wrapping_mul(FNV_PRIME);
        }
    }
}

/// Hashes `bytes` with 64-bit FNV-1a.
pub fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hasher = Fnv1a64::new();
    hasher.write(bytes);
    hasher.finish()
}

/// The default hash strategy: a chain of FNV-1a hashes.
///
/// Row 0 is the FNV-1a hash of the key bytes. Every following row is the
/// FNV-1a hash of the lowercase hexadecimal rendering (no leading zeros) of the
/// previous row's hash. Sketch files carry no record of the strategy, so this
/// rule is what makes exported files readable by another process.
///
/// # Examples
///
/// ```
/// use countminsketch::hash::{fnv1a_64, Fnv1aChain, HashStrategy};
///
/// let hashes = Fnv1aChain.hashes(b"0", 3);
/// assert_eq!(hashes[0], fnv1a_64(b"0"));
/// assert_eq!(hashes[1], fnv1a_64(format!("{:x}", hashes[0]).as_bytes()));
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Fnv1aChain;

impl HashStrategy for Fnv1aChain {
    fn hashes(&self, key: &[u8], depth: usize) -> Vec<u64> {
        let mut hashes = Vec::with_capacity(depth);
        if depth == 0 {
            return hashes;
        }

        let mut prev = fnv1a_64(key);
        hashes.push(prev);
        for _ in 1..depth {
            prev = fnv1a_64(format!("{prev:x}").as_bytes());
            hashes.push(prev);
        }
        hashes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv1a_reference_vectors() {
        assert_eq!(fnv1a_64(b""), FNV_OFFSET_BASIS);
        assert_eq!(fnv1a_64(b""), 0xcbf29ce484222349);
        assert_eq!(fnv1a_64(b"a"), 0xaf63c04c8601bcf8);
        assert_eq!(fnv1a_64(b"foobar"), 0xe429b1cb354b8e54);
    }

    #[test]
    fn test_incremental_writes_match_one_shot() {
        let mut hasher = Fnv1a64::default();
        hasher.write(b"foo");
        hasher.write(b"bar");
        assert_eq!(hasher.finish(), fnv1a_64(b"foobar"));
    }

    #[test]
    fn test_chain_seeds_from_hex_of_previous() {
        let hashes = Fnv1aChain.hashes(b"test", 7);
        assert_eq!(hashes.len(), 7);
        assert_eq!(hashes[0], fnv1a_64(b"test"));
        for i in 1..hashes.len() {
            let hex = format!("{:x}", hashes[i - 1]);
            assert_eq!(hashes[i], fnv1a_64(hex.as_bytes()));
        }
    }

    #[test]
    fn test_chain_prefix_is_stable() {
        let short = Fnv1aChain.hashes(b"0", 3);
        let long = Fnv1aChain.hashes(b"0", 7);
        assert_eq!(short[..], long[..3]);
        assert!(Fnv1aChain.hashes(b"0", 0).is_empty());
    }
}
