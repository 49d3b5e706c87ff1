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

//! Hash strategies that map a key to one 64-bit hash per sketch row.

mod fnv;

pub use self::fnv::FNV_OFFSET_BASIS;
pub use self::fnv::FNV_PRIME;
pub use self::fnv::Fnv1a64;
pub use self::fnv::Fnv1aChain;
pub use self::fnv::fnv1a_64;

/// Produces the per-row hashes a sketch uses to pick one counter in each row.
///
/// Implementations must be deterministic: the same key and depth always yield
/// the same sequence, and the returned vector holds exactly `depth` values.
///
/// Any `Fn(&[u8], usize) -> Vec<u64>` closure is a strategy:
///
/// ```
/// use countminsketch::hash::HashStrategy;
///
/// let strategy = |key: &[u8], depth: usize| vec![key.len() as u64; depth];
/// assert_eq!(strategy.hashes(b"abc", 2), vec![3, 3]);
/// ```
pub trait HashStrategy {
    /// Returns `depth` hashes for `key`.
    fn hashes(&self, key: &[u8], depth: usize) -> Vec<u64>;
}

impl<F> HashStrategy for F
where
    F: Fn(&[u8], usize) -> Vec<u64>,
{
    fn hashes(&self, key: &[u8], depth: usize) -> Vec<u64> {
        self(key, depth)
    }
}
