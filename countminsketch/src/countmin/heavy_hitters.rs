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

use std::collections::BTreeMap;
use std::path::Path;

use crate::countmin::CountMinSketch;
use crate::countmin::QueryMode;
use crate::error::Error;
use crate::hash::Fnv1aChain;
use crate::hash::HashStrategy;

/// Tracks the `num_hitters` keys with the largest estimates seen so far.
///
/// Keys are only ever added; removing occurrences could push a tracked key
/// below an untracked one without the tracker noticing, so there is no
/// `remove`.
///
/// # Examples
///
/// ```
/// use countminsketch::countmin::{CountMinSketch, HeavyHitters};
///
/// let mut hitters = HeavyHitters::new(2, CountMinSketch::new(1000, 7).unwrap());
/// hitters.add("test", 100);
/// hitters.add("test1", 99);
/// hitters.add("test2", 75);
///
/// assert_eq!(hitters.heavy_hitters().len(), 2);
/// assert!(!hitters.heavy_hitters().contains_key("test2"));
/// ```
#[derive(Debug, Clone)]
pub struct HeavyHitters<H = Fnv1aChain> {
    sketch: CountMinSketch<H>,
    num_hitters: usize,
    hitters: BTreeMap<String, i32>,
}

impl<H: HashStrategy> HeavyHitters<H> {
    /// Wraps `sketch`, tracking at most `num_hitters` keys.
    ///
    /// A freshly loaded sketch starts with no tracked keys; the file format
    /// stores counters only.
    pub fn new(num_hitters: usize, sketch: CountMinSketch<H>) -> Self {
        HeavyHitters {
            sketch,
            num_hitters,
            hitters: BTreeMap::new(),
        }
    }

    /// Returns the maximum number of tracked keys.
    pub fn num_hitters(&self) -> usize {
        self.num_hitters
    }

    /// Returns the tracked keys and their estimates at the time they were
    /// last added.
    pub fn heavy_hitters(&self) -> &BTreeMap<String, i32> {
        &self.hitters
    }

    /// Returns the underlying sketch.
    pub fn sketch(&self) -> &CountMinSketch<H> {
        &self.sketch
    }

    /// Consumes the tracker and returns the underlying sketch.
    pub fn into_sketch(self) -> CountMinSketch<H> {
        self.sketch
    }

    /// Adds `n` occurrences of `key` and returns its `min` estimate.
    pub fn add(&mut self, key: &str, n: i64) -> i32 {
        let hashes = self.sketch.hashes(key);
        self.add_with_hashes(key, &hashes, n)
    }

    /// Adds `n` occurrences of `key`, whose hashes are `hashes`.
    ///
    /// A tracked key is refreshed. An untracked key is inserted while there is
    /// room, otherwise it replaces the smallest tracked key if its estimate is
    /// strictly larger. Ties on the smallest estimate evict the key that sorts
    /// first.
    ///
    /// # Panics
    ///
    /// Panics if `hashes` holds fewer than `depth` values.
    pub fn add_with_hashes(&mut self, key: &str, hashes: &[u64], n: i64) -> i32 {
        let estimate = self.sketch.add_with_hashes(hashes, n);

        if let Some(tracked) = self.hitters.get_mut(key) {
            *tracked = estimate;
        } else if self.hitters.len() < self.num_hitters {
            self.hitters.insert(key.to_string(), estimate);
        } else {
            let smallest = self
                .hitters
                .iter()
                .min_by_key(|(_, e)| **e)
                .map(|(k, &e)| (k.clone(), e));
            if let Some((smallest_key, smallest)) = smallest {
                if estimate > smallest {
                    self.hitters.remove(&smallest_key);
                    self.hitters.insert(key.to_string(), estimate);
                }
            }
        }

        estimate
    }

    /// Estimates the frequency of `key`.
    pub fn check(&self, key: &str, mode: QueryMode) -> i64 {
        self.sketch.check(key, mode)
    }

    /// Resets the sketch and forgets every tracked key.
    pub fn clear(&mut self) {
        self.sketch.clear();
        self.hitters.clear();
    }

    /// Writes the underlying sketch to `path`.
    pub fn export(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        self.sketch.export(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hitters(num_hitters: usize) -> HeavyHitters {
        HeavyHitters::new(num_hitters, CountMinSketch::new(1000, 7).unwrap())
    }

    fn snapshot(hitters: &HeavyHitters) -> Vec<(&str, i32)> {
        hitters
            .heavy_hitters()
            .iter()
            .map(|(k, v)| (k.as_str(), *v))
            .collect()
    }

    #[test]
    fn test_replaces_smallest_when_full() {
        let mut hh = hitters(3);
        hh.add("test", 100);
        hh.add("test1", 99);
        hh.add("test2", 75);
        assert_eq!(snapshot(&hh), vec![("test", 100), ("test1", 99), ("test2", 75)]);

        hh.add("test3", 76);
        assert_eq!(snapshot(&hh), vec![("test", 100), ("test1", 99), ("test3", 76)]);

        // 75 + 2 beats the smallest tracked estimate of 76
        hh.add("test2", 2);
        assert_eq!(snapshot(&hh), vec![("test", 100), ("test1", 99), ("test2", 77)]);

        hh.add("test7", 112);
        assert_eq!(snapshot(&hh), vec![("test", 100), ("test1", 99), ("test7", 112)]);
    }

    #[test]
    fn test_equal_estimate_does_not_evict() {
        let mut hh = hitters(1);
        hh.add("a", 5);
        hh.add("b", 5);
        assert_eq!(snapshot(&hh), vec![("a", 5)]);
    }

    #[test]
    fn test_tracked_key_is_refreshed() {
        let mut hh = hitters(2);
        hh.add("a", 5);
        hh.add("a", 5);
        assert_eq!(snapshot(&hh), vec![("a", 10)]);
        assert_eq!(hh.check("a", QueryMode::Min), 10);
    }

    #[test]
    fn test_clear_forgets_hitters() {
        let mut hh = hitters(2);
        hh.add("a", 5);
        hh.clear();
        assert!(hh.heavy_hitters().is_empty());
        assert_eq!(hh.sketch().elements_added(), 0);
    }
}
