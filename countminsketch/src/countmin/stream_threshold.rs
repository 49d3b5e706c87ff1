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

/// Tracks every key whose estimate is at least `threshold`.
///
/// Membership is decided from the estimate returned by the latest `add` or
/// `remove` of that key.
///
/// # Examples
///
/// ```
/// use countminsketch::countmin::{CountMinSketch, StreamThreshold};
///
/// let mut stream = StreamThreshold::new(75, CountMinSketch::new(1000, 7).unwrap());
/// stream.add("test", 78);
/// stream.add("test1", 74);
/// assert!(stream.meets_threshold().contains_key("test"));
/// assert!(!stream.meets_threshold().contains_key("test1"));
///
/// stream.remove("test", 7);
/// assert!(stream.meets_threshold().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct StreamThreshold<H = Fnv1aChain> {
    sketch: CountMinSketch<H>,
    threshold: i32,
    meets_threshold: BTreeMap<String, i32>,
}

impl<H: HashStrategy> StreamThreshold<H> {
    /// Wraps `sketch`, tracking keys whose estimate reaches `threshold`.
    pub fn new(threshold: i32, sketch: CountMinSketch<H>) -> Self {
        StreamThreshold {
            sketch,
            threshold,
            meets_threshold: BTreeMap::new(),
        }
    }

    /// Returns the threshold.
    pub fn threshold(&self) -> i32 {
        self.threshold
    }

    /// Returns the keys at or above the threshold with their latest estimates.
    pub fn meets_threshold(&self) -> &BTreeMap<String, i32> {
        &self.meets_threshold
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
    /// # Panics
    ///
    /// Panics if `hashes` holds fewer than `depth` values.
    pub fn add_with_hashes(&mut self, key: &str, hashes: &[u64], n: i64) -> i32 {
        let estimate = self.sketch.add_with_hashes(hashes, n);
        self.track(key, estimate);
        estimate
    }

    /// Removes `n` occurrences of `key` and returns its `min` estimate.
    pub fn remove(&mut self, key: &str, n: i64) -> i32 {
        let hashes = self.sketch.hashes(key);
        self.remove_with_hashes(key, &hashes, n)
    }

    /// Removes `n` occurrences of `key`, whose hashes are `hashes`.
    ///
    /// # Panics
    ///
    /// Panics if `hashes` holds fewer than `depth` values.
    pub fn remove_with_hashes(&mut self, key: &str, hashes: &[u64], n: i64) -> i32 {
        let estimate = self.sketch.remove_with_hashes(hashes, n);
        self.track(key, estimate);
        estimate
    }

    /// Estimates the frequency of `key`.
    pub fn check(&self, key: &str, mode: QueryMode) -> i64 {
        self.sketch.check(key, mode)
    }

    /// Resets the sketch and forgets every tracked key.
    pub fn clear(&mut self) {
        self.sketch.clear();
        self.meets_threshold.clear();
    }

    /// Writes the underlying sketch to `path`.
    pub fn export(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        self.sketch.export(path)
    }

    fn track(&mut self, key: &str, estimate: i32) {
        if estimate >= self.threshold {
            self.meets_threshold.insert(key.to_string(), estimate);
        } else {
            self.meets_threshold.remove(key);
        }
    }
}
