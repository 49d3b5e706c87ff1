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

use std::f64::consts::LN_2;
use std::fs::File;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::io::Write;
use std::path::Path;

use byteorder::ByteOrder;
use byteorder::NativeEndian;
use byteorder::ReadBytesExt;
use tracing::debug;
use tracing::warn;

use crate::countmin::QueryMode;
use crate::countmin::serialization::COUNTER_SIZE_BYTES;
use crate::countmin::serialization::FOOTER_SIZE_BYTES;
use crate::countmin::serialization::Footer;
use crate::countmin::serialization::encoded_len;
use crate::countmin::serialization::write_counters;
use crate::error::Error;
use crate::hash::Fnv1aChain;
use crate::hash::HashStrategy;

/// Count-Min sketch for estimating the frequency of keys in a stream.
///
/// The counters form a `depth x width` matrix stored row-major in one flat
/// array. Row `i` is indexed by the `i`-th hash of a key. Counters are `i32`
/// and the running element count is `i64`; both saturate at their bounds
/// instead of wrapping.
///
/// The hash strategy `H` decides which counter a key touches in each row. It
/// defaults to [`Fnv1aChain`].
#[derive(Debug, Clone)]
pub struct CountMinSketch<H = Fnv1aChain> {
    width: u32,
    depth: u32,
    confidence: f64,
    error_rate: f64,
    elements_added: i64,
    counters: Vec<i32>,
    hasher: H,
}

impl CountMinSketch {
    /// Returns a builder for creating a sketch.
    ///
    /// # Examples
    ///
    /// ```
    /// use countminsketch::countmin::CountMinSketch;
    ///
    /// // By dimensions
    /// let sketch = CountMinSketch::builder().width(1000).depth(7).build().unwrap();
    /// assert_eq!(sketch.error_rate(), 0.002);
    ///
    /// // By accuracy
    /// let sketch = CountMinSketch::builder()
    ///     .confidence(0.99999)
    ///     .error_rate(0.001)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!((sketch.width(), sketch.depth()), (2000, 17));
    /// ```
    pub fn builder() -> CountMinSketchBuilder {
        CountMinSketchBuilder::default()
    }

    /// Creates a sketch with `width` counters in each of `depth` rows.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidParameters`](crate::error::ErrorKind::InvalidParameters)
    /// if `width < 2` or `depth < 1`.
    pub fn new(width: u32, depth: u32) -> Result<Self, Error> {
        Self::builder().width(width).depth(depth).build()
    }

    /// Creates a sketch sized so that an estimate overshoots by at most
    /// `error_rate * elements_added` with probability `confidence`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidParameters`](crate::error::ErrorKind::InvalidParameters)
    /// if `confidence` is not in `(0, 1)` or `error_rate` does not yield a
    /// width of at least 2.
    pub fn with_accuracy(confidence: f64, error_rate: f64) -> Result<Self, Error> {
        Self::builder()
            .confidence(confidence)
            .error_rate(error_rate)
            .build()
    }

    /// Loads a sketch exported with the default hash strategy.
    ///
    /// See [`load_with_hasher`](Self::load_with_hasher).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::load_with_hasher(path, Fnv1aChain)
    }

    /// Deserializes a sketch produced with the default hash strategy.
    ///
    /// See [`deserialize_with_hasher`](Self::deserialize_with_hasher).
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        Self::deserialize_with_hasher(bytes, Fnv1aChain)
    }

    /// Suggests the row width for a target error rate: `ceil(2 / error_rate)`.
    ///
    /// # Panics
    ///
    /// Panics if `error_rate` is not positive.
    pub fn suggest_width(error_rate: f64) -> u32 {
        assert!(error_rate > 0.0, "error_rate must be positive");
        (2.0 / error_rate).ceil() as u32
    }

    /// Suggests the number of rows for a target confidence:
    /// `ceil(-ln(1 - confidence) / ln 2)`.
    ///
    /// # Panics
    ///
    /// Panics if `confidence` is not in `(0, 1)`.
    pub fn suggest_depth(confidence: f64) -> u32 {
        assert!(
            confidence > 0.0 && confidence < 1.0,
            "confidence must be between 0.0 and 1.0 (exclusive)"
        );
        (-(1.0 - confidence).ln() / LN_2).ceil() as u32
    }
}

impl<H: HashStrategy> CountMinSketch<H> {
    fn with_dimensions(
        width: u32,
        depth: u32,
        confidence: f64,
        error_rate: f64,
        hasher: H,
    ) -> Result<Self, Error> {
        if width < 2 {
            return Err(
                Error::invalid_parameters("width must be at least 2").with_context("width", width),
            );
        }
        if depth < 1 {
            return Err(
                Error::invalid_parameters("depth must be at least 1").with_context("depth", depth),
            );
        }
        let num_counters = encoded_len(width, depth)
            .and_then(|_| usize::try_from(u64::from(width) * u64::from(depth)).ok())
            .ok_or_else(|| {
                Error::invalid_parameters("width * depth is too large")
                    .with_context("width", width)
                    .with_context("depth", depth)
            })?;

        Ok(CountMinSketch {
            width,
            depth,
            confidence,
            error_rate,
            elements_added: 0,
            counters: vec![0; num_counters],
            hasher,
        })
    }

    fn from_footer(footer: Footer, counters: Vec<i32>, hasher: H) -> Self {
        CountMinSketch {
            width: footer.width,
            depth: footer.depth,
            confidence: confidence_for_depth(footer.depth),
            error_rate: error_rate_for_width(footer.width),
            elements_added: footer.elements_added,
            counters,
            hasher,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Returns the number of counters per row.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the number of rows.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Returns the probability that an estimate stays within the error bound.
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Returns the overestimation bound as a fraction of elements added.
    pub fn error_rate(&self) -> f64 {
        self.error_rate
    }

    /// Returns the net number of elements added (additions minus removals).
    pub fn elements_added(&self) -> i64 {
        self.elements_added
    }

    /// Returns the counters in row-major order.
    pub fn counters(&self) -> &[i32] {
        &self.counters
    }

    /// Returns the hash strategy.
    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    // ========================================================================
    // Hashing
    // ========================================================================

    /// Returns the `depth` hashes the sketch uses for `key`.
    ///
    /// The result can be passed to the `*_with_hashes` methods to avoid
    /// rehashing a key that is updated or queried repeatedly.
    pub fn hashes<K: AsRef<[u8]> + ?Sized>(&self, key: &K) -> Vec<u64> {
        self.hasher.hashes(key.as_ref(), self.depth as usize)
    }

    /// Returns `depth` hashes for `key` using this sketch's hash strategy.
    pub fn hashes_with_depth<K: AsRef<[u8]> + ?Sized>(&self, key: &K, depth: usize) -> Vec<u64> {
        self.hasher.hashes(key.as_ref(), depth)
    }

    // ========================================================================
    // Update Operations
    // ========================================================================

    /// Adds `n` occurrences of `key`.
    ///
    /// Returns the smallest of the updated counters, which is the `min`
    /// estimate for `key` right after the update.
    ///
    /// # Examples
    ///
    /// ```
    /// # use countminsketch::countmin::CountMinSketch;
    /// let mut sketch = CountMinSketch::new(1000, 7).unwrap();
    /// assert_eq!(sketch.add("apple", 3), 3);
    /// assert_eq!(sketch.add("apple", 2), 5);
    /// assert_eq!(sketch.elements_added(), 5);
    /// ```
    pub fn add<K: AsRef<[u8]> + ?Sized>(&mut self, key: &K, n: i64) -> i32 {
        let hashes = self.hashes(key);
        self.add_with_hashes(&hashes, n)
    }

    /// Adds `n` occurrences of the key whose hashes are `hashes`.
    ///
    /// # Panics
    ///
    /// Panics if `hashes` holds fewer than `depth` values.
    pub fn add_with_hashes(&mut self, hashes: &[u64], n: i64) -> i32 {
        self.update_counters(hashes, n, i64::saturating_add)
    }

    /// Removes `n` occurrences of `key`.
    ///
    /// Returns the smallest of the updated counters.
    pub fn remove<K: AsRef<[u8]> + ?Sized>(&mut self, key: &K, n: i64) -> i32 {
        let hashes = self.hashes(key);
        self.remove_with_hashes(&hashes, n)
    }

    /// Removes `n` occurrences of the key whose hashes are `hashes`.
    ///
    /// # Panics
    ///
    /// Panics if `hashes` holds fewer than `depth` values.
    pub fn remove_with_hashes(&mut self, hashes: &[u64], n: i64) -> i32 {
        self.update_counters(hashes, n, i64::saturating_sub)
    }

    /// Resets every counter and the element count to zero.
    ///
    /// Dimensions, confidence and error rate are kept.
    pub fn clear(&mut self) {
        self.counters.fill(0);
        self.elements_added = 0;
    }

    /// Adds the counters of `other` into this sketch.
    ///
    /// Both sketches must have the same dimensions and should share a hash
    /// strategy, otherwise the merged estimates are meaningless.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidParameters`](crate::error::ErrorKind::InvalidParameters)
    /// if the dimensions differ.
    ///
    /// # Examples
    ///
    /// ```
    /// # use countminsketch::countmin::{CountMinSketch, QueryMode};
    /// let mut left = CountMinSketch::new(1000, 5).unwrap();
    /// let mut right = CountMinSketch::new(1000, 5).unwrap();
    /// left.add("a", 2);
    /// right.add("a", 3);
    ///
    /// left.merge(&right).unwrap();
    /// assert_eq!(left.check("a", QueryMode::Min), 5);
    /// ```
    pub fn merge<H2>(&mut self, other: &CountMinSketch<H2>) -> Result<(), Error> {
        if self.width != other.width || self.depth != other.depth {
            return Err(
                Error::invalid_parameters("cannot merge sketches with different dimensions")
                    .with_context("width", self.width)
                    .with_context("depth", self.depth)
                    .with_context("other_width", other.width)
                    .with_context("other_depth", other.depth),
            );
        }

        for (counter, other) in self.counters.iter_mut().zip(&other.counters) {
            *counter = counter.saturating_add(*other);
        }
        self.elements_added = self.elements_added.saturating_add(other.elements_added);
        Ok(())
    }

    // ========================================================================
    // Query Operations
    // ========================================================================

    /// Estimates the frequency of `key` with the given estimator.
    ///
    /// # Examples
    ///
    /// ```
    /// # use countminsketch::countmin::{CountMinSketch, QueryMode};
    /// let mut sketch = CountMinSketch::new(1000, 7).unwrap();
    /// sketch.add("test", 100);
    /// sketch.add("test1", 99);
    ///
    /// assert_eq!(sketch.check("test", QueryMode::Min), 100);
    /// assert_eq!(sketch.check("missing", QueryMode::Min), 0);
    /// ```
    pub fn check<K: AsRef<[u8]> + ?Sized>(&self, key: &K, mode: QueryMode) -> i64 {
        let hashes = self.hashes(key);
        self.check_with_hashes(&hashes, mode)
    }

    /// Estimates the frequency of the key whose hashes are `hashes`.
    ///
    /// `mean` and `mean-min` round toward negative infinity, including when
    /// the median of an even number of rows is halved.
    ///
    /// # Panics
    ///
    /// Panics if `hashes` holds fewer than `depth` values.
    pub fn check_with_hashes(&self, hashes: &[u64], mode: QueryMode) -> i64 {
        let mut values = self.row_values(hashes);
        values.sort_unstable();

        match mode {
            QueryMode::Min => values[0],
            QueryMode::Mean => {
                let sum: i128 = values.iter().map(|&v| i128::from(v)).sum();
                sum.div_euclid(values.len() as i128) as i64
            }
            QueryMode::MeanMin => {
                let noise_divisor = i64::from(self.width) - 1;
                let mut corrected: Vec<i64> = values
                    .iter()
                    .map(|&b| {
                        let noise = self.elements_added.saturating_sub(b).div_euclid(noise_divisor);
                        b.saturating_sub(noise)
                    })
                    .collect();
                corrected.sort_unstable();

                let mid = corrected.len() / 2;
                if corrected.len() % 2 == 0 {
                    floor_midpoint(corrected[mid - 1], corrected[mid])
                } else {
                    corrected[mid]
                }
            }
        }
    }

    // ========================================================================
    // Serialization
    // ========================================================================

    /// Serializes the sketch into the flat counters-then-footer layout.
    ///
    /// Integers are written in the host's native byte order, so the bytes are
    /// only portable between hosts of the same endianness.
    ///
    /// # Examples
    ///
    /// ```
    /// # use countminsketch::countmin::{CountMinSketch, QueryMode};
    /// let mut sketch = CountMinSketch::new(100, 3).unwrap();
    /// sketch.add("test", 4);
    ///
    /// let bytes = sketch.serialize();
    /// assert_eq!(bytes.len(), 100 * 3 * 4 + 16);
    ///
    /// let restored = CountMinSketch::deserialize(&bytes).unwrap();
    /// assert_eq!(restored.check("test", QueryMode::Min), 4);
    /// ```
    pub fn serialize(&self) -> Vec<u8> {
        let body_len = self.counters.len() * COUNTER_SIZE_BYTES as usize;
        let mut bytes = vec![0u8; body_len + FOOTER_SIZE_BYTES as usize];
        NativeEndian::write_i32_into(&self.counters, &mut bytes[..body_len]);
        bytes[body_len..].copy_from_slice(&self.footer().encode());
        bytes
    }

    /// Deserializes a sketch and attaches `hasher` to it.
    ///
    /// The layout records no hash strategy; `hasher` must match the one the
    /// sketch was built with for estimates to be meaningful.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::CorruptFile`](crate::error::ErrorKind::CorruptFile)
    /// if the footer is missing or its dimensions disagree with the data size.
    pub fn deserialize_with_hasher(bytes: &[u8], hasher: H) -> Result<Self, Error> {
        let total_len = bytes.len() as u64;
        let Some(body_len) = total_len.checked_sub(FOOTER_SIZE_BYTES) else {
            return Err(Error::corrupt("data is shorter than the sketch footer")
                .with_context("len", total_len));
        };
        let body_len = body_len as usize;

        let mut footer_bytes = [0u8; FOOTER_SIZE_BYTES as usize];
        footer_bytes.copy_from_slice(&bytes[body_len..]);
        let footer = Footer::decode(&footer_bytes);
        let num_counters = footer.validate(total_len)?;

        let mut counters = vec![0i32; num_counters];
        NativeEndian::read_i32_into(&bytes[..body_len], &mut counters);
        Ok(Self::from_footer(footer, counters, hasher))
    }

    /// Writes the sketch to `path`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::IoFailure`](crate::error::ErrorKind::IoFailure)
    /// with the path and the underlying cause if the file cannot be written.
    pub fn export(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|err| Error::io_failure("create", path, err))?;

        let mut writer = BufWriter::new(file);
        write_counters(&mut writer, &self.counters)
            .and_then(|_| writer.write_all(&self.footer().encode()))
            .and_then(|_| writer.flush())
            .map_err(|err| Error::io_failure("write", path, err))?;

        debug!(
            "Exported count-min sketch to {}: width={}, depth={}, elements_added={}",
            path.display(),
            self.width,
            self.depth,
            self.elements_added
        );
        Ok(())
    }

    /// Loads a sketch from `path` and attaches `hasher` to it.
    ///
    /// The footer is read first from the last 16 bytes; its dimensions are
    /// checked against the file size before any counter is read. Confidence
    /// and error rate are recomputed from the dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::IoFailure`](crate::error::ErrorKind::IoFailure)
    /// if the file cannot be opened or read, and
    /// [`ErrorKind::CorruptFile`](crate::error::ErrorKind::CorruptFile) if its
    /// size disagrees with the footer.
    pub fn load_with_hasher(path: impl AsRef<Path>, hasher: H) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| Error::io_failure("open", path, err))?;
        let file_len = file
            .metadata()
            .map_err(|err| Error::io_failure("stat", path, err))?
            .len();
        if file_len < FOOTER_SIZE_BYTES {
            warn!("Rejected sketch file {}: {} bytes is too short", path.display(), file_len);
            return Err(Error::corrupt("file is shorter than the sketch footer")
                .with_context("path", path.display())
                .with_context("len", file_len));
        }

        let mut reader = BufReader::new(file);
        let mut footer_bytes = [0u8; FOOTER_SIZE_BYTES as usize];
        reader
            .seek(SeekFrom::End(-(FOOTER_SIZE_BYTES as i64)))
            .and_then(|_| reader.read_exact(&mut footer_bytes))
            .map_err(|err| Error::io_failure("read footer of", path, err))?;

        let footer = Footer::decode(&footer_bytes);
        let num_counters = footer.validate(file_len).map_err(|err| {
            warn!("Rejected sketch file {}: {}", path.display(), err.message());
            err.with_context("path", path.display())
        })?;

        let mut counters = vec![0i32; num_counters];
        reader
            .seek(SeekFrom::Start(0))
            .and_then(|_| reader.read_i32_into::<NativeEndian>(&mut counters))
            .map_err(|err| Error::io_failure("read counters of", path, err))?;

        debug!(
            "Loaded count-min sketch from {}: width={}, depth={}, elements_added={}",
            path.display(),
            footer.width,
            footer.depth,
            footer.elements_added
        );
        Ok(Self::from_footer(footer, counters, hasher))
    }

    // ========================================================================
    // Internal Helpers
    // ========================================================================

    fn footer(&self) -> Footer {
        Footer {
            width: self.width,
            depth: self.depth,
            elements_added: self.elements_added,
        }
    }

    /// Index of the counter a hash selects in `row`: `row * width + hash % width`.
    fn counter_index(&self, row: usize, hash: u64) -> usize {
        let width = u64::from(self.width);
        row * self.width as usize + (hash % width) as usize
    }

    fn row_hashes<'a>(&self, hashes: &'a [u64]) -> &'a [u64] {
        let depth = self.depth as usize;
        assert!(
            hashes.len() >= depth,
            "expected at least {depth} hashes, got {}",
            hashes.len()
        );
        &hashes[..depth]
    }

    fn row_values(&self, hashes: &[u64]) -> Vec<i64> {
        self.row_hashes(hashes)
            .iter()
            .enumerate()
            .map(|(row, &hash)| i64::from(self.counters[self.counter_index(row, hash)]))
            .collect()
    }

    /// Applies `op(counter, n)` to the counter of every row, clamping to the
    /// `i32` range, and `op(elements_added, n)` to the element count.
    fn update_counters(&mut self, hashes: &[u64], n: i64, op: fn(i64, i64) -> i64) -> i32 {
        let mut min = i32::MAX;
        for (row, &hash) in self.row_hashes(hashes).iter().enumerate() {
            let index = self.counter_index(row, hash);
            let updated = clamp_to_i32(op(i64::from(self.counters[index]), n));
            self.counters[index] = updated;
            min = min.min(updated);
        }
        self.elements_added = op(self.elements_added, n);
        min
    }
}

/// Compares dimensions, element count and counters. The hash strategy and the
/// supplied confidence or error rate are not part of the comparison.
impl<H, H2> PartialEq<CountMinSketch<H2>> for CountMinSketch<H> {
    fn eq(&self, other: &CountMinSketch<H2>) -> bool {
        self.width == other.width
            && self.depth == other.depth
            && self.elements_added == other.elements_added
            && self.counters == other.counters
    }
}

fn confidence_for_depth(depth: u32) -> f64 {
    1.0 - (-f64::from(depth)).exp2()
}

fn error_rate_for_width(width: u32) -> f64 {
    2.0 / f64::from(width)
}

fn clamp_to_i32(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// `floor((a + b) / 2)` without overflowing.
fn floor_midpoint(a: i64, b: i64) -> i64 {
    a.div_euclid(2) + b.div_euclid(2) + (a.rem_euclid(2) + b.rem_euclid(2)) / 2
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for creating [`CountMinSketch`] instances.
///
/// Exactly one parameter pair must be supplied:
/// - [`width()`](Self::width) and [`depth()`](Self::depth): exact dimensions
/// - [`confidence()`](Self::confidence) and [`error_rate()`](Self::error_rate):
///   dimensions derived as `width = ceil(2 / error_rate)` and
///   `depth = ceil(-ln(1 - confidence) / ln 2)`
#[derive(Debug, Clone)]
pub struct CountMinSketchBuilder<H = Fnv1aChain> {
    width: Option<u32>,
    depth: Option<u32>,
    confidence: Option<f64>,
    error_rate: Option<f64>,
    hasher: H,
}

impl Default for CountMinSketchBuilder {
    fn default() -> Self {
        CountMinSketchBuilder {
            width: None,
            depth: None,
            confidence: None,
            error_rate: None,
            hasher: Fnv1aChain,
        }
    }
}

impl<H: HashStrategy> CountMinSketchBuilder<H> {
    /// Sets the number of counters per row.
    pub fn width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    /// Sets the number of rows.
    pub fn depth(mut self, depth: u32) -> Self {
        self.depth = Some(depth);
        self
    }

    /// Sets the probability that estimates stay within the error bound.
    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Sets the overestimation bound as a fraction of elements added.
    pub fn error_rate(mut self, error_rate: f64) -> Self {
        self.error_rate = Some(error_rate);
        self
    }

    /// Replaces the hash strategy.
    ///
    /// # Examples
    ///
    /// ```
    /// # use countminsketch::countmin::{CountMinSketch, QueryMode};
    /// let identity = |key: &[u8], depth: usize| vec![key[0] as u64; depth];
    /// let mut sketch = CountMinSketch::builder()
    ///     .width(256)
    ///     .depth(2)
    ///     .hasher(identity)
    ///     .build()
    ///     .unwrap();
    ///
    /// sketch.add("a", 1);
    /// assert_eq!(sketch.check("abc", QueryMode::Min), 1);
    /// ```
    pub fn hasher<H2: HashStrategy>(self, hasher: H2) -> CountMinSketchBuilder<H2> {
        CountMinSketchBuilder {
            width: self.width,
            depth: self.depth,
            confidence: self.confidence,
            error_rate: self.error_rate,
            hasher,
        }
    }

    /// Builds the sketch with zeroed counters.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidParameters`](crate::error::ErrorKind::InvalidParameters)
    /// if no parameter pair, an incomplete pair, or both pairs were supplied,
    /// or if the parameters are out of range. Nothing is allocated on error.
    pub fn build(self) -> Result<CountMinSketch<H>, Error> {
        match (self.width, self.depth, self.confidence, self.error_rate) {
            (Some(width), Some(depth), None, None) => CountMinSketch::with_dimensions(
                width,
                depth,
                confidence_for_depth(depth),
                error_rate_for_width(width),
                self.hasher,
            ),
            (None, None, Some(confidence), Some(error_rate)) => {
                if !(confidence > 0.0 && confidence < 1.0) {
                    return Err(Error::invalid_parameters(
                        "confidence must be between 0.0 and 1.0 (exclusive)",
                    )
                    .with_context("confidence", confidence));
                }
                if !(error_rate > 0.0 && 2.0 / error_rate <= f64::from(u32::MAX)) {
                    return Err(Error::invalid_parameters(
                        "error_rate must be positive and yield a width that fits in 32 bits",
                    )
                    .with_context("error_rate", error_rate));
                }

                let width = CountMinSketch::suggest_width(error_rate);
                let depth = CountMinSketch::suggest_depth(confidence);
                CountMinSketch::with_dimensions(width, depth, confidence, error_rate, self.hasher)
            }
            (None, None, None, None) => Err(Error::invalid_parameters(
                "either width and depth, or confidence and error_rate, must be supplied",
            )),
            (width, depth, confidence, error_rate) => Err(Error::invalid_parameters(
                "exactly one of {width, depth} or {confidence, error_rate} must be supplied",
            )
            .with_context("width", format!("{width:?}"))
            .with_context("depth", format!("{depth:?}"))
            .with_context("confidence", format!("{confidence:?}"))
            .with_context("error_rate", format!("{error_rate:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn raw_row_values<H: HashStrategy>(sketch: &CountMinSketch<H>, key: &str) -> Vec<i64> {
        sketch.row_values(&sketch.hashes(key))
    }

    #[test]
    fn test_dimension_parameters() {
        let sketch = CountMinSketch::new(10000, 7).unwrap();
        assert_eq!(sketch.width(), 10000);
        assert_eq!(sketch.depth(), 7);
        assert_eq!(sketch.elements_added(), 0);
        assert_eq!(sketch.counters().len(), 70000);
        assert!(sketch.counters().iter().all(|&c| c == 0));
        assert_eq!(sketch.confidence(), 1.0 - 1.0 / 128.0);
        assert!((sketch.error_rate() - 0.0002).abs() < 1e-12);
    }

    #[test]
    fn test_accuracy_parameters() {
        let sketch = CountMinSketch::with_accuracy(0.99999, 0.001).unwrap();
        assert_eq!(sketch.width(), 2000);
        assert_eq!(sketch.depth(), 17);
        assert_eq!(sketch.confidence(), 0.99999);
        assert_eq!(sketch.error_rate(), 0.001);
        assert_eq!(sketch.counters().len(), 2000 * 17);
    }

    #[test]
    fn test_suggest_depth_small_confidence() {
        assert_eq!(CountMinSketch::suggest_depth(0.3), 1);
        assert_eq!(CountMinSketch::suggest_depth(0.9), 4);
        assert_eq!(CountMinSketch::suggest_width(0.5), 4);
    }

    #[test]
    fn test_bad_dimensions() {
        for (width, depth) in [(0, 5), (1, 5), (10000, 0)] {
            let err = CountMinSketch::new(width, depth).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidParameters);
        }
    }

    #[test]
    fn test_bad_accuracy() {
        let cases = [(0.99999, -0.001), (-0.99999, 0.001), (1.0, 0.01), (0.9, 0.0)];
        for (confidence, error_rate) in cases {
            let err = CountMinSketch::with_accuracy(confidence, error_rate).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidParameters);
        }
        // a width of one leaves no room for the mean-min noise estimate
        let err = CountMinSketch::with_accuracy(0.9, 2.0).unwrap_err();
        assert_eq!(err.context("width"), Some("1"));
    }

    #[test]
    fn test_builder_requires_one_complete_pair() {
        let err = CountMinSketch::builder().build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameters);

        let err = CountMinSketch::builder().width(100).build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameters);
        assert_eq!(err.context("depth"), Some("None"));

        let err = CountMinSketch::builder()
            .width(100)
            .depth(3)
            .confidence(0.9)
            .error_rate(0.1)
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameters);
    }

    #[test]
    fn test_min_is_literal_row_minimum() {
        let mut sketch = CountMinSketch::new(50, 5).unwrap();
        for i in 0..500 {
            sketch.add(&format!("key-{}", i % 37), (i % 7) as i64 + 1);
        }
        for i in 0..37 {
            let key = format!("key-{i}");
            let rows = raw_row_values(&sketch, &key);
            assert_eq!(sketch.check(&key, QueryMode::Min), *rows.iter().min().unwrap());
        }
    }

    #[test]
    fn test_add_returns_min_after_update() {
        let mut sketch = CountMinSketch::new(20, 4).unwrap();
        for i in 0..100 {
            sketch.add(&i.to_string(), 1);
        }
        let returned = sketch.add("7", 5);
        assert_eq!(i64::from(returned), sketch.check("7", QueryMode::Min));
    }

    #[test]
    fn test_mean_and_mean_min_even_depth() {
        let mut sketch = CountMinSketch::new(10, 2).unwrap();
        sketch.add_with_hashes(&[0, 1], 10);
        sketch.add_with_hashes(&[0, 2], 7);
        assert_eq!(sketch.elements_added(), 17);

        // rows hold 17 and 10; noise is (17 - b) / 9, floored
        assert_eq!(sketch.check_with_hashes(&[0, 1], QueryMode::Min), 10);
        assert_eq!(sketch.check_with_hashes(&[0, 1], QueryMode::Mean), 13);
        // (17 + 10) / 2 floored
        assert_eq!(sketch.check_with_hashes(&[0, 1], QueryMode::MeanMin), 13);
    }

    #[test]
    fn test_mean_floors_negative_values() {
        let mut sketch = CountMinSketch::new(10, 2).unwrap();
        sketch.remove_with_hashes(&[3, 4], 3);
        assert_eq!(sketch.elements_added(), -3);

        // rows hold -3 and 0
        assert_eq!(sketch.check_with_hashes(&[3, 5], QueryMode::Min), -3);
        assert_eq!(sketch.check_with_hashes(&[3, 5], QueryMode::Mean), -2);
        // corrected values -3 and 0 - floor(-3 / 9) = 1
        assert_eq!(sketch.check_with_hashes(&[3, 5], QueryMode::MeanMin), -1);
    }

    #[test]
    fn test_mean_min_odd_depth_takes_median() {
        let mut sketch = CountMinSketch::new(11, 3).unwrap();
        sketch.add_with_hashes(&[0, 0, 0], 50);
        sketch.add_with_hashes(&[1, 0, 1], 30);
        sketch.add_with_hashes(&[2, 2, 1], 20);
        // rows for [0, 0, 0] hold 50, 80 and 50; elements_added = 100
        // corrected: 50 - 5 = 45, 80 - 2 = 78, 45
        assert_eq!(sketch.check_with_hashes(&[0, 0, 0], QueryMode::MeanMin), 45);
        assert_eq!(sketch.check_with_hashes(&[0, 0, 0], QueryMode::Mean), 60);
    }

    #[test]
    fn test_counter_saturation() {
        let mut sketch = CountMinSketch::new(1000, 7).unwrap();
        assert_eq!(sketch.add("x", i32::MAX as i64), i32::MAX);
        assert_eq!(sketch.add("x", 1), i32::MAX);
        assert!(raw_row_values(&sketch, "x").iter().all(|&v| v == i32::MAX as i64));
        assert_eq!(sketch.elements_added(), i32::MAX as i64 + 1);

        let mut sketch = CountMinSketch::new(1000, 7).unwrap();
        assert_eq!(sketch.remove("y", i64::MAX), i32::MIN);
        assert_eq!(sketch.elements_added(), -i64::MAX);
        sketch.remove("y", 5);
        assert_eq!(sketch.elements_added(), i64::MIN);
        assert_eq!(sketch.check("y", QueryMode::Min), i32::MIN as i64);
    }

    #[test]
    fn test_elements_added_saturates() {
        let mut sketch = CountMinSketch::new(100, 2).unwrap();
        sketch.add("a", i64::MAX);
        sketch.add("b", 1);
        assert_eq!(sketch.elements_added(), i64::MAX);
        // mean-min noise must not overflow either
        let _ = sketch.check("c", QueryMode::MeanMin);
    }

    #[test]
    fn test_add_then_remove_restores_state() {
        let mut sketch = CountMinSketch::new(200, 5).unwrap();
        for i in 0..50 {
            sketch.add(&i.to_string(), i + 1);
        }
        let before = sketch.clone();
        sketch.add("probe", 42);
        assert_ne!(sketch, before);
        sketch.remove("probe", 42);
        assert_eq!(sketch, before);
    }

    #[test]
    fn test_clear_keeps_parameters() {
        let mut sketch = CountMinSketch::with_accuracy(0.99, 0.01).unwrap();
        sketch.add("a", 10);
        sketch.clear();
        assert_eq!(sketch.elements_added(), 0);
        assert!(sketch.counters().iter().all(|&c| c == 0));
        assert_eq!(sketch.confidence(), 0.99);
        assert_eq!(sketch.error_rate(), 0.01);
        assert_eq!(sketch.width(), 200);
        assert_eq!(sketch.depth(), 7);
    }

    #[test]
    fn test_merge_requires_same_dimensions() {
        let mut left = CountMinSketch::new(100, 3).unwrap();
        let right = CountMinSketch::new(100, 4).unwrap();
        let err = left.merge(&right).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameters);
        assert_eq!(err.context("other_depth"), Some("4"));
    }

    #[test]
    fn test_merge_saturates() {
        let mut left = CountMinSketch::new(100, 3).unwrap();
        let mut right = CountMinSketch::new(100, 3).unwrap();
        left.add("a", i32::MAX as i64);
        right.add("a", 10);
        left.merge(&right).unwrap();
        assert_eq!(left.check("a", QueryMode::Min), i32::MAX as i64);
        assert_eq!(left.elements_added(), i32::MAX as i64 + 10);
    }

    #[test]
    #[should_panic(expected = "expected at least 3 hashes")]
    fn test_short_hash_slice_panics() {
        let mut sketch = CountMinSketch::new(100, 3).unwrap();
        sketch.add_with_hashes(&[1, 2], 1);
    }

    #[test]
    fn test_floor_midpoint() {
        assert_eq!(floor_midpoint(10, 17), 13);
        assert_eq!(floor_midpoint(-3, 0), -2);
        assert_eq!(floor_midpoint(i64::MAX, i64::MAX), i64::MAX);
        assert_eq!(floor_midpoint(i64::MIN, i64::MIN), i64::MIN);
        assert_eq!(floor_midpoint(i64::MIN, i64::MAX), -1);
    }
}
