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

//! Count-Min sketch implementation for frequency estimation.
//!
//! The Count-Min sketch provides approximate frequency counts for streaming data
//! with configurable error rate and confidence bounds. The `min` estimate never
//! underestimates, and overshoots by more than `error_rate * elements_added`
//! with probability at most `1 - confidence`.
//!
//! # Usage
//!
//! ```rust
//! use countminsketch::countmin::CountMinSketch;
//! use countminsketch::countmin::QueryMode;
//!
//! let mut sketch = CountMinSketch::new(1000, 7).unwrap();
//!
//! sketch.add("apple", 1);
//! sketch.add("banana", 3);
//!
//! let banana = sketch.check("banana", QueryMode::Min);
//! assert!(banana >= 3);
//!
//! let corrected = sketch.check("banana", "mean-min".parse().unwrap());
//! assert!(corrected <= banana);
//! ```
//!
//! # Configuration Helpers
//!
//! ```rust
//! use countminsketch::countmin::CountMinSketch;
//!
//! let width = CountMinSketch::suggest_width(0.01);
//! let depth = CountMinSketch::suggest_depth(0.99);
//!
//! let _sketch = CountMinSketch::new(width, depth).unwrap();
//! ```
//!
//! # Persistence
//!
//! ```rust,no_run
//! use countminsketch::countmin::CountMinSketch;
//!
//! let mut sketch = CountMinSketch::new(100_000, 7).unwrap();
//! sketch.add("0", 100);
//! sketch.export("sketch.cms").unwrap();
//!
//! let loaded = CountMinSketch::load("sketch.cms").unwrap();
//! assert_eq!(loaded, sketch);
//! ```

mod heavy_hitters;
mod mode;
mod serialization;
mod sketch;
mod stream_threshold;

pub use self::heavy_hitters::HeavyHitters;
pub use self::mode::QueryMode;
pub use self::sketch::CountMinSketch;
pub use self::sketch::CountMinSketchBuilder;
pub use self::stream_threshold::StreamThreshold;
