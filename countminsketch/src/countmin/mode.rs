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

use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::error::ErrorKind;

/// The estimator applied to the per-row counters of a key.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryMode {
    /// The smallest row counter. Never underestimates the true count.
    #[default]
    Min,
    /// The floor of the mean of the row counters.
    Mean,
    /// The median of the row counters after subtracting the expected
    /// collision noise `(elements_added - counter) / (width - 1)` from each.
    MeanMin,
}

impl QueryMode {
    /// Returns the textual name of this mode.
    pub const fn as_str(self) -> &'static str {
        match self {
            QueryMode::Min => "min",
            QueryMode::Mean => "mean",
            QueryMode::MeanMin => "mean-min",
        }
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryMode {
    type Err = Error;

    /// Parses `min`, `mean` or `mean-min`, ignoring ASCII case.
    ///
    /// # Examples
    ///
    /// ```
    /// use countminsketch::countmin::QueryMode;
    ///
    /// assert_eq!("Mean-Min".parse::<QueryMode>().unwrap(), QueryMode::MeanMin);
    /// assert!("median".parse::<QueryMode>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "min" => Ok(QueryMode::Min),
            "mean" => Ok(QueryMode::Mean),
            "mean-min" => Ok(QueryMode::MeanMin),
            _ => Err(Error::new(
                ErrorKind::InvalidQueryMode,
                "query mode must be one of min, mean, mean-min",
            )
            .with_context("mode", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_display() {
        for mode in [QueryMode::Min, QueryMode::Mean, QueryMode::MeanMin] {
            assert_eq!(mode.to_string().parse::<QueryMode>().unwrap(), mode);
        }
        assert_eq!("MIN".parse::<QueryMode>().unwrap(), QueryMode::Min);
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        let err = "max".parse::<QueryMode>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidQueryMode);
        assert_eq!(err.context("mode"), Some("max"));
    }

    #[test]
    fn test_default_is_min() {
        assert_eq!(QueryMode::default(), QueryMode::Min);
    }
}
