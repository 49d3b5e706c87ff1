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

//! Flat sketch layout: `width * depth` native-endian `i32` counters in
//! row-major order, followed by a 16-byte footer of `u32 width`, `u32 depth`
//! and `i64 elements_added`.

use std::io;
use std::io::Write;

use byteorder::ByteOrder;
use byteorder::NativeEndian;
use byteorder::WriteBytesExt;

use crate::error::Error;

pub(super) const COUNTER_SIZE_BYTES: u64 = 4;
pub(super) const FOOTER_SIZE_BYTES: u64 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Footer {
    pub(super) width: u32,
    pub(super) depth: u32,
    pub(super) elements_added: i64,
}

impl Footer {
    pub(super) fn encode(&self) -> [u8; FOOTER_SIZE_BYTES as usize] {
        let mut buf = [0u8; FOOTER_SIZE_BYTES as usize];
        NativeEndian::write_u32(&mut buf[0..4], self.width);
        NativeEndian::write_u32(&mut buf[4..8], self.depth);
        NativeEndian::write_i64(&mut buf[8..16], self.elements_added);
        buf
    }

    pub(super) fn decode(buf: &[u8; FOOTER_SIZE_BYTES as usize]) -> Self {
        Footer {
            width: NativeEndian::read_u32(&buf[0..4]),
            depth: NativeEndian::read_u32(&buf[4..8]),
            elements_added: NativeEndian::read_i64(&buf[8..16]),
        }
    }

    /// Checks the footer dimensions against the total size of the data they
    /// were read from, returning the number of counters in the body.
    pub(super) fn validate(&self, total_len: u64) -> Result<usize, Error> {
        if self.width < 2 || self.depth < 1 {
            return Err(Error::corrupt("footer dimensions are out of range")
                .with_context("width", self.width)
                .with_context("depth", self.depth));
        }

        let expected = encoded_len(self.width, self.depth).ok_or_else(|| {
            Error::corrupt("footer dimensions overflow the addressable size")
                .with_context("width", self.width)
                .with_context("depth", self.depth)
        })?;
        if expected != total_len {
            return Err(Error::corrupt(format!(
                "expected {expected} bytes for a {}x{} sketch, found {total_len}",
                self.depth, self.width
            ))
            .with_context("width", self.width)
            .with_context("depth", self.depth));
        }

        usize::try_from(u64::from(self.width) * u64::from(self.depth)).map_err(|_| {
            Error::corrupt("sketch does not fit in memory")
                .with_context("width", self.width)
                .with_context("depth", self.depth)
        })
    }
}

/// Total encoded size of a sketch with the given dimensions.
pub(super) fn encoded_len(width: u32, depth: u32) -> Option<u64> {
    u64::from(width)
        .checked_mul(u64::from(depth))?
        .checked_mul(COUNTER_SIZE_BYTES)?
        .checked_add(FOOTER_SIZE_BYTES)
}

pub(super) fn write_counters<W: Write>(writer: &mut W, counters: &[i32]) -> io::Result<()> {
    for &counter in counters {
        writer.write_i32::<NativeEndian>(counter)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_footer_layout() {
        let footer = Footer {
            width: 3,
            depth: 2,
            elements_added: -7,
        };
        let buf = footer.encode();
        assert_eq!(&buf[0..4], &3u32.to_ne_bytes());
        assert_eq!(&buf[4..8], &2u32.to_ne_bytes());
        assert_eq!(&buf[8..16], &(-7i64).to_ne_bytes());
        assert_eq!(Footer::decode(&buf), footer);
    }

    #[test]
    fn test_validate_accepts_exact_size() {
        let footer = Footer {
            width: 10,
            depth: 3,
            elements_added: 0,
        };
        assert_eq!(footer.validate(10 * 3 * 4 + 16).unwrap(), 30);
    }

    #[test]
    fn test_validate_rejects_size_mismatch() {
        let footer = Footer {
            width: 10,
            depth: 3,
            elements_added: 0,
        };
        // the legacy footer stored a 4-byte element count
        let err = footer.validate(10 * 3 * 4 + 12).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptFile);
        assert_eq!(err.context("width"), Some("10"));
    }

    #[test]
    fn test_validate_rejects_degenerate_dimensions() {
        let footer = Footer {
            width: 1,
            depth: 1,
            elements_added: 0,
        };
        let err = footer.validate(20).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptFile);

        let footer = Footer {
            width: 2,
            depth: 0,
            elements_added: 0,
        };
        assert!(footer.validate(16).is_err());
    }

    #[test]
    fn test_encoded_len_overflow() {
        assert_eq!(encoded_len(2, 1), Some(24));
        assert_eq!(encoded_len(u32::MAX, u32::MAX), None);
    }
}
