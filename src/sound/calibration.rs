//! Piecewise-linear timer calibration.
//!
//! Each hardware timer has its own table that maps a tone period (timer
//! top) to the compare value giving the loudest output for this particular
//! board.  Tables are produced by the off-line tuning tool and persisted as:
//!
//! ```text
//!  ┌────────┬──────────────────────────────────────────────┬─────┐
//!  │ len u8 │ threshold u16 │ mult i16 │ div i16 │ const i16 │ ... │
//!  └────────┴──────────────────────────────────────────────┴─────┘
//!             one 8-byte little-endian record per segment
//! ```
//!
//! Segment `i` covers `[t(i-1), t(i))`, segment 0 starts at 0 and the last
//! segment is the catch-all: its stored threshold is never a boundary.

use core::fmt;

use heapless::Vec;
use log::{error, info};

use crate::app::ports::StoragePort;
use crate::error::{CalibrationError, Error};

/// Upper bound on segments per table.
pub const MAX_SEGMENTS: usize = 10;
/// Bytes per persisted segment record.
pub const RECORD_BYTES: usize = 8;
/// Bytes reserved per table in the store (length byte + full records).
pub const REGION_BYTES: usize = 1 + MAX_SEGMENTS * RECORD_BYTES;

/// Size of the persisted image; both tables sit at its end.
pub const IMAGE_BYTES: usize = 1024;
/// Tone timer table region.
pub const TONE_TABLE_OFFSET: usize = IMAGE_BYTES - 2 * REGION_BYTES;
/// Boost timer table region.
pub const BOOST_TABLE_OFFSET: usize = IMAGE_BYTES - REGION_BYTES;

/// One linear piece: `f(x) = multiplier * x / divisor + constant`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationSegment {
    pub threshold: u16,
    pub multiplier: i32,
    pub divisor: i32,
    pub constant: i32,
}

impl CalibrationSegment {
    /// Evaluate this piece.  Intermediates are 64-bit; the result saturates.
    pub fn eval(&self, x: u16) -> i32 {
        let y = i64::from(self.multiplier) * i64::from(x) / i64::from(self.divisor)
            + i64::from(self.constant);
        y.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
    }

    fn decode(rec: &[u8]) -> Self {
        let u16_at = |i: usize| u16::from_le_bytes([rec[i], rec[i + 1]]);
        let i16_at = |i: usize| i16::from_le_bytes([rec[i], rec[i + 1]]);
        Self {
            threshold: u16_at(0),
            multiplier: i32::from(i16_at(2)),
            divisor: i32::from(i16_at(4)),
            constant: i32::from(i16_at(6)),
        }
    }

    fn encode(&self, out: &mut [u8]) {
        out[0..2].copy_from_slice(&self.threshold.to_le_bytes());
        out[2..4].copy_from_slice(&(self.multiplier as i16).to_le_bytes());
        out[4..6].copy_from_slice(&(self.divisor as i16).to_le_bytes());
        out[6..8].copy_from_slice(&(self.constant as i16).to_le_bytes());
    }
}

/// Validated, immutable piecewise function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibrationTable {
    segments: Vec<CalibrationSegment, MAX_SEGMENTS>,
}

impl CalibrationTable {
    /// Build a table from segments, applying the same checks as [`load`](Self::load).
    pub fn new(segments: &[CalibrationSegment]) -> Result<Self, CalibrationError> {
        let len = segments.len();
        if len == 0 || len > MAX_SEGMENTS {
            return Err(CalibrationError::InvalidLength(len.min(usize::from(u8::MAX)) as u8));
        }
        for (index, seg) in segments.iter().enumerate() {
            if seg.divisor == 0 {
                return Err(CalibrationError::ZeroDivisor { index });
            }
        }
        // The catch-all's stored threshold takes no part in ordering.
        let bounded = &segments[..len - 1];
        for index in 1..bounded.len() {
            if bounded[index].threshold <= bounded[index - 1].threshold {
                return Err(CalibrationError::NonMonotonicThresholds { index });
            }
        }

        let mut v = Vec::new();
        for seg in segments {
            // Capacity checked above.
            let _ = v.push(*seg);
        }
        Ok(Self { segments: v })
    }

    /// A table that maps everything to 0 (silent/unmodulated output).
    pub fn zero() -> Self {
        let mut segments = Vec::new();
        let _ = segments.push(CalibrationSegment {
            threshold: 0,
            multiplier: 0,
            divisor: 1,
            constant: 0,
        });
        Self { segments }
    }

    /// Parse a persisted region: length byte, then `length` records.
    pub fn load(bytes: &[u8]) -> Result<Self, CalibrationError> {
        let Some((&len, body)) = bytes.split_first() else {
            return Err(CalibrationError::Truncated);
        };
        let n = usize::from(len);
        if n == 0 || n > MAX_SEGMENTS {
            return Err(CalibrationError::InvalidLength(len));
        }
        if body.len() < n * RECORD_BYTES {
            return Err(CalibrationError::Truncated);
        }

        let mut segments: Vec<CalibrationSegment, MAX_SEGMENTS> = Vec::new();
        for rec in body.chunks_exact(RECORD_BYTES).take(n) {
            let _ = segments.push(CalibrationSegment::decode(rec));
        }
        Self::new(&segments)
    }

    /// Read and parse the region starting at `offset` in `store`.
    pub fn load_from(store: &impl StoragePort, offset: usize) -> Result<Self, Error> {
        let mut buf = [0u8; REGION_BYTES];
        store.read(offset, &mut buf)?;
        Ok(Self::load(&buf)?)
    }

    /// Load a table for boot, falling back to [`zero`](Self::zero) with a
    /// diagnostic if the stored data is unusable.
    pub fn load_or_zero(store: &impl StoragePort, offset: usize, label: &str) -> Self {
        match Self::load_from(store, offset) {
            Ok(table) => {
                info!("{} calibration:\n{}", label, table);
                table
            }
            Err(e) => {
                error!(
                    "{} calibration at 0x{:03x} rejected ({}); output muted until recalibrated",
                    label, offset, e
                );
                Self::zero()
            }
        }
    }

    /// Serialise into the persisted layout.  Returns the bytes written.
    pub fn encode(&self, out: &mut [u8; REGION_BYTES]) -> usize {
        out.fill(0);
        out[0] = self.segments.len() as u8;
        for (seg, rec) in self
            .segments
            .iter()
            .zip(out[1..].chunks_exact_mut(RECORD_BYTES))
        {
            seg.encode(rec);
        }
        1 + self.segments.len() * RECORD_BYTES
    }

    /// Index of the segment covering `x`.
    pub fn select(&self, x: u16) -> usize {
        let last = self.segments.len() - 1;
        self.segments[..last]
            .iter()
            .position(|seg| x < seg.threshold)
            .unwrap_or(last)
    }

    /// Evaluate the piecewise function at `x`.
    pub fn apply(&self, x: u16) -> i32 {
        self.segments[self.select(x)].eval(x)
    }

    pub fn segments(&self) -> &[CalibrationSegment] {
        &self.segments
    }
}

impl fmt::Display for CalibrationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last = self.segments.len() - 1;
        let mut lower = 0u16;
        for (i, seg) in self.segments.iter().enumerate() {
            let lead = if i == 0 { "f(x) = {" } else { "        " };
            write!(
                f,
                "{} ({})*x/({}) + ({}),",
                lead, seg.multiplier, seg.divisor, seg.constant
            )?;
            if i == last {
                writeln!(f, "\t{} <= x", lower)?;
            } else {
                writeln!(f, "\t{} <= x < {}", lower, seg.threshold)?;
                lower = seg.threshold;
            }
        }
        Ok(())
    }
}
