// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fixed-capacity ring of temperature samples.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::ValueError;

use super::RingView;

/// Default number of samples kept in the history.
pub const DEFAULT_CAPACITY: usize = 400;

/// Upper bound for the gap recorded between two samples, in seconds.
pub const MAX_DELTA_SECONDS: f32 = 255.0;

/// One temperature observation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Temperature in degrees Celsius.
    pub temperature: f32,
    /// Seconds elapsed since the previous sample, clamped to `[0, 255]`.
    pub delta_seconds: f32,
}

/// Circular buffer of [`Sample`]s.
///
/// The write cursor always points at the slot the next sample goes into, so
/// the most recent sample lives one slot behind it. Once the ring is full,
/// each push overwrites the oldest sample.
///
/// # Examples
///
/// ```
/// use tempc_lib::history::SampleRing;
/// use tokio::time::Instant;
///
/// let mut ring = SampleRing::new(3).unwrap();
/// let now = Instant::now();
/// for t in [20.0, 21.0, 22.0, 23.0] {
///     ring.push(t, now);
/// }
/// assert_eq!(ring.len(), 3);
///
/// let recent: Vec<f32> = ring.view().iter_recent().map(|s| s.temperature).collect();
/// assert_eq!(recent, vec![23.0, 22.0, 21.0]);
/// ```
#[derive(Debug, Clone)]
pub struct SampleRing {
    entries: Vec<Sample>,
    write_cursor: usize,
    count: usize,
    last_timestamp: Option<Instant>,
}

impl SampleRing {
    /// Creates an empty ring holding at most `capacity` samples.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::ZeroCapacity` if `capacity` is 0.
    pub fn new(capacity: usize) -> Result<Self, ValueError> {
        if capacity == 0 {
            return Err(ValueError::ZeroCapacity);
        }
        Ok(Self {
            entries: vec![Sample::default(); capacity],
            write_cursor: 0,
            count: 0,
            last_timestamp: None,
        })
    }

    /// Records a temperature observed at `now`.
    ///
    /// The first push after creation or [`clear`](Self::clear) records a
    /// delta of zero.
    pub fn push(&mut self, temperature: f32, now: Instant) {
        let delta_seconds = self
            .last_timestamp
            .map_or(0.0, |previous| elapsed_seconds(previous, now));

        self.entries[self.write_cursor] = Sample {
            temperature,
            delta_seconds,
        };
        self.count = (self.count + 1).min(self.capacity());
        self.write_cursor = (self.write_cursor + 1) % self.capacity();
        self.last_timestamp = Some(now);
    }

    /// Returns a read-only copy of the ring contents.
    #[must_use]
    pub fn view(&self) -> RingView {
        RingView::new(
            Arc::from(self.entries.as_slice()),
            self.most_recent_index(),
            self.count,
        )
    }

    /// Returns the most recently pushed sample.
    #[must_use]
    pub fn latest(&self) -> Option<Sample> {
        (self.count > 0).then(|| self.entries[self.most_recent_index()])
    }

    /// Discards every sample and forgets the last timestamp.
    pub fn clear(&mut self) {
        self.entries.fill(Sample::default());
        self.write_cursor = 0;
        self.count = 0;
        self.last_timestamp = None;
    }

    /// Returns the number of valid samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if no sample has been pushed since the last clear.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the maximum number of samples.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Returns the slot the next sample will be written to.
    #[must_use]
    pub fn write_cursor(&self) -> usize {
        self.write_cursor
    }

    fn most_recent_index(&self) -> usize {
        (self.write_cursor + self.capacity() - 1) % self.capacity()
    }
}

fn elapsed_seconds(previous: Instant, now: Instant) -> f32 {
    now.saturating_duration_since(previous)
        .as_secs_f32()
        .clamp(0.0, MAX_DELTA_SECONDS)
}
