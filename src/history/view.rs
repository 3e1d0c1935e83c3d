// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Immutable view of the sample history.

use std::sync::Arc;

use super::Sample;

/// A point on a reconstructed timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelinePoint {
    /// Minutes between this sample and the most recent one.
    pub minutes_before_latest: f32,
    /// Temperature in degrees Celsius.
    pub temperature: f32,
}

/// Read-only snapshot of a [`SampleRing`](super::SampleRing).
///
/// Chronological order is recovered by walking backward from
/// [`most_recent_index`](Self::most_recent_index) for [`len`](Self::len)
/// steps, wrapping around the slice.
#[derive(Debug, Clone, PartialEq)]
pub struct RingView {
    samples: Arc<[Sample]>,
    most_recent: usize,
    count: usize,
}

impl RingView {
    pub(crate) fn new(samples: Arc<[Sample]>, most_recent: usize, count: usize) -> Self {
        Self {
            samples,
            most_recent,
            count,
        }
    }

    /// Returns the slot index of the newest sample.
    #[must_use]
    pub fn most_recent_index(&self) -> usize {
        self.most_recent
    }

    /// Returns the number of valid samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if the view holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the newest sample.
    #[must_use]
    pub fn latest(&self) -> Option<Sample> {
        self.iter_recent().next()
    }

    /// Iterates over valid samples from newest to oldest.
    pub fn iter_recent(&self) -> impl Iterator<Item = Sample> + '_ {
        let capacity = self.samples.len();
        (0..self.count).map(move |step| {
            let index = (self.most_recent + capacity - step) % capacity;
            self.samples[index]
        })
    }

    /// Places each sample on a time axis relative to the newest one.
    ///
    /// Points are returned newest first. Each sample's delta is the gap to
    /// the sample before it, so an older point sits at the sum of the
    /// deltas of every newer sample.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use tempc_lib::history::SampleRing;
    /// use tokio::time::Instant;
    ///
    /// let mut ring = SampleRing::new(8).unwrap();
    /// let t0 = Instant::now();
    /// ring.push(20.0, t0);
    /// ring.push(21.0, t0 + Duration::from_secs(60));
    ///
    /// let points = ring.view().timeline();
    /// assert_eq!(points[0].minutes_before_latest, 0.0);
    /// assert_eq!(points[1].minutes_before_latest, 1.0);
    /// ```
    #[must_use]
    pub fn timeline(&self) -> Vec<TimelinePoint> {
        let mut offset = 0.0_f32;
        self.iter_recent()
            .map(|sample| {
                let point = TimelinePoint {
                    minutes_before_latest: offset,
                    temperature: sample.temperature,
                };
                offset += sample.delta_seconds / 60.0;
                point
            })
            .collect()
    }
}
