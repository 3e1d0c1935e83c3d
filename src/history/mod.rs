// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Rolling temperature history.
//!
//! [`SampleRing`] is owned and written by the session only. Consumers see
//! it through [`RingView`] copies carried by snapshots.

mod sample_ring;
mod view;

pub use sample_ring::{DEFAULT_CAPACITY, MAX_DELTA_SECONDS, Sample, SampleRing};
pub use view::{RingView, TimelinePoint};
