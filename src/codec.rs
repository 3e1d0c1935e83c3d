// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire codec for characteristic payloads.
//!
//! Both the temperature and the setpoint characteristic carry a single
//! IEEE-754 `f32` in little-endian byte order, the device's native layout.

use crate::error::ParseError;

/// Size in bytes of an encoded value.
pub const PAYLOAD_LEN: usize = 4;

/// Encodes a value for a characteristic write.
///
/// # Examples
///
/// ```
/// use tempc_lib::codec::encode_f32_le;
///
/// assert_eq!(encode_f32_le(1.0), [0x00, 0x00, 0x80, 0x3f]);
/// ```
#[must_use]
pub fn encode_f32_le(value: f32) -> [u8; PAYLOAD_LEN] {
    value.to_le_bytes()
}

/// Decodes a value read from a characteristic.
///
/// Only the first four bytes are interpreted; anything after them is ignored.
///
/// # Errors
///
/// Returns `ParseError::MalformedPayload` if fewer than four bytes are supplied.
///
/// # Examples
///
/// ```
/// use tempc_lib::codec::decode_f32_le;
///
/// assert_eq!(decode_f32_le(&[0x00, 0x00, 0xb8, 0x41]).unwrap(), 23.0);
/// assert!(decode_f32_le(&[0x00, 0x00]).is_err());
/// ```
pub fn decode_f32_le(bytes: &[u8]) -> Result<f32, ParseError> {
    let Some(head) = bytes.first_chunk::<PAYLOAD_LEN>() else {
        return Err(ParseError::MalformedPayload {
            expected: PAYLOAD_LEN,
            actual: bytes.len(),
        });
    };
    Ok(f32::from_le_bytes(*head))
}
