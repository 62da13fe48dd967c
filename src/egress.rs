// Copyright (C) 2025 Matthew Waters <matthew@centricular.com>
//
// Licensed under the MIT license <LICENSE-MIT> or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Serialisation of a normalised triplet stream back into the target
//! carriage. CDP egress is handled separately by [`crate::writer`], since it
//! needs the converter's running sequence counter.

use crate::triplet::Triplet;

/// Emit CEA-608 raw byte pairs: only valid, field-1 triplets (`0xFC`)
/// survive; everything else (field 2, 708 payload) is dropped.
pub fn encode_608_raw(triplets: &[Triplet]) -> Vec<u8> {
    let mut out = Vec::with_capacity(triplets.len() * 2);
    for t in triplets {
        if t.is_608_field1() {
            out.push(t.data1());
            out.push(t.data2());
        }
    }
    out
}

/// Emit CEA-608 S334-1A triplets: only 608-position, valid triplets
/// survive, each re-tagged with an explicit field-indicator header byte
/// (`0x80` for field 1, `0x00` for field 2).
pub fn encode_608_s334_1a(triplets: &[Triplet]) -> Vec<u8> {
    let mut out = Vec::with_capacity(triplets.len() * 3);
    for t in triplets {
        if !t.is_valid() || !t.is_608_position() {
            continue;
        }
        out.push(if t.is_608_field1() { 0x80 } else { 0x00 });
        out.push(t.data1());
        out.push(t.data2());
    }
    out
}

/// Emit a cc_data triplet stream as-is; it is already the native wire form.
pub fn encode_708_cc_data(triplets: &[Triplet]) -> Vec<u8> {
    let mut out = Vec::with_capacity(triplets.len() * 3);
    for t in triplets {
        out.extend_from_slice(&t.as_bytes());
    }
    out
}
