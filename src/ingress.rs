// Copyright (C) 2025 Matthew Waters <matthew@centricular.com>
//
// Licensed under the MIT license <LICENSE-MIT> or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Normalisation of any of the four carriages into a uniform cc_data
//! triplet stream.

use crate::fps::FpsEntry;
use crate::reader::read_cdp;
use crate::timecode::TimeCode;
use crate::triplet::{compact, Triplet};

const MAX_608_PAIRS: usize = 3;
const MAX_708_TRIPLETS: usize = 25;

/// Decode CEA-608 raw byte pairs (field 1 only) into triplets.
///
/// An odd trailing byte is dropped with a warning. At most
/// [`MAX_608_PAIRS`] pairs are kept; any further pairs are discarded with a
/// warning, matching the hard per-frame upper bound at 608 rates.
pub fn decode_608_raw(bytes: &[u8]) -> Vec<Triplet> {
    let usable = if bytes.len() % 2 != 0 {
        log::warn!("608 raw payload has odd length {}, dropping trailing byte", bytes.len());
        bytes.len() - 1
    } else {
        bytes.len()
    };

    let pairs = usable / 2;
    if pairs > MAX_608_PAIRS {
        log::warn!("608 raw payload has {} pairs, truncating to {}", pairs, MAX_608_PAIRS);
    }
    let keep = pairs.min(MAX_608_PAIRS);

    bytes[..usable]
        .chunks_exact(2)
        .take(keep)
        .map(|pair| Triplet::new(0xfc, pair[0], pair[1]))
        .collect()
}

/// Decode CEA-608 S334-1A triplets (field-flagged 608 pairs) into cc_data
/// triplets.
///
/// Input not a multiple of 3 bytes is truncated with a warning. At most
/// [`MAX_608_PAIRS`] triplets are kept.
pub fn decode_608_s334_1a(bytes: &[u8]) -> Vec<Triplet> {
    let usable = bytes.len() - (bytes.len() % 3);
    if usable != bytes.len() {
        log::warn!(
            "S334-1A payload length {} is not a multiple of 3, truncating to {}",
            bytes.len(),
            usable
        );
    }

    let count = usable / 3;
    if count > MAX_608_PAIRS {
        log::warn!("S334-1A payload has {} triplets, truncating to {}", count, MAX_608_PAIRS);
    }
    let keep = count.min(MAX_608_PAIRS);

    bytes[..usable]
        .chunks_exact(3)
        .take(keep)
        .map(|chunk| {
            let field1 = chunk[0] & 0x80 != 0;
            if field1 {
                Triplet::new(0xfc, chunk[1], chunk[2])
            } else {
                Triplet::new(0xfd, chunk[1], chunk[2])
            }
        })
        .collect()
}

/// Decode a raw cc_data triplet stream, capping at [`MAX_708_TRIPLETS`] and
/// removing invalid entries via [`compact`].
pub fn decode_708_cc_data(bytes: &[u8]) -> Vec<Triplet> {
    let usable = bytes.len() - (bytes.len() % 3);
    if usable != bytes.len() {
        log::warn!(
            "cc_data payload length {} is not a multiple of 3, truncating to {}",
            bytes.len(),
            usable
        );
    }

    let count = usable / 3;
    if count > MAX_708_TRIPLETS {
        log::warn!("cc_data payload has {} triplets, truncating to {}", count, MAX_708_TRIPLETS);
    }
    let keep = count.min(MAX_708_TRIPLETS);

    let triplets: Vec<Triplet> = bytes[..usable]
        .chunks_exact(3)
        .take(keep)
        .map(|chunk| Triplet::new(chunk[0], chunk[1], chunk[2]))
        .collect();

    compact(&triplets)
}

/// Decode a CDP packet into its cc_data triplets (compacted), embedded
/// timecode, and declared frame rate.
pub fn decode_cdp(bytes: &[u8]) -> (Vec<Triplet>, Option<TimeCode>, Option<FpsEntry>) {
    let packet = read_cdp(bytes);
    (compact(packet.triplets()), packet.timecode(), packet.fps())
}
