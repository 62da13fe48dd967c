// Copyright (C) 2025 Matthew Waters <matthew@centricular.com>
//
// Licensed under the MIT license <LICENSE-MIT> or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

#![deny(missing_debug_implementations)]
#![deny(missing_docs)]

//! # cc-carriage
//!
//! A closed-caption carriage converter: normalises CEA-608 raw, CEA-608
//! S334-1A, CEA-708 cc_data, and CEA-708 CDP (Caption Distribution Packet,
//! SMPTE-334) into a common triplet stream and back out again, rescaling
//! the per-frame caption budget across frame rate changes and rewriting
//! CDP framing and embedded timecodes as needed.
//!
//! The reference for the CDP wire format is the `SMPTE 334-2-2007`
//! specification.

#[macro_use]
extern crate log;

mod converter;
mod egress;
mod fps;
mod ingress;
mod rate;
mod reader;
mod timecode;
mod triplet;
mod writer;

pub use converter::{ConvertError, Converter};
pub use fps::{fps_entry_from_fps, fps_entry_from_id, FpsEntry};
pub use timecode::{interpolate_time_code, is_drop_frame_rate, TimeCode};
pub use triplet::{compact, Triplet};

/// The four broadcast-caption carriages this converter moves data between,
/// ordered from least to most information-bearing. The ordering drives
/// passthrough and caps-selection decisions made by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CarriageKind {
    /// CEA-608 raw byte pairs, field 1 only.
    Cea608Raw,
    /// CEA-608 S334-1A: a 608 pair annotated with a field indicator.
    Cea608S334_1A,
    /// CEA-708 cc_data: triplets carrying 608 or 708 payload.
    Cea708CcData,
    /// CEA-708 CDP: a framed cc_data packet with timecode, sequence
    /// counter, and checksum.
    Cea708Cdp,
}
