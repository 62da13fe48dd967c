// Copyright (C) 2025 Matthew Waters <matthew@centricular.com>
//
// Licensed under the MIT license <LICENSE-MIT> or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Parsing of Caption Distribution Packets (CDP, SMPTE-334) into triplets,
//! an optional embedded timecode, and the frame rate the packet declares.

use crate::fps::{fps_entry_from_id, FpsEntry};
use crate::timecode::TimeCode;
use crate::triplet::Triplet;

const MAGIC: [u8; 2] = [0x96, 0x69];
const SECTION_TIME_CODE: u8 = 0x71;
const SECTION_CC_DATA: u8 = 0x72;
const FOOTER: u8 = 0x74;

const FLAG_TIME_CODE_PRESENT: u8 = 0x80;
const FLAG_CC_DATA_PRESENT: u8 = 0x40;

/// The result of parsing a CDP packet: the triplets carried in its cc_data
/// section, the embedded timecode if present, and the frame rate the
/// packet's header declares.
///
/// A structurally invalid packet yields an empty, timecode-less,
/// rate-less result rather than an error — see the module's error design
/// (malformed CDP input is recoverable per payload, logged and swallowed,
/// never propagated to the caller as a hard failure).
#[derive(Debug, Clone, Default)]
pub struct CdpPacket {
    triplets: Vec<Triplet>,
    timecode: Option<TimeCode>,
    fps: Option<FpsEntry>,
}

impl CdpPacket {
    /// The cc_data triplets carried by the packet.
    pub fn triplets(&self) -> &[Triplet] {
        &self.triplets
    }

    /// The embedded timecode, if the packet's flags declared one present.
    pub fn timecode(&self) -> Option<TimeCode> {
        self.timecode
    }

    /// The frame rate the packet's header declared.
    pub fn fps(&self) -> Option<FpsEntry> {
        self.fps
    }
}

/// Parse a CDP packet.
///
/// Performs the nine structural checks in order; on the first failure,
/// logs a warning and returns an empty [`CdpPacket`]. The checksum footer
/// is read but not verified — CDP parsing is deliberately tolerant of a
/// bad checksum so that a single corrupted byte doesn't discard an
/// otherwise well-formed frame.
pub fn read_cdp(data: &[u8]) -> CdpPacket {
    match try_read_cdp(data) {
        Some(packet) => packet,
        None => CdpPacket::default(),
    }
}

fn try_read_cdp(data: &[u8]) -> Option<CdpPacket> {
    if data.len() < 11 {
        log::warn!("CDP packet too short: {} bytes", data.len());
        return None;
    }
    if data[0..2] != MAGIC {
        log::warn!("CDP packet has wrong magic bytes {:02x?}", &data[0..2]);
        return None;
    }
    if data[2] as usize != data.len() {
        log::warn!(
            "CDP length byte {} does not match actual length {}",
            data[2],
            data.len()
        );
        return None;
    }

    let fps = fps_entry_from_id(data[3] >> 4);
    if fps.is_none() || data[3] & 0x0f != 0x0f {
        log::warn!("CDP packet has unknown framerate id byte {:#x}", data[3]);
        return None;
    }
    let fps = fps.unwrap();

    let flags = data[4];
    if flags & FLAG_CC_DATA_PRESENT == 0 {
        log::warn!("CDP packet does not declare cc_data_present");
        return None;
    }
    let time_code_present = flags & FLAG_TIME_CODE_PRESENT != 0;

    // bytes 5-6 are a sequence counter; per spec §4.2 check 6 it is skipped
    // here, not compared against the footer's copy (the original cc_data
    // converter this is grounded on doesn't check it either).
    let mut pos = 7;

    let timecode = if time_code_present {
        let tc = parse_time_code(&data[pos..], fps)?;
        pos += 5;
        Some(tc)
    } else {
        None
    };

    if data.get(pos) != Some(&SECTION_CC_DATA) {
        log::warn!("CDP packet missing cc_data section marker");
        return None;
    }
    let count_byte = *data.get(pos + 1)?;
    if count_byte & 0xe0 != 0xe0 {
        log::warn!("CDP cc_data count byte {:#x} has malformed marker bits", count_byte);
        return None;
    }
    let count = (count_byte & 0x1f) as usize;
    pos += 2;

    if pos + 3 * count > data.len() {
        log::warn!("CDP cc_data section declares {} triplets past the end of the packet", count);
        return None;
    }
    let mut triplets = Vec::with_capacity(count);
    for chunk in data[pos..pos + 3 * count].chunks_exact(3) {
        triplets.push(Triplet::new(chunk[0], chunk[1], chunk[2]));
    }
    pos += 3 * count;

    // Skip any trailing sections (service info, future extensions) we don't
    // interpret, walking `id, len, <len bytes>` triples until the footer.
    while data.get(pos) != Some(&FOOTER) {
        let len = *data.get(pos + 1)? as usize;
        pos += 2 + len;
        if pos > data.len() {
            log::warn!("CDP packet section overruns packet length");
            return None;
        }
    }

    pos += 1;
    if pos + 2 > data.len() {
        log::warn!("CDP packet truncated before footer sequence counter");
        return None;
    }
    // The footer repeats the sequence counter, but matching it against the
    // header's copy is not one of the spec's structural checks and isn't
    // performed by the converter this parser is grounded on; a mismatch
    // here is tolerated like the checksum is.

    Some(CdpPacket {
        triplets,
        timecode,
        fps: Some(fps),
    })
}

fn parse_time_code(data: &[u8], fps: FpsEntry) -> Option<TimeCode> {
    if data.len() < 5 || data[0] != SECTION_TIME_CODE {
        log::warn!("CDP packet missing time_code section marker");
        return None;
    }

    let hours_byte = data[1];
    if hours_byte & 0xc0 != 0xc0 {
        log::warn!("CDP time_code hours byte {:#x} has invalid prefix", hours_byte);
        return None;
    }
    let hours = ((hours_byte >> 4) & 0x03) * 10 + (hours_byte & 0x0f);

    let minutes_byte = data[2];
    if minutes_byte & 0x80 != 0x80 {
        log::warn!("CDP time_code minutes byte {:#x} has invalid prefix", minutes_byte);
        return None;
    }
    let minutes = ((minutes_byte >> 4) & 0x07) * 10 + (minutes_byte & 0x0f);

    let seconds_byte = data[3];
    let field_count = if seconds_byte & 0x80 != 0 { 2 } else { 1 };
    let seconds = ((seconds_byte >> 4) & 0x07) * 10 + (seconds_byte & 0x0f);

    let frames_byte = data[4];
    if frames_byte & 0x40 != 0 {
        log::warn!("CDP time_code frames byte {:#x} has reserved bit set", frames_byte);
        return None;
    }
    let drop_frame = frames_byte & 0x80 != 0;
    let frames = ((frames_byte >> 4) & 0x03) * 10 + (frames_byte & 0x0f);

    Some(TimeCode::new(
        fps.fps_n(),
        fps.fps_d(),
        drop_frame,
        hours,
        minutes,
        seconds,
        frames,
        field_count,
    ))
}
