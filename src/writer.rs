// Copyright (C) 2025 Matthew Waters <matthew@centricular.com>
//
// Licensed under the MIT license <LICENSE-MIT> or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Serialisation of triplets, an optional timecode, and a target frame rate
//! into a Caption Distribution Packet (CDP, SMPTE-334).

use crate::fps::FpsEntry;
use crate::timecode::TimeCode;
use crate::triplet::Triplet;

const SECTION_TIME_CODE: u8 = 0x71;
const SECTION_CC_DATA: u8 = 0x72;
const FOOTER: u8 = 0x74;

const FLAG_TIME_CODE_PRESENT: u8 = 0x80;
const FLAG_CC_DATA_PRESENT: u8 = 0x40;
const FLAG_CAPTION_SERVICE_ACTIVE: u8 = 0x02;
const FLAG_RESERVED_ONE: u8 = 0x01;

/// Serialise a cc_data block, an optional timecode, and a target frame rate
/// into a CDP packet, advancing `sequence_counter` (wrapping at 2^16).
///
/// If `triplets` carries more than `fps.max_cc_count()` entries it is
/// truncated with a warning — the Rate Controller is responsible for never
/// handing the writer an oversized block in normal operation.
pub fn write_cdp(triplets: &[Triplet], timecode: Option<TimeCode>, fps: FpsEntry, sequence_counter: &mut u16) -> Vec<u8> {
    let max = fps.max_cc_count() as usize;
    let triplets = if triplets.len() > max {
        log::warn!(
            "CDP writer truncating {} triplets down to the {} allowed at this rate",
            triplets.len(),
            max
        );
        &triplets[..max]
    } else {
        triplets
    };

    let mut out = Vec::with_capacity(11 + 5 + 2 + 3 * max);
    out.push(0x96);
    out.push(0x69);
    out.push(0x00); // length, patched below

    out.push((fps.id() << 4) | 0x0f);

    let mut flags = FLAG_CC_DATA_PRESENT | FLAG_CAPTION_SERVICE_ACTIVE | FLAG_RESERVED_ONE;
    if timecode.is_some() {
        flags |= FLAG_TIME_CODE_PRESENT;
    }
    out.push(flags);

    out.extend_from_slice(&sequence_counter.to_be_bytes());

    if let Some(tc) = timecode {
        out.push(SECTION_TIME_CODE);
        write_time_code(&mut out, tc);
    }

    out.push(SECTION_CC_DATA);
    out.push(0xe0 | max as u8);
    for t in triplets {
        out.extend_from_slice(&t.as_bytes());
    }
    for _ in triplets.len()..max {
        out.extend_from_slice(&Triplet::padding().as_bytes());
    }

    out.push(FOOTER);
    out.extend_from_slice(&sequence_counter.to_be_bytes());
    out.push(0x00); // checksum placeholder

    out[2] = out.len() as u8;

    *sequence_counter = sequence_counter.wrapping_add(1);

    let sum: u32 = out[..out.len() - 1].iter().fold(0u32, |acc, b| acc + *b as u32);
    let checksum = (256u32.wrapping_sub(sum & 0xff) & 0xff) as u8;
    *out.last_mut().unwrap() = checksum;

    out
}

fn write_time_code(out: &mut Vec<u8>, tc: TimeCode) {
    out.push(0xc0 | ((tc.hours() / 10) << 4) | (tc.hours() % 10));
    out.push(0x80 | ((tc.minutes() / 10) << 4) | (tc.minutes() % 10));
    out.push(
        (if tc.field_count() == 2 { 0x80 } else { 0x00 }) | ((tc.seconds() / 10) << 4) | (tc.seconds() % 10),
    );
    out.push(
        (if tc.drop_frame() { 0x80 } else { 0x00 }) | ((tc.frames() / 10) << 4) | (tc.frames() % 10),
    );
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fps::fps_entry_from_id;
    use crate::reader::read_cdp;

    #[test]
    fn writes_header_and_length() {
        let fps = fps_entry_from_id(0x5).unwrap();
        let mut seq = 0u16;
        let triplets = [Triplet::new(0xfc, 0xaa, 0xbb)];
        let out = write_cdp(&triplets, None, fps, &mut seq);
        assert_eq!(&out[0..2], &[0x96, 0x69]);
        assert_eq!(out[2] as usize, out.len());
        assert_eq!(out[3], (0x5 << 4) | 0x0f);
        assert_eq!(seq, 1);
    }

    #[test]
    fn pads_cc_data_to_max_count() {
        let fps = fps_entry_from_id(0x4).unwrap(); // max_cc_count 20
        let mut seq = 0u16;
        let triplets = [Triplet::new(0xfc, 0x01, 0x02)];
        let out = write_cdp(&triplets, None, fps, &mut seq);
        let packet = read_cdp(&out);
        assert_eq!(packet.triplets().len(), 20);
        assert_eq!(packet.triplets()[0].as_bytes(), [0xfc, 0x01, 0x02]);
        assert_eq!(packet.triplets()[1].as_bytes(), Triplet::padding().as_bytes());
    }

    #[test]
    fn checksum_sums_to_zero_mod_256() {
        let fps = fps_entry_from_id(0x6).unwrap();
        let mut seq = 42u16;
        let out = write_cdp(&[], None, fps, &mut seq);
        let sum: u32 = out.iter().fold(0, |acc, b| acc + *b as u32);
        assert_eq!(sum & 0xff, 0);
    }

    #[test]
    fn round_trips_through_reader() {
        let fps = fps_entry_from_id(0x4).unwrap();
        let mut seq = 7u16;
        let tc = TimeCode::new(30000, 1001, true, 1, 2, 3, 4, 1);
        let triplets = [
            Triplet::new(0xfc, 0x10, 0x20),
            Triplet::new(0xfd, 0x30, 0x40),
        ];
        let out = write_cdp(&triplets, Some(tc), fps, &mut seq);
        let packet = read_cdp(&out);
        assert_eq!(packet.fps().unwrap().id(), 0x4);
        assert_eq!(&packet.triplets()[..2], &triplets);
        let parsed_tc = packet.timecode().unwrap();
        assert_eq!(
            (parsed_tc.hours(), parsed_tc.minutes(), parsed_tc.seconds(), parsed_tc.frames()),
            (1, 2, 3, 4)
        );
        assert!(parsed_tc.drop_frame());
    }

    #[test]
    fn truncates_oversized_input_with_warning() {
        let fps = fps_entry_from_id(0x8).unwrap(); // max_cc_count 10
        let mut seq = 0u16;
        let triplets: Vec<Triplet> = (0..15).map(|i| Triplet::new(0xfc, i, i)).collect();
        let out = write_cdp(&triplets, None, fps, &mut seq);
        let packet = read_cdp(&out);
        assert_eq!(packet.triplets().len(), 10);
    }
}
