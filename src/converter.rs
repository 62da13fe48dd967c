// Copyright (C) 2025 Matthew Waters <matthew@centricular.com>
//
// Licensed under the MIT license <LICENSE-MIT> or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The top-level converter: carriage dispatch, lifecycle, and the rate/
//! timecode bookkeeping that ties the other modules together.

use crate::egress::{encode_608_raw, encode_608_s334_1a, encode_708_cc_data};
use crate::fps::{fps_entry_from_fps, FpsEntry};
use crate::ingress::{decode_608_raw, decode_608_s334_1a, decode_708_cc_data, decode_cdp};
use crate::rate::RateController;
use crate::timecode::{interpolate_time_code, TimeCode};
use crate::triplet::Triplet;
use crate::writer::write_cdp;
use crate::CarriageKind;

/// Errors that halt the stream outright, as opposed to the
/// recoverable-per-payload conditions that are logged and produce a
/// best-effort (possibly empty) output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConvertError {
    /// `set_caps` was called with a carriage/rate combination the converter
    /// cannot realise — currently, a CDP output rate outside the CDP-legal
    /// frame rate table.
    #[error("caps are not realisable by this converter")]
    InvalidCaps,
    /// An internal arithmetic or control-flow invariant was violated. This
    /// indicates a bug rather than bad input.
    #[error("internal invariant violated")]
    InternalInvariantViolated,
}

/// The closed-caption carriage converter.
///
/// Construct with [`Converter::new`], configure with [`Converter::set_caps`],
/// then drive it with [`Converter::convert`] per input payload and
/// [`Converter::end_of_stream`] to flush any held scratch at the end of the
/// stream.
#[derive(Debug)]
pub struct Converter {
    in_kind: Option<CarriageKind>,
    out_kind: Option<CarriageKind>,
    in_fps: (u32, u32),
    out_fps: (u32, u32),
    current_output_timecode: Option<TimeCode>,
    rate: RateController,
    cdp_sequence_counter: u16,
    previous_buffer: Option<Vec<u8>>,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new()
    }
}

impl Converter {
    /// An unconfigured converter. Call [`Converter::set_caps`] before
    /// [`Converter::convert`].
    pub fn new() -> Self {
        Self {
            in_kind: None,
            out_kind: None,
            in_fps: (0, 0),
            out_fps: (0, 0),
            current_output_timecode: None,
            rate: RateController::new(),
            cdp_sequence_counter: 0,
            previous_buffer: None,
        }
    }

    /// Fix the conversion pair. `in_fps`/`out_fps` may be `(0, 0)` if
    /// unspecified; if so and the pair requires rate conversion, the
    /// controller falls back to 1:1 scale.
    pub fn set_caps(
        &mut self,
        in_kind: CarriageKind,
        in_fps: (u32, u32),
        out_kind: CarriageKind,
        out_fps: (u32, u32),
    ) -> Result<(), ConvertError> {
        if out_kind == CarriageKind::Cea708Cdp && out_fps != (0, 0) && fps_entry_from_fps(out_fps.0, out_fps.1).is_none() {
            return Err(ConvertError::InvalidCaps);
        }
        self.in_kind = Some(in_kind);
        self.out_kind = Some(out_kind);
        self.in_fps = in_fps;
        self.out_fps = out_fps;
        Ok(())
    }

    /// Zero all counters, clear scratch, clear timecodes.
    pub fn start(&mut self) {
        self.rate.reset();
        self.current_output_timecode = None;
        self.cdp_sequence_counter = 0;
        self.previous_buffer = None;
    }

    /// Release the retained previous buffer and clear state.
    pub fn stop(&mut self) {
        self.start();
    }

    /// As [`Converter::start`], but without re-announcing caps.
    pub fn flush(&mut self) {
        self.start();
    }

    /// The interpolated timecode for the most recently produced (or about
    /// to be produced) output frame, for the host to attach to its buffer.
    pub fn current_output_timecode(&self) -> Option<TimeCode> {
        self.current_output_timecode
    }

    /// The most recently converted input payload.
    ///
    /// A drain output synthesised by [`Converter::end_of_stream`] has no
    /// input payload of its own; the host uses this to copy buffer
    /// metadata (flags, duration, and the like — attaching it is the
    /// host's concern, not the core's) from the last real input onto that
    /// synthesised output.
    pub fn previous_buffer(&self) -> Option<&[u8]> {
        self.previous_buffer.as_deref()
    }

    fn in_entry(&self, cdp_entry: Option<FpsEntry>) -> Option<FpsEntry> {
        cdp_entry.or_else(|| fps_entry_from_fps(self.in_fps.0, self.in_fps.1))
    }

    /// The output frame rate entry, falling back to the input's when the
    /// host left `out_fps` unspecified — per spec §6, an unset output rate
    /// on a CDP-involved pair falls back to 1:1 scale rather than failing.
    fn out_entry(&self, in_entry: Option<FpsEntry>) -> Option<FpsEntry> {
        if self.out_fps == (0, 0) {
            in_entry
        } else {
            fps_entry_from_fps(self.out_fps.0, self.out_fps.1)
        }
    }

    fn decode(&self, payload: &[u8]) -> Result<(Vec<Triplet>, Option<TimeCode>, Option<FpsEntry>), ConvertError> {
        match self.in_kind.ok_or(ConvertError::InvalidCaps)? {
            CarriageKind::Cea608Raw => Ok((decode_608_raw(payload), None, None)),
            CarriageKind::Cea608S334_1A => Ok((decode_608_s334_1a(payload), None, None)),
            CarriageKind::Cea708CcData => Ok((decode_708_cc_data(payload), None, None)),
            CarriageKind::Cea708Cdp => {
                let (triplets, tc, fps) = decode_cdp(payload);
                Ok((triplets, tc, fps))
            }
        }
    }

    fn encode(&mut self, kind: CarriageKind, triplets: &[Triplet], out_entry: Option<FpsEntry>) -> Result<Vec<u8>, ConvertError> {
        match kind {
            CarriageKind::Cea608Raw => Ok(encode_608_raw(triplets)),
            CarriageKind::Cea608S334_1A => Ok(encode_608_s334_1a(triplets)),
            CarriageKind::Cea708CcData => Ok(encode_708_cc_data(triplets)),
            CarriageKind::Cea708Cdp => {
                let entry = out_entry.ok_or(ConvertError::InvalidCaps)?;
                Ok(write_cdp(
                    triplets,
                    self.current_output_timecode,
                    entry,
                    &mut self.cdp_sequence_counter,
                ))
            }
        }
    }

    fn update_timecode(&mut self, input_tc: Option<TimeCode>, in_entry: Option<FpsEntry>, out_entry: Option<FpsEntry>) {
        let scale = RateController::scale(in_entry, out_entry);
        if let Some(tc) = input_tc {
            self.current_output_timecode =
                interpolate_time_code(Some(tc), self.out_fps.0, self.out_fps.1, scale.n, scale.d);
        } else if let Some(cur) = self.current_output_timecode.as_mut() {
            cur.advance();
        }
    }

    /// Convert one input payload, returning the output payload and the
    /// interpolated output timecode (if any), or an error if the caps are
    /// invalid or an internal invariant is violated.
    ///
    /// Same-kind, same-rate conversions are a pure passthrough: the output
    /// equals the input byte-for-byte and no timecode is synthesised. A
    /// same-kind pair at *different* rates (e.g. CDP-to-CDP across a rate
    /// change) still runs the full Rate Controller pipeline.
    pub fn convert(
        &mut self,
        payload: &[u8],
        input_timecode: Option<TimeCode>,
    ) -> Result<(Vec<u8>, Option<TimeCode>), ConvertError> {
        let in_kind = self.in_kind.ok_or(ConvertError::InvalidCaps)?;
        let out_kind = self.out_kind.ok_or(ConvertError::InvalidCaps)?;

        self.previous_buffer = Some(payload.to_vec());

        if in_kind == out_kind && self.in_fps == self.out_fps {
            return Ok((payload.to_vec(), None));
        }

        let (triplets, embedded_tc, cdp_entry) = self.decode(payload)?;
        let effective_tc = embedded_tc.or(input_timecode);

        let in_entry = self.in_entry(cdp_entry);
        let out_entry = self.out_entry(in_entry);

        let emitted = self.rate.process(in_entry, out_entry, triplets);

        match emitted {
            Some(triplets) => {
                self.update_timecode(effective_tc, in_entry, out_entry);
                let out = self.encode(out_kind, &triplets, out_entry)?;
                Ok((out, self.current_output_timecode))
            }
            None => Ok((Vec::new(), None)),
        }
    }

    /// Drain any triplets held in scratch at end-of-stream, synthesising
    /// output frames from null input until the rate controller has nothing
    /// left to emit. Returns each drained `(payload, timecode)` pair in
    /// order.
    pub fn end_of_stream(&mut self) -> Result<Vec<(Vec<u8>, Option<TimeCode>)>, ConvertError> {
        let out_kind = match self.out_kind {
            Some(k) => k,
            None => return Ok(Vec::new()),
        };
        let in_entry = self.in_entry(None);
        let out_entry = self.out_entry(in_entry);

        let mut drained = Vec::new();
        while self.rate.scratch_len() > 0 || self.rate.can_generate_output(in_entry, out_entry) {
            match self.rate.process(in_entry, out_entry, Vec::new()) {
                Some(triplets) => {
                    self.update_timecode(None, in_entry, out_entry);
                    let out = self.encode(out_kind, &triplets, out_entry)?;
                    drained.push((out, self.current_output_timecode));
                }
                None => {
                    self.rate.advance_input_frame();
                }
            }
        }

        self.start();
        Ok(drained)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn passthrough_same_kind_is_byte_identical() {
        let mut conv = Converter::new();
        conv.set_caps(CarriageKind::Cea708CcData, (30, 1), CarriageKind::Cea708CcData, (30, 1))
            .unwrap();
        let input = [0xfc, 0xaa, 0xbb];
        let (out, tc) = conv.convert(&input, None).unwrap();
        assert_eq!(out, input);
        assert!(tc.is_none());
    }

    #[test]
    fn previous_buffer_tracks_last_input_and_clears_on_start() {
        let mut conv = Converter::new();
        conv.set_caps(CarriageKind::Cea608Raw, (0, 0), CarriageKind::Cea608S334_1A, (0, 0))
            .unwrap();
        assert!(conv.previous_buffer().is_none());
        conv.convert(&[0x94, 0x20], None).unwrap();
        assert_eq!(conv.previous_buffer(), Some(&[0x94, 0x20][..]));
        conv.start();
        assert!(conv.previous_buffer().is_none());
    }

    #[test]
    fn raw_to_s334_1a_single_pair() {
        let mut conv = Converter::new();
        conv.set_caps(CarriageKind::Cea608Raw, (0, 0), CarriageKind::Cea608S334_1A, (0, 0))
            .unwrap();
        let (out, _) = conv.convert(&[0x94, 0x20], None).unwrap();
        assert_eq!(out, vec![0x80, 0x94, 0x20]);
    }

    #[test]
    fn raw_to_cc_data_two_pairs() {
        let mut conv = Converter::new();
        conv.set_caps(CarriageKind::Cea608Raw, (0, 0), CarriageKind::Cea708CcData, (0, 0))
            .unwrap();
        let (out, _) = conv.convert(&[0x94, 0x20, 0x13, 0x2f], None).unwrap();
        assert_eq!(out, vec![0xfc, 0x94, 0x20, 0xfc, 0x13, 0x2f]);
    }

    #[test]
    fn cc_data_to_raw_keeps_only_field1() {
        let mut conv = Converter::new();
        conv.set_caps(CarriageKind::Cea708CcData, (0, 0), CarriageKind::Cea608Raw, (0, 0))
            .unwrap();
        let input = [0xfc, 0xaa, 0xbb, 0xfd, 0xcc, 0xdd, 0xfe, 0x00, 0x00];
        let (out, _) = conv.convert(&input, None).unwrap();
        assert_eq!(out, vec![0xaa, 0xbb]);
    }

    #[test]
    fn cc_data_to_cdp_at_30000_1001() {
        let mut conv = Converter::new();
        conv.set_caps(
            CarriageKind::Cea708CcData,
            (30000, 1001),
            CarriageKind::Cea708Cdp,
            (30000, 1001),
        )
        .unwrap();
        let triplets: Vec<u8> = (0..20u8).flat_map(|i| [0xfc, i, i]).collect();
        let (out, _) = conv.convert(&triplets, None).unwrap();
        assert_eq!(&out[0..2], &[0x96, 0x69]);
        assert_eq!(out[3], (0x4 << 4) | 0x0f);
        let packet = crate::reader::read_cdp(&out);
        assert_eq!(packet.triplets().len(), 20);
    }

    #[test]
    fn cdp_rate_change_accumulates_across_two_inputs() {
        let mut conv = Converter::new();
        conv.set_caps(
            CarriageKind::Cea708Cdp,
            (60000, 1001),
            CarriageKind::Cea708Cdp,
            (30000, 1001),
        )
        .unwrap();

        let fast = fps_entry_from_fps(60000, 1001).unwrap();
        let mut seq = 0u16;
        let first_triplets: Vec<Triplet> = (0..10u8).map(|i| Triplet::new(0xfc, i, i)).collect();
        let first_packet = write_cdp(&first_triplets, None, fast, &mut seq);
        let second_triplets: Vec<Triplet> = (10..20u8).map(|i| Triplet::new(0xfc, i, i)).collect();
        let second_packet = write_cdp(&second_triplets, None, fast, &mut seq);

        let (first_out, _) = conv.convert(&first_packet, None).unwrap();
        assert!(first_out.is_empty());

        let (second_out, _) = conv.convert(&second_packet, None).unwrap();
        let packet = crate::reader::read_cdp(&second_out);
        assert_eq!(packet.triplets().len(), 20);
        assert_eq!(packet.triplets()[0].as_bytes(), [0xfc, 0, 0]);
        assert_eq!(packet.triplets()[10].as_bytes(), [0xfc, 10, 10]);
    }

    #[test]
    fn cdp_to_raw_with_embedded_time_code() {
        let mut conv = Converter::new();
        conv.set_caps(
            CarriageKind::Cea708Cdp,
            (30, 1),
            CarriageKind::Cea608Raw,
            (0, 0),
        )
        .unwrap();

        let fps = fps_entry_from_fps(30, 1).unwrap();
        let tc = TimeCode::new(30, 1, false, 1, 2, 3, 4, 1);
        let mut seq = 0u16;
        let triplets = [Triplet::new(0xfc, 0x11, 0x22)];
        let packet = write_cdp(&triplets, Some(tc), fps, &mut seq);

        let (out, out_tc) = conv.convert(&packet, None).unwrap();
        assert_eq!(out, vec![0x11, 0x22]);
        let out_tc = out_tc.unwrap();
        assert_eq!(
            (out_tc.hours(), out_tc.minutes(), out_tc.seconds(), out_tc.frames()),
            (1, 2, 3, 4)
        );
    }

    #[test]
    fn end_of_stream_drains_scratch() {
        let mut conv = Converter::new();
        conv.set_caps(
            CarriageKind::Cea708Cdp,
            (60000, 1001),
            CarriageKind::Cea708Cdp,
            (30000, 1001),
        )
        .unwrap();
        let fast = fps_entry_from_fps(60000, 1001).unwrap();
        let mut seq = 0u16;
        let triplets: Vec<Triplet> = (0..5u8).map(|i| Triplet::new(0xfc, i, i)).collect();
        let packet = write_cdp(&triplets, None, fast, &mut seq);
        let (out, _) = conv.convert(&packet, None).unwrap();
        assert!(out.is_empty());
        assert_eq!(conv.rate.scratch_len(), 5);

        let drained = conv.end_of_stream().unwrap();
        assert!(!drained.is_empty());
        assert_eq!(conv.rate.scratch_len(), 0);
    }
}
