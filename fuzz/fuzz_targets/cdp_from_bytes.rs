#![no_main]
use libfuzzer_sys::fuzz_target;

use cc_carriage::{CarriageKind, Converter};

use once_cell::sync::Lazy;

#[macro_use]
extern crate log;

fn debug_init() {
    static LOG_INIT: Lazy<()> = Lazy::new(|| {
        let _ = env_logger::try_init();
    });
    Lazy::force(&LOG_INIT);
}

fuzz_target!(|data: &[u8]| {
    debug_init();

    let mut to_cc_data = Converter::new();
    if to_cc_data
        .set_caps(
            CarriageKind::Cea708Cdp,
            (30000, 1001),
            CarriageKind::Cea708CcData,
            (30000, 1001),
        )
        .is_err()
    {
        return;
    }

    let Ok((cc_data, _timecode)) = to_cc_data.convert(data, None) else {
        return;
    };
    info!("decoded {} bytes of cc_data from CDP input", cc_data.len());

    // Round-trip whatever was decoded back out to CDP to exercise the
    // writer on arbitrary (but now well-formed) triplet streams.
    let mut to_cdp = Converter::new();
    if to_cdp
        .set_caps(
            CarriageKind::Cea708CcData,
            (30000, 1001),
            CarriageKind::Cea708Cdp,
            (30000, 1001),
        )
        .is_err()
    {
        return;
    }
    let _ = to_cdp.convert(&cc_data, None);
});
