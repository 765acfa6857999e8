#![no_main]
use libfuzzer_sys::fuzz_target;
use zenpict::{DecodeRequest, Limits, PictReader, ResourceKind};

const KINDS: [&[u8; 4]; 21] = [
    b"PICT", b"cicn", b"ppat", b"crsr", b"CURS", b"ICON", b"ICN#", b"ics#", b"icm#", b"icl4",
    b"icl8", b"ics4", b"ics8", b"icm4", b"icm8", b"SICN", b"PAT ", b"PAT#", b"pxm#", b"idsc",
    b"qtif",
];

fuzz_target!(|data: &[u8]| {
    let limits = Limits {
        max_pixels: Some(1 << 22),
        ..Default::default()
    };

    // The first byte picks the resource kind; every kind must fail cleanly.
    let Some((&selector, body)) = data.split_first() else {
        return;
    };
    let kind = ResourceKind::from_code(*KINDS[usize::from(selector) % KINDS.len()]).unwrap();
    let _ = DecodeRequest::new(kind, body).with_limits(&limits).decode();

    // The format label must survive failures.
    let mut reader = PictReader::new(data).with_limits(&limits);
    let _ = reader.decode();
    let _ = reader.format().to_string();
});
