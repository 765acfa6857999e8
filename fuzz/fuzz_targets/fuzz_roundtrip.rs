#![no_main]
use libfuzzer_sys::fuzz_target;
use zenpict::*;

fuzz_target!(|data: &[u8]| {
    // If a picture decodes, re-encoding and decoding again must produce
    // identical pixels once alpha is dropped.
    let limits = Limits {
        max_pixels: Some(1 << 20),
        ..Default::default()
    };
    let Ok(mut decoded) = PictReader::new(data).with_limits(&limits).decode() else {
        return;
    };
    decoded.drop_alpha();

    let Ok(reencoded) = encode_picture(&decoded) else {
        return;
    };
    let Ok(decoded2) = PictReader::new(&reencoded).decode() else {
        panic!("re-encoded picture failed to decode");
    };

    assert_eq!(decoded.width, decoded2.width);
    assert_eq!(decoded.height, decoded2.height);
    assert_eq!(decoded.pixels(), decoded2.pixels(), "roundtrip pixel mismatch");
});
