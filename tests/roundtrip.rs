use zenpict::*;

/// `colors` repeated in raster order.
fn tiled(w: u32, h: u32, colors: &[[u8; 4]]) -> Raster {
    let mut pixels = Vec::with_capacity((w * h * 4) as usize);
    for i in 0..(w * h) as usize {
        pixels.extend_from_slice(&colors[i % colors.len()]);
    }
    Raster::from_rgba(w, h, pixels).unwrap()
}

/// `n` distinct opaque colors.
fn palette(n: usize) -> Vec<[u8; 4]> {
    (0..n)
        .map(|i| [(i * 37) as u8, (i * 11 + 3) as u8, (i / 3) as u8, 255])
        .collect()
}

fn noise(w: u32, h: u32) -> Raster {
    let mut state: u32 = 0xDEAD_BEEF;
    let pixels = (0..w * h)
        .flat_map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            [state as u8, (state >> 8) as u8, (state >> 16) as u8, 255]
        })
        .collect();
    Raster::from_rgba(w, h, pixels).unwrap()
}

// ── PICT ─────────────────────────────────────────────────────────────

#[test]
fn pict_indexed_depths() {
    for (colors, depth) in [(2, 1), (4, 2), (16, 4), (200, 8)] {
        let raster = tiled(23, 9, &palette(colors));
        let bytes = encode_picture(&raster).unwrap();
        let mut reader = PictReader::new(&bytes);
        assert_eq!(reader.decode().unwrap(), raster, "{colors} colors");
        assert_eq!(
            reader.format().encoding,
            Some(PictEncoding::Bits {
                depth,
                packed: true
            })
        );
        assert!(reader.format().extended);
    }
}

#[test]
fn pict_direct() {
    let raster = noise(40, 30);
    let bytes = encode_picture(&raster).unwrap();
    let mut reader = PictReader::new(&bytes);
    assert_eq!(reader.decode().unwrap(), raster);
    assert_eq!(reader.format().to_string(), "PICT v2 extended, 32-bit direct");
}

#[test]
fn pict_narrow_direct() {
    let raster = noise(1, 300);
    let bytes = encode_picture(&raster).unwrap();
    assert_eq!(PictReader::new(&bytes).decode().unwrap(), raster);
}

#[test]
fn pict_through_decode_request() {
    let raster = tiled(5, 5, &palette(3));
    let bytes = EncodeRequest::new(ResourceKind::Pict).encode(&raster).unwrap();
    let decoded = DecodeRequest::new(ResourceKind::Pict, &bytes).decode().unwrap();
    assert_eq!(decoded, raster);
}

#[test]
fn pict_limits() {
    let bytes = encode_picture(&noise(64, 64)).unwrap();
    let limits = Limits {
        max_pixels: Some(64 * 63),
        ..Default::default()
    };
    let err = PictReader::new(&bytes).with_limits(&limits).decode().unwrap_err();
    assert!(matches!(err, QdError::LimitExceeded(_)));
}

// ── Resources ────────────────────────────────────────────────────────

fn masked_sample() -> Raster {
    let mut raster = tiled(12, 10, &[[255, 0, 0, 255], [0, 0, 0, 0], [20, 200, 20, 255], [250, 250, 250, 255]]);
    raster.set_pixel(0, 0, rgb::RGBA8::new(0, 0, 0, 255));
    raster
}

fn roundtrip(kind: ResourceKind, raster: &Raster) -> Raster {
    let bytes = EncodeRequest::new(kind).encode(raster).unwrap();
    DecodeRequest::new(kind, &bytes).decode().unwrap()
}

#[test]
fn color_icon_keeps_mask() {
    let raster = masked_sample();
    assert_eq!(roundtrip(ResourceKind::ColorIcon, &raster), raster);
}

#[test]
fn pixel_pattern_indexed_and_direct() {
    let raster = tiled(8, 8, &palette(5));
    assert_eq!(roundtrip(ResourceKind::PixelPattern, &raster), raster);
    let raster = noise(32, 32);
    assert_eq!(roundtrip(ResourceKind::PixelPattern, &raster), raster);
}

#[test]
fn color_cursor() {
    let raster = tiled(16, 16, &[[255, 0, 0, 255], [0, 0, 0, 0], [0, 0, 255, 255]]);
    let bytes = EncodeRequest::new(ResourceKind::ColorCursor)
        .with_hot_spot(Point::new(8, 4))
        .encode(&raster)
        .unwrap();
    assert_eq!(hot_spot(ResourceKind::ColorCursor, &bytes).unwrap(), Point::new(8, 4));
    assert_eq!(DecodeRequest::new(ResourceKind::ColorCursor, &bytes).decode().unwrap(), raster);
}

#[test]
fn monochrome_members() {
    let bw = [[0, 0, 0, 255], [255, 255, 255, 255], [0, 0, 0, 0]];
    for kind in [
        ResourceKind::Cursor,
        ResourceKind::IconList,
        ResourceKind::SmallIconList,
        ResourceKind::MiniIconList,
    ] {
        let (w, h) = icon_dimensions(kind).unwrap_or((16, 16));
        let raster = tiled(w, h, &bw);
        assert_eq!(roundtrip(kind, &raster), raster, "{kind:?}");
    }
    let pattern = tiled(8, 8, &bw[..2]);
    assert_eq!(roundtrip(ResourceKind::Pattern, &pattern), pattern);
}

#[test]
fn color_icons_with_mask_lookup() {
    // Colors taken from the standard palettes survive exactly.
    let colors = [[255, 0, 0, 255], [0, 0, 0, 0], [0, 0, 0, 255], [255, 255, 255, 255]];
    for (color, mono) in [
        (ResourceKind::LargeIcon8, ResourceKind::IconList),
        (ResourceKind::SmallIcon8, ResourceKind::SmallIconList),
        (ResourceKind::MiniIcon8, ResourceKind::MiniIconList),
    ] {
        let (w, h) = icon_dimensions(color).unwrap();
        let raster = tiled(w, h, &colors);
        let pixels = EncodeRequest::new(color).encode(&raster).unwrap();
        let list = EncodeRequest::new(mono).encode(&raster).unwrap();
        let code = mono.code();
        let lookup = move |kind: FourCC, id: i16| (kind == code && id == -4000).then(|| list.clone());
        let decoded = DecodeRequest::new(color, &pixels)
            .with_id(-4000)
            .with_lookup(&lookup)
            .decode()
            .unwrap();
        assert_eq!(decoded, raster, "{color:?}");
    }
}

#[test]
fn four_bit_icons_use_sixteen_colors() {
    let colors = [[0xFF, 0xFF, 0xFF, 255], [0xFC, 0xF3, 0x05, 255], [0x00, 0x00, 0x00, 255]];
    for kind in [ResourceKind::LargeIcon4, ResourceKind::SmallIcon4, ResourceKind::MiniIcon4] {
        let (w, h) = icon_dimensions(kind).unwrap();
        let raster = tiled(w, h, &colors);
        assert_eq!(roundtrip(kind, &raster), raster, "{kind:?}");
    }
}

#[test]
fn encode_limits() {
    let big = noise(40, 40);
    let err = EncodeRequest::new(ResourceKind::IconList).encode(&big).unwrap_err();
    assert!(err.is_encode_limit());
    let err = EncodeRequest::new(ResourceKind::ColorIcon).encode(&big).unwrap_err();
    assert!(matches!(err, QdError::TooManyColors(_)));
    assert!(err.is_encode_limit());
    let err = EncodeRequest::new(ResourceKind::PixmapList).encode(&big).unwrap_err();
    assert!(matches!(err, QdError::Unsupported(_)));
}

#[test]
fn wide_rasters_are_too_big() {
    let raster = Raster::new(40_000, 1).unwrap();
    let err = encode_picture(&raster).unwrap_err();
    assert!(matches!(err, QdError::TooBig(_)));
}
