use std::io::Cursor;

use jp2::{
    decode_jp2, encode_jp2, BitDepth, ColourSpecificationMethods, JBox as _, JP2Error,
    BOX_TYPE_CONTIGUOUS_CODESTREAM, BOX_TYPE_HEADER,
};

struct ExpectedConfiguration {
    file_length: u64,
    height: u32,
    width: u32,
    components_num: u16,
    bit_depth: BitDepth,
    colour_space: u32,
    capture_resolution: Option<(f64, f64)>,
    codestream_offset: u64,
}

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn boxed(box_type: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut bytes = ((payload.len() + 8) as u32).to_be_bytes().to_vec();
    bytes.extend_from_slice(box_type);
    bytes.extend_from_slice(payload);
    bytes
}

fn image_header(height: u32, width: u32, components_num: u16, bits: u8) -> Vec<u8> {
    let mut payload = height.to_be_bytes().to_vec();
    payload.extend_from_slice(&width.to_be_bytes());
    payload.extend_from_slice(&components_num.to_be_bytes());
    payload.extend_from_slice(&[bits, 7, 0, 0]);
    boxed(b"ihdr", &payload)
}

fn colour_specification(colour_space: u32) -> Vec<u8> {
    let mut payload = vec![1, 0, 0];
    payload.extend_from_slice(&colour_space.to_be_bytes());
    boxed(b"colr", &payload)
}

fn capture_resolution(numerator: u16, exponent: i8) -> Vec<u8> {
    let mut payload = vec![];
    for _ in 0..2 {
        payload.extend_from_slice(&numerator.to_be_bytes());
        payload.extend_from_slice(&1u16.to_be_bytes());
    }
    payload.extend_from_slice(&[exponent as u8, exponent as u8]);
    boxed(b"res ", &boxed(b"resc", &payload))
}

fn jp2_file(header: &[Vec<u8>], codestream: &[u8]) -> Vec<u8> {
    let mut bytes = boxed(b"jP  ", &[0x0d, 0x0a, 0x87, 0x0a]);
    bytes.extend(boxed(b"ftyp", b"jp2 \x00\x00\x00\x00jp2 "));
    bytes.extend(boxed(b"jp2h", &header.concat()));
    bytes.extend(boxed(b"jp2c", codestream));
    bytes
}

// SOC, SIZ marker start and EOC, never decoded here.
const CODESTREAM: [u8; 8] = [0xff, 0x4f, 0xff, 0x51, 0x00, 0x2f, 0xff, 0xd9];

#[test]
fn test_rgb() {
    let bytes = jp2_file(
        &[image_header(128, 64, 3, 15), colour_specification(16)],
        &CODESTREAM,
    );
    let expected_configuration = ExpectedConfiguration {
        file_length: 93,
        height: 128,
        width: 64,
        components_num: 3,
        bit_depth: BitDepth::Unsigned { value: 16 },
        colour_space: 16,
        capture_resolution: None,
        codestream_offset: 85,
    };
    test_jp2_file(bytes, expected_configuration);
}

#[test]
fn test_greyscale_with_resolution() {
    let bytes = jp2_file(
        &[
            image_header(32, 48, 1, 0x87),
            colour_specification(17),
            capture_resolution(2835, 1),
        ],
        &CODESTREAM,
    );
    let expected_configuration = ExpectedConfiguration {
        file_length: 119,
        height: 32,
        width: 48,
        components_num: 1,
        bit_depth: BitDepth::Signed { value: 8 },
        colour_space: 17,
        capture_resolution: Some((28350.0, 28350.0)),
        codestream_offset: 111,
    };
    test_jp2_file(bytes, expected_configuration);
}

fn test_jp2_file(bytes: Vec<u8>, expected: ExpectedConfiguration) {
    init();
    let mut reader = Cursor::new(bytes.clone());
    let result = decode_jp2(&mut reader);
    assert!(result.is_ok());
    let file = result.unwrap();
    assert_eq!(file.length(), Some(expected.file_length));
    assert_eq!(bytes.len() as u64, expected.file_length);

    assert_eq!(file.signature(), Some(&b"\x0d\x0a\x87\x0a"[..]));

    let file_type = file.file_type().unwrap();
    assert_eq!(file_type.brand(), *b"jp2 ");
    assert_eq!(file_type.min_version(), 0);
    assert_eq!(file_type.compatibility_list(), vec!["jp2 "]);

    let image_header_box = file.image_header().unwrap();
    assert_eq!(image_header_box.height(), expected.height);
    assert_eq!(image_header_box.width(), expected.width);
    assert_eq!(image_header_box.components_num(), expected.components_num);
    assert_eq!(image_header_box.compression_type(), 7);
    assert_eq!(image_header_box.colourspace_unknown(), 0);
    assert_eq!(image_header_box.intellectual_property(), 0);
    assert_eq!(image_header_box.bit_depth(), Some(expected.bit_depth));

    assert!(file.bits_per_component().is_none());

    assert_eq!(file.colour_specifications().count(), 1);
    let colour_specification_box = file.colour_specifications().next().unwrap();
    assert_eq!(
        colour_specification_box.method(),
        ColourSpecificationMethods::EnumeratedColourSpace
    );
    assert_eq!(colour_specification_box.precedence(), 0);
    assert_eq!(colour_specification_box.colourspace_approximation(), 0u8);
    assert_eq!(
        colour_specification_box.enumerated_colour_space(),
        Some(expected.colour_space)
    );

    assert!(file.palette().is_none());
    assert!(file.component_mapping().is_none());
    assert!(file.channel_definition().is_none());
    assert!(file.default_display_resolution().is_none());

    match expected.capture_resolution {
        Some((horizontal, vertical)) => {
            let resolution_box = file.capture_resolution().unwrap();
            assert_eq!(resolution_box.horizontal_resolution(), Some(horizontal));
            assert_eq!(resolution_box.vertical_resolution(), Some(vertical));
        }
        None => assert!(file.resolution().is_none()),
    }

    assert_eq!(file.codestreams().count(), 1);
    let codestream_box = file.codestreams().next().unwrap();
    assert_eq!(codestream_box.codestream(), &CODESTREAM);
    assert_eq!(
        codestream_box.length(),
        Some(expected.file_length - expected.codestream_offset)
    );
    assert_eq!(
        &bytes[expected.codestream_offset as usize..],
        &CODESTREAM[..]
    );

    assert_eq!(file.xml().count(), 0);
    assert_eq!(file.uuid().count(), 0);

    let mut encoded = Vec::new();
    encode_jp2(&mut encoded, &file).unwrap();
    assert_eq!(encoded, bytes);
}

#[test]
fn test_unknown_boxes_are_kept() {
    init();
    let mut bytes = boxed(b"jP  ", &[0x0d, 0x0a, 0x87, 0x0a]);
    bytes.extend(boxed(b"ftyp", b"jpx \x00\x00\x00\x00jpx jp2 "));
    bytes.extend(boxed(b"xml ", b"<meta/>"));
    bytes.extend(boxed(
        b"jp2h",
        &[
            image_header(1, 1, 1, 7),
            boxed(b"zzzz", b"vendor"),
            colour_specification(17),
        ]
        .concat(),
    ));
    bytes.extend(boxed(b"jp2c", &CODESTREAM));
    bytes.extend(boxed(b"jp2c", &CODESTREAM[..2]));

    let file = decode_jp2(&mut Cursor::new(bytes.clone())).unwrap();
    assert_eq!(file.file_type().unwrap().brand(), *b"jpx ");
    assert_eq!(file.xml().next().unwrap().format().unwrap(), "<meta/>");
    assert_eq!(file.header().unwrap().boxes().len(), 3);
    assert_eq!(file.codestreams().count(), 2);

    let mut encoded = Vec::new();
    encode_jp2(&mut encoded, &file).unwrap();
    assert_eq!(encoded, bytes);
}

fn decode_error(bytes: Vec<u8>) -> JP2Error {
    match decode_jp2(&mut Cursor::new(bytes)) {
        Ok(file) => panic!("unexpected success {:?}", file),
        Err(error) => match error.downcast::<JP2Error>() {
            Ok(error) => *error,
            Err(error) => panic!("unexpected error {:?}", error),
        },
    }
}

#[test]
fn test_invalid_signature() {
    init();
    let mut bytes = jp2_file(
        &[image_header(1, 1, 1, 7), colour_specification(17)],
        &CODESTREAM,
    );
    bytes[11] = 0x0b;
    assert!(matches!(
        decode_error(bytes),
        JP2Error::InvalidSignature { offset: 0, .. }
    ));
}

#[test]
fn test_not_compatible() {
    init();
    let mut bytes = boxed(b"jP  ", &[0x0d, 0x0a, 0x87, 0x0a]);
    bytes.extend(boxed(b"ftyp", b"jpx \x00\x00\x00\x00jpx "));
    match decode_error(bytes) {
        JP2Error::NotCompatible { compatibility_list } => {
            assert_eq!(compatibility_list, vec!["jpx "])
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_codestream_before_header() {
    init();
    let mut bytes = boxed(b"jP  ", &[0x0d, 0x0a, 0x87, 0x0a]);
    bytes.extend(boxed(b"ftyp", b"jp2 \x00\x00\x00\x00jp2 "));
    bytes.extend(boxed(b"jp2c", &CODESTREAM));
    match decode_error(bytes) {
        JP2Error::BoxUnexpected { box_type, offset } => {
            assert_eq!(box_type, BOX_TYPE_CONTIGUOUS_CODESTREAM);
            assert_eq!(offset, 32);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_missing_codestream() {
    init();
    let mut bytes = boxed(b"jP  ", &[0x0d, 0x0a, 0x87, 0x0a]);
    bytes.extend(boxed(b"ftyp", b"jp2 \x00\x00\x00\x00jp2 "));
    bytes.extend(boxed(
        b"jp2h",
        &[image_header(1, 1, 1, 7), colour_specification(17)].concat(),
    ));
    assert!(matches!(
        decode_error(bytes),
        JP2Error::BoxMissing {
            box_type: BOX_TYPE_CONTIGUOUS_CODESTREAM
        }
    ));
}

#[test]
fn test_duplicate_header() {
    init();
    let header = [image_header(1, 1, 1, 7), colour_specification(17)];
    let mut bytes = jp2_file(&header, &CODESTREAM);
    bytes.extend(boxed(b"jp2h", &header.concat()));
    assert!(matches!(
        decode_error(bytes),
        JP2Error::BoxDuplicate {
            box_type: BOX_TYPE_HEADER,
            ..
        }
    ));
}

#[test]
fn test_header_rules() {
    init();
    // Image Header box not first
    let bytes = jp2_file(
        &[colour_specification(17), image_header(1, 1, 1, 7)],
        &CODESTREAM,
    );
    assert!(matches!(
        decode_error(bytes),
        JP2Error::BoxUnexpected { offset: 40, .. }
    ));

    // No Colour Specification box
    let bytes = jp2_file(&[image_header(1, 1, 1, 7)], &CODESTREAM);
    assert!(matches!(decode_error(bytes), JP2Error::BoxMissing { .. }));

    // Two Resolution boxes
    let bytes = jp2_file(
        &[
            image_header(1, 1, 1, 7),
            colour_specification(17),
            capture_resolution(72, 0),
            capture_resolution(72, 0),
        ],
        &CODESTREAM,
    );
    match decode_error(bytes) {
        JP2Error::BoxDuplicate { box_type, offset } => {
            assert_eq!(box_type, *b"res ");
            assert_eq!(offset, 32 + 8 + 22 + 15 + 26);
        }
        other => panic!("unexpected {:?}", other),
    }

    // Several Colour Specification boxes are allowed
    let bytes = jp2_file(
        &[
            image_header(1, 1, 1, 7),
            colour_specification(17),
            colour_specification(16),
        ],
        &CODESTREAM,
    );
    let file = decode_jp2(&mut Cursor::new(bytes)).unwrap();
    assert_eq!(file.colour_specifications().count(), 2);
}
