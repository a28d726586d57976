use std::convert::TryInto;
use std::error;
use std::io::Cursor;

use jp2::{
    decode_image, decode_jp2, encode_image, encode_jp2, BitDepth, Codec, EncodingParameters,
    JP2Error, PixelPlanes, ProgressionOrder,
};

// Stores the planes verbatim behind a made-up header, enough to check what
// crosses the boundary.
struct RawCodec;

impl Codec for RawCodec {
    fn encode(
        &self,
        planes: &PixelPlanes,
        parameters: &EncodingParameters,
    ) -> Result<Vec<u8>, Box<dyn error::Error>> {
        let mut codestream = vec![0xff, 0x4f];
        codestream.extend_from_slice(&planes.width.to_be_bytes());
        codestream.extend_from_slice(&planes.height.to_be_bytes());
        codestream.push(planes.bit_depth);
        codestream.push(planes.signed as u8);
        codestream.push(planes.components.len() as u8);
        codestream.push(parameters.lossless() as u8);
        for plane in &planes.components {
            for sample in plane {
                codestream.extend_from_slice(&sample.to_be_bytes());
            }
        }
        Ok(codestream)
    }

    fn decode(&self, codestream: &[u8]) -> Result<PixelPlanes, Box<dyn error::Error>> {
        let width = u32::from_be_bytes(codestream[2..6].try_into()?);
        let height = u32::from_be_bytes(codestream[6..10].try_into()?);
        let samples = (width * height) as usize;
        let components = (0..codestream[12] as usize)
            .map(|component| {
                (0..samples)
                    .map(|sample| {
                        let start = 14 + 4 * (component * samples + sample);
                        i32::from_be_bytes([
                            codestream[start],
                            codestream[start + 1],
                            codestream[start + 2],
                            codestream[start + 3],
                        ])
                    })
                    .collect()
            })
            .collect();
        Ok(PixelPlanes {
            width,
            height,
            bit_depth: codestream[10],
            signed: codestream[11] == 1,
            components,
        })
    }
}

fn planes(components: usize) -> PixelPlanes {
    PixelPlanes {
        width: 3,
        height: 2,
        bit_depth: 12,
        signed: true,
        components: (0..components)
            .map(|component| (0..6).map(|sample| sample * 100 - component as i32).collect())
            .collect(),
    }
}

#[test]
fn test_encode_decode_rgb() {
    let _ = env_logger::builder().is_test(true).try_init();
    let planes = planes(3);
    let mut parameters = EncodingParameters::default();
    parameters.set_progression(ProgressionOrder::ResolutionPosition);

    let file = encode_image(&RawCodec, &planes, &parameters, Some((2835.0, 100000.0))).unwrap();

    let image_header_box = file.image_header().unwrap();
    assert_eq!(image_header_box.width(), 3);
    assert_eq!(image_header_box.height(), 2);
    assert_eq!(image_header_box.components_num(), 3);
    assert_eq!(
        image_header_box.bit_depth(),
        Some(BitDepth::Signed { value: 12 })
    );
    assert_eq!(
        file.colour_specifications()
            .next()
            .unwrap()
            .enumerated_colour_space(),
        Some(16)
    );

    let capture = file.capture_resolution().unwrap();
    assert_eq!(capture.horizontal_resolution(), Some(2835.0));
    assert_eq!(capture.vertical_numerator(), 10000);
    assert_eq!(capture.vertical_exponent(), 1);

    let mut bytes = Vec::new();
    encode_jp2(&mut bytes, &file).unwrap();
    assert_eq!(Some(bytes.len() as u64), file.length());

    let decoded = decode_jp2(&mut Cursor::new(bytes)).unwrap();
    assert_eq!(decoded, file);
    assert_eq!(decode_image(&RawCodec, &decoded).unwrap(), planes);
}

#[test]
fn test_encode_greyscale_without_resolution() {
    let planes = planes(1);
    let file = encode_image(&RawCodec, &planes, &EncodingParameters::default(), None).unwrap();

    assert_eq!(
        file.colour_specifications()
            .next()
            .unwrap()
            .enumerated_colour_space(),
        Some(17)
    );
    assert!(file.resolution().is_none());
    assert_eq!(file.header().unwrap().boxes().len(), 2);
    assert_eq!(file.codestreams().count(), 1);
}

#[test]
fn test_encode_rejects_mismatched_planes() {
    let mut planes = planes(2);
    planes.components[1].pop();
    let error = encode_image(&RawCodec, &planes, &EncodingParameters::default(), None)
        .unwrap_err();
    assert!(matches!(
        error.downcast_ref::<JP2Error>(),
        Some(JP2Error::InvalidParameter {
            name: "components",
            ..
        })
    ));
}
