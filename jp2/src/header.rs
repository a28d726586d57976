use std::convert::TryFrom;
use std::error;
use std::io::{self, Read};

use crate::reader::SubReader;
use crate::{BoxType, JP2Error};

/// Size of the LBox and TBox fields.
pub const BOX_HEADER_LENGTH: u64 = 8;

#[derive(Debug, PartialEq)]
pub struct BoxHeader {
    // Box Length
    //
    // This field specifies the length of the box, stored as a 4-byte big
    // endian unsigned integer. The value includes all of the fields of the
    // box, including the length and type.
    //
    // Held here as the payload length. `None` when the length field is 0, the
    // length of the box was not known when it was written and it contains all
    // bytes up to the end of its superbox.
    pub box_length: Option<u64>,

    // Box Type
    //
    // This field specifies the type of information found in the DBox field.
    //
    // All values of TBox not defined are reserved for ISO use.
    pub box_type: BoxType,
}

/// Read one LBox/TBox header from `reader`.
pub fn decode_box_header(reader: &mut SubReader) -> Result<BoxHeader, Box<dyn error::Error>> {
    let offset = reader.offset();
    if reader.remaining() < BOX_HEADER_LENGTH {
        return Err(JP2Error::TruncatedInput {
            box_type: None,
            offset,
        }
        .into());
    }

    let mut box_length: [u8; 4] = [0; 4];
    let mut box_type: BoxType = [0; 4];
    reader.read_exact(&mut box_length)?;
    reader.read_exact(&mut box_type)?;

    let box_length = match u32::from_be_bytes(box_length) as u64 {
        // If a box of length 0 is contained within another box (its
        // superbox), then the length of that superbox shall also be 0.
        0 => None,

        // If the value of this field is 1, then the XLBox field shall exist
        // and the value of that field shall be the actual length of the box.
        1 => {
            return Err(JP2Error::UnsupportedBoxLength { box_type, offset }.into());
        }

        // The values 2–7 are reserved for ISO use.
        2..=7 => {
            return Err(JP2Error::BoxMalformed { box_type, offset }.into());
        }

        // Subtract LBox and TBox from length
        value => Some(value - BOX_HEADER_LENGTH),
    };

    Ok(BoxHeader {
        box_length,
        box_type,
    })
}

/// Write one LBox/TBox header for a payload of `box_length` bytes, or 0 in
/// the length field when the payload extends to the end.
pub fn encode_box_header(
    writer: &mut dyn io::Write,
    box_type: BoxType,
    box_length: Option<u64>,
) -> Result<(), Box<dyn error::Error>> {
    let length_field = match box_length {
        None => 0,
        Some(length) => length
            .checked_add(BOX_HEADER_LENGTH)
            .and_then(|value| u32::try_from(value).ok())
            .ok_or(JP2Error::BoxTooLarge { box_type, length })?,
    };

    writer.write_all(&length_field.to_be_bytes())?;
    writer.write_all(&box_type)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn decode(bytes: &[u8]) -> Result<BoxHeader, Box<dyn error::Error>> {
        let mut cursor = Cursor::new(bytes.to_vec());
        let mut reader = SubReader::to_end(&mut cursor)?;
        decode_box_header(&mut reader)
    }

    #[test]
    fn test_decode_bounded_length() {
        let header = decode(&[0, 0, 0, 18, b'r', b'e', b's', b'c']).unwrap();
        assert_eq!(header.box_length, Some(10));
        assert_eq!(header.box_type, *b"resc");
    }

    #[test]
    fn test_decode_open_ended_length() {
        let header = decode(&[0, 0, 0, 0, b'j', b'p', b'2', b'c']).unwrap();
        assert_eq!(header.box_length, None);
    }

    #[test]
    fn test_decode_rejects_extended_length() {
        let error = decode(&[0, 0, 0, 1, b'j', b'p', b'2', b'c']).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<JP2Error>(),
            Some(JP2Error::UnsupportedBoxLength { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_reserved_length() {
        for length in 2u8..=7 {
            let error = decode(&[0, 0, 0, length, b'a', b'b', b'c', b'd']).unwrap_err();
            assert!(matches!(
                error.downcast_ref::<JP2Error>(),
                Some(JP2Error::BoxMalformed { .. })
            ));
        }
    }

    #[test]
    fn test_decode_short_header() {
        let error = decode(&[0, 0, 0, 8, b'a']).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<JP2Error>(),
            Some(JP2Error::TruncatedInput { box_type: None, .. })
        ));
    }

    #[test]
    fn test_encode() {
        let mut bytes = Vec::new();
        encode_box_header(&mut bytes, *b"resc", Some(10)).unwrap();
        encode_box_header(&mut bytes, *b"jp2c", None).unwrap();
        assert_eq!(
            bytes,
            vec![0, 0, 0, 18, b'r', b'e', b's', b'c', 0, 0, 0, 0, b'j', b'p', b'2', b'c']
        );
    }

    #[test]
    fn test_encode_too_large() {
        let mut bytes = Vec::new();
        let error = encode_box_header(&mut bytes, *b"jp2c", Some(u32::MAX as u64)).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<JP2Error>(),
            Some(JP2Error::BoxTooLarge { .. })
        ));
        assert!(bytes.is_empty());
    }
}
