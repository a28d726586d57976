use std::error;
use std::io::{self, Read};

use crate::jbox::JBox;
use crate::reader::SubReader;
use crate::{BoxType, BOX_TYPE_BITS_PER_COMPONENT, BOX_TYPE_IMAGE_HEADER};

// I.5.3
const COMPRESSION_TYPE_WAVELET: u8 = 7;

const IMAGE_HEADER_BOX_LENGTH: u64 = 14;

// 1111 1111 Components vary in bit depth
const BITS_PER_COMPONENT_VARY: u8 = 255;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BitDepth {
    Signed { value: u8 },
    Unsigned { value: u8 },
    Reserved { value: u8 },
}

impl BitDepth {
    /// Bit depth from its 1-byte field, depth minus one in the low 7 bits and
    /// the sign in the high bit.
    pub fn new(byte: u8) -> BitDepth {
        // The low 7-bits of the value indicate the bit depth of this component.
        let value = (byte & 0b0111_1111) + 1;

        // x000 0000 to x010 0101 Component bit depth = value + 1. From 1 bit
        // deep through 38 bits deep respectively. All other values reserved
        // for ISO use.
        if value > 38 {
            return BitDepth::Reserved { value };
        }

        // The high-bit indicates whether the component is signed or unsigned.
        match byte >> 7 {
            1 => BitDepth::Signed { value },
            _ => BitDepth::Unsigned { value },
        }
    }

    /// Bit depth of `value` bits, counting the sign bit.
    pub fn from_depth(value: u8, signed: bool) -> BitDepth {
        if signed {
            BitDepth::Signed { value }
        } else {
            BitDepth::Unsigned { value }
        }
    }

    pub fn value(&self) -> u8 {
        match &self {
            Self::Signed { value } => *value,
            Self::Unsigned { value } => *value,
            Self::Reserved { value } => *value,
        }
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, Self::Signed { .. })
    }

    /// The 1-byte field form.
    pub fn to_byte(&self) -> u8 {
        let low_bits = self.value().saturating_sub(1) & 0b0111_1111;
        if self.is_signed() {
            low_bits | 0b1000_0000
        } else {
            low_bits
        }
    }
}

// I.5.3.1
//
// Image Header box
//
// This box contains fixed length generic information about the image, such as
// the image size and number of components.
//
// The contents of the JP2 Header box shall start with an Image Header box.
//
// The length of the Image Header box shall be 22 bytes, including the box
// length and type fields.
//
// Much of the information within the Image Header box is redundant with
// information stored in the codestream itself.
#[derive(Debug, Default, PartialEq)]
pub struct ImageHeaderBox {
    height: u32,
    width: u32,
    components_num: u16,
    components_bits: u8,
    compression_type: u8,
    colourspace_unknown: u8,
    intellectual_property: u8,
    pub(crate) open_ended: bool,
}

impl ImageHeaderBox {
    /// Image Header box for a wavelet compressed image of known colourspace
    /// where every component has the same bit depth.
    pub fn new(
        height: u32,
        width: u32,
        components_num: u16,
        bit_depth: BitDepth,
    ) -> ImageHeaderBox {
        ImageHeaderBox {
            height,
            width,
            components_num,
            components_bits: bit_depth.to_byte(),
            compression_type: COMPRESSION_TYPE_WAVELET,
            colourspace_unknown: 0,
            intellectual_property: 0,
            open_ended: false,
        }
    }

    // Image area height.
    //
    // The value of this field shall be Ysiz – YOsiz, where Ysiz and YOsiz are
    // the values of the respective fields in the SIZ marker in the codestream.
    pub fn height(&self) -> u32 {
        self.height
    }

    // Image area width.
    //
    // The value of this field shall be Xsiz – XOsiz, where Xsiz and XOsiz are
    // the values of the respective fields in the SIZ marker in the codestream.
    pub fn width(&self) -> u32 {
        self.width
    }

    // Number of components.
    //
    // The value of this field shall be equal to the value of the Csiz field in
    // the SIZ marker in the codestream.
    pub fn components_num(&self) -> u16 {
        self.components_num
    }

    /// Bits per component, the raw 1-byte field.
    ///
    /// If the components vary in bit depth, then the value of this field shall
    /// be 255 and the JP2 Header box shall also contain a Bits Per Component
    /// box defining the bit depth of each component.
    pub fn components_bits(&self) -> u8 {
        self.components_bits
    }

    /// Bit depth shared by all components, `None` when it varies per
    /// component.
    pub fn bit_depth(&self) -> Option<BitDepth> {
        if self.components_bits == BITS_PER_COMPONENT_VARY {
            None
        } else {
            Some(BitDepth::new(self.components_bits))
        }
    }

    // Compression type.
    //
    // The value of this field shall be 7. Other values are reserved for ISO
    // use.
    pub fn compression_type(&self) -> u8 {
        self.compression_type
    }

    // Colourspace Unknown.
    //
    // 0 if the colourspace of the image is known and correctly specified in
    // the Colourspace Specification boxes within the file, 1 if it is not
    // known.
    pub fn colourspace_unknown(&self) -> u8 {
        self.colourspace_unknown
    }

    // Intellectual Property.
    //
    // 1 if the file contains an IPR box, 0 otherwise.
    pub fn intellectual_property(&self) -> u8 {
        self.intellectual_property
    }
}

impl JBox for ImageHeaderBox {
    // The type of the Image Header box shall be ‘ihdr’ (0x6968 6472)
    fn identifier(&self) -> BoxType {
        BOX_TYPE_IMAGE_HEADER
    }

    fn length(&self) -> Option<u64> {
        if self.open_ended {
            return None;
        }
        Some(IMAGE_HEADER_BOX_LENGTH)
    }

    fn decode(&mut self, reader: &mut SubReader) -> Result<(), Box<dyn error::Error>> {
        let mut buffer: [u8; 4] = [0; 4];
        reader.read_exact(&mut buffer)?;
        self.height = u32::from_be_bytes(buffer);
        reader.read_exact(&mut buffer)?;
        self.width = u32::from_be_bytes(buffer);

        let mut components_num: [u8; 2] = [0; 2];
        reader.read_exact(&mut components_num)?;
        self.components_num = u16::from_be_bytes(components_num);

        let mut fields: [u8; 4] = [0; 4];
        reader.read_exact(&mut fields)?;
        self.components_bits = fields[0];
        self.compression_type = fields[1];
        self.colourspace_unknown = fields[2];
        self.intellectual_property = fields[3];

        Ok(())
    }

    fn encode(&self, writer: &mut dyn io::Write) -> Result<(), Box<dyn error::Error>> {
        writer.write_all(&self.height.to_be_bytes())?;
        writer.write_all(&self.width.to_be_bytes())?;
        writer.write_all(&self.components_num.to_be_bytes())?;
        writer.write_all(&[
            self.components_bits,
            self.compression_type,
            self.colourspace_unknown,
            self.intellectual_property,
        ])?;
        Ok(())
    }
}

// I.5.3.2
//
// The Bits Per Component box specifies the bit depth of each component.
//
// If the bit depth of all components in the codestream is the same (in both
// sign and precision), then this box shall not be found. Otherwise, this box
// specifies the bit depth of each individual component.
//
// The order of bit depth values in this box is the actual order in which those
// components are enumerated within the codestream.
#[derive(Debug, Default, PartialEq)]
pub struct BitsPerComponentBox {
    // Bits per component.
    //
    // The number of BP_Ci fields shall be the same as the value of the NC
    // field from the Image Header box.
    bits_per_component: Vec<u8>,

    // Written back with a length field of 0.
    pub(crate) open_ended: bool,
}

impl BitsPerComponentBox {
    pub fn new(bits_per_component: &[BitDepth]) -> BitsPerComponentBox {
        BitsPerComponentBox {
            bits_per_component: bits_per_component
                .iter()
                .map(|bit_depth| bit_depth.to_byte())
                .collect(),
            open_ended: false,
        }
    }

    pub fn bits_per_component(&self) -> Vec<BitDepth> {
        self.bits_per_component
            .iter()
            .map(|byte| BitDepth::new(*byte))
            .collect()
    }
}

impl JBox for BitsPerComponentBox {
    fn identifier(&self) -> BoxType {
        BOX_TYPE_BITS_PER_COMPONENT
    }

    fn length(&self) -> Option<u64> {
        if self.open_ended {
            return None;
        }
        Some(self.bits_per_component.len() as u64)
    }

    fn decode(&mut self, reader: &mut SubReader) -> Result<(), Box<dyn error::Error>> {
        self.bits_per_component.clear();
        reader.read_to_end(&mut self.bits_per_component)?;
        Ok(())
    }

    fn encode(&self, writer: &mut dyn io::Write) -> Result<(), Box<dyn error::Error>> {
        writer.write_all(&self.bits_per_component)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_bit_depth() {
        assert_eq!(BitDepth::new(7), BitDepth::Unsigned { value: 8 });
        assert_eq!(BitDepth::new(0x8f), BitDepth::Signed { value: 16 });
        assert_eq!(BitDepth::new(0x7f), BitDepth::Reserved { value: 128 });
        assert_eq!(BitDepth::Signed { value: 16 }.to_byte(), 0x8f);
        assert_eq!(BitDepth::from_depth(8, false).to_byte(), 7);
    }

    #[test]
    fn test_image_header_decode() {
        let bytes = vec![0, 0, 1, 0, 0, 0, 2, 0, 0, 3, 7, 7, 0, 0];
        let mut cursor = Cursor::new(bytes.clone());
        let mut reader = SubReader::to_end(&mut cursor).unwrap();
        let mut image_header_box = ImageHeaderBox::default();
        image_header_box.decode(&mut reader).unwrap();

        assert_eq!(image_header_box.height(), 256);
        assert_eq!(image_header_box.width(), 512);
        assert_eq!(image_header_box.components_num(), 3);
        assert_eq!(
            image_header_box.bit_depth(),
            Some(BitDepth::Unsigned { value: 8 })
        );
        assert_eq!(image_header_box.compression_type(), 7);

        let mut encoded = Vec::new();
        image_header_box.encode(&mut encoded).unwrap();
        assert_eq!(encoded, bytes);
        assert_eq!(
            image_header_box,
            ImageHeaderBox::new(256, 512, 3, BitDepth::from_depth(8, false))
        );
    }

    #[test]
    fn test_image_header_varying_depth() {
        let mut image_header_box = ImageHeaderBox::new(1, 1, 2, BitDepth::from_depth(8, false));
        image_header_box.components_bits = BITS_PER_COMPONENT_VARY;
        assert_eq!(image_header_box.bit_depth(), None);
    }

    #[test]
    fn test_bits_per_component() {
        let bits_per_component_box = BitsPerComponentBox::new(&[
            BitDepth::from_depth(8, false),
            BitDepth::from_depth(12, true),
        ]);
        assert_eq!(bits_per_component_box.length(), Some(2));

        let mut encoded = Vec::new();
        bits_per_component_box.encode(&mut encoded).unwrap();
        assert_eq!(encoded, vec![7, 0x8b]);
    }
}
