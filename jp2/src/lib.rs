//! JP2 file format.
//!
//! The JPEG 2000 file format (JP2 file format) wraps a JPEG 2000 codestream
//! together with the information required to display it, such as the image
//! header, colour specification, palette and resolution. The building-block of
//! the JP2 file format is called a box. All information contained within the
//! JP2 file is encapsulated in boxes, and some boxes are defined to contain
//! other boxes.
//!
//! This crate reads any box stream into a tree of [`Jp2Box`] values and writes
//! such a tree back out. Box types it does not understand are kept as opaque
//! bytes, so reading then writing a file reproduces it exactly.
//!
//! The entry points are [`read_boxes`] for a lenient parse of any box stream
//! and [`decode_jp2`] which additionally checks the structure required by
//! ISO/IEC 15444-1 Annex I. The codestream itself is never interpreted, see
//! the [`codec`] module for the boundary to an external JPEG 2000 codec.

use std::error;
use std::fmt;
use std::io;

pub mod codec;
mod colour;
mod container;
mod extension;
mod file;
mod file_type;
mod header;
mod image;
mod jbox;
mod reader;
mod registry;
mod resolution;

pub use codec::{
    decode_image, encode_image, Codec, EncodingParameters, FilterKind, MQLengthCalculation,
    MQTermination, PixelPlanes, ProgressionOrder,
};
pub use colour::{
    Channel, ChannelDefinitionBox, ChannelTypes, ColourSpecificationBox,
    ColourSpecificationMethods, ComponentMap, ComponentMapType, ComponentMappingBox,
    EnumeratedColourSpaces, GeneratedComponent, PaletteBox, ENUMERATED_COLOUR_SPACE_GREYSCALE,
    ENUMERATED_COLOUR_SPACE_SRGB,
};
pub use container::{read_box, write_box, ContainerBox};
pub use extension::{DataEntryURLBox, UUIDBox, UUIDListBox, XMLBox};
pub use file::{decode_jp2, encode_jp2, JP2File};
pub use file_type::FileTypeBox;
pub use header::{decode_box_header, encode_box_header, BoxHeader, BOX_HEADER_LENGTH};
pub use image::{BitDepth, BitsPerComponentBox, ImageHeaderBox};
pub use jbox::{ContiguousCodestreamBox, JBox, Jp2Box, OpaqueBox};
pub use reader::{ReadSeek, SubReader};
pub use registry::{registry, BoxFactory, Registry};
pub use resolution::ResolutionBox;

#[derive(Debug)]
pub enum JP2Error {
    /// The box framing is structurally inconsistent, e.g. a length field
    /// between 2 and 7 or a payload that does not match the layout of its
    /// box type. Byte alignment cannot be recovered past this point.
    BoxMalformed { box_type: BoxType, offset: u64 },

    /// Fewer bytes are available than a box header or payload declares.
    TruncatedInput {
        box_type: Option<BoxType>,
        offset: u64,
    },

    /// The box uses the 64-bit extended length form (length field 1).
    UnsupportedBoxLength { box_type: BoxType, offset: u64 },

    /// The box is too large for the 32-bit length field.
    BoxTooLarge { box_type: BoxType, length: u64 },

    /// A textual box type that is not exactly four bytes long.
    InvalidBoxType { value: String },

    InvalidSignature { signature: Vec<u8>, offset: u64 },
    NotCompatible { compatibility_list: Vec<String> },
    BoxUnexpected { box_type: BoxType, offset: u64 },
    BoxDuplicate { box_type: BoxType, offset: u64 },
    BoxMissing { box_type: BoxType },

    /// An encoding parameter that is out of range or not a known name.
    InvalidParameter { name: &'static str, value: String },
}

impl error::Error for JP2Error {}
impl fmt::Display for JP2Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::BoxMalformed { box_type, offset } => {
                write!(
                    f,
                    "malformed box type {:?} at offset {}",
                    box_type_name(*box_type),
                    offset
                )
            }
            Self::TruncatedInput {
                box_type: Some(box_type),
                offset,
            } => {
                write!(
                    f,
                    "truncated input in box type {:?} at offset {}",
                    box_type_name(*box_type),
                    offset
                )
            }
            Self::TruncatedInput {
                box_type: None,
                offset,
            } => {
                write!(f, "truncated box header at offset {}", offset)
            }
            Self::UnsupportedBoxLength { box_type, offset } => {
                write!(
                    f,
                    "unsupported extended length for box type {:?} at offset {}",
                    box_type_name(*box_type),
                    offset
                )
            }
            Self::BoxTooLarge { box_type, length } => {
                write!(
                    f,
                    "box type {:?} with payload length {} does not fit a 32-bit length field",
                    box_type_name(*box_type),
                    length
                )
            }
            Self::InvalidBoxType { value } => {
                write!(f, "invalid box type {:?}, expected four bytes", value)
            }
            Self::InvalidSignature { signature, offset } => {
                write!(f, "invalid signature {:02x?} at offset {}", signature, offset)
            }
            Self::NotCompatible { compatibility_list } => {
                write!(
                    f,
                    "'jp2 ' not found in compatibility list '{}'",
                    compatibility_list.join(", ")
                )
            }
            Self::BoxUnexpected { box_type, offset } => {
                write!(
                    f,
                    "unexpected box type {:?} at offset {}",
                    box_type_name(*box_type),
                    offset
                )
            }
            Self::BoxDuplicate { box_type, offset } => {
                write!(
                    f,
                    "unexpected duplicate box type {:?} at offset {}",
                    box_type_name(*box_type),
                    offset
                )
            }
            Self::BoxMissing { box_type } => {
                write!(f, "box type {:?} missing", box_type_name(*box_type))
            }
            Self::InvalidParameter { name, value } => {
                write!(f, "invalid value {:?} for parameter {}", value, name)
            }
        }
    }
}

/// Box Type
///
/// The value is a 4-byte big endian unsigned integer. However, boxes are
/// generally referred to by an ISO 646 character string translation of the
/// integer value, with a space shown as "\040".
pub type BoxType = [u8; 4];

// Type of the implicit root of a box stream, not a box that exists in a file.
pub const BOX_TYPE_ROOT: BoxType = [0, 0, 0, 0];

// jP\040\040 (0x6A50 2020)
pub const BOX_TYPE_SIGNATURE: BoxType = *b"jP  ";
pub const BOX_TYPE_FILE_TYPE: BoxType = *b"ftyp";
pub const BOX_TYPE_HEADER: BoxType = *b"jp2h";
pub const BOX_TYPE_IMAGE_HEADER: BoxType = *b"ihdr";
pub const BOX_TYPE_BITS_PER_COMPONENT: BoxType = *b"bpcc";
pub const BOX_TYPE_COLOUR_SPECIFICATION: BoxType = *b"colr";
pub const BOX_TYPE_PALETTE: BoxType = *b"pclr";
pub const BOX_TYPE_COMPONENT_MAPPING: BoxType = *b"cmap";
pub const BOX_TYPE_CHANNEL_DEFINITION: BoxType = *b"cdef";
pub const BOX_TYPE_RESOLUTION: BoxType = *b"res ";
pub const BOX_TYPE_CAPTURE_RESOLUTION: BoxType = *b"resc";
pub const BOX_TYPE_DEFAULT_DISPLAY_RESOLUTION: BoxType = *b"resd";
pub const BOX_TYPE_CONTIGUOUS_CODESTREAM: BoxType = *b"jp2c";
pub const BOX_TYPE_XML: BoxType = *b"xml ";
pub const BOX_TYPE_UUID: BoxType = *b"uuid";
pub const BOX_TYPE_UUID_INFO: BoxType = *b"uinf";
pub const BOX_TYPE_UUID_LIST: BoxType = *b"ulst";
pub const BOX_TYPE_DATA_ENTRY_URL: BoxType = *b"url ";

// jp2\040
pub const BRAND_JP2: [u8; 4] = *b"jp2 ";

// <CR><LF><0x87><LF> (0x0D0A 870A).
pub const SIGNATURE_MAGIC: [u8; 4] = [13, 10, 135, 10];

/// Human readable form of a box type.
///
/// Four characters when every byte is printable ASCII (0x20 to 0x7E),
/// otherwise `0x` followed by the 32-bit code as eight hex digits.
pub fn box_type_name(box_type: BoxType) -> String {
    if box_type.iter().all(|byte| (0x20..=0x7e).contains(byte)) {
        box_type.iter().map(|byte| *byte as char).collect()
    } else {
        format!("0x{:08x}", u32::from_be_bytes(box_type))
    }
}

/// Box type from its four character form, e.g. `"jp2h"`.
pub fn box_type_from_str(value: &str) -> Result<BoxType, JP2Error> {
    let bytes = value.as_bytes();
    if bytes.len() != 4 {
        return Err(JP2Error::InvalidBoxType {
            value: value.to_owned(),
        });
    }
    Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Read every box from the current position of `reader` to its end into a
/// root container, using the process-wide [`registry`].
///
/// No structural validation is done beyond the box framing, see
/// [`decode_jp2`] for that.
pub fn read_boxes<R: io::Read + io::Seek>(
    reader: &mut R,
) -> Result<ContainerBox, Box<dyn error::Error>> {
    read_boxes_with(reader, registry())
}

/// [`read_boxes`] with a caller supplied registry.
pub fn read_boxes_with<R: io::Read + io::Seek>(
    reader: &mut R,
    registry: &Registry,
) -> Result<ContainerBox, Box<dyn error::Error>> {
    let mut reader = SubReader::to_end(reader)?;
    let mut root = ContainerBox::new(BOX_TYPE_ROOT);
    root.decode_with(&mut reader, registry)?;
    Ok(root)
}

/// Write the children of `root` as a box stream.
pub fn write_boxes<W: io::Write>(
    writer: &mut W,
    root: &ContainerBox,
) -> Result<(), Box<dyn error::Error>> {
    root.encode(writer)
}
