use log::{info, warn};
use std::error;
use std::io::{self, Seek};

use crate::colour::{
    ChannelDefinitionBox, ColourSpecificationBox, ComponentMappingBox, PaletteBox,
};
use crate::container::ContainerBox;
use crate::extension::{UUIDBox, XMLBox};
use crate::file_type::FileTypeBox;
use crate::header::BOX_HEADER_LENGTH;
use crate::image::{BitsPerComponentBox, ImageHeaderBox};
use crate::jbox::{ContiguousCodestreamBox, JBox, Jp2Box};
use crate::resolution::ResolutionBox;
use crate::{
    read_boxes, write_boxes, BoxType, JP2Error, BOX_TYPE_BITS_PER_COMPONENT,
    BOX_TYPE_CAPTURE_RESOLUTION, BOX_TYPE_CHANNEL_DEFINITION, BOX_TYPE_COLOUR_SPECIFICATION,
    BOX_TYPE_COMPONENT_MAPPING, BOX_TYPE_CONTIGUOUS_CODESTREAM,
    BOX_TYPE_DEFAULT_DISPLAY_RESOLUTION, BOX_TYPE_FILE_TYPE, BOX_TYPE_HEADER,
    BOX_TYPE_IMAGE_HEADER, BOX_TYPE_PALETTE, BOX_TYPE_RESOLUTION, BOX_TYPE_SIGNATURE, BRAND_JP2,
    SIGNATURE_MAGIC,
};

// Boxes of which the JP2 Header box holds at most one.
const HEADER_SINGLETONS: [BoxType; 5] = [
    BOX_TYPE_BITS_PER_COMPONENT,
    BOX_TYPE_PALETTE,
    BOX_TYPE_COMPONENT_MAPPING,
    BOX_TYPE_CHANNEL_DEFINITION,
    BOX_TYPE_RESOLUTION,
];

/// A JP2 file whose box structure conforms to ISO/IEC 15444-1 Annex I.
///
/// Holds the whole box tree, so unknown boxes and box order survive a
/// decode and encode.
#[derive(Debug, PartialEq)]
pub struct JP2File {
    root: ContainerBox,
}

impl JP2File {
    /// Validate the structure of a box tree read from, or to be written as,
    /// a JP2 file.
    pub fn from_root(root: ContainerBox) -> Result<JP2File, Box<dyn error::Error>> {
        validate(&root, 0)?;
        Ok(JP2File { root })
    }

    pub fn root(&self) -> &ContainerBox {
        &self.root
    }

    pub fn into_root(self) -> ContainerBox {
        self.root
    }

    /// Length of the file in bytes, `None` when its last box is open-ended.
    pub fn length(&self) -> Option<u64> {
        self.root.length()
    }

    /// Payload of the Signature box.
    pub fn signature(&self) -> Option<&[u8]> {
        match self.root.find(BOX_TYPE_SIGNATURE).next() {
            Some(Jp2Box::Opaque(signature_box)) => Some(signature_box.data()),
            _ => None,
        }
    }

    pub fn file_type(&self) -> Option<&FileTypeBox> {
        self.root.boxes().iter().find_map(|jbox| match jbox {
            Jp2Box::FileType(file_type_box) => Some(file_type_box),
            _ => None,
        })
    }

    /// JP2 Header box.
    pub fn header(&self) -> Option<&ContainerBox> {
        self.root
            .find(BOX_TYPE_HEADER)
            .next()
            .and_then(Jp2Box::as_container)
    }

    pub fn image_header(&self) -> Option<&ImageHeaderBox> {
        self.header_boxes().find_map(|jbox| match jbox {
            Jp2Box::ImageHeader(image_header_box) => Some(image_header_box),
            _ => None,
        })
    }

    pub fn bits_per_component(&self) -> Option<&BitsPerComponentBox> {
        self.header_boxes().find_map(|jbox| match jbox {
            Jp2Box::BitsPerComponent(bits_per_component_box) => Some(bits_per_component_box),
            _ => None,
        })
    }

    /// Colour Specification boxes, a conforming reader uses the first.
    pub fn colour_specifications(&self) -> impl Iterator<Item = &ColourSpecificationBox> {
        self.header_boxes().filter_map(|jbox| match jbox {
            Jp2Box::ColourSpecification(colour_box) => Some(colour_box),
            _ => None,
        })
    }

    pub fn palette(&self) -> Option<&PaletteBox> {
        self.header_boxes().find_map(|jbox| match jbox {
            Jp2Box::Palette(palette_box) => Some(palette_box),
            _ => None,
        })
    }

    pub fn component_mapping(&self) -> Option<&ComponentMappingBox> {
        self.header_boxes().find_map(|jbox| match jbox {
            Jp2Box::ComponentMapping(mapping_box) => Some(mapping_box),
            _ => None,
        })
    }

    pub fn channel_definition(&self) -> Option<&ChannelDefinitionBox> {
        self.header_boxes().find_map(|jbox| match jbox {
            Jp2Box::ChannelDefinition(channel_box) => Some(channel_box),
            _ => None,
        })
    }

    /// Resolution box of the JP2 Header box.
    pub fn resolution(&self) -> Option<&ContainerBox> {
        self.header_boxes()
            .find(|jbox| jbox.identifier() == BOX_TYPE_RESOLUTION)
            .and_then(Jp2Box::as_container)
    }

    pub fn capture_resolution(&self) -> Option<&ResolutionBox> {
        self.resolution_box(BOX_TYPE_CAPTURE_RESOLUTION)
    }

    pub fn default_display_resolution(&self) -> Option<&ResolutionBox> {
        self.resolution_box(BOX_TYPE_DEFAULT_DISPLAY_RESOLUTION)
    }

    /// Contiguous Codestream boxes in file order. When displaying the image
    /// only the first is used.
    pub fn codestreams(&self) -> impl Iterator<Item = &ContiguousCodestreamBox> {
        self.root.boxes().iter().filter_map(|jbox| match jbox {
            Jp2Box::ContiguousCodestream(codestream_box) => Some(codestream_box),
            _ => None,
        })
    }

    pub fn xml(&self) -> impl Iterator<Item = &XMLBox> {
        self.root.boxes().iter().filter_map(|jbox| match jbox {
            Jp2Box::Xml(xml_box) => Some(xml_box),
            _ => None,
        })
    }

    pub fn uuid(&self) -> impl Iterator<Item = &UUIDBox> {
        self.root.boxes().iter().filter_map(|jbox| match jbox {
            Jp2Box::Uuid(uuid_box) => Some(uuid_box),
            _ => None,
        })
    }

    fn header_boxes(&self) -> impl Iterator<Item = &Jp2Box> {
        self.header()
            .map(|header_box| header_box.boxes())
            .unwrap_or_default()
            .iter()
    }

    fn resolution_box(&self, box_type: BoxType) -> Option<&ResolutionBox> {
        self.resolution()?
            .find(box_type)
            .find_map(|jbox| match jbox {
                Jp2Box::Resolution(resolution_box) => Some(resolution_box),
                _ => None,
            })
    }
}

/// Read a JP2 file and check its box structure.
///
/// The box stream is read as by [`read_boxes`](crate::read_boxes), then the
/// Signature box, File Type box, JP2 Header box and Contiguous Codestream
/// boxes are checked for presence, order and multiplicity.
pub fn decode_jp2<R: io::Read + io::Seek>(
    reader: &mut R,
) -> Result<JP2File, Box<dyn error::Error>> {
    let start = reader.stream_position()?;
    let root = read_boxes(reader)?;
    validate(&root, start)?;
    info!("JP2 file of {} boxes", root.boxes().len());
    Ok(JP2File { root })
}

/// Write a JP2 file.
pub fn encode_jp2<W: io::Write>(
    writer: &mut W,
    file: &JP2File,
) -> Result<(), Box<dyn error::Error>> {
    write_boxes(writer, &file.root)
}

fn validate(root: &ContainerBox, start: u64) -> Result<(), Box<dyn error::Error>> {
    let boxes = root.boxes_with_offsets(start);
    let mut boxes = boxes.into_iter();

    // The Signature box shall be the first box
    match boxes.next() {
        None => {
            return Err(JP2Error::BoxMissing {
                box_type: BOX_TYPE_SIGNATURE,
            }
            .into())
        }
        Some((offset, Jp2Box::Opaque(signature_box)))
            if signature_box.identifier() == BOX_TYPE_SIGNATURE =>
        {
            if signature_box.data() != &SIGNATURE_MAGIC[..] {
                return Err(JP2Error::InvalidSignature {
                    signature: signature_box.data().to_vec(),
                    offset,
                }
                .into());
            }
        }
        Some((offset, jbox)) => {
            return Err(JP2Error::BoxUnexpected {
                box_type: jbox.identifier(),
                offset,
            }
            .into())
        }
    }

    // The File Type box shall immediately follow the Signature box
    match boxes.next() {
        None => {
            return Err(JP2Error::BoxMissing {
                box_type: BOX_TYPE_FILE_TYPE,
            }
            .into())
        }
        Some((_, Jp2Box::FileType(file_type_box))) => {
            if !file_type_box.is_compatible(BRAND_JP2) {
                return Err(JP2Error::NotCompatible {
                    compatibility_list: file_type_box.compatibility_list(),
                }
                .into());
            }
        }
        Some((offset, jbox)) => {
            return Err(JP2Error::BoxUnexpected {
                box_type: jbox.identifier(),
                offset,
            }
            .into())
        }
    }

    let mut header_found = false;
    let mut codestreams = 0;
    for (offset, jbox) in boxes {
        match jbox.identifier() {
            BOX_TYPE_HEADER => {
                if header_found {
                    return Err(JP2Error::BoxDuplicate {
                        box_type: BOX_TYPE_HEADER,
                        offset,
                    }
                    .into());
                }
                match jbox.as_container() {
                    Some(header_box) => {
                        validate_header(header_box, offset + BOX_HEADER_LENGTH)?
                    }
                    None => {
                        return Err(JP2Error::BoxUnexpected {
                            box_type: BOX_TYPE_HEADER,
                            offset,
                        }
                        .into())
                    }
                }
                header_found = true;
            }
            // The Header box shall fall before the Contiguous Codestream box
            BOX_TYPE_CONTIGUOUS_CODESTREAM => {
                if !header_found {
                    return Err(JP2Error::BoxUnexpected {
                        box_type: BOX_TYPE_CONTIGUOUS_CODESTREAM,
                        offset,
                    }
                    .into());
                }
                codestreams += 1;
            }
            box_type @ BOX_TYPE_SIGNATURE | box_type @ BOX_TYPE_FILE_TYPE => {
                return Err(JP2Error::BoxDuplicate { box_type, offset }.into());
            }
            _ => {}
        }
    }

    if !header_found {
        return Err(JP2Error::BoxMissing {
            box_type: BOX_TYPE_HEADER,
        }
        .into());
    }
    if codestreams == 0 {
        return Err(JP2Error::BoxMissing {
            box_type: BOX_TYPE_CONTIGUOUS_CODESTREAM,
        }
        .into());
    }

    Ok(())
}

fn validate_header(header_box: &ContainerBox, start: u64) -> Result<(), Box<dyn error::Error>> {
    let boxes = header_box.boxes_with_offsets(start);

    // The contents of the JP2 Header box shall start with an Image Header box.
    match boxes.first() {
        None => {
            return Err(JP2Error::BoxMissing {
                box_type: BOX_TYPE_IMAGE_HEADER,
            }
            .into())
        }
        Some((_, Jp2Box::ImageHeader(_))) => {}
        Some((offset, jbox)) => {
            return Err(JP2Error::BoxUnexpected {
                box_type: jbox.identifier(),
                offset: *offset,
            }
            .into())
        }
    }

    let mut seen: Vec<BoxType> = vec![];
    let mut colour_specifications = 0;
    for (offset, jbox) in boxes.iter().skip(1) {
        let box_type = jbox.identifier();
        match box_type {
            BOX_TYPE_IMAGE_HEADER => {
                // Instances of Image Header box in other places in the file
                // shall be ignored.
                warn!("ImageHeaderBox found in other place, ignoring");
            }
            BOX_TYPE_COLOUR_SPECIFICATION => colour_specifications += 1,
            box_type if HEADER_SINGLETONS.contains(&box_type) => {
                if seen.contains(&box_type) {
                    return Err(JP2Error::BoxDuplicate {
                        box_type,
                        offset: *offset,
                    }
                    .into());
                }
                seen.push(box_type);
            }
            _ => {}
        }
    }

    if colour_specifications == 0 {
        return Err(JP2Error::BoxMissing {
            box_type: BOX_TYPE_COLOUR_SPECIFICATION,
        }
        .into());
    }

    Ok(())
}
