use log::debug;
use std::error;
use std::io::{self, Read};

use crate::colour::{
    ChannelDefinitionBox, ColourSpecificationBox, ComponentMappingBox, PaletteBox,
};
use crate::container::ContainerBox;
use crate::extension::{DataEntryURLBox, UUIDBox, UUIDListBox, XMLBox};
use crate::file_type::FileTypeBox;
use crate::image::{BitsPerComponentBox, ImageHeaderBox};
use crate::reader::SubReader;
use crate::registry::{registry, Registry};
use crate::resolution::ResolutionBox;
use crate::{BoxType, BOX_TYPE_CONTIGUOUS_CODESTREAM};

/// JPEG 2000 box trait.
///
/// The building-block of the JP2 file format is called a box.
///
/// All information contained within the JP2 file is encapsulated in boxes.
///
/// ISO/IEC 15444-1 / ITU T-800 defines several types of boxes;
/// the definition of each specific box type defines the kinds of information
/// that may be found within a box of that type. Some boxes will be defined to
/// contain other boxes.
///
/// The header (LBox and TBox) is handled by the enclosing container, a box
/// only reads and writes its payload (DBox).
///
/// For more information, see ISO/IEC 15444-1 / ITU T-800 Appendix I.4.
pub trait JBox {
    fn identifier(&self) -> BoxType;

    /// Payload length in bytes, `None` when the payload extends to the end of
    /// the enclosing box or file.
    fn length(&self) -> Option<u64>;

    /// Read the payload from `reader`, which is bounded to the payload.
    fn decode(&mut self, reader: &mut SubReader) -> Result<(), Box<dyn error::Error>>;

    /// Write the payload, in the same layout `decode` reads.
    fn encode(&self, writer: &mut dyn io::Write) -> Result<(), Box<dyn error::Error>>;
}

/// Any box of a JP2 file.
///
/// Box types without a dedicated representation are held as [`OpaqueBox`].
#[derive(Debug, PartialEq)]
pub enum Jp2Box {
    Opaque(OpaqueBox),
    Container(ContainerBox),
    FileType(FileTypeBox),
    ImageHeader(ImageHeaderBox),
    BitsPerComponent(BitsPerComponentBox),
    ColourSpecification(ColourSpecificationBox),
    Palette(PaletteBox),
    ComponentMapping(ComponentMappingBox),
    ChannelDefinition(ChannelDefinitionBox),
    Resolution(ResolutionBox),
    ContiguousCodestream(ContiguousCodestreamBox),
    Xml(XMLBox),
    Uuid(UUIDBox),
    UuidList(UUIDListBox),
    DataEntryUrl(DataEntryURLBox),
}

impl Jp2Box {
    fn as_jbox(&self) -> &dyn JBox {
        match self {
            Jp2Box::Opaque(b) => b,
            Jp2Box::Container(b) => b,
            Jp2Box::FileType(b) => b,
            Jp2Box::ImageHeader(b) => b,
            Jp2Box::BitsPerComponent(b) => b,
            Jp2Box::ColourSpecification(b) => b,
            Jp2Box::Palette(b) => b,
            Jp2Box::ComponentMapping(b) => b,
            Jp2Box::ChannelDefinition(b) => b,
            Jp2Box::Resolution(b) => b,
            Jp2Box::ContiguousCodestream(b) => b,
            Jp2Box::Xml(b) => b,
            Jp2Box::Uuid(b) => b,
            Jp2Box::UuidList(b) => b,
            Jp2Box::DataEntryUrl(b) => b,
        }
    }

    fn as_jbox_mut(&mut self) -> &mut dyn JBox {
        match self {
            Jp2Box::Opaque(b) => b,
            Jp2Box::Container(b) => b,
            Jp2Box::FileType(b) => b,
            Jp2Box::ImageHeader(b) => b,
            Jp2Box::BitsPerComponent(b) => b,
            Jp2Box::ColourSpecification(b) => b,
            Jp2Box::Palette(b) => b,
            Jp2Box::ComponentMapping(b) => b,
            Jp2Box::ChannelDefinition(b) => b,
            Jp2Box::Resolution(b) => b,
            Jp2Box::ContiguousCodestream(b) => b,
            Jp2Box::Xml(b) => b,
            Jp2Box::Uuid(b) => b,
            Jp2Box::UuidList(b) => b,
            Jp2Box::DataEntryUrl(b) => b,
        }
    }

    /// Read the payload, resolving the children of container boxes through
    /// `registry`.
    pub fn decode_with(
        &mut self,
        reader: &mut SubReader,
        registry: &Registry,
    ) -> Result<(), Box<dyn error::Error>> {
        match self {
            Jp2Box::Container(container_box) => container_box.decode_with(reader, registry),
            other => other.as_jbox_mut().decode(reader),
        }
    }

    /// Record that the header of this box had a length field of 0 and that
    /// the box ran to the end of the file, so that it is written back the
    /// same way.
    pub(crate) fn mark_open_ended(&mut self) {
        match self {
            Jp2Box::Opaque(b) => b.open_ended = true,
            Jp2Box::Container(b) => b.open_ended = true,
            Jp2Box::FileType(b) => b.open_ended = true,
            Jp2Box::ImageHeader(b) => b.open_ended = true,
            Jp2Box::BitsPerComponent(b) => b.open_ended = true,
            Jp2Box::ColourSpecification(b) => b.open_ended = true,
            Jp2Box::Palette(b) => b.open_ended = true,
            Jp2Box::ComponentMapping(b) => b.open_ended = true,
            Jp2Box::ChannelDefinition(b) => b.open_ended = true,
            Jp2Box::Resolution(b) => b.open_ended = true,
            Jp2Box::ContiguousCodestream(b) => b.open_ended = true,
            Jp2Box::Xml(b) => b.open_ended = true,
            Jp2Box::Uuid(b) => b.open_ended = true,
            Jp2Box::UuidList(b) => b.open_ended = true,
            Jp2Box::DataEntryUrl(b) => b.open_ended = true,
        }
    }

    pub fn as_container(&self) -> Option<&ContainerBox> {
        match self {
            Jp2Box::Container(container_box) => Some(container_box),
            _ => None,
        }
    }
}

impl JBox for Jp2Box {
    fn identifier(&self) -> BoxType {
        self.as_jbox().identifier()
    }

    fn length(&self) -> Option<u64> {
        self.as_jbox().length()
    }

    fn decode(&mut self, reader: &mut SubReader) -> Result<(), Box<dyn error::Error>> {
        self.decode_with(reader, registry())
    }

    fn encode(&self, writer: &mut dyn io::Write) -> Result<(), Box<dyn error::Error>> {
        self.as_jbox().encode(writer)
    }
}

/// Box of a type without a dedicated representation.
///
/// The payload is kept as raw bytes and written back unchanged, so box types
/// defined by other standards, or by later revisions, survive a read and
/// write.
#[derive(Debug, Default, PartialEq)]
pub struct OpaqueBox {
    box_type: BoxType,
    data: Vec<u8>,
    open_ended: bool,
}

impl OpaqueBox {
    pub fn new(box_type: BoxType, data: Vec<u8>) -> OpaqueBox {
        OpaqueBox {
            box_type,
            data,
            open_ended: false,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn set_data(&mut self, data: Vec<u8>) {
        self.data = data;
    }

    /// Whether the box is written with a length field of 0.
    pub fn open_ended(&self) -> bool {
        self.open_ended
    }

    /// Only valid for the last box of a file or superbox.
    pub fn set_open_ended(&mut self, open_ended: bool) {
        self.open_ended = open_ended;
    }
}

impl JBox for OpaqueBox {
    fn identifier(&self) -> BoxType {
        self.box_type
    }

    fn length(&self) -> Option<u64> {
        if self.open_ended {
            None
        } else {
            Some(self.data.len() as u64)
        }
    }

    fn decode(&mut self, reader: &mut SubReader) -> Result<(), Box<dyn error::Error>> {
        self.data.clear();
        reader.read_to_end(&mut self.data)?;
        debug!("Read {} opaque bytes", self.data.len());
        Ok(())
    }

    fn encode(&self, writer: &mut dyn io::Write) -> Result<(), Box<dyn error::Error>> {
        writer.write_all(&self.data)?;
        Ok(())
    }
}

// Contiguous Codestream box
//
// The Contiguous Codestream box contains a valid and complete JPEG 2000
// codestream. When displaying the image, a conforming reader shall ignore all
// codestreams after the first codestream found in the file.
//
// Contiguous Codestream boxes may be found anywhere in the file
// except before the JP2 Header box.
//
// The codestream is carried as is, decoding it is left to a codec, see
// `crate::codec`.
#[derive(Debug, Default, PartialEq)]
pub struct ContiguousCodestreamBox {
    codestream: Vec<u8>,
    open_ended: bool,
}

impl ContiguousCodestreamBox {
    pub fn new(codestream: Vec<u8>) -> ContiguousCodestreamBox {
        ContiguousCodestreamBox {
            codestream,
            open_ended: false,
        }
    }

    pub fn codestream(&self) -> &[u8] {
        &self.codestream
    }

    pub fn into_codestream(self) -> Vec<u8> {
        self.codestream
    }

    pub fn open_ended(&self) -> bool {
        self.open_ended
    }

    /// Write the box with a length field of 0, as encoders that stream the
    /// codestream do. Only valid for the last box of the file.
    pub fn set_open_ended(&mut self, open_ended: bool) {
        self.open_ended = open_ended;
    }
}

impl JBox for ContiguousCodestreamBox {
    // The type of a Contiguous Codestream box shall be ‘jp2c’
    fn identifier(&self) -> BoxType {
        BOX_TYPE_CONTIGUOUS_CODESTREAM
    }

    fn length(&self) -> Option<u64> {
        if self.open_ended {
            None
        } else {
            Some(self.codestream.len() as u64)
        }
    }

    fn decode(&mut self, reader: &mut SubReader) -> Result<(), Box<dyn error::Error>> {
        self.codestream.clear();
        reader.read_to_end(&mut self.codestream)?;
        debug!("Codestream of {} bytes", self.codestream.len());
        Ok(())
    }

    fn encode(&self, writer: &mut dyn io::Write) -> Result<(), Box<dyn error::Error>> {
        writer.write_all(&self.codestream)?;
        Ok(())
    }
}
