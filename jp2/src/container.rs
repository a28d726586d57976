use log::info;
use std::error;
use std::io::{self, Seek};

use crate::header::{decode_box_header, encode_box_header, BoxHeader, BOX_HEADER_LENGTH};
use crate::jbox::{JBox, Jp2Box};
use crate::reader::SubReader;
use crate::registry::{registry, Registry};
use crate::{box_type_name, BoxType, JP2Error};

/// Superbox.
///
/// A box whose payload is a sequence of other boxes, such as the JP2 Header
/// box, the Resolution box and the UUID Info box. The file itself is read as
/// a container of type `0`.
///
/// The order of the children is preserved on read and on write.
#[derive(Debug)]
pub struct ContainerBox {
    box_type: BoxType,
    boxes: Vec<Jp2Box>,

    // Offset of each child header in the source it was read from, `None` for
    // children added after reading.
    offsets: Vec<Option<u64>>,
    pub(crate) open_ended: bool,
}

impl ContainerBox {
    pub fn new(box_type: BoxType) -> ContainerBox {
        ContainerBox {
            box_type,
            boxes: vec![],
            offsets: vec![],
            open_ended: false,
        }
    }

    /// Append a child box.
    pub fn add(&mut self, jbox: Jp2Box) -> &mut ContainerBox {
        self.boxes.push(jbox);
        self.offsets.push(None);
        self
    }

    /// Whether the box is written with a length field of 0.
    pub fn open_ended(&self) -> bool {
        self.open_ended
    }

    /// Only valid for the last box of a file or superbox.
    pub fn set_open_ended(&mut self, open_ended: bool) {
        self.open_ended = open_ended;
    }

    pub fn boxes(&self) -> &[Jp2Box] {
        &self.boxes
    }

    pub fn into_boxes(self) -> Vec<Jp2Box> {
        self.boxes
    }

    /// Children of the given type, in order.
    pub fn find<'a>(&'a self, box_type: BoxType) -> impl Iterator<Item = &'a Jp2Box> + 'a {
        self.boxes
            .iter()
            .filter(move |jbox| jbox.identifier() == box_type)
    }

    /// Children paired with the offset of their header.
    ///
    /// Children that were read keep the offset they were read at. Offsets of
    /// added children follow from the length of the preceding child, counting
    /// from `start` for the first one.
    pub fn boxes_with_offsets(&self, start: u64) -> Vec<(u64, &Jp2Box)> {
        let mut next = start;
        self.boxes
            .iter()
            .zip(&self.offsets)
            .map(|(jbox, recorded)| {
                let offset = recorded.unwrap_or(next);
                next = offset + BOX_HEADER_LENGTH + jbox.length().unwrap_or(0);
                (offset, jbox)
            })
            .collect()
    }

    /// Read children until the end of `reader`, resolving each child type
    /// through `registry`.
    pub fn decode_with(
        &mut self,
        reader: &mut SubReader,
        registry: &Registry,
    ) -> Result<(), Box<dyn error::Error>> {
        while reader.remaining() > 0 {
            let offset = reader.offset();
            let jbox = read_box(reader, registry)?;
            self.boxes.push(jbox);
            self.offsets.push(Some(offset));
        }
        Ok(())
    }
}

// Where the children were read from is not part of the box.
impl PartialEq for ContainerBox {
    fn eq(&self, other: &ContainerBox) -> bool {
        self.box_type == other.box_type
            && self.boxes == other.boxes
            && self.open_ended == other.open_ended
    }
}

impl JBox for ContainerBox {
    fn identifier(&self) -> BoxType {
        self.box_type
    }

    // If a box of length 0 is contained within a superbox, then the length of
    // that superbox shall also be 0.
    fn length(&self) -> Option<u64> {
        if self.open_ended {
            return None;
        }
        let mut length = 0;
        for jbox in &self.boxes {
            length += BOX_HEADER_LENGTH + jbox.length()?;
        }
        Some(length)
    }

    fn decode(&mut self, reader: &mut SubReader) -> Result<(), Box<dyn error::Error>> {
        self.decode_with(reader, registry())
    }

    fn encode(&self, writer: &mut dyn io::Write) -> Result<(), Box<dyn error::Error>> {
        for jbox in &self.boxes {
            write_box(jbox, writer)?;
        }
        Ok(())
    }
}

/// Read one box, header and payload, from the current position of `reader`.
///
/// The payload is read through a region bounded to the length declared in
/// the header, and `reader` is left at the end of the box whatever the box
/// consumed.
pub fn read_box(
    reader: &mut SubReader,
    registry: &Registry,
) -> Result<Jp2Box, Box<dyn error::Error>> {
    let start = reader.position();
    let BoxHeader {
        box_length,
        box_type,
    } = decode_box_header(reader)?;

    let offset = reader.offset();
    let available = reader.remaining();
    let payload_length = match box_length {
        Some(length) if length > available => {
            return Err(JP2Error::TruncatedInput {
                box_type: Some(box_type),
                offset,
            }
            .into());
        }
        Some(length) => length,
        None => available,
    };

    // A length of 0 ends the box at the end of the enclosing region. Only
    // when that region runs to the end of the file is it kept on write.
    let open_ended = box_length.is_none() && reader.open_ended();
    let mut jbox = registry.create(box_type);
    if open_ended {
        jbox.mark_open_ended();
    }

    info!("{} box start at {:?}", box_type_name(box_type), offset);
    {
        let mut region = if open_ended {
            reader.rest()?
        } else {
            reader.region(payload_length)?
        };
        jbox.decode_with(&mut region, registry)
            .map_err(|error| truncation(error, box_type, offset))?;
    }

    reader.seek(io::SeekFrom::Start(
        start + BOX_HEADER_LENGTH + payload_length,
    ))?;
    info!("{} box finish at {:?}", box_type_name(box_type), reader.offset());

    Ok(jbox)
}

/// Write one box, header and payload.
pub fn write_box(jbox: &Jp2Box, writer: &mut dyn io::Write) -> Result<(), Box<dyn error::Error>> {
    encode_box_header(writer, jbox.identifier(), jbox.length())?;
    jbox.encode(writer)
}

// A payload that ends before the layout of its box type is complete.
fn truncation(
    error: Box<dyn error::Error>,
    box_type: BoxType,
    offset: u64,
) -> Box<dyn error::Error> {
    match error.downcast_ref::<io::Error>() {
        Some(e) if e.kind() == io::ErrorKind::UnexpectedEof => JP2Error::TruncatedInput {
            box_type: Some(box_type),
            offset,
        }
        .into(),
        _ => error,
    }
}
