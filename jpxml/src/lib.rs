use core::fmt::Write as _;
use jp2::{
    box_type_name, read_boxes, BitsPerComponentBox, ChannelDefinitionBox, ColourSpecificationBox,
    ComponentMappingBox, ContainerBox, ContiguousCodestreamBox, DataEntryURLBox, FileTypeBox,
    ImageHeaderBox, JBox, Jp2Box, OpaqueBox, PaletteBox, ResolutionBox, UUIDBox, UUIDListBox,
    XMLBox, BOX_HEADER_LENGTH,
};
use log::info;
use std::error;
use std::fmt;
use std::io;
use std::str;

/// Lower case hexadecimal digits, two per byte.
pub fn to_hex<'a, I>(iter: I) -> Result<String, Box<dyn error::Error>>
where
    I: Iterator<Item = &'a u8>,
{
    let mut hex = String::new();
    for byte in iter {
        write!(hex, "{:02x}", byte)?;
    }
    Ok(hex)
}

/// Lower case hexadecimal digits of the bytes read as one big endian unsigned
/// integer, without leading zeros, then padded with a single `0` when the
/// digit count is odd.
///
/// An empty payload is the integer zero, written `00`.
pub fn to_natural_hex(data: &[u8]) -> Result<String, Box<dyn error::Error>> {
    let hex = to_hex(data.iter())?;
    let digits = match hex.trim_start_matches('0') {
        "" => "0",
        digits => digits,
    };
    if digits.len() % 2 == 1 {
        Ok(format!("0{}", digits))
    } else {
        Ok(digits.to_string())
    }
}

/// Replace the characters that may not appear verbatim in XML text or
/// attribute values.
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

// The "jP\040\040" box type is converted to a "jP__" element name, and other
// 4CC box types are used for the element names. Names beginning with "xml" are
// reserved in XML, as are names that do not start with a letter.
pub fn element_name(box_type: [u8; 4]) -> String {
    let name: String = box_type_name(box_type)
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let starts_with_letter = name
        .chars()
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic());
    if !starts_with_letter || name.to_ascii_lowercase().starts_with("xml") {
        format!("_{}", name)
    } else {
        name
    }
}

#[derive(Debug)]
pub enum JPXMLError {
    InvalidRepresentation { representation: String },
}

impl error::Error for JPXMLError {}
impl fmt::Display for JPXMLError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidRepresentation { representation } => {
                write!(f, "invalid representation {:?}", representation)
            }
        }
    }
}

// The JPXML document is generated from an image file format, and its kind
// varies from none property to including binary data representations.
//
// When kinds of image property representation are included, the JPXML document
// is categorized with three levels of representation:
// - "skeleton"
// - "fat-skeleton"
// - and "fat" representations.
#[derive(Debug, PartialEq)]
pub enum Representation {
    // The first-level representation, the skeleton representation, shall
    // express only the structure of the image itself, and may contain an
    // attribute for the absolute offset to the element block.
    //
    // The skeleton shall have no text node in the JPXML elements.
    Skeleton,

    // The second-level representation, the fat-skeleton representation,
    // expresses the image structure and the variables of box contents, but no
    // binary data (such as a coded codestream).
    FatSkeleton,

    // The third-and final level representation, the fat representation,
    // expresses the image structure and whole image property values.
    //
    // Binary contents are written as hexadecimal digits, two per byte, so the
    // document is larger than the image it describes.
    Fat,
}

impl Representation {
    fn has_fields(&self) -> bool {
        *self != Representation::Skeleton
    }

    fn has_binary(&self) -> bool {
        *self == Representation::Fat
    }
}

impl str::FromStr for Representation {
    type Err = Box<dyn error::Error>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skeleton" => Ok(Representation::Skeleton),
            "fat-skeleton" => Ok(Representation::FatSkeleton),
            "fat" => Ok(Representation::Fat),
            _ => Err(JPXMLError::InvalidRepresentation {
                representation: s.to_owned(),
            }
            .into()),
        }
    }
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

fn encode_field<W: io::Write, T: fmt::Display>(
    writer: &mut W,
    depth: usize,
    name: &str,
    length: usize,
    kind: &str,
    value: T,
) -> Result<(), Box<dyn error::Error>> {
    write!(
        writer,
        "{}<xjp:{} length=\"{}\" type=\"{}\">{}</xjp:{}>\n",
        indent(depth),
        name,
        length,
        kind,
        value,
        name
    )?;
    Ok(())
}

fn encode_integer<W: io::Write, T: fmt::Display>(
    writer: &mut W,
    depth: usize,
    name: &str,
    length: usize,
    value: T,
) -> Result<(), Box<dyn error::Error>> {
    encode_field(writer, depth, name, length, "integer", value)
}

fn encode_hexbyte<W: io::Write>(
    writer: &mut W,
    depth: usize,
    name: &str,
    data: &[u8],
) -> Result<(), Box<dyn error::Error>> {
    encode_field(writer, depth, name, data.len(), "hexbyte", to_hex(data.iter())?)
}

/// Write one box, and the boxes it contains, as a JPXML element.
///
/// `offset` is the absolute position of the box header in the file. Open-ended
/// boxes are written with a length of 0.
pub fn encode_box<W: io::Write>(
    writer: &mut W,
    jbox: &Jp2Box,
    representation: &Representation,
    depth: usize,
    offset: u64,
) -> Result<(), Box<dyn error::Error>> {
    let name = element_name(jbox.identifier());
    write!(
        writer,
        "{}<xjp:{} type=\"box\" length=\"{}\" offset=\"{}\"",
        indent(depth),
        name,
        jbox.length().unwrap_or(0),
        offset
    )?;

    // Opaque payloads are the content of the box element itself.
    if let Jp2Box::Opaque(opaque_box) = jbox {
        return encode_opaque_box(writer, opaque_box, representation, &name);
    }
    writer.write_all(b">\n")?;

    let depth = depth + 1;
    match jbox {
        Jp2Box::Container(container_box) => {
            encode_children(writer, container_box, representation, depth, offset)?
        }
        _ if !representation.has_fields() => {}
        Jp2Box::FileType(file_type_box) => encode_file_type_box(writer, file_type_box, depth)?,
        Jp2Box::ImageHeader(image_header_box) => {
            encode_image_header_box(writer, image_header_box, depth)?
        }
        Jp2Box::BitsPerComponent(bits_per_component_box) => {
            encode_bits_per_component_box(writer, bits_per_component_box, depth)?
        }
        Jp2Box::ColourSpecification(colour_specification_box) => encode_colour_specification_box(
            writer,
            colour_specification_box,
            representation,
            depth,
        )?,
        Jp2Box::Palette(palette_box) => encode_palette_box(writer, palette_box, depth)?,
        Jp2Box::ComponentMapping(component_mapping_box) => {
            encode_component_mapping_box(writer, component_mapping_box, depth)?
        }
        Jp2Box::ChannelDefinition(channel_definition_box) => {
            encode_channel_definition_box(writer, channel_definition_box, depth)?
        }
        Jp2Box::Resolution(resolution_box) => {
            encode_resolution_box(writer, resolution_box, depth)?
        }
        Jp2Box::ContiguousCodestream(codestream_box) => {
            encode_contiguous_codestream_box(writer, codestream_box, representation, depth)?
        }
        Jp2Box::Xml(xml_box) => encode_xml_box(writer, xml_box, representation, depth)?,
        Jp2Box::Uuid(uuid_box) => encode_uuid_box(writer, uuid_box, representation, depth)?,
        Jp2Box::UuidList(uuid_list_box) => encode_uuid_list_box(writer, uuid_list_box, depth)?,
        Jp2Box::DataEntryUrl(data_entry_url_box) => {
            encode_data_entry_url_box(writer, data_entry_url_box, depth)?
        }
        Jp2Box::Opaque(_) => {}
    }

    write!(writer, "{}</xjp:{}>\n", indent(depth - 1), name)?;
    Ok(())
}

fn encode_children<W: io::Write>(
    writer: &mut W,
    container_box: &ContainerBox,
    representation: &Representation,
    depth: usize,
    offset: u64,
) -> Result<(), Box<dyn error::Error>> {
    for (child_offset, child) in container_box.boxes_with_offsets(offset + BOX_HEADER_LENGTH) {
        encode_box(writer, child, representation, depth, child_offset)?;
    }
    Ok(())
}

fn encode_opaque_box<W: io::Write>(
    writer: &mut W,
    opaque_box: &OpaqueBox,
    representation: &Representation,
    name: &str,
) -> Result<(), Box<dyn error::Error>> {
    if representation.has_binary() {
        write!(
            writer,
            ">{}</xjp:{}>\n",
            to_natural_hex(opaque_box.data())?,
            name
        )?;
    } else {
        writer.write_all(b"/>\n")?;
    }
    Ok(())
}

fn encode_file_type_box<W: io::Write>(
    writer: &mut W,
    file_type_box: &FileTypeBox,
    depth: usize,
) -> Result<(), Box<dyn error::Error>> {
    encode_field(
        writer,
        depth,
        "brand",
        4,
        "fourcc",
        escape(&box_type_name(file_type_box.brand())),
    )?;
    encode_integer(writer, depth, "version", 4, file_type_box.min_version())?;
    for compatibility in file_type_box.compatibility_list() {
        encode_field(
            writer,
            depth,
            "compatibility",
            4,
            "fourcc",
            escape(&compatibility),
        )?;
    }
    Ok(())
}

fn encode_image_header_box<W: io::Write>(
    writer: &mut W,
    image_header_box: &ImageHeaderBox,
    depth: usize,
) -> Result<(), Box<dyn error::Error>> {
    encode_integer(writer, depth, "height", 4, image_header_box.height())?;
    encode_integer(writer, depth, "width", 4, image_header_box.width())?;
    encode_integer(
        writer,
        depth,
        "num_components",
        2,
        image_header_box.components_num(),
    )?;
    encode_integer(writer, depth, "depth", 1, image_header_box.components_bits())?;
    encode_integer(
        writer,
        depth,
        "compression",
        1,
        image_header_box.compression_type(),
    )?;
    encode_integer(
        writer,
        depth,
        "colour_unknown",
        1,
        image_header_box.colourspace_unknown(),
    )?;
    encode_integer(
        writer,
        depth,
        "ipr",
        1,
        image_header_box.intellectual_property(),
    )?;
    Ok(())
}

fn encode_bits_per_component_box<W: io::Write>(
    writer: &mut W,
    bits_per_component_box: &BitsPerComponentBox,
    depth: usize,
) -> Result<(), Box<dyn error::Error>> {
    for component_bit_depth in bits_per_component_box.bits_per_component() {
        encode_integer(writer, depth, "depth", 1, component_bit_depth.to_byte())?;
    }
    Ok(())
}

fn encode_colour_specification_box<W: io::Write>(
    writer: &mut W,
    colour_specification_box: &ColourSpecificationBox,
    representation: &Representation,
    depth: usize,
) -> Result<(), Box<dyn error::Error>> {
    encode_integer(writer, depth, "method", 1, colour_specification_box.method())?;
    encode_integer(
        writer,
        depth,
        "precedence",
        1,
        colour_specification_box.precedence(),
    )?;
    encode_integer(
        writer,
        depth,
        "approx",
        1,
        colour_specification_box.colourspace_approximation(),
    )?;
    if let Some(enumerated_colour_space) = colour_specification_box.enumerated_colour_space() {
        encode_integer(writer, depth, "colour", 4, enumerated_colour_space)?;
    }
    if representation.has_binary() && !colour_specification_box.data().is_empty() {
        encode_hexbyte(writer, depth, "profile", colour_specification_box.data())?;
    }
    Ok(())
}

fn encode_palette_box<W: io::Write>(
    writer: &mut W,
    palette_box: &PaletteBox,
    depth: usize,
) -> Result<(), Box<dyn error::Error>> {
    encode_integer(writer, depth, "num_entries", 2, palette_box.num_entries())?;
    encode_integer(
        writer,
        depth,
        "num_components",
        1,
        palette_box.num_components(),
    )?;

    for generated_component in palette_box.generated_components() {
        let bit_depth = generated_component.bit_depth();
        encode_integer(writer, depth, "depth", 1, bit_depth.to_byte())?;
        let length = (bit_depth.value() as usize + 7) / 8;
        for value in generated_component.values() {
            encode_integer(writer, depth + 1, "entry", length, value)?;
        }
    }
    Ok(())
}

fn encode_component_mapping_box<W: io::Write>(
    writer: &mut W,
    component_mapping_box: &ComponentMappingBox,
    depth: usize,
) -> Result<(), Box<dyn error::Error>> {
    for component_map in component_mapping_box.component_map() {
        write!(writer, "{}<xjp:mapc type=\"xjp:mapc\">\n", indent(depth))?;
        encode_integer(writer, depth + 1, "component", 2, component_map.component())?;
        encode_integer(
            writer,
            depth + 1,
            "mtype",
            1,
            component_map.mapping_type_u8(),
        )?;
        encode_integer(writer, depth + 1, "palette", 1, component_map.palette())?;
        write!(writer, "{}</xjp:mapc>\n", indent(depth))?;
    }
    Ok(())
}

fn encode_channel_definition_box<W: io::Write>(
    writer: &mut W,
    channel_definition_box: &ChannelDefinitionBox,
    depth: usize,
) -> Result<(), Box<dyn error::Error>> {
    encode_integer(
        writer,
        depth,
        "num_entries",
        2,
        channel_definition_box.channels().len(),
    )?;
    for channel in channel_definition_box.channels() {
        encode_integer(writer, depth, "index", 2, channel.channel_index())?;
        encode_integer(writer, depth, "type", 2, channel.channel_type_u16())?;
        encode_integer(writer, depth, "assoc", 2, channel.channel_association())?;
    }
    Ok(())
}

fn encode_resolution_box<W: io::Write>(
    writer: &mut W,
    resolution_box: &ResolutionBox,
    depth: usize,
) -> Result<(), Box<dyn error::Error>> {
    encode_integer(
        writer,
        depth,
        "vert_num",
        2,
        resolution_box.vertical_numerator(),
    )?;
    encode_integer(
        writer,
        depth,
        "vert_den",
        2,
        resolution_box.vertical_denominator(),
    )?;
    encode_integer(
        writer,
        depth,
        "hori_num",
        2,
        resolution_box.horizontal_numerator(),
    )?;
    encode_integer(
        writer,
        depth,
        "hori_den",
        2,
        resolution_box.horizontal_denominator(),
    )?;
    encode_integer(
        writer,
        depth,
        "vert_exp",
        1,
        resolution_box.vertical_exponent(),
    )?;
    encode_integer(
        writer,
        depth,
        "hori_exp",
        1,
        resolution_box.horizontal_exponent(),
    )?;
    Ok(())
}

fn encode_contiguous_codestream_box<W: io::Write>(
    writer: &mut W,
    codestream_box: &ContiguousCodestreamBox,
    representation: &Representation,
    depth: usize,
) -> Result<(), Box<dyn error::Error>> {
    if representation.has_binary() {
        encode_hexbyte(writer, depth, "codestream", codestream_box.codestream())?;
    }
    Ok(())
}

fn encode_xml_box<W: io::Write>(
    writer: &mut W,
    xml_box: &XMLBox,
    representation: &Representation,
    depth: usize,
) -> Result<(), Box<dyn error::Error>> {
    match xml_box.format() {
        Ok(value) => encode_field(writer, depth, "text", value.len(), "string", escape(value))?,
        // Not UTF-8, so only representable as binary data
        Err(_) if representation.has_binary() => {
            encode_hexbyte(writer, depth, "data", xml_box.xml())?
        }
        Err(_) => {}
    }
    Ok(())
}

fn encode_uuid_box<W: io::Write>(
    writer: &mut W,
    uuid_box: &UUIDBox,
    representation: &Representation,
    depth: usize,
) -> Result<(), Box<dyn error::Error>> {
    encode_hexbyte(writer, depth, "id", uuid_box.uuid())?;
    if representation.has_binary() {
        encode_hexbyte(writer, depth, "data", uuid_box.data())?;
    }
    Ok(())
}

fn encode_uuid_list_box<W: io::Write>(
    writer: &mut W,
    uuid_list_box: &UUIDListBox,
    depth: usize,
) -> Result<(), Box<dyn error::Error>> {
    encode_integer(writer, depth, "nu", 2, uuid_list_box.number_of_uuids())?;
    for id in uuid_list_box.ids() {
        encode_hexbyte(writer, depth, "id", id)?;
    }
    Ok(())
}

fn encode_data_entry_url_box<W: io::Write>(
    writer: &mut W,
    data_entry_url_box: &DataEntryURLBox,
    depth: usize,
) -> Result<(), Box<dyn error::Error>> {
    encode_integer(writer, depth, "version", 1, data_entry_url_box.version())?;
    encode_integer(writer, depth, "flags", 3, data_entry_url_box.flags())?;
    let location = data_entry_url_box.location()?;
    encode_field(
        writer,
        depth,
        "location",
        location.len(),
        "string",
        escape(location),
    )?;
    Ok(())
}

// The JPXML document is described with three elements; a JPXML element, its
// attribute, and its content value.
//
// The JPXML element structure represents an image structure; box and content
// structure.
//
// The JPXML element has two types;
// - the first element is a container element which expresses a box itself
// - and the second one is a content element which expresses a box content.
//
// Superboxes contain other containers, and so a JPXML document will have a
// tree structure.
pub fn encode_boxes<W: io::Write>(
    writer: &mut W,
    root: &ContainerBox,
    representation: &Representation,
    name: &str,
) -> Result<(), Box<dyn error::Error>> {
    writer.write_all(b"<?xml version=\"1.0\"?>\n")?;
    writer.write_all(b"<xjp:jpxml xmlns:xjp=\"http://www.jpeg.org/jpxml/1.0\" xmlns:xs=\"http://www.w3.org/2001/XMLSchema\"")?;
    write!(writer, " length=\"{}\"", root.length().unwrap_or(0))?;
    if !name.is_empty() {
        write!(writer, " name=\"{}\"", escape(name))?;
    }
    writer.write_all(b">\n")?;

    for (offset, jbox) in root.boxes_with_offsets(0) {
        encode_box(writer, jbox, representation, 1, offset)?;
    }

    writer.write_all(b"</xjp:jpxml>\n")?;
    Ok(())
}

/// Read every box of `reader` and write them as a JPXML document.
///
/// Boxes are read without the JP2 file rules, so any box sequence can be
/// inspected.
pub fn encode_jp2<W: io::Write, R: io::Read + io::Seek>(
    writer: &mut W,
    reader: &mut R,
    representation: &Representation,
    name: &str,
) -> Result<(), Box<dyn error::Error>> {
    let root = read_boxes(reader)?;
    info!("JPXML {:?} of {} boxes", representation, root.boxes().len());
    encode_boxes(writer, &root, representation, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_hex() {
        assert_eq!(to_hex([0x0d, 0x0a, 0x87, 0x0a].iter()).unwrap(), "0d0a870a");
        assert_eq!(to_hex([0x01].iter()).unwrap(), "01");
        assert_eq!(to_hex([].iter()).unwrap(), "");
    }

    #[test]
    fn test_to_natural_hex() {
        assert_eq!(to_natural_hex(&[0x0d, 0x0a, 0x87, 0x0a]).unwrap(), "0d0a870a");
        assert_eq!(to_natural_hex(&[0xff, 0x00]).unwrap(), "ff00");
        assert_eq!(to_natural_hex(&[0x00, 0x01]).unwrap(), "01");
        assert_eq!(to_natural_hex(&[0x00, 0x00, 0x1f, 0xab]).unwrap(), "1fab");
        assert_eq!(to_natural_hex(&[0x00, 0x00]).unwrap(), "00");
        assert_eq!(to_natural_hex(&[]).unwrap(), "00");
    }

    #[test]
    fn test_element_name() {
        assert_eq!(element_name(*b"jP  "), "jP__");
        assert_eq!(element_name(*b"jp2h"), "jp2h");
        assert_eq!(element_name(*b"xml "), "_xml_");
        assert_eq!(element_name(*b"res "), "res_");
        assert_eq!(element_name([0, 0, 0, 0]), "_0x00000000");
        assert_eq!(element_name(*b"a<b>"), "a_b_");
    }

    #[test]
    fn test_escape() {
        assert_eq!(
            escape("<a href=\"x\">&'</a>"),
            "&lt;a href=&quot;x&quot;&gt;&amp;&apos;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_representation_from_str() {
        assert_eq!(
            "skeleton".parse::<Representation>().unwrap(),
            Representation::Skeleton
        );
        assert_eq!(
            "fat-skeleton".parse::<Representation>().unwrap(),
            Representation::FatSkeleton
        );
        assert_eq!("fat".parse::<Representation>().unwrap(), Representation::Fat);
        assert!("thin".parse::<Representation>().is_err());
    }
}
