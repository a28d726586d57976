use log::{debug, warn};
use std::cmp;
use std::error;
use std::fmt;
use std::io::{self, Read};

use crate::image::BitDepth;
use crate::jbox::JBox;
use crate::reader::SubReader;
use crate::{
    BoxType, JP2Error, BOX_TYPE_CHANNEL_DEFINITION, BOX_TYPE_COLOUR_SPECIFICATION,
    BOX_TYPE_COMPONENT_MAPPING, BOX_TYPE_PALETTE,
};

const METHOD_ENUMERATED_COLOUR_SPACE: u8 = 1;
const METHOD_ENUMERATED_RESTRICTED_ICC_PROFILE: u8 = 2;

#[derive(Debug, PartialEq)]
pub enum ColourSpecificationMethods {
    EnumeratedColourSpace,
    RestrictedICCProfile,
    Reserved { value: u8 },
}

impl fmt::Display for ColourSpecificationMethods {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl ColourSpecificationMethods {
    fn new(value: u8) -> ColourSpecificationMethods {
        match value {
            METHOD_ENUMERATED_COLOUR_SPACE => ColourSpecificationMethods::EnumeratedColourSpace,
            METHOD_ENUMERATED_RESTRICTED_ICC_PROFILE => {
                ColourSpecificationMethods::RestrictedICCProfile
            }
            value => ColourSpecificationMethods::Reserved { value },
        }
    }

    pub fn value(&self) -> u8 {
        match self {
            ColourSpecificationMethods::EnumeratedColourSpace => METHOD_ENUMERATED_COLOUR_SPACE,
            ColourSpecificationMethods::RestrictedICCProfile => {
                METHOD_ENUMERATED_RESTRICTED_ICC_PROFILE
            }
            ColourSpecificationMethods::Reserved { value } => *value,
        }
    }
}

pub const ENUMERATED_COLOUR_SPACE_SRGB: u32 = 16;
pub const ENUMERATED_COLOUR_SPACE_GREYSCALE: u32 = 17;

#[derive(Debug, PartialEq)]
pub enum EnumeratedColourSpaces {
    #[allow(non_camel_case_types)]
    sRGB,
    Greyscale,
    Reserved { value: u32 },
}

impl EnumeratedColourSpaces {
    pub fn new(value: u32) -> EnumeratedColourSpaces {
        match value {
            ENUMERATED_COLOUR_SPACE_SRGB => EnumeratedColourSpaces::sRGB,
            ENUMERATED_COLOUR_SPACE_GREYSCALE => EnumeratedColourSpaces::Greyscale,
            value => EnumeratedColourSpaces::Reserved { value },
        }
    }
}

// I.5.3.3
//
// Colour Specification box
//
// Each Colour Specification box defines one method by which an application can
// interpret the colourspace of the decompressed image data. This colour
// specification is to be applied to the image data after it has been
// decompressed and after any reverse decorrelating component transform has been
// applied to the image data.
//
// A JP2 file may contain multiple Colour Specification boxes, but must contain
// at least one, specifying different methods for achieving “equivalent” results.
// A conforming JP2 reader shall ignore all Colour Specification boxes after the
// first.
#[derive(Debug, Default, PartialEq)]
pub struct ColourSpecificationBox {
    method: u8,
    precedence: i8,
    colourspace_approximation: u8,

    // If the value of the METH field is 2, then the EnumCS field shall not
    // exist.
    enumerated_colour_space: Option<u32>,

    // The ICC profile for method 2, any bytes following the fixed fields for
    // the other methods.
    data: Vec<u8>,

    // Written back with a length field of 0.
    pub(crate) open_ended: bool,
}

impl ColourSpecificationBox {
    /// Colour Specification box using an enumerated colourspace.
    pub fn enumerated(colour_space: u32) -> ColourSpecificationBox {
        ColourSpecificationBox {
            method: METHOD_ENUMERATED_COLOUR_SPACE,
            precedence: 0,
            colourspace_approximation: 0,
            enumerated_colour_space: Some(colour_space),
            data: vec![],
            open_ended: false,
        }
    }

    /// Colour Specification box embedding a restricted ICC profile.
    pub fn icc(profile: Vec<u8>) -> ColourSpecificationBox {
        ColourSpecificationBox {
            method: METHOD_ENUMERATED_RESTRICTED_ICC_PROFILE,
            precedence: 0,
            colourspace_approximation: 0,
            enumerated_colour_space: None,
            data: profile,
            open_ended: false,
        }
    }

    // Specification method.
    //
    // This field specifies the method used by this Colour Specification box to
    // define the colourspace of the decompressed image.
    pub fn method(&self) -> ColourSpecificationMethods {
        ColourSpecificationMethods::new(self.method)
    }

    // Precedence.
    //
    // This field is reserved for ISO use and the value shall be set to zero;
    // however, conforming readers shall ignore the value of this field.
    pub fn precedence(&self) -> i8 {
        self.precedence
    }

    // Colourspace approximation.
    //
    // The value of this field shall be set to zero; however, conforming readers
    // shall ignore the value of this field.
    pub fn colourspace_approximation(&self) -> u8 {
        self.colourspace_approximation
    }

    // Enumerated colourspace.
    //
    // This field contains a 4-byte big endian unsigned integer value
    // indicating the colourspace of the image.
    pub fn enumerated_colour_space(&self) -> Option<u32> {
        self.enumerated_colour_space
    }

    /// Restricted ICC profile, for method 2 only.
    pub fn restricted_icc_profile(&self) -> Option<&[u8]> {
        match self.method() {
            ColourSpecificationMethods::RestrictedICCProfile => Some(&self.data),
            _ => None,
        }
    }

    /// Bytes following the fixed fields, the profile for method 2.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl JBox for ColourSpecificationBox {
    // The type of a Colour Specification box shall be ‘colr’ (0x636F 6C72).
    fn identifier(&self) -> BoxType {
        BOX_TYPE_COLOUR_SPECIFICATION
    }

    fn length(&self) -> Option<u64> {
        if self.open_ended {
            return None;
        }
        let enumerated = if self.enumerated_colour_space.is_some() {
            4
        } else {
            0
        };
        Some(3 + enumerated + self.data.len() as u64)
    }

    fn decode(&mut self, reader: &mut SubReader) -> Result<(), Box<dyn error::Error>> {
        let mut fields: [u8; 3] = [0; 3];
        reader.read_exact(&mut fields)?;
        self.method = fields[0];
        self.precedence = fields[1] as i8;
        self.colourspace_approximation = fields[2];

        if self.precedence != 0 {
            warn!("Precedence {:?} Unexpected", self.precedence);
        }
        if self.colourspace_approximation != 0 {
            warn!(
                "Colourspace Approximation {:?} unexpected",
                self.colourspace_approximation
            );
        }

        debug!("Method {:?}", self.method());

        // If the value of the METH field is 1, then the EnumCS shall exist in
        // this box immediately following the APPROX field.
        self.enumerated_colour_space = match self.method() {
            ColourSpecificationMethods::EnumeratedColourSpace => {
                let mut buffer: [u8; 4] = [0; 4];
                reader.read_exact(&mut buffer)?;
                let enumerated_colour_space = u32::from_be_bytes(buffer);
                debug!(
                    "Enumerated Colour Space {:?}",
                    EnumeratedColourSpaces::new(enumerated_colour_space)
                );
                Some(enumerated_colour_space)
            }
            _ => None,
        };

        // The PROFILE field for method 2, fields a conforming JP2 reader shall
        // ignore for the reserved methods.
        self.data.clear();
        reader.read_to_end(&mut self.data)?;

        Ok(())
    }

    fn encode(&self, writer: &mut dyn io::Write) -> Result<(), Box<dyn error::Error>> {
        writer.write_all(&[
            self.method,
            self.precedence as u8,
            self.colourspace_approximation,
        ])?;
        if let Some(enumerated_colour_space) = self.enumerated_colour_space {
            writer.write_all(&enumerated_colour_space.to_be_bytes())?;
        }
        writer.write_all(&self.data)?;
        Ok(())
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct GeneratedComponent {
    // This parameter specifies the bit depth of generated component i,
    // encoded as a 1-byte big endian integer.
    bit_depth: u8,

    // The generated component value for each entry of the palette, padded to
    // a multiple of 8 bits with the actual value in the low-order bits.
    values: Vec<u64>,
}

impl GeneratedComponent {
    pub fn new(bit_depth: BitDepth, values: Vec<u64>) -> GeneratedComponent {
        GeneratedComponent {
            bit_depth: bit_depth.to_byte(),
            values,
        }
    }

    pub fn bit_depth(&self) -> BitDepth {
        BitDepth::new(self.bit_depth)
    }

    pub fn values(&self) -> &[u64] {
        &self.values
    }

    // If the value of Bi is not a multiple of 8, then each Cji value is padded
    // with zeros to a multiple of 8 bits.
    fn value_length(&self) -> usize {
        cmp::min((self.bit_depth().value() as usize + 7) / 8, 8)
    }
}

/// Palette box.
///
/// The palette specified in this box is applied to a single component to
/// convert it into multiple components.
///
/// If the JP2 Header box contains a Palette box, then it shall also contain a
/// Component Mapping box.
///
/// See Part 1 Section I.5.3.4 for more information.
#[derive(Debug, Default, PartialEq)]
pub struct PaletteBox {
    /// Number of entries in the table.
    ///
    /// This value shall be in the range 1 to 1024 and is encoded as a 2-byte
    /// big endian unsigned integer.
    num_entries: u16,

    generated_components: Vec<GeneratedComponent>,
    pub(crate) open_ended: bool,
}

impl PaletteBox {
    /// Palette of `num_entries` entries, every generated component holding
    /// one value per entry.
    pub fn new(num_entries: u16, generated_components: Vec<GeneratedComponent>) -> PaletteBox {
        PaletteBox {
            num_entries,
            generated_components,
            open_ended: false,
        }
    }

    pub fn num_entries(&self) -> u16 {
        self.num_entries
    }

    /// Number of components created by the application of the palette.
    pub fn num_components(&self) -> u8 {
        self.generated_components.len() as u8
    }

    pub fn generated_components(&self) -> &[GeneratedComponent] {
        &self.generated_components
    }
}

impl JBox for PaletteBox {
    // The type of a Palette box shall be ‘pclr’ (0x7063 6C72).
    fn identifier(&self) -> BoxType {
        BOX_TYPE_PALETTE
    }

    fn length(&self) -> Option<u64> {
        if self.open_ended {
            return None;
        }
        let entry_length: usize = self
            .generated_components
            .iter()
            .map(|component| component.value_length())
            .sum();
        Some(
            3 + self.generated_components.len() as u64
                + self.num_entries as u64 * entry_length as u64,
        )
    }

    fn decode(&mut self, reader: &mut SubReader) -> Result<(), Box<dyn error::Error>> {
        let mut num_entries: [u8; 2] = [0; 2];
        reader.read_exact(&mut num_entries)?;
        self.num_entries = u16::from_be_bytes(num_entries);

        let mut num_components: [u8; 1] = [0; 1];
        reader.read_exact(&mut num_components)?;

        let offset = reader.offset();
        let mut bit_depths = vec![0; num_components[0] as usize];
        reader.read_exact(&mut bit_depths)?;
        if bit_depths
            .iter()
            .any(|bit_depth| matches!(BitDepth::new(*bit_depth), BitDepth::Reserved { .. }))
        {
            return Err(JP2Error::BoxMalformed {
                box_type: BOX_TYPE_PALETTE,
                offset,
            }
            .into());
        }
        self.generated_components = bit_depths
            .into_iter()
            .map(|bit_depth| GeneratedComponent {
                bit_depth,
                values: Vec::with_capacity(self.num_entries as usize),
            })
            .collect();

        // Cji values are organized in entry major order; all of the component
        // values for entry j are grouped together.
        let mut buffer: [u8; 8] = [0; 8];
        for _ in 0..self.num_entries {
            for generated_component in &mut self.generated_components {
                let value_length = generated_component.value_length();
                let value = &mut buffer[8 - value_length..];
                reader.read_exact(value)?;
                let value = value.iter().fold(0u64, |acc, byte| acc << 8 | *byte as u64);
                generated_component.values.push(value);
            }
        }

        debug!(
            "Palette of {} entries and {} components",
            self.num_entries,
            self.generated_components.len()
        );

        Ok(())
    }

    fn encode(&self, writer: &mut dyn io::Write) -> Result<(), Box<dyn error::Error>> {
        writer.write_all(&self.num_entries.to_be_bytes())?;
        writer.write_all(&[self.num_components()])?;
        for generated_component in &self.generated_components {
            writer.write_all(&[generated_component.bit_depth])?;
        }
        for entry in 0..self.num_entries as usize {
            for generated_component in &self.generated_components {
                let value = generated_component
                    .values
                    .get(entry)
                    .copied()
                    .unwrap_or_default();
                let value_length = generated_component.value_length();
                writer.write_all(&value.to_be_bytes()[8 - value_length..])?;
            }
        }
        Ok(())
    }
}

const COMPONENT_MAP_TYPE_DIRECT: u8 = 1;
const COMPONENT_MAP_TYPE_PALETTE: u8 = 2;

#[derive(Debug, PartialEq)]
pub enum ComponentMapType {
    // Direct use.
    //
    // This channel is created directly from an actual component in the
    // codestream.
    Direct,

    // Palette mapping.
    //
    // This channel is created by applying the palette to an actual component
    // in the codestream.
    Palette,

    // Reserved for ISO use
    Reserved { value: u8 },
}

impl ComponentMapType {
    fn new(value: u8) -> ComponentMapType {
        match value {
            COMPONENT_MAP_TYPE_DIRECT => ComponentMapType::Direct,
            COMPONENT_MAP_TYPE_PALETTE => ComponentMapType::Palette,
            value => ComponentMapType::Reserved { value },
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct ComponentMap {
    // This field specifies the index of component from the codestream that is
    // mapped to this channel (either directly or through a palette).
    component: u16,

    // This field specifies how this channel is generated from the actual
    // components in the file.
    mapping_type: u8,

    // If the value of the MTYPi field for this channel is 0, then the value of
    // this field shall be 0.
    palette: u8,
}

impl ComponentMap {
    pub fn new(component: u16, mapping_type: u8, palette: u8) -> ComponentMap {
        ComponentMap {
            component,
            mapping_type,
            palette,
        }
    }

    pub fn component(&self) -> u16 {
        self.component
    }

    pub fn mapping_type(&self) -> ComponentMapType {
        ComponentMapType::new(self.mapping_type)
    }

    pub fn mapping_type_u8(&self) -> u8 {
        self.mapping_type
    }

    pub fn palette(&self) -> u8 {
        self.palette
    }
}

/// Component Mapping Box.
///
/// The Component Mapping box defines how image channels are identified from the
/// actual components decoded from the codestream.
///
/// The channels are numbered in order starting with zero, and the number of
/// channels specified in the Component Mapping box is determined by the length
/// of the box.
///
/// See ISO/IEC 15444-1:2024 Section I.5.3.5.
#[derive(Debug, Default, PartialEq)]
pub struct ComponentMappingBox {
    mapping: Vec<ComponentMap>,
    pub(crate) open_ended: bool,
}

impl ComponentMappingBox {
    pub fn new(mapping: Vec<ComponentMap>) -> ComponentMappingBox {
        ComponentMappingBox {
            mapping,
            open_ended: false,
        }
    }

    pub fn component_map(&self) -> &[ComponentMap] {
        &self.mapping
    }
}

impl JBox for ComponentMappingBox {
    // The type of a Component Mapping box shall be ‘cmap’ (0x636D 6170).
    fn identifier(&self) -> BoxType {
        BOX_TYPE_COMPONENT_MAPPING
    }

    fn length(&self) -> Option<u64> {
        if self.open_ended {
            return None;
        }
        Some(4 * self.mapping.len() as u64)
    }

    fn decode(&mut self, reader: &mut SubReader) -> Result<(), Box<dyn error::Error>> {
        if reader.remaining() % 4 != 0 {
            return Err(JP2Error::BoxMalformed {
                box_type: BOX_TYPE_COMPONENT_MAPPING,
                offset: reader.offset(),
            }
            .into());
        }

        self.mapping.clear();
        let mut buffer: [u8; 4] = [0; 4];
        while reader.remaining() > 0 {
            reader.read_exact(&mut buffer)?;
            self.mapping.push(ComponentMap {
                component: u16::from_be_bytes([buffer[0], buffer[1]]),
                mapping_type: buffer[2],
                palette: buffer[3],
            });
        }
        Ok(())
    }

    fn encode(&self, writer: &mut dyn io::Write) -> Result<(), Box<dyn error::Error>> {
        for component_map in &self.mapping {
            writer.write_all(&component_map.component.to_be_bytes())?;
            writer.write_all(&[component_map.mapping_type, component_map.palette])?;
        }
        Ok(())
    }
}

const CHANNEL_TYPE_COLOUR_IMAGE_DATA: u16 = 0;
const CHANNEL_TYPE_OPACITY: u16 = 1;
const CHANNEL_TYPE_PREMULTIPLIED_OPACITY: u16 = 2;
const CHANNEL_TYPE_UNSPECIFIED: u16 = u16::MAX;

#[derive(Debug, PartialEq)]
pub enum ChannelTypes {
    ColourImageData,
    Opacity,
    PremultipliedOpacity,
    Reserved { value: u16 },
    Unspecified { value: u16 },
}

impl ChannelTypes {
    fn new(channel_type: u16) -> ChannelTypes {
        match channel_type {
            CHANNEL_TYPE_COLOUR_IMAGE_DATA => ChannelTypes::ColourImageData,
            CHANNEL_TYPE_OPACITY => ChannelTypes::Opacity,
            CHANNEL_TYPE_PREMULTIPLIED_OPACITY => ChannelTypes::PremultipliedOpacity,
            CHANNEL_TYPE_UNSPECIFIED => ChannelTypes::Unspecified {
                value: channel_type,
            },
            value => ChannelTypes::Reserved { value },
        }
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct Channel {
    // Channel index
    //
    // The index of the channel as defined within the Component Mapping box
    // (or the actual component from the codestream if the file does not
    // contain a Component Mapping box).
    channel_index: u16,

    // Channel type
    //
    // The meaning of the decompressed samples in this channel.
    channel_type: u16,

    // Channel association
    //
    // The index of the colour for which this channel is directly associated
    // (or a special value to indicate the whole image or the lack of an
    // association).
    channel_association: u16,
}

impl Channel {
    pub fn new(channel_index: u16, channel_type: u16, channel_association: u16) -> Channel {
        Channel {
            channel_index,
            channel_type,
            channel_association,
        }
    }

    pub fn channel_index(&self) -> u16 {
        self.channel_index
    }

    pub fn channel_type(&self) -> ChannelTypes {
        ChannelTypes::new(self.channel_type)
    }

    pub fn channel_type_u16(&self) -> u16 {
        self.channel_type
    }

    pub fn channel_association(&self) -> u16 {
        self.channel_association
    }
}

// I.5.3.6
//
// Channel Definition Box
//
// The Channel Definition box specifies the meaning of the samples in each
// channel in the image.
//
// If the JP2 Header box does not contain a Component Mapping box, then a
// reader shall map component i to channel i, for all components in
// the codestream.
#[derive(Debug, Default, PartialEq)]
pub struct ChannelDefinitionBox {
    channels: Vec<Channel>,
    pub(crate) open_ended: bool,
}

impl ChannelDefinitionBox {
    pub fn new(channels: Vec<Channel>) -> ChannelDefinitionBox {
        ChannelDefinitionBox {
            channels,
            open_ended: false,
        }
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }
}

impl JBox for ChannelDefinitionBox {
    // The type of a Channel Definition box shall be ‘cdef’ (0x6364 6566).
    fn identifier(&self) -> BoxType {
        BOX_TYPE_CHANNEL_DEFINITION
    }

    fn length(&self) -> Option<u64> {
        if self.open_ended {
            return None;
        }
        Some(2 + 6 * self.channels.len() as u64)
    }

    fn decode(&mut self, reader: &mut SubReader) -> Result<(), Box<dyn error::Error>> {
        // Number of channel descriptions, a 2-byte big endian unsigned integer.
        let mut no_channel_descriptions: [u8; 2] = [0; 2];
        reader.read_exact(&mut no_channel_descriptions)?;
        let size = u16::from_be_bytes(no_channel_descriptions);

        self.channels = Vec::with_capacity(size as usize);
        let mut buffer: [u8; 6] = [0; 6];
        for _ in 0..size {
            reader.read_exact(&mut buffer)?;
            let channel = Channel {
                channel_index: u16::from_be_bytes([buffer[0], buffer[1]]),
                channel_type: u16::from_be_bytes([buffer[2], buffer[3]]),
                channel_association: u16::from_be_bytes([buffer[4], buffer[5]]),
            };

            debug!(
                "Found channel at index {:?} of type {:?} and association {:?}",
                channel.channel_index(),
                channel.channel_type(),
                channel.channel_association(),
            );

            self.channels.push(channel);
        }

        Ok(())
    }

    fn encode(&self, writer: &mut dyn io::Write) -> Result<(), Box<dyn error::Error>> {
        writer.write_all(&(self.channels.len() as u16).to_be_bytes())?;
        for channel in &self.channels {
            writer.write_all(&channel.channel_index.to_be_bytes())?;
            writer.write_all(&channel.channel_type.to_be_bytes())?;
            writer.write_all(&channel.channel_association.to_be_bytes())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn decode<B: JBox + Default>(bytes: &[u8]) -> Result<B, Box<dyn error::Error>> {
        let mut cursor = Cursor::new(bytes.to_vec());
        let mut reader = SubReader::to_end(&mut cursor)?;
        let mut jbox = B::default();
        jbox.decode(&mut reader)?;
        Ok(jbox)
    }

    fn encode<B: JBox>(jbox: &B) -> Vec<u8> {
        let mut bytes = Vec::new();
        jbox.encode(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_colour_specification_enumerated() {
        let bytes = [1, 0, 0, 0, 0, 0, 16];
        let colour_box: ColourSpecificationBox = decode(&bytes).unwrap();
        assert_eq!(
            colour_box.method(),
            ColourSpecificationMethods::EnumeratedColourSpace
        );
        assert_eq!(colour_box.enumerated_colour_space(), Some(16));
        assert_eq!(colour_box.restricted_icc_profile(), None);
        assert_eq!(colour_box.length(), Some(7));
        assert_eq!(encode(&colour_box), bytes.to_vec());
        assert_eq!(
            colour_box,
            ColourSpecificationBox::enumerated(ENUMERATED_COLOUR_SPACE_SRGB)
        );
    }

    #[test]
    fn test_colour_specification_icc() {
        let bytes = [2, 0, 0, 0xde, 0xad, 0xbe, 0xef, 0x01];
        let colour_box: ColourSpecificationBox = decode(&bytes).unwrap();
        assert_eq!(
            colour_box.method(),
            ColourSpecificationMethods::RestrictedICCProfile
        );
        assert_eq!(colour_box.enumerated_colour_space(), None);
        assert_eq!(
            colour_box.restricted_icc_profile(),
            Some(&[0xde, 0xad, 0xbe, 0xef, 0x01][..])
        );
        assert_eq!(encode(&colour_box), bytes.to_vec());
    }

    #[test]
    fn test_colour_specification_reserved_method() {
        let bytes = [9, 0xff, 1, 1, 2, 3];
        let colour_box: ColourSpecificationBox = decode(&bytes).unwrap();
        assert_eq!(
            colour_box.method(),
            ColourSpecificationMethods::Reserved { value: 9 }
        );
        assert_eq!(colour_box.precedence(), -1);
        assert_eq!(colour_box.data(), &[1, 2, 3]);
        assert_eq!(encode(&colour_box), bytes.to_vec());
    }

    #[test]
    fn test_palette() {
        // 2 entries, 2 components of 8 and 10 bits
        let bytes = [0, 2, 2, 7, 9, 0x10, 0x03, 0xff, 0x20, 0x00, 0x01];
        let palette_box: PaletteBox = decode(&bytes).unwrap();
        assert_eq!(palette_box.num_entries(), 2);
        assert_eq!(palette_box.num_components(), 2);

        let components = palette_box.generated_components();
        assert_eq!(components[0].bit_depth(), BitDepth::Unsigned { value: 8 });
        assert_eq!(components[0].values(), &[0x10, 0x20]);
        assert_eq!(components[1].bit_depth(), BitDepth::Unsigned { value: 10 });
        assert_eq!(components[1].values(), &[0x03ff, 0x0001]);

        assert_eq!(palette_box.length(), Some(bytes.len() as u64));
        assert_eq!(encode(&palette_box), bytes.to_vec());
    }

    #[test]
    fn test_palette_truncated() {
        let error = decode::<PaletteBox>(&[0, 2, 1, 7, 0x10]).unwrap_err();
        assert!(error.downcast_ref::<io::Error>().is_some());
    }

    #[test]
    fn test_component_mapping() {
        let bytes = [0, 0, 2, 0, 0, 0, 2, 1, 0, 0, 2, 2];
        let mapping_box: ComponentMappingBox = decode(&bytes).unwrap();
        let mapping = mapping_box.component_map();
        assert_eq!(mapping.len(), 3);
        assert_eq!(mapping[1].mapping_type(), ComponentMapType::Palette);
        assert_eq!(mapping[2].palette(), 2);
        assert_eq!(encode(&mapping_box), bytes.to_vec());
    }

    #[test]
    fn test_component_mapping_partial_entry() {
        let error = decode::<ComponentMappingBox>(&[0, 0, 1, 0, 0, 1]).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<JP2Error>(),
            Some(JP2Error::BoxMalformed { .. })
        ));
    }

    #[test]
    fn test_channel_definition() {
        let bytes = [0, 2, 0, 0, 0, 0, 0, 1, 0, 1, 0, 1, 0xff, 0xff];
        let channel_box: ChannelDefinitionBox = decode(&bytes).unwrap();
        let channels = channel_box.channels();
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].channel_type(), ChannelTypes::ColourImageData);
        assert_eq!(channels[0].channel_association(), 1);
        assert_eq!(channels[1].channel_type(), ChannelTypes::Opacity);
        assert_eq!(channels[1].channel_association(), u16::MAX);
        assert_eq!(channel_box.length(), Some(14));
        assert_eq!(encode(&channel_box), bytes.to_vec());
    }
}
