use log::debug;
use std::error;
use std::io::{self, Read};

use crate::jbox::JBox;
use crate::reader::SubReader;
use crate::{BoxType, BOX_TYPE_CAPTURE_RESOLUTION, BOX_TYPE_DEFAULT_DISPLAY_RESOLUTION};

// Largest value a 16-bit numerator holds as a positive signed value, values
// from here on are scaled down by powers of ten.
const NUMERATOR_LIMIT: u64 = 32768;

const RESOLUTION_BOX_LENGTH: u64 = 10;

// I.5.3.7.1 / I.5.3.7.2
//
// Capture Resolution box and Default Display Resolution box.
//
// The Capture Resolution box ('resc') specifies the grid resolution at which
// the source was digitized to create the image samples specified by the
// codestream. For example, this may specify the resolution of the flatbed
// scanner that captured a page from a book.
//
// The Default Display Resolution box ('resd') specifies a desired display grid
// resolution. For example, this may be used to determine the size of the image
// on a page when the image is placed in a page-layout program.
//
// Both share the same layout and only differ in their type.
//
// The values are always in reference grid points per meter:
//
//   R = (N / D) * 10^E
#[derive(Debug, PartialEq)]
pub struct ResolutionBox {
    box_type: BoxType,

    // VR N: Vertical grid resolution numerator.
    //
    // This parameter is encoded as a 2-byte big endian unsigned integer.
    vertical_numerator: u16,

    // VR D: Vertical grid resolution denominator.
    //
    // This parameter is encoded as a 2-byte big endian unsigned integer.
    vertical_denominator: u16,

    // HR N: Horizontal grid resolution numerator.
    //
    // This parameter is encoded as a 2-byte big endian unsigned integer.
    horizontal_numerator: u16,

    // HR D: Horizontal grid resolution denominator.
    //
    // This parameter is encoded as a 2-byte big endian unsigned integer.
    horizontal_denominator: u16,

    // VR E: Vertical grid resolution exponent.
    //
    // This parameter is encoded as a twos-complement 1-byte signed integer.
    vertical_exponent: i8,

    // HR E: Horizontal grid resolution exponent.
    //
    // This parameter is encoded as a twos-complement 1-byte signed integer.
    horizontal_exponent: i8,

    // Written back with a length field of 0.
    pub(crate) open_ended: bool,
}

impl ResolutionBox {
    /// Resolution box of the given type with every field zero.
    pub fn new(box_type: BoxType) -> ResolutionBox {
        ResolutionBox {
            box_type,
            vertical_numerator: 0,
            vertical_denominator: 0,
            horizontal_numerator: 0,
            horizontal_denominator: 0,
            vertical_exponent: 0,
            horizontal_exponent: 0,
            open_ended: false,
        }
    }

    /// Resolution box from resolutions in grid points per meter.
    ///
    /// Denominators are set to 1. Values below 32768 are truncated to an
    /// integer numerator with exponent 0. Larger values are divided by ten,
    /// truncating each time, until they fit, and the exponent counts the
    /// divisions, so `123456.0` is stored as `12345 * 10^1`.
    pub fn with_resolution(box_type: BoxType, horizontal: f64, vertical: f64) -> ResolutionBox {
        let (horizontal_numerator, horizontal_exponent) = quantize(horizontal);
        let (vertical_numerator, vertical_exponent) = quantize(vertical);

        ResolutionBox {
            box_type,
            vertical_numerator,
            vertical_denominator: 1,
            horizontal_numerator,
            horizontal_denominator: 1,
            vertical_exponent,
            horizontal_exponent,
            open_ended: false,
        }
    }

    /// Capture Resolution box ('resc').
    pub fn capture(horizontal: f64, vertical: f64) -> ResolutionBox {
        ResolutionBox::with_resolution(BOX_TYPE_CAPTURE_RESOLUTION, horizontal, vertical)
    }

    /// Default Display Resolution box ('resd').
    pub fn default_display(horizontal: f64, vertical: f64) -> ResolutionBox {
        ResolutionBox::with_resolution(BOX_TYPE_DEFAULT_DISPLAY_RESOLUTION, horizontal, vertical)
    }

    pub fn vertical_numerator(&self) -> u16 {
        self.vertical_numerator
    }
    pub fn vertical_denominator(&self) -> u16 {
        self.vertical_denominator
    }
    pub fn horizontal_numerator(&self) -> u16 {
        self.horizontal_numerator
    }
    pub fn horizontal_denominator(&self) -> u16 {
        self.horizontal_denominator
    }
    pub fn vertical_exponent(&self) -> i8 {
        self.vertical_exponent
    }
    pub fn horizontal_exponent(&self) -> i8 {
        self.horizontal_exponent
    }

    pub fn set_vertical(&mut self, numerator: u16, denominator: u16, exponent: i8) {
        self.vertical_numerator = numerator;
        self.vertical_denominator = denominator;
        self.vertical_exponent = exponent;
    }

    pub fn set_horizontal(&mut self, numerator: u16, denominator: u16, exponent: i8) {
        self.horizontal_numerator = numerator;
        self.horizontal_denominator = denominator;
        self.horizontal_exponent = exponent;
    }

    // VR = VRN / VRD * 10^VRE
    /// Vertical resolution, `None` when the denominator is zero.
    pub fn vertical_resolution(&self) -> Option<f64> {
        resolution(
            self.vertical_numerator,
            self.vertical_denominator,
            self.vertical_exponent,
        )
    }

    // HR = HRN / HRD * 10^HRE
    /// Horizontal resolution, `None` when the denominator is zero.
    pub fn horizontal_resolution(&self) -> Option<f64> {
        resolution(
            self.horizontal_numerator,
            self.horizontal_denominator,
            self.horizontal_exponent,
        )
    }
}

fn resolution(numerator: u16, denominator: u16, exponent: i8) -> Option<f64> {
    if denominator == 0 {
        return None;
    }
    Some(numerator as f64 * 10_f64.powi(exponent as i32) / denominator as f64)
}

fn quantize(value: f64) -> (u16, i8) {
    if value < NUMERATOR_LIMIT as f64 {
        return (value as u16, 0);
    }

    let mut numerator = value as u64;
    let mut exponent: i8 = 0;
    while numerator >= NUMERATOR_LIMIT {
        exponent += 1;
        numerator /= 10;
    }
    (numerator as u16, exponent)
}

impl JBox for ResolutionBox {
    // The type of a Capture Resolution box shall be ‘resc’ (0x7265 7363).
    // The type of a Default Display Resolution box shall be ‘resd’ (0x7265 7364).
    fn identifier(&self) -> BoxType {
        self.box_type
    }

    fn length(&self) -> Option<u64> {
        if self.open_ended {
            return None;
        }
        Some(RESOLUTION_BOX_LENGTH)
    }

    fn decode(&mut self, reader: &mut SubReader) -> Result<(), Box<dyn error::Error>> {
        let mut buffer: [u8; 2] = [0; 2];

        reader.read_exact(&mut buffer)?;
        self.vertical_numerator = u16::from_be_bytes(buffer);
        reader.read_exact(&mut buffer)?;
        self.vertical_denominator = u16::from_be_bytes(buffer);

        reader.read_exact(&mut buffer)?;
        self.horizontal_numerator = u16::from_be_bytes(buffer);
        reader.read_exact(&mut buffer)?;
        self.horizontal_denominator = u16::from_be_bytes(buffer);

        reader.read_exact(&mut buffer)?;
        self.vertical_exponent = buffer[0] as i8;
        self.horizontal_exponent = buffer[1] as i8;

        debug!(
            "Resolution {:?} x {:?}",
            self.horizontal_resolution(),
            self.vertical_resolution()
        );

        Ok(())
    }

    fn encode(&self, writer: &mut dyn io::Write) -> Result<(), Box<dyn error::Error>> {
        writer.write_all(&self.vertical_numerator.to_be_bytes())?;
        writer.write_all(&self.vertical_denominator.to_be_bytes())?;
        writer.write_all(&self.horizontal_numerator.to_be_bytes())?;
        writer.write_all(&self.horizontal_denominator.to_be_bytes())?;
        writer.write_all(&[
            self.vertical_exponent as u8,
            self.horizontal_exponent as u8,
        ])?;
        Ok(())
    }
}
