//! Boundary to an external JPEG 2000 codec.
//!
//! The codestream carried in a Contiguous Codestream box is produced and
//! consumed by a [`Codec`]. This module defines the pixel data handed to a
//! codec, the encoder parameters, and the orchestration that wraps a freshly
//! encoded codestream into a complete JP2 file.

use log::{debug, info};
use std::error;
use std::fmt;
use std::str::FromStr;

use crate::colour::{
    ColourSpecificationBox, ENUMERATED_COLOUR_SPACE_GREYSCALE, ENUMERATED_COLOUR_SPACE_SRGB,
};
use crate::container::ContainerBox;
use crate::file::JP2File;
use crate::file_type::FileTypeBox;
use crate::image::{BitDepth, ImageHeaderBox};
use crate::jbox::{ContiguousCodestreamBox, Jp2Box, OpaqueBox};
use crate::resolution::ResolutionBox;
use crate::{
    JP2Error, BOX_TYPE_CONTIGUOUS_CODESTREAM, BOX_TYPE_HEADER, BOX_TYPE_RESOLUTION,
    BOX_TYPE_ROOT, BOX_TYPE_SIGNATURE, BRAND_JP2, SIGNATURE_MAGIC,
};

/// Decoded image samples, one plane per component in raster order.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelPlanes {
    pub width: u32,
    pub height: u32,
    /// Bits per sample, counting the sign bit.
    pub bit_depth: u8,
    pub signed: bool,
    pub components: Vec<Vec<i32>>,
}

impl PixelPlanes {
    fn validate(&self) -> Result<(), JP2Error> {
        let samples = self.width as usize * self.height as usize;
        if self.components.is_empty()
            || self.components.len() > u16::MAX as usize
            || self.components.iter().any(|plane| plane.len() != samples)
        {
            return Err(JP2Error::InvalidParameter {
                name: "components",
                value: format!(
                    "{} planes for {}x{}",
                    self.components.len(),
                    self.width,
                    self.height
                ),
            });
        }
        if self.bit_depth == 0 || self.bit_depth > 38 {
            return Err(JP2Error::InvalidParameter {
                name: "bit_depth",
                value: self.bit_depth.to_string(),
            });
        }
        Ok(())
    }
}

/// A JPEG 2000 codestream encoder and decoder.
pub trait Codec {
    /// Compress `planes` into a codestream.
    fn encode(
        &self,
        planes: &PixelPlanes,
        parameters: &EncodingParameters,
    ) -> Result<Vec<u8>, Box<dyn error::Error>>;

    /// Decompress a codestream.
    fn decode(&self, codestream: &[u8]) -> Result<PixelPlanes, Box<dyn error::Error>>;
}

macro_rules! named_options {
    ($(#[$meta:meta])* $name:ident, $parameter:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn name(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.name())
            }
        }

        impl FromStr for $name {
            type Err = JP2Error;

            fn from_str(input: &str) -> Result<$name, JP2Error> {
                match input {
                    $($text => Ok($name::$variant),)+
                    _ => Err(JP2Error::InvalidParameter {
                        name: $parameter,
                        value: input.to_owned(),
                    }),
                }
            }
        }
    };
}

named_options!(
    /// Progression order of the packets in the codestream.
    ProgressionOrder, "progression", {
        Resolution => "res",
        Layer => "layer",
        ResolutionPosition => "res-pos",
        PositionComponent => "pos-comp",
        ComponentPosition => "comp-pos",
    }
);

named_options!(
    /// Wavelet filter.
    FilterKind, "filter", {
        Reversible53 => "w5x3",
        Irreversible97 => "w9x7",
    }
);

named_options!(
    /// MQ coder termination.
    MQTermination, "mq_termination", {
        NearOptimal => "near_opt",
        Easy => "easy",
        Predictable => "predict",
        Full => "full",
    }
);

named_options!(
    /// MQ coder length calculation.
    MQLengthCalculation, "mq_length_calculation", {
        NearOptimal => "near_opt",
        LazyGood => "lazy_good",
        Lazy => "lazy",
    }
);

/// Encoder parameters.
///
/// Defaults to lossless compression with the reversible 5/3 filter.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodingParameters {
    lossless: bool,
    layers: String,
    progression: ProgressionOrder,
    decomposition_levels: u8,
    guard_bits: u8,
    quantization_step: Option<f64>,
    code_block_width: u16,
    code_block_height: u16,
    filter: FilterKind,
    component_transform: bool,
    roi_start_level: i32,
    roi_align: bool,
    roi_mask: Option<String>,
    mq_termination: MQTermination,
    mq_length_calculation: MQLengthCalculation,
    sop: bool,
    eph: bool,
    bypass: bool,
    reset_mq: bool,
    terminate_on_byte: bool,
    causal_context: bool,
    segmentation_symbol: bool,
}

impl Default for EncodingParameters {
    fn default() -> EncodingParameters {
        EncodingParameters {
            lossless: true,
            layers: "0.015 +20 2.0 +10".to_owned(),
            progression: ProgressionOrder::Layer,
            decomposition_levels: 5,
            guard_bits: 2,
            quantization_step: None,
            code_block_width: 64,
            code_block_height: 64,
            filter: FilterKind::Reversible53,
            component_transform: true,
            roi_start_level: -1,
            roi_align: false,
            roi_mask: None,
            mq_termination: MQTermination::NearOptimal,
            mq_length_calculation: MQLengthCalculation::NearOptimal,
            sop: false,
            eph: false,
            bypass: false,
            reset_mq: false,
            terminate_on_byte: false,
            causal_context: false,
            segmentation_symbol: false,
        }
    }
}

// Code-block dimensions are powers of two from 4 to 1024, with an area of at
// most 4096 samples.
fn valid_code_block(width: u16, height: u16) -> bool {
    let side = |value: u16| value.is_power_of_two() && (4..=1024).contains(&value);
    side(width) && side(height) && width as u32 * height as u32 <= 4096
}

impl EncodingParameters {
    pub fn lossless(&self) -> bool {
        self.lossless
    }

    /// Lossless compression requires the reversible 5/3 filter, selecting it
    /// switches the filter.
    pub fn set_lossless(&mut self, lossless: bool) -> &mut EncodingParameters {
        self.lossless = lossless;
        if lossless {
            self.filter = FilterKind::Reversible53;
        }
        self
    }

    pub fn layers(&self) -> &str {
        &self.layers
    }

    pub fn set_layers(&mut self, layers: &str) -> &mut EncodingParameters {
        self.layers = layers.to_owned();
        self
    }

    pub fn progression(&self) -> ProgressionOrder {
        self.progression
    }

    pub fn set_progression(&mut self, progression: ProgressionOrder) -> &mut EncodingParameters {
        self.progression = progression;
        self
    }

    pub fn decomposition_levels(&self) -> u8 {
        self.decomposition_levels
    }

    pub fn set_decomposition_levels(
        &mut self,
        levels: u8,
    ) -> Result<&mut EncodingParameters, JP2Error> {
        if levels > 32 {
            return Err(JP2Error::InvalidParameter {
                name: "decomposition_levels",
                value: levels.to_string(),
            });
        }
        self.decomposition_levels = levels;
        Ok(self)
    }

    pub fn guard_bits(&self) -> u8 {
        self.guard_bits
    }

    pub fn set_guard_bits(&mut self, guard_bits: u8) -> Result<&mut EncodingParameters, JP2Error> {
        if guard_bits == 0 {
            return Err(JP2Error::InvalidParameter {
                name: "guard_bits",
                value: guard_bits.to_string(),
            });
        }
        self.guard_bits = guard_bits;
        Ok(self)
    }

    /// Base quantization step, `None` leaves the choice to the codec.
    pub fn quantization_step(&self) -> Option<f64> {
        self.quantization_step
    }

    pub fn set_quantization_step(
        &mut self,
        step: Option<f64>,
    ) -> Result<&mut EncodingParameters, JP2Error> {
        match step {
            Some(value) if !(value.is_finite() && value > 0.0) => {
                Err(JP2Error::InvalidParameter {
                    name: "quantization_step",
                    value: value.to_string(),
                })
            }
            step => {
                self.quantization_step = step;
                Ok(self)
            }
        }
    }

    /// Code-block width and height.
    pub fn code_block_size(&self) -> (u16, u16) {
        (self.code_block_width, self.code_block_height)
    }

    pub fn set_code_block_size(
        &mut self,
        width: u16,
        height: u16,
    ) -> Result<&mut EncodingParameters, JP2Error> {
        if !valid_code_block(width, height) {
            return Err(JP2Error::InvalidParameter {
                name: "code_block_size",
                value: format!("{}x{}", width, height),
            });
        }
        self.code_block_width = width;
        self.code_block_height = height;
        Ok(self)
    }

    pub fn filter(&self) -> FilterKind {
        self.filter
    }

    pub fn component_transform(&self) -> bool {
        self.component_transform
    }

    /// Wavelet filter and whether the multiple component transform is used.
    /// The 9/7 filter is lossy and clears the lossless flag.
    pub fn set_filter(
        &mut self,
        filter: FilterKind,
        component_transform: bool,
    ) -> &mut EncodingParameters {
        self.filter = filter;
        self.component_transform = component_transform;
        if filter == FilterKind::Irreversible97 {
            self.lossless = false;
        }
        self
    }

    /// Start level of the region of interest, -1 when there is none.
    pub fn roi_start_level(&self) -> i32 {
        self.roi_start_level
    }

    pub fn roi_align(&self) -> bool {
        self.roi_align
    }

    pub fn roi_mask(&self) -> Option<&str> {
        self.roi_mask.as_deref()
    }

    pub fn set_roi(
        &mut self,
        start_level: i32,
        align: bool,
        mask: Option<&str>,
    ) -> &mut EncodingParameters {
        self.roi_start_level = start_level;
        self.roi_align = align;
        self.roi_mask = mask.map(str::to_owned);
        self
    }

    pub fn mq_termination(&self) -> MQTermination {
        self.mq_termination
    }

    pub fn mq_length_calculation(&self) -> MQLengthCalculation {
        self.mq_length_calculation
    }

    pub fn set_mq(
        &mut self,
        length_calculation: MQLengthCalculation,
        termination: MQTermination,
    ) -> &mut EncodingParameters {
        self.mq_length_calculation = length_calculation;
        self.mq_termination = termination;
        self
    }

    /// Start of packet marker segments.
    pub fn sop(&self) -> bool {
        self.sop
    }

    pub fn set_sop(&mut self, sop: bool) -> &mut EncodingParameters {
        self.sop = sop;
        self
    }

    /// End of packet header markers.
    pub fn eph(&self) -> bool {
        self.eph
    }

    pub fn set_eph(&mut self, eph: bool) -> &mut EncodingParameters {
        self.eph = eph;
        self
    }

    /// Arithmetic coding bypass.
    pub fn bypass(&self) -> bool {
        self.bypass
    }

    pub fn set_bypass(&mut self, bypass: bool) -> &mut EncodingParameters {
        self.bypass = bypass;
        self
    }

    pub fn reset_mq(&self) -> bool {
        self.reset_mq
    }

    pub fn set_reset_mq(&mut self, reset_mq: bool) -> &mut EncodingParameters {
        self.reset_mq = reset_mq;
        self
    }

    pub fn terminate_on_byte(&self) -> bool {
        self.terminate_on_byte
    }

    pub fn set_terminate_on_byte(&mut self, terminate_on_byte: bool) -> &mut EncodingParameters {
        self.terminate_on_byte = terminate_on_byte;
        self
    }

    pub fn causal_context(&self) -> bool {
        self.causal_context
    }

    pub fn set_causal_context(&mut self, causal_context: bool) -> &mut EncodingParameters {
        self.causal_context = causal_context;
        self
    }

    pub fn segmentation_symbol(&self) -> bool {
        self.segmentation_symbol
    }

    pub fn set_segmentation_symbol(
        &mut self,
        segmentation_symbol: bool,
    ) -> &mut EncodingParameters {
        self.segmentation_symbol = segmentation_symbol;
        self
    }
}

/// Encode `planes` with `codec` and wrap the codestream in a JP2 file.
///
/// The file holds the Signature box, a File Type box of brand `jp2 `, a JP2
/// Header box and the codestream. The JP2 Header box has an Image Header box
/// derived from the planes, an enumerated Colour Specification box (sRGB for
/// three or more components, greyscale otherwise) and, when
/// `capture_resolution` is given as horizontal and vertical grid points per
/// meter, a Resolution box with a Capture Resolution box.
pub fn encode_image(
    codec: &dyn Codec,
    planes: &PixelPlanes,
    parameters: &EncodingParameters,
    capture_resolution: Option<(f64, f64)>,
) -> Result<JP2File, Box<dyn error::Error>> {
    planes.validate()?;
    debug!("Encoding {}x{} image", planes.width, planes.height);

    let codestream = codec.encode(planes, parameters)?;
    info!("Codec produced a codestream of {} bytes", codestream.len());

    let components_num = planes.components.len() as u16;
    let colour_space = if components_num >= 3 {
        ENUMERATED_COLOUR_SPACE_SRGB
    } else {
        ENUMERATED_COLOUR_SPACE_GREYSCALE
    };

    let mut header_box = ContainerBox::new(BOX_TYPE_HEADER);
    header_box
        .add(Jp2Box::ImageHeader(ImageHeaderBox::new(
            planes.height,
            planes.width,
            components_num,
            BitDepth::from_depth(planes.bit_depth, planes.signed),
        )))
        .add(Jp2Box::ColourSpecification(ColourSpecificationBox::enumerated(
            colour_space,
        )));
    if let Some((horizontal, vertical)) = capture_resolution {
        let mut resolution_box = ContainerBox::new(BOX_TYPE_RESOLUTION);
        resolution_box.add(Jp2Box::Resolution(ResolutionBox::capture(
            horizontal, vertical,
        )));
        header_box.add(Jp2Box::Container(resolution_box));
    }

    let mut root = ContainerBox::new(BOX_TYPE_ROOT);
    root.add(Jp2Box::Opaque(OpaqueBox::new(
        BOX_TYPE_SIGNATURE,
        SIGNATURE_MAGIC.to_vec(),
    )))
    .add(Jp2Box::FileType(FileTypeBox::new(BRAND_JP2)))
    .add(Jp2Box::Container(header_box))
    .add(Jp2Box::ContiguousCodestream(ContiguousCodestreamBox::new(
        codestream,
    )));

    JP2File::from_root(root)
}

/// Decode the first codestream of `file` with `codec`.
pub fn decode_image(
    codec: &dyn Codec,
    file: &JP2File,
) -> Result<PixelPlanes, Box<dyn error::Error>> {
    let codestream_box = file.codestreams().next().ok_or(JP2Error::BoxMissing {
        box_type: BOX_TYPE_CONTIGUOUS_CODESTREAM,
    })?;
    debug!(
        "Decoding codestream of {} bytes",
        codestream_box.codestream().len()
    );
    codec.decode(codestream_box.codestream())
}
