use clap::Parser;
use log::info;
use std::error;
use std::error::Error;
use std::ffi::OsStr;
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use jp2::{
    box_type_name, decode_jp2, encode_jp2, read_boxes, write_boxes, ContainerBox, JBox, JP2File,
    Jp2Box, ResolutionBox, BOX_TYPE_HEADER, BOX_TYPE_RESOLUTION,
};
use jpxml::Representation;

#[derive(Debug)]
enum JP2BoxError {
    DecodingContainer { error: String },
    InvalidResolution { value: String },
    MissingResolution,
    MissingHeader,
}

impl error::Error for JP2BoxError {}
impl fmt::Display for JP2BoxError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::DecodingContainer { error } => {
                write!(f, "error decoding jp2 container {}", error)
            }
            Self::InvalidResolution { value } => {
                write!(f, "invalid resolution {:?}, expected horizontal,vertical", value)
            }
            Self::MissingResolution => {
                write!(f, "at least one of --capture and --display is required")
            }
            Self::MissingHeader => write!(f, "no jp2h box to hold the resolution"),
        }
    }
}

// "H,V" in grid points per meter, e.g. "2835,2835"
fn parse_resolution(value: &str) -> Result<(f64, f64), JP2BoxError> {
    let invalid = || JP2BoxError::InvalidResolution {
        value: value.to_owned(),
    };
    let (horizontal, vertical) = value.split_once(',').ok_or_else(invalid)?;
    let horizontal = f64::from_str(horizontal.trim()).map_err(|_| invalid())?;
    let vertical = f64::from_str(vertical.trim()).map_err(|_| invalid())?;
    if !(horizontal.is_finite() && vertical.is_finite()) || horizontal < 0.0 || vertical < 0.0 {
        return Err(invalid());
    }
    Ok((horizontal, vertical))
}

#[derive(Parser)]
struct Opts {
    #[clap(subcommand)]
    subcommand: SubCommand,
}

#[derive(Parser)]
enum SubCommand {
    /// Decode .jp2 file and print a summary of its boxes
    Decode(Decode),

    /// Encode boxes of a .jp2 file to JPXML document (stdout)
    JPXML(JPXML),

    /// Read every box of a file and write them back unchanged
    Rewrite(Rewrite),

    /// Replace the resolution box of a .jp2 file
    Resolution(Resolution),
}

#[derive(Parser)]
struct Decode {
    /// Path to .jp2 file
    path: String,
}

#[derive(Parser)]
struct JPXML {
    /// Path to .jp2 file
    path: String,

    /// Level of representation of JPXML document generated from an image file
    /// format.
    ///
    /// skeleton - does not contains text nodes.
    ///
    /// fat-skeleton - contains box fields excluding binary data.
    ///
    /// fat - contains whole box data on text nodes.
    #[clap(short, long, default_value = "fat")]
    representation: String,
}

#[derive(Parser)]
struct Rewrite {
    /// Path to input file
    input: String,

    /// Path to output file
    output: String,
}

#[derive(Parser)]
struct Resolution {
    /// Path to input .jp2 file
    input: String,

    /// Path to output .jp2 file
    output: String,

    /// Capture resolution as horizontal,vertical grid points per meter
    #[clap(long, value_parser = parse_resolution)]
    capture: Option<(f64, f64)>,

    /// Default display resolution as horizontal,vertical grid points per meter
    #[clap(long, value_parser = parse_resolution)]
    display: Option<(f64, f64)>,
}

fn decode(path: &Path) -> Result<JP2File, Box<dyn Error>> {
    let mut reader = BufReader::new(File::open(path)?);
    match decode_jp2(&mut reader) {
        Ok(jp2) => Ok(jp2),
        Err(error) => Err(JP2BoxError::DecodingContainer {
            error: error.to_string(),
        }
        .into()),
    }
}

fn format_resolution(resolution_box: Option<&ResolutionBox>) -> String {
    match resolution_box.map(|resolution_box| {
        (
            resolution_box.horizontal_resolution(),
            resolution_box.vertical_resolution(),
        )
    }) {
        Some((Some(horizontal), Some(vertical))) => format!("{} x {}", horizontal, vertical),
        Some(_) => "invalid".to_owned(),
        None => "none".to_owned(),
    }
}

fn print_summary<W: io::Write>(writer: &mut W, jp2: &JP2File) -> Result<(), Box<dyn Error>> {
    if let Some(file_type_box) = jp2.file_type() {
        writeln!(
            writer,
            "brand: {} (compatible {})",
            box_type_name(file_type_box.brand()),
            file_type_box.compatibility_list().join(", ")
        )?;
    }
    if let Some(image_header_box) = jp2.image_header() {
        writeln!(
            writer,
            "size: {} x {}",
            image_header_box.width(),
            image_header_box.height()
        )?;
        writeln!(writer, "components: {}", image_header_box.components_num())?;
        match image_header_box.bit_depth() {
            Some(bit_depth) => writeln!(
                writer,
                "bit depth: {}{}",
                bit_depth.value(),
                if bit_depth.is_signed() { " signed" } else { "" }
            )?,
            None => writeln!(writer, "bit depth: per component")?,
        }
    }
    for colour_specification_box in jp2.colour_specifications() {
        match colour_specification_box.enumerated_colour_space() {
            Some(colour_space) => writeln!(
                writer,
                "colour: method {} colour space {}",
                colour_specification_box.method(),
                colour_space
            )?,
            None => writeln!(
                writer,
                "colour: method {} ({} bytes)",
                colour_specification_box.method(),
                colour_specification_box.data().len()
            )?,
        }
    }
    writeln!(
        writer,
        "capture resolution: {}",
        format_resolution(jp2.capture_resolution())
    )?;
    writeln!(
        writer,
        "display resolution: {}",
        format_resolution(jp2.default_display_resolution())
    )?;

    let codestreams: Vec<_> = jp2.codestreams().collect();
    writeln!(writer, "codestreams: {}", codestreams.len())?;
    for (index, codestream_box) in codestreams.iter().enumerate() {
        writeln!(
            writer,
            "  {}: {} bytes",
            index,
            codestream_box.codestream().len()
        )?;
    }
    Ok(())
}

// Rebuild the root with the jp2h box holding `resolution` in place of any
// earlier resolution box.
fn replace_resolution(
    root: ContainerBox,
    resolution: ContainerBox,
) -> Result<ContainerBox, Box<dyn Error>> {
    let mut resolution = Some(resolution);
    let mut replaced = ContainerBox::new(root.identifier());
    for jbox in root.into_boxes() {
        match jbox {
            Jp2Box::Container(header_box) if header_box.identifier() == BOX_TYPE_HEADER => {
                let mut header = ContainerBox::new(BOX_TYPE_HEADER);
                for child in header_box.into_boxes() {
                    if child.identifier() != BOX_TYPE_RESOLUTION {
                        header.add(child);
                    }
                }
                if let Some(resolution) = resolution.take() {
                    header.add(Jp2Box::Container(resolution));
                }
                replaced.add(Jp2Box::Container(header));
            }
            other => {
                replaced.add(other);
            }
        }
    }

    match resolution {
        None => Ok(replaced),
        Some(_) => Err(JP2BoxError::MissingHeader.into()),
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let opts: Opts = Opts::parse();

    match opts.subcommand {
        SubCommand::Decode(c) => {
            let jp2 = decode(Path::new(&c.path))?;
            let mut writer = io::stdout();
            print_summary(&mut writer, &jp2)?;
        }
        SubCommand::JPXML(c) => {
            let path = Path::new(&c.path);
            let filename = match path.file_name().and_then(OsStr::to_str) {
                Some(value) => value,
                None => "",
            };
            let representation = Representation::from_str(&c.representation)?;

            let mut reader = BufReader::new(File::open(path)?);
            let mut writer = BufWriter::new(io::stdout());
            jpxml::encode_jp2(&mut writer, &mut reader, &representation, filename)?;
            writer.flush()?;
        }
        SubCommand::Rewrite(c) => {
            let mut reader = BufReader::new(File::open(&c.input)?);
            let root = read_boxes(&mut reader)?;

            let mut writer = BufWriter::new(File::create(&c.output)?);
            write_boxes(&mut writer, &root)?;
            writer.flush()?;
            info!("rewrote {} boxes to {}", root.boxes().len(), c.output);
        }
        SubCommand::Resolution(c) => {
            if c.capture.is_none() && c.display.is_none() {
                return Err(JP2BoxError::MissingResolution.into());
            }

            let mut resolution = ContainerBox::new(BOX_TYPE_RESOLUTION);
            if let Some((horizontal, vertical)) = c.capture {
                resolution.add(Jp2Box::Resolution(ResolutionBox::capture(
                    horizontal, vertical,
                )));
            }
            if let Some((horizontal, vertical)) = c.display {
                resolution.add(Jp2Box::Resolution(ResolutionBox::default_display(
                    horizontal, vertical,
                )));
            }

            let jp2 = decode(Path::new(&c.input))?;
            let root = replace_resolution(jp2.into_root(), resolution)?;
            let jp2 = JP2File::from_root(root)?;

            let mut writer = BufWriter::new(File::create(&c.output)?);
            encode_jp2(&mut writer, &jp2)?;
            writer.flush()?;
        }
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    match run() {
        Err(e) => {
            return Err(e.to_string().into());
        }
        Ok(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jp2::{
        BitDepth, ColourSpecificationBox, ContiguousCodestreamBox, FileTypeBox, ImageHeaderBox,
        OpaqueBox, BOX_TYPE_ROOT, BOX_TYPE_SIGNATURE, BRAND_JP2,
        ENUMERATED_COLOUR_SPACE_GREYSCALE, SIGNATURE_MAGIC,
    };

    fn file(resolution: Option<ResolutionBox>) -> ContainerBox {
        let mut header = ContainerBox::new(BOX_TYPE_HEADER);
        header.add(Jp2Box::ImageHeader(ImageHeaderBox::new(
            1,
            1,
            1,
            BitDepth::from_depth(8, false),
        )));
        header.add(Jp2Box::ColourSpecification(
            ColourSpecificationBox::enumerated(ENUMERATED_COLOUR_SPACE_GREYSCALE),
        ));
        if let Some(resolution_box) = resolution {
            let mut resolution = ContainerBox::new(BOX_TYPE_RESOLUTION);
            resolution.add(Jp2Box::Resolution(resolution_box));
            header.add(Jp2Box::Container(resolution));
        }

        let mut root = ContainerBox::new(BOX_TYPE_ROOT);
        root.add(Jp2Box::Opaque(OpaqueBox::new(
            BOX_TYPE_SIGNATURE,
            SIGNATURE_MAGIC.to_vec(),
        )));
        root.add(Jp2Box::FileType(FileTypeBox::new(BRAND_JP2)));
        root.add(Jp2Box::Container(header));
        root.add(Jp2Box::ContiguousCodestream(ContiguousCodestreamBox::new(
            vec![0xff, 0x4f, 0xff, 0xd9],
        )));
        root
    }

    #[test]
    fn test_parse_resolution() {
        assert_eq!(parse_resolution("2835,72.5").unwrap(), (2835.0, 72.5));
        assert_eq!(parse_resolution(" 1 , 2 ").unwrap(), (1.0, 2.0));
        assert!(parse_resolution("2835").is_err());
        assert!(parse_resolution("a,b").is_err());
        assert!(parse_resolution("-1,1").is_err());
    }

    #[test]
    fn test_replace_resolution() {
        let mut resolution = ContainerBox::new(BOX_TYPE_RESOLUTION);
        resolution.add(Jp2Box::Resolution(ResolutionBox::default_display(
            100.0, 200.0,
        )));

        let root = replace_resolution(file(Some(ResolutionBox::capture(1.0, 1.0))), resolution)
            .unwrap();
        let jp2 = JP2File::from_root(root).unwrap();

        assert!(jp2.capture_resolution().is_none());
        let display = jp2.default_display_resolution().unwrap();
        assert_eq!(display.horizontal_resolution(), Some(100.0));
        assert_eq!(display.vertical_resolution(), Some(200.0));
        assert_eq!(jp2.header().unwrap().boxes().len(), 3);
    }

    #[test]
    fn test_replace_resolution_without_header() {
        let root = ContainerBox::new(BOX_TYPE_ROOT);
        let error =
            replace_resolution(root, ContainerBox::new(BOX_TYPE_RESOLUTION)).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<JP2BoxError>(),
            Some(JP2BoxError::MissingHeader)
        ));
    }

    #[test]
    fn test_print_summary() {
        let jp2 = JP2File::from_root(file(Some(ResolutionBox::capture(2835.0, 2835.0)))).unwrap();
        let mut output = Vec::new();
        print_summary(&mut output, &jp2).unwrap();
        let output = String::from_utf8(output).unwrap();

        assert!(output.contains("size: 1 x 1\n"));
        assert!(output.contains("bit depth: 8\n"));
        assert!(output.contains("colour: method 1 colour space 17\n"));
        assert!(output.contains("capture resolution: 2835 x 2835\n"));
        assert!(output.contains("display resolution: none\n"));
        assert!(output.contains("codestreams: 1\n  0: 4 bytes\n"));
    }
}
