use log::warn;
use std::error;
use std::io::{self, Read};

use crate::jbox::JBox;
use crate::reader::SubReader;
use crate::{box_type_name, BoxType, JP2Error, BOX_TYPE_FILE_TYPE, BRAND_JP2};

type CompatibilityList = Vec<[u8; 4]>;

/// File Type box
///
/// The File Type box completely defines all of the contents of this file, as
/// well as a separate list of readers, defined by other Recommendations |
/// International Standards, with which this file is compatible, and thus the
/// file can be properly interpreted within the scope of that other standard.
///
/// This box shall immediately follow the Signature box.
///
/// All files shall contain one and only one File Type box
///
/// For more information, see ISO/IEC 15444-1 / ITU T-800 Appendix I.5.2.
#[derive(Debug, Default, PartialEq)]
pub struct FileTypeBox {
    brand: [u8; 4],
    min_version: [u8; 4],
    compatibility_list: CompatibilityList,
    pub(crate) open_ended: bool,
}

impl FileTypeBox {
    /// File Type box with the given brand, minor version 0 and the brand as
    /// the only compatibility list entry.
    pub fn new(brand: [u8; 4]) -> FileTypeBox {
        FileTypeBox {
            brand,
            min_version: [0; 4],
            compatibility_list: vec![brand],
            open_ended: false,
        }
    }

    /// Brand.
    ///
    /// This field specifies the Recommendation | International Standard which
    /// completely defines this file.
    //
    // If the value of the Brand field is not ‘jp2\040’, then a value of
    // ‘jp2\040’ in the Compatibility list indicates that a JP2 reader can
    // interpret the file in some manner as intended by the creator of the
    // file.
    pub fn brand(&self) -> [u8; 4] {
        self.brand
    }

    /// Minor version.
    ///
    /// The value of this field shall be zero. However, readers shall continue
    /// to parse and interpret this file even if the value of this field is
    /// not zero.
    pub fn min_version(&self) -> u32 {
        u32::from_be_bytes(self.min_version)
    }

    /// Compatibility list, one printable name per entry.
    pub fn compatibility_list(&self) -> Vec<String> {
        self.compatibility_list
            .iter()
            .map(|entry| box_type_name(*entry))
            .collect()
    }

    pub fn add_compatibility(&mut self, brand: [u8; 4]) {
        self.compatibility_list.push(brand);
    }

    /// Whether `brand` is listed in the compatibility list.
    pub fn is_compatible(&self, brand: [u8; 4]) -> bool {
        self.compatibility_list.contains(&brand)
    }
}

impl JBox for FileTypeBox {
    // The type of the File Type Box shall be ‘ftyp’ (0x6674 7970).
    fn identifier(&self) -> BoxType {
        BOX_TYPE_FILE_TYPE
    }

    fn length(&self) -> Option<u64> {
        if self.open_ended {
            return None;
        }
        Some(8 + 4 * self.compatibility_list.len() as u64)
    }

    fn decode(&mut self, reader: &mut SubReader) -> Result<(), Box<dyn error::Error>> {
        let offset = reader.offset();
        reader.read_exact(&mut self.brand)?;
        reader.read_exact(&mut self.min_version)?;

        // The number of CL fields is determined by the length of this box
        if reader.remaining() % 4 != 0 {
            return Err(JP2Error::BoxMalformed {
                box_type: BOX_TYPE_FILE_TYPE,
                offset,
            }
            .into());
        }

        self.compatibility_list.clear();
        let mut buffer: [u8; 4] = [0; 4];
        while reader.remaining() > 0 {
            reader.read_exact(&mut buffer)?;
            self.compatibility_list.push(buffer);
        }

        // Checked strictly by `decode_jp2`, any box stream may be read.
        if !self.is_compatible(BRAND_JP2) {
            warn!(
                "'jp2 ' not in compatibility list {:?}",
                self.compatibility_list()
            );
        }

        Ok(())
    }

    fn encode(&self, writer: &mut dyn io::Write) -> Result<(), Box<dyn error::Error>> {
        writer.write_all(&self.brand)?;
        writer.write_all(&self.min_version)?;
        for entry in &self.compatibility_list {
            writer.write_all(entry)?;
        }
        Ok(())
    }
}
