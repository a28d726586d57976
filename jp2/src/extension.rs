use std::error;
use std::io::{self, Read};
use std::str;

use crate::jbox::JBox;
use crate::reader::SubReader;
use crate::{BoxType, BOX_TYPE_DATA_ENTRY_URL, BOX_TYPE_UUID, BOX_TYPE_UUID_LIST, BOX_TYPE_XML};

/// XML box.
///
/// An XML box contains vendor specific information (in XML format) other than
/// the information contained within boxes defined.
///
/// There may be multiple XML boxes within the file, and those boxes may be found
/// anywhere in the file except before the File Type box.
///
/// See ISO/IEC 15444-1:2024 Section I.7.1 for more details on this box.
#[derive(Debug, Default, PartialEq)]
pub struct XMLBox {
    xml: Vec<u8>,
    pub(crate) open_ended: bool,
}

impl XMLBox {
    pub fn new(xml: Vec<u8>) -> XMLBox {
        XMLBox {
            xml,
            open_ended: false,
        }
    }

    /// Get the XML body as a UTF-8 string.
    pub fn format(&self) -> Result<&str, str::Utf8Error> {
        str::from_utf8(&self.xml)
    }

    pub fn xml(&self) -> &[u8] {
        &self.xml
    }
}

impl JBox for XMLBox {
    // The type of an XML box is ‘xml\040’ (0x786D 6C20).
    fn identifier(&self) -> BoxType {
        BOX_TYPE_XML
    }

    fn length(&self) -> Option<u64> {
        if self.open_ended {
            return None;
        }
        Some(self.xml.len() as u64)
    }

    fn decode(&mut self, reader: &mut SubReader) -> Result<(), Box<dyn error::Error>> {
        self.xml.clear();
        reader.read_to_end(&mut self.xml)?;
        Ok(())
    }

    fn encode(&self, writer: &mut dyn io::Write) -> Result<(), Box<dyn error::Error>> {
        writer.write_all(&self.xml)?;
        Ok(())
    }
}

/// UUID box.
///
/// A UUID box contains vendor specific information other than the information
/// contained within boxes defined.
///
/// See ISO/IEC 15444-1:2024 Section I.7.2 for more details on this box.
#[derive(Debug, Default, PartialEq)]
pub struct UUIDBox {
    uuid: [u8; 16],
    data: Vec<u8>,
    pub(crate) open_ended: bool,
}

impl UUIDBox {
    pub fn new(uuid: [u8; 16], data: Vec<u8>) -> UUIDBox {
        UUIDBox {
            uuid, data,
            open_ended: false,
        }
    }

    /// Get the UUID for the box.
    ///
    /// This field contains a 16-byte UUID as specified by ISO/IEC 11578. The
    /// value of this UUID specifies the format of the vendor-specific information
    /// stored in the DATA field and the interpretation of that information.
    pub fn uuid(&self) -> &[u8; 16] {
        &self.uuid
    }

    /// Get the vendor-specific information.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl JBox for UUIDBox {
    // The type of a UUID box shall be ‘uuid’ (0x7575 6964).
    fn identifier(&self) -> BoxType {
        BOX_TYPE_UUID
    }

    fn length(&self) -> Option<u64> {
        if self.open_ended {
            return None;
        }
        Some(self.uuid.len() as u64 + self.data.len() as u64)
    }

    fn decode(&mut self, reader: &mut SubReader) -> Result<(), Box<dyn error::Error>> {
        reader.read_exact(&mut self.uuid)?;
        self.data.clear();
        reader.read_to_end(&mut self.data)?;
        Ok(())
    }

    fn encode(&self, writer: &mut dyn io::Write) -> Result<(), Box<dyn error::Error>> {
        writer.write_all(&self.uuid)?;
        writer.write_all(&self.data)?;
        Ok(())
    }
}

// I.7.3.1
//
// UUID List box
//
// This box contains a list of UUIDs.
#[derive(Debug, Default, PartialEq)]
pub struct UUIDListBox {
    // ID^i: ID
    //
    // This field specifies one UUID, as specified in ISO/IEC 11578, which
    // shall be associated with the URL contained in the URL box within the
    // same UUID Info box.
    //
    // The number of UUIDi fields shall be the same as the value of the NU
    // field.
    ids: Vec<[u8; 16]>,
    pub(crate) open_ended: bool,
}

impl UUIDListBox {
    pub fn new(ids: Vec<[u8; 16]>) -> UUIDListBox {
        UUIDListBox {
            ids,
            open_ended: false,
        }
    }

    pub fn ids(&self) -> &[[u8; 16]] {
        &self.ids
    }

    // NU: Number of UUIDs.
    pub fn number_of_uuids(&self) -> u16 {
        self.ids.len() as u16
    }
}

impl JBox for UUIDListBox {
    // The type of a UUID List box shall be ‘ulst’ (0x756C 7374)
    fn identifier(&self) -> BoxType {
        BOX_TYPE_UUID_LIST
    }

    fn length(&self) -> Option<u64> {
        if self.open_ended {
            return None;
        }
        Some(2 + 16 * self.ids.len() as u64)
    }

    fn decode(&mut self, reader: &mut SubReader) -> Result<(), Box<dyn error::Error>> {
        let mut number_of_uuids: [u8; 2] = [0; 2];
        reader.read_exact(&mut number_of_uuids)?;
        let size = u16::from_be_bytes(number_of_uuids) as usize;

        self.ids = Vec::with_capacity(size);
        let mut buffer: [u8; 16] = [0; 16];
        for _ in 0..size {
            reader.read_exact(&mut buffer)?;
            self.ids.push(buffer);
        }

        Ok(())
    }

    fn encode(&self, writer: &mut dyn io::Write) -> Result<(), Box<dyn error::Error>> {
        writer.write_all(&self.number_of_uuids().to_be_bytes())?;
        for id in &self.ids {
            writer.write_all(id)?;
        }
        Ok(())
    }
}

// I.7.3.2
//
// Data Entry URL box
//
// This box contains a URL which can be used by an application to acquire more
// information about the associated vendor-specific extensions.
//
// Relative URLs are permissible and are relative to the file containing this
// Data Entry URL box.
#[derive(Debug, Default, PartialEq)]
pub struct DataEntryURLBox {
    // VERS: Version number.
    //
    // The value of this field shall be 0.
    version: u8,

    // FLAG: Flags.
    //
    // This field is encoded as a 3-byte unsigned integer. The value of this
    // field shall be 0.
    flags: [u8; 3],

    // LOC: Location.
    //
    // The URL is encoded as a null terminated string of UTF-8 characters.
    location: Vec<u8>,
    pub(crate) open_ended: bool,
}

impl DataEntryURLBox {
    /// Data Entry URL box of version 0 with no flags, the location is written
    /// null terminated.
    pub fn new(location: &str) -> DataEntryURLBox {
        let mut bytes = location.as_bytes().to_vec();
        bytes.push(0);
        DataEntryURLBox {
            version: 0,
            flags: [0; 3],
            location: bytes,
            open_ended: false,
        }
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn flags(&self) -> u32 {
        u32::from_be_bytes([0, self.flags[0], self.flags[1], self.flags[2]])
    }

    /// Location without its null terminator.
    pub fn location(&self) -> Result<&str, str::Utf8Error> {
        let end = self
            .location
            .iter()
            .position(|byte| *byte == 0)
            .unwrap_or(self.location.len());
        str::from_utf8(&self.location[..end])
    }
}

impl JBox for DataEntryURLBox {
    // The type of a Data Entry URL box shall be 'url\040' (0x7572 6C20).
    fn identifier(&self) -> BoxType {
        BOX_TYPE_DATA_ENTRY_URL
    }

    fn length(&self) -> Option<u64> {
        if self.open_ended {
            return None;
        }
        Some(4 + self.location.len() as u64)
    }

    fn decode(&mut self, reader: &mut SubReader) -> Result<(), Box<dyn error::Error>> {
        let mut version: [u8; 1] = [0; 1];
        reader.read_exact(&mut version)?;
        self.version = version[0];
        reader.read_exact(&mut self.flags)?;

        self.location.clear();
        reader.read_to_end(&mut self.location)?;
        Ok(())
    }

    fn encode(&self, writer: &mut dyn io::Write) -> Result<(), Box<dyn error::Error>> {
        writer.write_all(&[self.version])?;
        writer.write_all(&self.flags)?;
        writer.write_all(&self.location)?;
        Ok(())
    }
}
