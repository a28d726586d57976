use log::debug;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::colour::{
    ChannelDefinitionBox, ColourSpecificationBox, ComponentMappingBox, PaletteBox,
};
use crate::container::ContainerBox;
use crate::extension::{DataEntryURLBox, UUIDBox, UUIDListBox, XMLBox};
use crate::file_type::FileTypeBox;
use crate::image::{BitsPerComponentBox, ImageHeaderBox};
use crate::jbox::{ContiguousCodestreamBox, Jp2Box, OpaqueBox};
use crate::resolution::ResolutionBox;
use crate::{
    box_type_name, BoxType, BOX_TYPE_BITS_PER_COMPONENT, BOX_TYPE_CAPTURE_RESOLUTION,
    BOX_TYPE_CHANNEL_DEFINITION, BOX_TYPE_COLOUR_SPECIFICATION, BOX_TYPE_COMPONENT_MAPPING,
    BOX_TYPE_CONTIGUOUS_CODESTREAM, BOX_TYPE_DATA_ENTRY_URL, BOX_TYPE_DEFAULT_DISPLAY_RESOLUTION,
    BOX_TYPE_FILE_TYPE, BOX_TYPE_HEADER, BOX_TYPE_IMAGE_HEADER, BOX_TYPE_PALETTE,
    BOX_TYPE_RESOLUTION, BOX_TYPE_UUID, BOX_TYPE_UUID_INFO, BOX_TYPE_UUID_LIST, BOX_TYPE_XML,
};

/// Constructor for an empty box of a registered type.
pub type BoxFactory = fn() -> Jp2Box;

/// Box type registry.
///
/// Maps a box type to the constructor of its dedicated representation.
/// Types without an entry are read as [`OpaqueBox`], which is how boxes
/// defined outside of ISO/IEC 15444-1 are carried through unchanged.
#[derive(Default)]
pub struct Registry {
    factories: HashMap<BoxType, BoxFactory>,
}

impl Registry {
    /// Registry without any entry, every box reads as opaque.
    pub fn new() -> Registry {
        Registry::default()
    }

    /// Registry of every box type defined for JP2 files.
    pub fn jp2() -> Registry {
        let mut registry = Registry::new();

        // Children of the file
        registry.register(BOX_TYPE_FILE_TYPE, || {
            Jp2Box::FileType(FileTypeBox::default())
        });
        registry.register(BOX_TYPE_HEADER, || {
            Jp2Box::Container(ContainerBox::new(BOX_TYPE_HEADER))
        });
        registry.register(BOX_TYPE_CONTIGUOUS_CODESTREAM, || {
            Jp2Box::ContiguousCodestream(ContiguousCodestreamBox::default())
        });
        registry.register(BOX_TYPE_XML, || Jp2Box::Xml(XMLBox::default()));
        registry.register(BOX_TYPE_UUID, || Jp2Box::Uuid(UUIDBox::default()));
        registry.register(BOX_TYPE_UUID_INFO, || {
            Jp2Box::Container(ContainerBox::new(BOX_TYPE_UUID_INFO))
        });

        // Children of the JP2 Header box
        registry.register(BOX_TYPE_IMAGE_HEADER, || {
            Jp2Box::ImageHeader(ImageHeaderBox::default())
        });
        registry.register(BOX_TYPE_BITS_PER_COMPONENT, || {
            Jp2Box::BitsPerComponent(BitsPerComponentBox::default())
        });
        registry.register(BOX_TYPE_COLOUR_SPECIFICATION, || {
            Jp2Box::ColourSpecification(ColourSpecificationBox::default())
        });
        registry.register(BOX_TYPE_PALETTE, || Jp2Box::Palette(PaletteBox::default()));
        registry.register(BOX_TYPE_COMPONENT_MAPPING, || {
            Jp2Box::ComponentMapping(ComponentMappingBox::default())
        });
        registry.register(BOX_TYPE_CHANNEL_DEFINITION, || {
            Jp2Box::ChannelDefinition(ChannelDefinitionBox::default())
        });
        registry.register(BOX_TYPE_RESOLUTION, || {
            Jp2Box::Container(ContainerBox::new(BOX_TYPE_RESOLUTION))
        });

        // Children of the Resolution box
        registry.register(BOX_TYPE_CAPTURE_RESOLUTION, || {
            Jp2Box::Resolution(ResolutionBox::new(BOX_TYPE_CAPTURE_RESOLUTION))
        });
        registry.register(BOX_TYPE_DEFAULT_DISPLAY_RESOLUTION, || {
            Jp2Box::Resolution(ResolutionBox::new(BOX_TYPE_DEFAULT_DISPLAY_RESOLUTION))
        });

        // Children of the UUID Info box
        registry.register(BOX_TYPE_UUID_LIST, || {
            Jp2Box::UuidList(UUIDListBox::default())
        });
        registry.register(BOX_TYPE_DATA_ENTRY_URL, || {
            Jp2Box::DataEntryUrl(DataEntryURLBox::default())
        });

        registry
    }

    /// Associate `box_type` with `factory`, replacing any earlier entry.
    pub fn register(&mut self, box_type: BoxType, factory: BoxFactory) {
        self.factories.insert(box_type, factory);
    }

    /// Empty box for `box_type`.
    pub fn create(&self, box_type: BoxType) -> Jp2Box {
        match self.factories.get(&box_type) {
            Some(factory) => factory(),
            None => {
                debug!(
                    "No handler for box type {:?}, reading as opaque",
                    box_type_name(box_type)
                );
                Jp2Box::Opaque(OpaqueBox::new(box_type, vec![]))
            }
        }
    }

    pub fn contains(&self, box_type: BoxType) -> bool {
        self.factories.contains_key(&box_type)
    }
}

/// The process-wide registry of JP2 box types.
///
/// Built on first use and never changed afterwards, so it can be shared by
/// parses running on any number of threads.
pub fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(Registry::jp2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jbox::JBox;

    #[test]
    fn test_create_registered() {
        let registry = Registry::jp2();

        match registry.create(BOX_TYPE_DEFAULT_DISPLAY_RESOLUTION) {
            Jp2Box::Resolution(resolution_box) => {
                assert_eq!(
                    resolution_box.identifier(),
                    BOX_TYPE_DEFAULT_DISPLAY_RESOLUTION
                )
            }
            other => panic!("unexpected {:?}", other),
        }

        match registry.create(BOX_TYPE_HEADER) {
            Jp2Box::Container(container_box) => {
                assert_eq!(container_box.identifier(), BOX_TYPE_HEADER)
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_create_unregistered_is_opaque() {
        let registry = Registry::jp2();
        assert!(!registry.contains(*b"zzzz"));

        let jbox = registry.create(*b"zzzz");
        assert_eq!(jbox, Jp2Box::Opaque(OpaqueBox::new(*b"zzzz", vec![])));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = Registry::new();
        assert!(matches!(
            registry.create(BOX_TYPE_XML),
            Jp2Box::Opaque(_)
        ));

        registry.register(BOX_TYPE_XML, || Jp2Box::Xml(XMLBox::default()));
        assert!(matches!(registry.create(BOX_TYPE_XML), Jp2Box::Xml(_)));

        registry.register(BOX_TYPE_XML, || {
            Jp2Box::Opaque(OpaqueBox::new(BOX_TYPE_XML, vec![]))
        });
        assert!(matches!(registry.create(BOX_TYPE_XML), Jp2Box::Opaque(_)));
    }

    #[test]
    fn test_shared_registry() {
        assert!(std::ptr::eq(registry(), registry()));
        for box_type in [
            BOX_TYPE_FILE_TYPE,
            BOX_TYPE_HEADER,
            BOX_TYPE_IMAGE_HEADER,
            BOX_TYPE_BITS_PER_COMPONENT,
            BOX_TYPE_COLOUR_SPECIFICATION,
            BOX_TYPE_PALETTE,
            BOX_TYPE_COMPONENT_MAPPING,
            BOX_TYPE_CHANNEL_DEFINITION,
            BOX_TYPE_RESOLUTION,
            BOX_TYPE_CAPTURE_RESOLUTION,
            BOX_TYPE_DEFAULT_DISPLAY_RESOLUTION,
            BOX_TYPE_CONTIGUOUS_CODESTREAM,
            BOX_TYPE_XML,
            BOX_TYPE_UUID,
            BOX_TYPE_UUID_INFO,
            BOX_TYPE_UUID_LIST,
            BOX_TYPE_DATA_ENTRY_URL,
        ]
        .iter()
        {
            assert!(registry().contains(*box_type));
        }
    }
}
