//! Decode VSTS volume-statistics files into voxel positions.
//!
//! A VSTS unit file holds one sparse voxel octree per area of a world grid.
//! This crate parses already-decompressed buffers: the world context
//! descriptor, unit files, and the SARC archive that carries the
//! decompression dictionaries. Reading files and zstd decompression live in
//! the `vsts` crate.
//!
//! # Design principles
//!
//! - **Synchronous**: No I/O, no threading primitives
//! - **User-controlled parallelism**: Every unit decodes independently
//! - **Bounds-checked**: Malformed input yields a [`DecodeError`], never a panic
//!
//! # Example
//!
//! ```
//! use glam::I64Vec3;
//! use vsts_decode::{Area, decode_area};
//!
//! let mut area = Area::default();
//! area.voxel_masks = std::array::from_fn(|_| vec![0x01]);
//!
//! let positions = decode_area(&area, I64Vec3::new(10, 20, 30)).unwrap();
//! assert_eq!(positions, [I64Vec3::new(10, 20, 30)]);
//! ```

mod context;
mod error;
mod octree;
mod packed;
mod reader;
pub mod sarc;
mod unit;

pub use context::{CONTEXT_SIZE, ContextDescriptor, GeometryConfig, MAGIC, OCTREE_EXTENT};
pub use error::{DecodeError, DecodeResult};
pub use octree::{
    LEAF_LEVEL, Leaf, SURFACE_INFO2_LEVEL, WORLD_INFO_LEVEL, child_count, child_index,
    child_offset, decode_area, decode_area_leaves, walk, walk_area,
};
pub use packed::{PackedRecords, SURFACE_INFO_BITS, SURFACE_INFO2_BITS};
pub use reader::{ByteReader, Endian, PointerWidth};
pub use sarc::SarcArchive;
pub use unit::{Area, LEVEL_COUNT, SUPPORTED_VERSION, Unit, UnitHeader, WORLD_INFO_SIZE, WorldInfo};
