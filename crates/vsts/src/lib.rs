//! Read VSTS volume-statistics worlds from a romfs dump.
//!
//! This crate locates a world's unit files, decompresses them with the
//! game's zstd dictionaries and decodes them into voxel positions using
//! `vsts-decode`.
//!
//! # Design principles
//!
//! - **Pluggable storage**: Files are read through [`FileSource`], so worlds
//!   can come from disk or memory
//! - **Explicit context**: Dictionaries are loaded once into a
//!   [`DecompressContext`] and shared, with no global state
//! - **Parallel units**: Units decode independently on the rayon pool;
//!   results keep grid order
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use vsts::{Filesystem, World, WorldOptions};
//!
//! let romfs = Path::new("romfs");
//! let world = World::open(Filesystem::new(), romfs, "MainField", WorldOptions::for_world("MainField"))?;
//!
//! let unit = world.decode_unit(3, 7)?;
//! println!("{} voxels in {}", unit.positions.len(), unit.path.display());
//! # Ok::<(), vsts::Error>(())
//! ```

pub mod decompress;
mod error;
pub mod layout;
pub mod obj;
pub mod source;
mod world;

pub use decompress::{Compression, DecompressContext, DictionaryKind};
pub use error::{Error, Result};
pub use source::{FileSource, Filesystem, MemorySource};
pub use world::{MAIN_FIELD_FLAGS, ScanMode, ScanSummary, UnitVoxels, World, WorldOptions};

// Re-export decode types for convenience.
pub use vsts_decode::{DecodeError, GeometryConfig, Leaf, Unit};
