//! Builders for in-memory romfs fixtures.

#![allow(dead_code, clippy::cast_possible_truncation)]

use std::path::{Path, PathBuf};

use glam::IVec3;
use vsts::MemorySource;
use vsts_decode::{Area, ContextDescriptor, GeometryConfig, SUPPORTED_VERSION, Unit, UnitHeader};

pub const ROMFS: &str = "romfs";

/// One area per unit, a 2 × 2 unit grid, aligned to the octree.
pub fn small_geometry() -> GeometryConfig {
    GeometryConfig {
        unit_size: IVec3::splat(250),
        world_base: IVec3::new(-500, -100, -500),
        grid_dimensions: IVec3::new(2, 1, 2),
        area_margin: IVec3::splat(3),
        area_sidelength: 250,
    }
}

pub fn world_dir(world: &str) -> PathBuf {
    Path::new(ROMFS).join("VolumeStats").join(world)
}

pub fn compress(data: &[u8]) -> Vec<u8> {
    zstd::encode_all(data, 3).unwrap()
}

/// A single-scene unit with one area whose every level holds one mask.
pub fn single_path_unit(mask: u32) -> Vec<u8> {
    let mut area = Area::default();
    area.voxel_masks = std::array::from_fn(|_| vec![mask]);
    Unit {
        header: UnitHeader {
            area_count: 1,
            is_single_scene: true,
            reserved: 0,
            version: SUPPORTED_VERSION,
        },
        areas: vec![area],
    }
    .to_bytes()
}

/// Store a compressed context file for `world`.
pub fn insert_context(source: &MemorySource, world: &str, geometry: GeometryConfig) {
    let context = ContextDescriptor::from(geometry).to_bytes();
    source.insert(
        world_dir(world).join("context.vsts.zs"),
        compress(&context),
    );
}

/// Store a compressed unit file, optionally in an override folder.
pub fn insert_unit(
    source: &MemorySource,
    world: &str,
    flag: Option<&str>,
    x: i32,
    z: i32,
    unit: &[u8],
) {
    let mut dir = world_dir(world);
    if let Some(flag) = flag {
        dir = dir.join(flag);
    }
    source.insert(dir.join(format!("X{x}_Z{z}.vsts.zs")), compress(unit));
}

/// Build a little-endian SARC archive holding `files`.
pub fn build_sarc(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut names = Vec::new();
    let mut name_offsets = Vec::new();
    for (name, _) in files {
        name_offsets.push(names.len() as u32);
        names.extend_from_slice(name.as_bytes());
        names.push(0);
        while names.len() % 4 != 0 {
            names.push(0);
        }
    }

    let mut blob = Vec::new();
    let mut ranges = Vec::new();
    for (_, data) in files {
        let start = blob.len() as u32;
        blob.extend_from_slice(data);
        ranges.push((start, blob.len() as u32));
    }

    let data_offset = 0x14 + 0x0C + files.len() * 16 + 8 + names.len();

    let mut out = Vec::new();
    out.extend_from_slice(b"SARC");
    out.extend_from_slice(&0x14u16.to_le_bytes());
    out.extend_from_slice(&[0xFF, 0xFE]);
    out.extend_from_slice(&((data_offset + blob.len()) as u32).to_le_bytes());
    out.extend_from_slice(&(data_offset as u32).to_le_bytes());
    out.extend_from_slice(&0x0100u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());

    out.extend_from_slice(b"SFAT");
    out.extend_from_slice(&0x0Cu16.to_le_bytes());
    out.extend_from_slice(&(files.len() as u16).to_le_bytes());
    out.extend_from_slice(&0x65u32.to_le_bytes());
    for (i, &(start, end)) in ranges.iter().enumerate() {
        out.extend_from_slice(&(i as u32).to_le_bytes());
        out.extend_from_slice(&(0x0100_0000 | (name_offsets[i] / 4)).to_le_bytes());
        out.extend_from_slice(&start.to_le_bytes());
        out.extend_from_slice(&end.to_le_bytes());
    }

    out.extend_from_slice(b"SFNT");
    out.extend_from_slice(&8u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&names);
    out.extend_from_slice(&blob);
    out
}

/// Samples resembling the text-heavy files the dictionaries are built for.
fn training_samples() -> Vec<Vec<u8>> {
    (0u32..1000)
        .map(|i| {
            format!(
                "{{\"Gyaml\":\"Obj_Tree_{:03}\",\"Translate\":[{}.5,{}.25,{}.0],\"Rotate\":{},\"Hash\":{}}}",
                i % 37,
                i * 7 % 1000,
                i * 13 % 500,
                i * 31 % 900,
                i % 4,
                i.wrapping_mul(2_654_435_761),
            )
            .into_bytes()
        })
        .collect()
}

pub fn train_dictionary() -> Vec<u8> {
    zstd::dict::from_samples(&training_samples(), 2048).unwrap()
}

/// Copy of `dictionary` stamped with `id`.
///
/// Bytes 4..8 of a formatted dictionary hold its id, which is copied into
/// the header of every frame compressed with it.
pub fn with_id(dictionary: &[u8], id: u32) -> Vec<u8> {
    let mut dictionary = dictionary.to_vec();
    dictionary[4..8].copy_from_slice(&id.to_le_bytes());
    dictionary
}

pub fn compress_with_dictionary(data: &[u8], dictionary: &[u8]) -> Vec<u8> {
    let mut compressor = zstd::bulk::Compressor::with_dictionary(3, dictionary).unwrap();
    compressor.compress(data).unwrap()
}

/// The three game dictionaries, stamped with ids 1, 2 and 3.
pub struct Dictionaries {
    pub generic: Vec<u8>,
    pub archive_table: Vec<u8>,
    pub pack: Vec<u8>,
}

impl Dictionaries {
    pub fn new() -> Self {
        let trained = train_dictionary();
        Self {
            generic: with_id(&trained, 1),
            archive_table: with_id(&trained, 2),
            pack: with_id(&trained, 3),
        }
    }

    /// Store the dictionary archive at `romfs/Pack/ZsDic.pack.zs`.
    pub fn insert_archive(&self, source: &MemorySource) {
        let archive = build_sarc(&[
            ("zs.zsdic", self.generic.as_slice()),
            ("bcett.byml.zsdic", self.archive_table.as_slice()),
            ("pack.zsdic", self.pack.as_slice()),
        ]);
        source.insert(
            Path::new(ROMFS).join("Pack/ZsDic.pack.zs"),
            compress(&archive),
        );
    }
}
