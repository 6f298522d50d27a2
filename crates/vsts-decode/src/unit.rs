//! Unit files: a grid of areas, each holding one sparse octree.

use glam::IVec3;

use crate::context::{GeometryConfig, MAGIC};
use crate::error::{DecodeError, DecodeResult};
use crate::packed::{PackedRecords, SURFACE_INFO_BITS, SURFACE_INFO2_BITS};
use crate::reader::ByteReader;

/// The only unit format version this decoder understands.
pub const SUPPORTED_VERSION: u8 = 0x0a;

/// Depth of every area octree.
pub const LEVEL_COUNT: usize = 8;

/// Size of one [`WorldInfo`] record in bytes.
pub const WORLD_INFO_SIZE: usize = 20;

/// The 8-byte header at the start of a unit file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitHeader {
    pub area_count: u8,
    /// Single-scene units omit `surface_info2` and `world_info`.
    pub is_single_scene: bool,
    /// Byte 6; meaning unknown, kept verbatim.
    pub reserved: u8,
    pub version: u8,
}

/// Per-node metadata attached to level-5 octree nodes.
///
/// Fields are kept as stored; none of them are interpreted here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorldInfo {
    pub cave_or_indoor_distance: u8,
    pub water_distance: u8,
    pub forest_density: u8,
    /// Directional surface bitfield.
    pub surface_flags: u8,
    pub cave_entrance_distance: u8,
    /// Material byte; the low nibble is the water material.
    pub material: u8,
    pub route_distance: u8,
    pub water_depth: u8,
    pub water_flow_rate: u8,
    pub terrain_material: u8,
    pub forest_type_flags: u8,
    /// Trailing byte of the fixed fields; probably padding.
    pub reserved: u8,
    pub cave_id: u64,
}

impl WorldInfo {
    /// Decode one 20-byte record: 12 single-byte fields then a little-endian `u64`.
    #[must_use]
    pub fn from_bytes(bytes: &[u8; WORLD_INFO_SIZE]) -> Self {
        let mut cave_id = [0u8; 8];
        cave_id.copy_from_slice(&bytes[12..]);
        Self {
            cave_or_indoor_distance: bytes[0],
            water_distance: bytes[1],
            forest_density: bytes[2],
            surface_flags: bytes[3],
            cave_entrance_distance: bytes[4],
            material: bytes[5],
            route_distance: bytes[6],
            water_depth: bytes[7],
            water_flow_rate: bytes[8],
            terrain_material: bytes[9],
            forest_type_flags: bytes[10],
            reserved: bytes[11],
            cave_id: u64::from_le_bytes(cave_id),
        }
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; WORLD_INFO_SIZE] {
        let mut out = [0u8; WORLD_INFO_SIZE];
        out[..12].copy_from_slice(&[
            self.cave_or_indoor_distance,
            self.water_distance,
            self.forest_density,
            self.surface_flags,
            self.cave_entrance_distance,
            self.material,
            self.route_distance,
            self.water_depth,
            self.water_flow_rate,
            self.terrain_material,
            self.forest_type_flags,
            self.reserved,
        ]);
        out[12..].copy_from_slice(&self.cave_id.to_le_bytes());
        out
    }
}

/// One area of a unit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Area {
    /// Index of the area within its unit (not a world position).
    pub grid_pos: IVec3,
    /// Mask arrays for octree levels 0 through 7.
    pub voxel_masks: [Vec<u32>; LEVEL_COUNT],
    /// Packed 10-bit records, one per occupied leaf.
    pub surface_info: Vec<u8>,
    /// Packed 6-bit records, one per level-6 node. `None` in single-scene units.
    pub surface_info2: Option<Vec<u8>>,
    /// One record per level-5 node. `None` in single-scene units.
    pub world_info: Option<Vec<WorldInfo>>,
}

impl Area {
    /// Whether the octree has no root node and therefore no voxels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.voxel_masks[0].is_empty()
    }

    /// Leaf records, addressed by [`crate::Leaf::surface_index`].
    #[must_use]
    pub fn surface_records(&self) -> PackedRecords<'_> {
        PackedRecords::new(&self.surface_info, SURFACE_INFO_BITS)
    }

    /// Level-6 records, addressed by [`crate::Leaf::surface2_index`].
    #[must_use]
    pub fn surface2_records(&self) -> Option<PackedRecords<'_>> {
        self.surface_info2
            .as_deref()
            .map(|data| PackedRecords::new(data, SURFACE_INFO2_BITS))
    }

    /// Parse one area block.
    ///
    /// # Format
    ///
    /// - `size` (u32): byte length of the voxel mask section that follows
    /// - 8 × (`count` (u32), `count` × u32 masks)
    /// - `surface_info_size` (u32) + bytes
    /// - unless single scene: `surface_info2_size` (u32) + bytes,
    ///   `world_info_count` (u32) + `count` × 20-byte records
    fn parse(
        reader: &mut ByteReader<'_>,
        index: usize,
        grid_pos: IVec3,
        is_single_scene: bool,
    ) -> DecodeResult<Self> {
        let declared = reader.read_u32()? as usize;
        let start = reader.position();

        let mut voxel_masks: [Vec<u32>; LEVEL_COUNT] = Default::default();
        for level in &mut voxel_masks {
            let count = reader.read_u32()? as usize;
            // Check the whole array up front so a corrupt count cannot
            // trigger a huge allocation.
            if reader.remaining() / 4 < count {
                return Err(DecodeError::UnexpectedEof {
                    offset: reader.position(),
                    requested: count.saturating_mul(4),
                    len: reader.len(),
                });
            }
            *level = (0..count)
                .map(|_| reader.read_u32())
                .collect::<DecodeResult<_>>()?;
        }

        let consumed = reader.position() - start;
        if consumed != declared {
            return Err(DecodeError::SizeMismatch {
                area: index,
                offset: start,
                declared,
                consumed,
            });
        }

        let surface_info = read_sized_bytes(reader)?;

        let (surface_info2, world_info) = if is_single_scene {
            (None, None)
        } else {
            let surface_info2 = read_sized_bytes(reader)?;
            let count = reader.read_u32()? as usize;
            if reader.remaining() / WORLD_INFO_SIZE < count {
                return Err(DecodeError::UnexpectedEof {
                    offset: reader.position(),
                    requested: count.saturating_mul(WORLD_INFO_SIZE),
                    len: reader.len(),
                });
            }
            let world_info = (0..count)
                .map(|_| reader.read_array().map(|bytes| WorldInfo::from_bytes(&bytes)))
                .collect::<DecodeResult<_>>()?;
            (Some(surface_info2), Some(world_info))
        };

        Ok(Self {
            grid_pos,
            voxel_masks,
            surface_info,
            surface_info2,
            world_info,
        })
    }

    fn write(&self, out: &mut Vec<u8>, is_single_scene: bool) {
        let section: usize = self.voxel_masks.iter().map(|m| 4 + m.len() * 4).sum();
        push_len(out, section);
        for masks in &self.voxel_masks {
            push_len(out, masks.len());
            for mask in masks {
                out.extend_from_slice(&mask.to_le_bytes());
            }
        }

        push_len(out, self.surface_info.len());
        out.extend_from_slice(&self.surface_info);

        if !is_single_scene {
            let surface_info2 = self.surface_info2.as_deref().unwrap_or_default();
            push_len(out, surface_info2.len());
            out.extend_from_slice(surface_info2);

            let world_info = self.world_info.as_deref().unwrap_or_default();
            push_len(out, world_info.len());
            for info in world_info {
                out.extend_from_slice(&info.to_bytes());
            }
        }
    }
}

/// A parsed unit file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub header: UnitHeader,
    /// Areas in file order: y outermost, then z, then x.
    pub areas: Vec<Area>,
}

impl Unit {
    /// Parse a decompressed unit file.
    ///
    /// The area grid comes from `geometry`: the file stores areas in
    /// y, z, x nesting order (x varies fastest) without their positions.
    ///
    /// # Errors
    ///
    /// Fails on a wrong magic or version, an area count that disagrees with
    /// the geometry, a voxel section whose size field is wrong, or
    /// truncated input.
    pub fn parse(data: &[u8], geometry: &GeometryConfig) -> DecodeResult<Self> {
        let mut reader = ByteReader::new(data);
        reader.expect_magic(MAGIC)?;

        let header = UnitHeader {
            area_count: reader.read_u8()?,
            is_single_scene: reader.read_bool()?,
            reserved: reader.read_u8()?,
            version: reader.read_u8()?,
        };
        if header.version != SUPPORTED_VERSION {
            return Err(DecodeError::UnsupportedVersion {
                expected: SUPPORTED_VERSION,
                found: header.version,
            });
        }

        let counts = geometry.areas_per_unit()?;
        let expected = geometry.areas_per_unit_count()?;
        if usize::from(header.area_count) != expected {
            return Err(DecodeError::AreaCountMismatch {
                expected,
                found: usize::from(header.area_count),
            });
        }

        let mut areas = Vec::with_capacity(expected);
        for y in 0..counts.y {
            for z in 0..counts.z {
                for x in 0..counts.x {
                    let grid_pos = glam::UVec3::new(x, y, z).as_ivec3();
                    areas.push(Area::parse(
                        &mut reader,
                        areas.len(),
                        grid_pos,
                        header.is_single_scene,
                    )?);
                }
            }
        }

        Ok(Self { header, areas })
    }

    /// Encode the unit back into its on-disk layout.
    ///
    /// Area positions are implied by order and are not written.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);
        out.push(self.header.area_count);
        out.push(u8::from(self.header.is_single_scene));
        out.push(self.header.reserved);
        out.push(self.header.version);
        for area in &self.areas {
            area.write(&mut out, self.header.is_single_scene);
        }
        out
    }
}

fn read_sized_bytes(reader: &mut ByteReader<'_>) -> DecodeResult<Vec<u8>> {
    let size = reader.read_u32()? as usize;
    Ok(reader.read_bytes(size)?.to_vec())
}

fn push_len(out: &mut Vec<u8>, len: usize) {
    // Lengths come from data that was itself read through u32 fields.
    #[allow(clippy::cast_possible_truncation)]
    out.extend_from_slice(&(len as u32).to_le_bytes());
}
