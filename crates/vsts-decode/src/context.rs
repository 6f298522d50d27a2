//! World grid geometry and the context descriptor file.

use glam::{I64Vec3, IVec3, UVec3};

use crate::error::{DecodeError, DecodeResult};
use crate::reader::ByteReader;

/// File tag shared by context and unit files.
pub const MAGIC: &[u8; 4] = b"VSTS";

/// Size of a context descriptor in bytes.
pub const CONTEXT_SIZE: usize = 72;

/// Edge length of an area's octree cube (8 levels of binary subdivision).
pub const OCTREE_EXTENT: i32 = 256;

/// Voxel grid geometry of one world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryConfig {
    /// Size of one unit (one file) in world units.
    pub unit_size: IVec3,
    /// World position of the first unit's minimum corner.
    pub world_base: IVec3,
    /// Number of units along each axis. Only x and z are iterated.
    pub grid_dimensions: IVec3,
    /// Overlap added around each area's octree cube.
    pub area_margin: IVec3,
    /// Edge length of one area in world units.
    pub area_sidelength: i32,
}

impl GeometryConfig {
    /// Geometry of `MainField`, which ships without a context file.
    pub const MAIN_FIELD: Self = Self {
        unit_size: IVec3::new(500, 8000, 500),
        world_base: IVec3::new(-5000, -4000, -4000),
        grid_dimensions: IVec3::new(20, 1, 16),
        area_margin: IVec3::new(3, 3, 3),
        area_sidelength: 250,
    };

    /// Parse a decompressed context file, discarding the reserved fields.
    pub fn parse(data: &[u8]) -> DecodeResult<Self> {
        ContextDescriptor::parse(data).map(|descriptor| descriptor.geometry)
    }

    /// Number of areas along each axis of a unit.
    ///
    /// # Errors
    ///
    /// Fails if the sidelength is not positive or does not divide the unit
    /// size evenly on every axis.
    pub fn areas_per_unit(&self) -> DecodeResult<UVec3> {
        let side = self.area_sidelength;
        if side <= 0 {
            return Err(DecodeError::InvalidGeometry {
                detail: format!("area sidelength {side} is not positive"),
            });
        }
        let size = self.unit_size;
        if size.min_element() < 0 || size % side != IVec3::ZERO {
            return Err(DecodeError::InvalidGeometry {
                detail: format!("unit size {size} is not a multiple of area sidelength {side}"),
            });
        }
        Ok((size / side).as_uvec3())
    }

    /// Total number of areas stored in one unit file.
    pub fn areas_per_unit_count(&self) -> DecodeResult<usize> {
        let counts = self.areas_per_unit()?;
        (counts.x as usize)
            .checked_mul(counts.y as usize)
            .and_then(|n| n.checked_mul(counts.z as usize))
            .ok_or_else(|| DecodeError::InvalidGeometry {
                detail: format!("area count {counts} overflows"),
            })
    }

    /// Whether `sidelength + 2 * margin` spans the octree cube on every axis.
    ///
    /// Decoding still works when this is false, but positions near area
    /// borders will not line up with the game's own lookups.
    #[must_use]
    pub fn is_octree_aligned(&self) -> bool {
        let span = self.area_margin.as_i64vec3() * 2 + i64::from(self.area_sidelength);
        span == I64Vec3::splat(i64::from(OCTREE_EXTENT))
    }

    /// World position of the unit at grid cell `(x, z)`.
    ///
    /// The y component stays at `world_base.y` because the grid is one unit
    /// tall.
    #[must_use]
    pub fn unit_world_base(&self, x: i32, z: i32) -> I64Vec3 {
        self.world_base.as_i64vec3()
            + self.unit_size.as_i64vec3() * I64Vec3::new(i64::from(x), 0, i64::from(z))
    }

    /// Base position of an area's octree given its unit's base.
    #[must_use]
    pub fn area_base(&self, unit_base: I64Vec3, grid_pos: IVec3) -> I64Vec3 {
        (grid_pos.as_i64vec3() * i64::from(self.area_sidelength)) - self.area_margin.as_i64vec3()
            + unit_base
    }
}

/// A parsed context file, keeping its reserved words for re-serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextDescriptor {
    pub geometry: GeometryConfig,
    /// The four reserved words, in file order.
    pub reserved: [[u8; 4]; 4],
}

impl ContextDescriptor {
    /// Parse a decompressed context file.
    ///
    /// # Format
    ///
    /// - `"VSTS"`, 4 reserved bytes
    /// - unit size (3 × i32), 4 reserved bytes
    /// - world base (3 × i32), 4 reserved bytes
    /// - grid dimensions (3 × i32), 4 reserved bytes
    /// - area margin (3 × i32), area sidelength (i32)
    pub fn parse(data: &[u8]) -> DecodeResult<Self> {
        let mut reader = ByteReader::new(data);
        reader.expect_magic(MAGIC)?;

        let mut reserved = [[0u8; 4]; 4];
        reserved[0] = reader.read_array()?;
        let unit_size = read_ivec3(&mut reader)?;
        reserved[1] = reader.read_array()?;
        let world_base = read_ivec3(&mut reader)?;
        reserved[2] = reader.read_array()?;
        let grid_dimensions = read_ivec3(&mut reader)?;
        reserved[3] = reader.read_array()?;
        let area_margin = read_ivec3(&mut reader)?;
        let area_sidelength = reader.read_i32()?;

        Ok(Self {
            geometry: GeometryConfig {
                unit_size,
                world_base,
                grid_dimensions,
                area_margin,
                area_sidelength,
            },
            reserved,
        })
    }

    /// Serialize back into the 72-byte on-disk layout.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; CONTEXT_SIZE] {
        let g = &self.geometry;
        let mut out = Vec::with_capacity(CONTEXT_SIZE);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&self.reserved[0]);
        push_ivec3(&mut out, g.unit_size);
        out.extend_from_slice(&self.reserved[1]);
        push_ivec3(&mut out, g.world_base);
        out.extend_from_slice(&self.reserved[2]);
        push_ivec3(&mut out, g.grid_dimensions);
        out.extend_from_slice(&self.reserved[3]);
        push_ivec3(&mut out, g.area_margin);
        out.extend_from_slice(&g.area_sidelength.to_le_bytes());

        let mut bytes = [0u8; CONTEXT_SIZE];
        bytes.copy_from_slice(&out);
        bytes
    }
}

impl From<GeometryConfig> for ContextDescriptor {
    fn from(geometry: GeometryConfig) -> Self {
        Self {
            geometry,
            reserved: [[0; 4]; 4],
        }
    }
}

fn read_ivec3(reader: &mut ByteReader<'_>) -> DecodeResult<IVec3> {
    Ok(IVec3::new(
        reader.read_i32()?,
        reader.read_i32()?,
        reader.read_i32()?,
    ))
}

fn push_ivec3(out: &mut Vec<u8>, v: IVec3) {
    for c in v.to_array() {
        out.extend_from_slice(&c.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_context() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(b"VSTS");
        data.extend_from_slice(&[1, 2, 3, 4]);
        for v in [1000, 4000, 500] {
            data.extend_from_slice(&i32::to_le_bytes(v));
        }
        data.extend_from_slice(&[0; 4]);
        for v in [-1000, -2000, -250] {
            data.extend_from_slice(&i32::to_le_bytes(v));
        }
        data.extend_from_slice(&[0xEE; 4]);
        for v in [4, 1, 2] {
            data.extend_from_slice(&i32::to_le_bytes(v));
        }
        data.extend_from_slice(&[0; 4]);
        for v in [3, 3, 3] {
            data.extend_from_slice(&i32::to_le_bytes(v));
        }
        data.extend_from_slice(&250i32.to_le_bytes());
        data
    }

    #[test]
    fn test_parse_context() {
        let data = sample_context();
        assert_eq!(data.len(), CONTEXT_SIZE);

        let geometry = GeometryConfig::parse(&data).unwrap();
        assert_eq!(geometry.unit_size, IVec3::new(1000, 4000, 500));
        assert_eq!(geometry.world_base, IVec3::new(-1000, -2000, -250));
        assert_eq!(geometry.grid_dimensions, IVec3::new(4, 1, 2));
        assert_eq!(geometry.area_margin, IVec3::splat(3));
        assert_eq!(geometry.area_sidelength, 250);
        assert!(geometry.is_octree_aligned());
    }

    #[test]
    fn test_context_round_trip() {
        let data = sample_context();
        let descriptor = ContextDescriptor::parse(&data).unwrap();
        assert_eq!(descriptor.reserved[0], [1, 2, 3, 4]);
        assert_eq!(descriptor.to_bytes().as_slice(), data.as_slice());
    }

    #[test]
    fn test_context_invalid_magic() {
        let mut data = sample_context();
        data[0..4].copy_from_slice(b"VSTX");
        assert!(matches!(
            GeometryConfig::parse(&data),
            Err(DecodeError::InvalidMagic { offset: 0, .. })
        ));
    }

    #[test]
    fn test_context_truncated() {
        let data = sample_context();
        assert!(matches!(
            GeometryConfig::parse(&data[..CONTEXT_SIZE - 1]),
            Err(DecodeError::UnexpectedEof { offset: 68, .. })
        ));
    }

    #[test]
    fn test_main_field_defaults() {
        let g = GeometryConfig::MAIN_FIELD;
        assert!(g.is_octree_aligned());
        assert_eq!(g.areas_per_unit().unwrap(), UVec3::new(2, 32, 2));
        assert_eq!(g.areas_per_unit_count().unwrap(), 128);
    }

    #[test]
    fn test_areas_per_unit_rejects_uneven_division() {
        let g = GeometryConfig {
            unit_size: IVec3::new(500, 600, 500),
            ..GeometryConfig::MAIN_FIELD
        };
        assert!(matches!(
            g.areas_per_unit(),
            Err(DecodeError::InvalidGeometry { .. })
        ));

        let g = GeometryConfig {
            area_sidelength: 0,
            ..GeometryConfig::MAIN_FIELD
        };
        assert!(g.areas_per_unit().is_err());
    }

    #[test]
    fn test_unit_and_area_base() {
        let g = GeometryConfig::MAIN_FIELD;
        let unit_base = g.unit_world_base(2, 3);
        assert_eq!(unit_base, I64Vec3::new(-4000, -4000, -2500));

        let area_base = g.area_base(unit_base, IVec3::new(1, 4, 0));
        assert_eq!(area_base, I64Vec3::new(-4000 + 250 - 3, -4000 + 1000 - 3, -2500 - 3));
    }

    #[test]
    fn test_misaligned_geometry() {
        let g = GeometryConfig {
            area_margin: IVec3::new(3, 2, 3),
            ..GeometryConfig::MAIN_FIELD
        };
        assert!(!g.is_octree_aligned());
    }

    #[test]
    fn test_extreme_geometry_does_not_overflow() {
        let mut data = sample_context();
        // Area margin x.
        data[56..60].copy_from_slice(&i32::MAX.to_le_bytes());
        // World base x.
        data[24..28].copy_from_slice(&(i32::MAX - 100).to_le_bytes());
        let g = GeometryConfig::parse(&data).unwrap();
        assert_eq!(g.area_margin.x, i32::MAX);

        assert!(!g.is_octree_aligned());
        assert_eq!(
            g.unit_world_base(1, 0).x,
            i64::from(i32::MAX - 100) + 1000
        );
        assert_eq!(
            g.area_base(g.unit_world_base(0, 0), IVec3::ZERO).x,
            i64::from(i32::MAX - 100) - i64::from(i32::MAX)
        );
    }

    #[test]
    fn test_huge_area_count_rejected() {
        let g = GeometryConfig {
            unit_size: IVec3::splat(i32::MAX),
            area_sidelength: 1,
            ..GeometryConfig::MAIN_FIELD
        };
        assert!(matches!(
            g.areas_per_unit_count(),
            Err(DecodeError::InvalidGeometry { .. })
        ));
    }
}
