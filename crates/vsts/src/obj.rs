//! Writing voxel positions as Wavefront OBJ vertices.
//!
//! Each unit becomes a block of `v X Y Z` lines followed by a blank line.
//! No faces are written.

use std::io::{self, Write};

use glam::I64Vec3;

use crate::world::UnitVoxels;

/// Output file name for a whole world.
#[must_use]
pub fn world_file_name(world: &str) -> String {
    format!("{world}.obj")
}

/// Output file name for one unit of a world.
#[must_use]
pub fn unit_file_name(world: &str, x: i32, z: i32) -> String {
    format!("{world}_X{x}_Z{z}.obj")
}

/// Write one block of vertices, returning how many were written.
pub fn write_positions<W: Write>(out: &mut W, positions: &[I64Vec3]) -> io::Result<usize> {
    for p in positions {
        writeln!(out, "v {} {} {}", p.x, p.y, p.z)?;
    }
    writeln!(out)?;
    Ok(positions.len())
}

/// Write each unit as its own block, in order.
pub fn write_units<W: Write>(out: &mut W, units: &[UnitVoxels]) -> io::Result<usize> {
    units
        .iter()
        .try_fold(0, |total, unit| -> io::Result<usize> {
            Ok(total + write_positions(out, &unit.positions)?)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_write_positions() {
        let mut out = Vec::new();
        let count = write_positions(
            &mut out,
            &[I64Vec3::new(-5000, -4000, 12), I64Vec3::new(1, 2, 3)],
        )
        .unwrap();
        assert_eq!(count, 2);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "v -5000 -4000 12\nv 1 2 3\n\n"
        );
    }

    #[test]
    fn test_empty_block_is_blank_line() {
        let mut out = Vec::new();
        assert_eq!(write_positions(&mut out, &[]).unwrap(), 0);
        assert_eq!(out, b"\n");
    }

    #[test]
    fn test_write_units_in_order() {
        let unit = |x, positions| UnitVoxels {
            x,
            z: 0,
            path: PathBuf::from(format!("X{x}_Z0.vsts.zs")),
            positions,
        };
        let units = [
            unit(0, vec![I64Vec3::ZERO]),
            unit(1, vec![I64Vec3::ONE, I64Vec3::splat(2)]),
        ];

        let mut out = Vec::new();
        assert_eq!(write_units(&mut out, &units).unwrap(), 3);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "v 0 0 0\n\nv 1 1 1\nv 2 2 2\n\n"
        );
    }

    #[test]
    fn test_file_names() {
        assert_eq!(world_file_name("Dungeon001"), "Dungeon001.obj");
        assert_eq!(unit_file_name("MainField", 3, 15), "MainField_X3_Z15.obj");
    }
}
