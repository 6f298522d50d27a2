//! Rank-indexed bitmask octree decoding.
//!
//! Each area stores its octree as one array of 32-bit mask words per level.
//! A mask word holds:
//!
//! - bits 0-7: which of the node's 8 children exist
//! - bits 8-31: where this node's children start in the next level's array
//!
//! Only present children are stored, packed level by level, so the index of
//! child `i` is the number of present siblings before it plus the node's
//! base offset. Nothing else links a node to its children.

use glam::I64Vec3;

use crate::error::{DecodeError, DecodeResult};
use crate::unit::{Area, LEVEL_COUNT};

/// Level whose children are individual voxels.
pub const LEAF_LEVEL: usize = LEVEL_COUNT - 1;

/// Level whose child rank addresses `surface_info2`.
pub const SURFACE_INFO2_LEVEL: usize = 6;

/// Level whose child rank addresses `world_info`.
pub const WORLD_INFO_LEVEL: usize = 5;

/// An occupied voxel together with the indices of its auxiliary records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leaf {
    /// World position of the voxel.
    pub position: I64Vec3,
    /// Record index into `surface_info`, from the rank at level 7.
    pub surface_index: usize,
    /// Record index into `surface_info2`, from the rank at level 6.
    pub surface2_index: usize,
    /// Record index into `world_info`, from the rank at level 5.
    pub world_info_index: usize,
}

/// Number of children present in a mask word.
#[must_use]
pub fn child_count(mask: u32) -> u32 {
    (mask & 0xFF).count_ones()
}

/// Index of child `child` of `mask` in the next level's array.
///
/// This is the number of present children below bit `child`, plus the base
/// offset stored in the upper 24 bits.
#[must_use]
pub fn child_index(mask: u32, child: u32) -> usize {
    debug_assert!(child < 8);
    let below = mask & 0xFF & ((1 << child) - 1);
    below.count_ones() as usize + (mask >> 8) as usize
}

/// Offset of child `child` of a node at `level`.
///
/// Bit 0 of the child number selects x, bit 1 selects y, bit 2 selects z;
/// each step is `2^(7 - level)` world units.
#[must_use]
pub fn child_offset(child: u32, level: usize) -> I64Vec3 {
    let step = 1i64 << (LEAF_LEVEL - level);
    I64Vec3::new(
        i64::from(child & 1),
        i64::from((child >> 1) & 1),
        i64::from((child >> 2) & 1),
    ) * step
}

/// Walk an octree, calling `visit` for each occupied voxel in traversal order.
///
/// `masks` must hold the arrays of levels 0 through 7; traversal starts at
/// level 0, index 0 and expects that node to exist.
///
/// # Errors
///
/// Returns [`DecodeError::CorruptOctree`] as soon as a computed index falls
/// outside its level's array. Leaves visited before the failure have
/// already been reported.
pub fn walk(
    masks: &[Vec<u32>; LEVEL_COUNT],
    base: I64Vec3,
    visit: &mut impl FnMut(Leaf),
) -> DecodeResult<()> {
    let parent = Leaf {
        position: base,
        surface_index: 0,
        surface2_index: 0,
        world_info_index: 0,
    };
    walk_node(masks, 0, 0, parent, visit)
}

fn walk_node(
    masks: &[Vec<u32>; LEVEL_COUNT],
    level: usize,
    index: usize,
    node: Leaf,
    visit: &mut impl FnMut(Leaf),
) -> DecodeResult<()> {
    let level_masks = &masks[level];
    let mask = *level_masks
        .get(index)
        .ok_or(DecodeError::CorruptOctree {
            level,
            index,
            len: level_masks.len(),
        })?;

    for child in (0..8).filter(|&i| mask >> i & 1 != 0) {
        let rank = child_index(mask, child);
        let mut next = Leaf {
            position: node.position + child_offset(child, level),
            ..node
        };
        match level {
            LEAF_LEVEL => {
                next.surface_index = rank;
                visit(next);
                continue;
            }
            SURFACE_INFO2_LEVEL => next.surface2_index = rank,
            WORLD_INFO_LEVEL => next.world_info_index = rank,
            _ => {}
        }
        walk_node(masks, level + 1, rank, next, visit)?;
    }

    Ok(())
}

/// Walk an area's octree, reporting each occupied voxel offset by `base`.
///
/// An area without a root node reports nothing.
pub fn walk_area(area: &Area, base: I64Vec3, visit: &mut impl FnMut(Leaf)) -> DecodeResult<()> {
    if area.is_empty() {
        return Ok(());
    }
    walk(&area.voxel_masks, base, visit)
}

/// Decode an area's occupied voxels, offset by `base`.
///
/// # Errors
///
/// Returns [`DecodeError::CorruptOctree`] if the octree references a mask
/// that does not exist.
pub fn decode_area(area: &Area, base: I64Vec3) -> DecodeResult<Vec<I64Vec3>> {
    let mut positions = Vec::new();
    walk_area(area, base, &mut |leaf| positions.push(leaf.position))?;
    Ok(positions)
}

/// Like [`decode_area`], but keeps each voxel's auxiliary record indices.
pub fn decode_area_leaves(area: &Area, base: I64Vec3) -> DecodeResult<Vec<Leaf>> {
    let mut leaves = Vec::new();
    walk_area(area, base, &mut |leaf| leaves.push(leaf))?;
    Ok(leaves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn area_with(masks: [Vec<u32>; LEVEL_COUNT]) -> Area {
        Area {
            voxel_masks: masks,
            ..Area::default()
        }
    }

    /// Reference rank: count set bits one at a time.
    fn naive_child_index(mask: u32, child: u32) -> usize {
        let below = (0..child).filter(|&b| mask >> b & 1 != 0).count();
        below + (mask >> 8) as usize
    }

    #[test]
    fn test_child_index_table() {
        for low in 0..=0xFFu32 {
            for base in [0u32, 1, 7, 0x00AB_CDEF] {
                let mask = (base << 8) | low;
                for child in 0..8 {
                    assert_eq!(
                        child_index(mask, child),
                        naive_child_index(mask, child),
                        "mask {mask:#x} child {child}"
                    );
                }
                assert_eq!(child_count(mask), low.count_ones());
            }
        }
    }

    #[test]
    fn test_child_index_known_masks() {
        // Children 1, 3 and 6 present, base 10.
        let mask = (10 << 8) | 0b0100_1010;
        assert_eq!(child_index(mask, 1), 10);
        assert_eq!(child_index(mask, 3), 11);
        assert_eq!(child_index(mask, 6), 12);
        assert_eq!(child_count(mask), 3);
    }

    #[test]
    fn test_child_offset() {
        assert_eq!(child_offset(0, 0), I64Vec3::ZERO);
        assert_eq!(child_offset(1, 0), I64Vec3::new(128, 0, 0));
        assert_eq!(child_offset(2, 0), I64Vec3::new(0, 128, 0));
        assert_eq!(child_offset(4, 0), I64Vec3::new(0, 0, 128));
        assert_eq!(child_offset(7, 7), I64Vec3::ONE);
        assert_eq!(child_offset(5, 6), I64Vec3::new(2, 0, 2));
    }

    #[test]
    fn test_empty_root_mask() {
        // Root exists but has no children; deeper levels are never read.
        let area = area_with([vec![0], vec![], vec![], vec![], vec![], vec![], vec![], vec![]]);
        assert!(decode_area(&area, I64Vec3::ZERO).unwrap().is_empty());
    }

    #[test]
    fn test_missing_root_is_empty() {
        let area = Area::default();
        assert!(decode_area(&area, I64Vec3::new(5, 5, 5)).unwrap().is_empty());
    }

    #[test]
    fn test_single_leaf() {
        let area = area_with(std::array::from_fn(|_| vec![0x01]));
        let base = I64Vec3::new(-3, 997, 247);
        assert_eq!(decode_area(&area, base).unwrap(), [base]);
    }

    #[test]
    fn test_single_path_offsets() {
        // Take child 7 at every level: each axis gets 128 + 64 + ... + 1 = 255.
        let area = area_with(std::array::from_fn(|_| vec![0x80]));
        assert_eq!(
            decode_area(&area, I64Vec3::ZERO).unwrap(),
            [I64Vec3::splat(255)]
        );
    }

    #[test]
    fn test_dense_last_two_levels() {
        // Levels 0-5 take child 0; level 6 has all 8 children, each of which
        // is a level-7 node with all 8 leaves. Level-7 nodes are stored
        // contiguously, so level-6 base offset is 0 and level-7 masks carry
        // no offset of their own.
        let mut masks: [Vec<u32>; LEVEL_COUNT] = std::array::from_fn(|_| vec![0x01]);
        masks[6] = vec![0xFF];
        masks[7] = vec![0xFF; 8];
        let area = area_with(masks);

        let base = I64Vec3::new(100, 200, 300);
        let positions = decode_area(&area, base).unwrap();
        assert_eq!(positions.len(), 64);

        let unique: HashSet<_> = positions.iter().copied().collect();
        let expected: HashSet<_> = (0..4)
            .flat_map(|x| (0..4).flat_map(move |y| (0..4).map(move |z| I64Vec3::new(x, y, z))))
            .map(|p| p + base)
            .collect();
        assert_eq!(unique, expected);
    }

    #[test]
    fn test_rank_addresses_packed_children() {
        // Root has children 0 and 7. Child 0's subtree sits at index 0 of
        // every level; child 7's at index 1.
        let mut masks: [Vec<u32>; LEVEL_COUNT] = std::array::from_fn(|_| Vec::new());
        masks[0] = vec![0x81];
        for level in 1..LEVEL_COUNT {
            // Node 0 takes child 0, node 1 takes child 7 and points past
            // node 0's single child.
            masks[level] = vec![0x01, (1 << 8) | 0x80];
        }
        let area = area_with(masks);

        let positions = decode_area(&area, I64Vec3::ZERO).unwrap();
        assert_eq!(
            positions,
            [I64Vec3::ZERO, I64Vec3::splat(128 + 127)]
        );
    }

    #[test]
    fn test_leaf_auxiliary_indices() {
        let mut masks: [Vec<u32>; LEVEL_COUNT] = std::array::from_fn(|_| vec![0x01]);
        // Level 5 node takes child 2 with base 4 -> world info index 4.
        masks[5] = vec![(4 << 8) | 0b100];
        masks[6] = vec![0; 4];
        // Level 6 node 4 takes children 0 and 1 with base 2.
        masks[6].push((2 << 8) | 0b11);
        masks[7] = vec![0, 0, 0b1000_0001, (5 << 8) | 0b10];
        let area = area_with(masks);

        let leaves = decode_area_leaves(&area, I64Vec3::ZERO).unwrap();
        assert_eq!(leaves.len(), 3);

        assert_eq!(leaves[0].world_info_index, 4);
        assert_eq!(leaves[0].surface2_index, 2);
        assert_eq!(leaves[0].surface_index, 0);

        assert_eq!(leaves[1].surface2_index, 2);
        assert_eq!(leaves[1].surface_index, 1);

        assert_eq!(leaves[2].surface2_index, 3);
        assert_eq!(leaves[2].surface_index, 5);
        assert_eq!(leaves[2].world_info_index, 4);

        // Level 5 child 2 moves +4 in y; level 6 child 1 moves +2 in x.
        assert_eq!(leaves[2].position, I64Vec3::new(2 + 1, 4, 0));
    }

    #[test]
    fn test_corrupt_index_is_reported() {
        let mut masks: [Vec<u32>; LEVEL_COUNT] = std::array::from_fn(|_| vec![0x01]);
        // Level 3 points at index 9 of level 4, which has one mask.
        masks[3] = vec![(9 << 8) | 0x01];
        let area = area_with(masks);
        assert_eq!(
            decode_area(&area, I64Vec3::ZERO),
            Err(DecodeError::CorruptOctree {
                level: 4,
                index: 9,
                len: 1,
            })
        );
    }

    #[test]
    fn test_truncated_leaf_level() {
        let mut masks: [Vec<u32>; LEVEL_COUNT] = std::array::from_fn(|_| vec![0x01]);
        masks[7].clear();
        let area = area_with(masks);
        assert!(matches!(
            decode_area(&area, I64Vec3::ZERO),
            Err(DecodeError::CorruptOctree { level: 7, index: 0, len: 0 })
        ));
    }

    proptest! {
        #[test]
        fn prop_child_index_matches_reference(mask in any::<u32>(), child in 0u32..8) {
            prop_assert_eq!(child_index(mask, child), naive_child_index(mask, child));
        }

        #[test]
        fn prop_full_rank_is_child_count(mask in any::<u32>()) {
            // One past the last child is the base plus the number of children.
            let last = (0..8).rev().find(|&i| mask >> i & 1 != 0);
            if let Some(last) = last {
                prop_assert_eq!(
                    child_index(mask, last) + 1,
                    (mask >> 8) as usize + child_count(mask) as usize
                );
            }
        }
    }
}
