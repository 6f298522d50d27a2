//! Decoding whole worlds unit by unit.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use glam::I64Vec3;
use rayon::prelude::*;
use vsts_decode::{GeometryConfig, Unit, walk_area};

use crate::decompress::DecompressContext;
use crate::error::{Error, Result};
use crate::layout::{self, WorldLayout};
use crate::source::FileSource;

/// Override folders used for `MainField` by default.
///
/// Some `MainField` units are replaced once story flags are set; the
/// replacements live in folders named after the flag.
pub const MAIN_FIELD_FLAGS: [&str; 3] = [
    "SageOfGerudo_IsAfter_DungeonBossDead_Exp",
    "SageOfGerudo_IsAfter_DungeonFind_Exp",
    "SageOfSoul_HiddenStairsAppear",
];

/// What to do when a unit fails to decode during a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMode {
    /// Stop the scan at the first failing unit.
    #[default]
    Strict,
    /// Log the failure, skip the unit and keep going.
    Lenient,
}

/// Options for reading a world.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorldOptions {
    /// Override folders to look in before the world directory, in order.
    pub flags: Vec<String>,
    pub scan_mode: ScanMode,
}

impl WorldOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Default options for `world`: `MainField` gets [`MAIN_FIELD_FLAGS`].
    #[must_use]
    pub fn for_world(world: &str) -> Self {
        if layout::is_main_field(world) {
            Self::new().with_flags(MAIN_FIELD_FLAGS)
        } else {
            Self::new()
        }
    }

    /// Replace the override flags.
    #[must_use]
    pub fn with_flags<I>(mut self, flags: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.flags = flags.into_iter().map(Into::into).collect();
        self
    }

    /// Append one override flag.
    #[must_use]
    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.push(flag.into());
        self
    }

    #[must_use]
    pub fn with_scan_mode(mut self, scan_mode: ScanMode) -> Self {
        self.scan_mode = scan_mode;
        self
    }
}

/// The decoded voxels of one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitVoxels {
    pub x: i32,
    pub z: i32,
    /// The file the unit was read from.
    pub path: PathBuf,
    /// Voxel positions in decode order.
    pub positions: Vec<I64Vec3>,
}

/// Totals from [`World::for_each_unit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanSummary {
    /// Units decoded and visited.
    pub units: usize,
    /// Units skipped in lenient mode.
    pub skipped: usize,
    /// Voxels across all visited units.
    pub voxels: usize,
}

/// One world of a romfs dump, ready to decode.
#[derive(Debug)]
pub struct World<S> {
    source: S,
    name: String,
    layout: WorldLayout,
    geometry: GeometryConfig,
    decompress: DecompressContext,
    options: WorldOptions,
}

impl<S: FileSource> World<S> {
    /// Open `name` under `romfs`, loading the dictionary archive first.
    pub fn open(source: S, romfs: &Path, name: &str, options: WorldOptions) -> Result<Self> {
        let decompress = DecompressContext::load(&source, romfs)?;
        Self::with_decompress(source, romfs, name, decompress, options)
    }

    /// Open `name` with an existing decompression context.
    ///
    /// `MainField` (or an empty name) uses [`GeometryConfig::MAIN_FIELD`];
    /// every other world reads its `context.vsts.zs`.
    pub fn with_decompress(
        source: S,
        romfs: &Path,
        name: &str,
        decompress: DecompressContext,
        options: WorldOptions,
    ) -> Result<Self> {
        let layout = WorldLayout::new(romfs, name);

        let (geometry, origin) = if layout::is_main_field(name) {
            (GeometryConfig::MAIN_FIELD, layout.dir().to_path_buf())
        } else {
            let path = layout.context_path();
            let data = decompress.decompress(&path, &source.read(&path)?)?;
            let geometry = GeometryConfig::parse(&data).map_err(|e| Error::decode(&path, e))?;
            (geometry, path)
        };
        geometry
            .areas_per_unit()
            .map_err(|e| Error::decode(&origin, e))?;

        if !geometry.is_octree_aligned() {
            tracing::warn!(
                world = name,
                sidelength = geometry.area_sidelength,
                margin = %geometry.area_margin,
                "Area size plus margins does not span the octree; positions may be offset"
            );
        }
        tracing::debug!(world = name, geometry = ?geometry, "Opened world");

        Ok(Self {
            source,
            name: name.to_owned(),
            layout,
            geometry,
            decompress,
            options,
        })
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn geometry(&self) -> &GeometryConfig {
        &self.geometry
    }

    #[must_use]
    pub fn options(&self) -> &WorldOptions {
        &self.options
    }

    #[must_use]
    pub fn layout(&self) -> &WorldLayout {
        &self.layout
    }

    /// Grid cells in scan order: x outer, z inner. The y dimension is not
    /// iterated.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + use<S> {
        let grid = self.geometry.grid_dimensions;
        (0..grid.x).flat_map(move |x| (0..grid.z).map(move |z| (x, z)))
    }

    /// Path of the unit at `(x, z)`: the first override folder holding the
    /// unit, or the world directory.
    #[must_use]
    pub fn resolve_unit_path(&self, x: i32, z: i32) -> PathBuf {
        self.layout
            .unit_candidates(&self.options.flags, x, z)
            .find(|path| self.source.exists(path))
            .unwrap_or_else(|| self.layout.unit_path(None, x, z))
    }

    /// Decode the unit at `(x, z)` in world coordinates.
    pub fn decode_unit(&self, x: i32, z: i32) -> Result<UnitVoxels> {
        let path = self.resolve_unit_path(x, z);
        tracing::debug!(x, z, path = %path.display(), "Decoding unit");

        let base = self.geometry.unit_world_base(x, z);
        let positions = self
            .decode_unit_file(&path, base)
            .map_err(|e| e.in_unit(x, z))?;
        Ok(UnitVoxels {
            x,
            z,
            path,
            positions,
        })
    }

    /// Decode one unit relative to its own corner.
    ///
    /// The unit is placed at `(0, world_base.y, 0)`. With `flag`, the unit is
    /// read from that override folder only.
    pub fn decode_unit_local(&self, x: i32, z: i32, flag: Option<&str>) -> Result<UnitVoxels> {
        let path = self.layout.unit_path(flag, x, z);
        tracing::debug!(x, z, path = %path.display(), "Decoding unit at local origin");

        let base = I64Vec3::new(0, i64::from(self.geometry.world_base.y), 0);
        let positions = self
            .decode_unit_file(&path, base)
            .map_err(|e| e.in_unit(x, z))?;
        Ok(UnitVoxels {
            x,
            z,
            path,
            positions,
        })
    }

    /// Read, decompress and decode one unit file placed at `unit_base`.
    pub fn decode_unit_file(&self, path: &Path, unit_base: I64Vec3) -> Result<Vec<I64Vec3>> {
        let compressed = self.source.read(path)?;
        let data = self.decompress.decompress(path, &compressed)?;
        let unit = Unit::parse(&data, &self.geometry).map_err(|e| Error::decode(path, e))?;

        let mut positions = Vec::new();
        for area in &unit.areas {
            let base = self.geometry.area_base(unit_base, area.grid_pos);
            walk_area(area, base, &mut |leaf| positions.push(leaf.position))
                .map_err(|e| Error::decode(path, e))?;
        }
        Ok(positions)
    }

    /// Decode every unit of the grid, in parallel.
    ///
    /// Results come back in [`Self::cells`] order. In strict mode the first
    /// failing unit in that order is returned as the error. This keeps the
    /// whole world in memory; prefer [`Self::for_each_unit_in_order`] for
    /// large worlds.
    pub fn decode_all(&self) -> Result<Vec<UnitVoxels>> {
        let mut units = Vec::new();
        self.for_each_unit_in_order(|unit| {
            units.push(unit);
            Ok(())
        })?;
        Ok(units)
    }

    /// Decode units in parallel batches and hand them to `visit` in
    /// [`Self::cells`] order.
    ///
    /// At most one batch (one unit per rayon thread) is held in memory. In
    /// strict mode the first failing unit in grid order stops the scan and
    /// no further batches are decoded. Errors from `visit` always stop it.
    pub fn for_each_unit_in_order<F>(&self, mut visit: F) -> Result<ScanSummary>
    where
        F: FnMut(UnitVoxels) -> Result<()>,
    {
        let cells: Vec<_> = self.cells().collect();
        let batch_size = rayon::current_num_threads().max(1);
        let mut summary = ScanSummary::default();

        for batch in cells.chunks(batch_size) {
            let results: Vec<_> = batch
                .par_iter()
                .map(|&(x, z)| self.decode_unit(x, z))
                .collect();
            for result in results {
                match result {
                    Ok(unit) => {
                        summary.units += 1;
                        summary.voxels += unit.positions.len();
                        visit(unit)?;
                    }
                    Err(e) => {
                        self.skip_or_fail(e)?;
                        summary.skipped += 1;
                    }
                }
            }
        }

        tracing::info!(
            world = %self.name,
            units = summary.units,
            skipped = summary.skipped,
            voxels = summary.voxels,
            "Decoded world"
        );
        Ok(summary)
    }

    /// Decode every unit in parallel and hand each to `visit` as soon as it
    /// is ready, without keeping the whole world in memory.
    ///
    /// Units are visited in no particular order. Errors from `visit` always
    /// stop the scan; decode errors stop it only in strict mode.
    pub fn for_each_unit<F>(&self, visit: F) -> Result<ScanSummary>
    where
        F: Fn(UnitVoxels) -> Result<()> + Sync,
    {
        let units = AtomicUsize::new(0);
        let skipped = AtomicUsize::new(0);
        let voxels = AtomicUsize::new(0);

        let cells: Vec<_> = self.cells().collect();
        cells.par_iter().try_for_each(|&(x, z)| -> Result<()> {
            let unit = match self.decode_unit(x, z) {
                Ok(unit) => unit,
                Err(e) => {
                    self.skip_or_fail(e)?;
                    skipped.fetch_add(1, Ordering::Relaxed);
                    return Ok(());
                }
            };
            voxels.fetch_add(unit.positions.len(), Ordering::Relaxed);
            visit(unit)?;
            units.fetch_add(1, Ordering::Relaxed);
            Ok(())
        })?;

        let summary = ScanSummary {
            units: units.into_inner(),
            skipped: skipped.into_inner(),
            voxels: voxels.into_inner(),
        };
        tracing::info!(
            world = %self.name,
            units = summary.units,
            skipped = summary.skipped,
            voxels = summary.voxels,
            "Decoded world"
        );
        Ok(summary)
    }

    fn skip_or_fail(&self, error: Error) -> Result<()> {
        match self.options.scan_mode {
            ScanMode::Strict => Err(error),
            ScanMode::Lenient => {
                tracing::warn!(error = %error, "Skipping unit");
                Ok(())
            }
        }
    }
}
