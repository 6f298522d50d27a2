//! Where VSTS files live inside a romfs dump.
//!
//! ```text
//! <romfs>/Pack/ZsDic.pack.zs
//! <romfs>/VolumeStats/<world>/context.vsts.zs
//! <romfs>/VolumeStats/<world>/X{x}_Z{z}.vsts.zs
//! <romfs>/VolumeStats/<world>/<flag>/X{x}_Z{z}.vsts.zs
//! ```

use std::path::{Path, PathBuf};

/// Name of the world that ships without a context file.
pub const MAIN_FIELD: &str = "MainField";

/// Dictionary archive path, relative to the romfs root.
pub const DICTIONARY_ARCHIVE: &str = "Pack/ZsDic.pack.zs";

const VOLUME_STATS_DIR: &str = "VolumeStats";
const CONTEXT_FILE: &str = "context.vsts.zs";

/// Whether `world` uses the built-in `MainField` geometry.
///
/// An empty name is treated as `MainField`.
#[must_use]
pub fn is_main_field(world: &str) -> bool {
    world.is_empty() || world == MAIN_FIELD
}

/// File name of the unit at grid cell `(x, z)`.
#[must_use]
pub fn unit_file_name(x: i32, z: i32) -> String {
    format!("X{x}_Z{z}.vsts.zs")
}

/// Path of the dictionary archive under `romfs`.
#[must_use]
pub fn dictionary_path(romfs: &Path) -> PathBuf {
    romfs.join(DICTIONARY_ARCHIVE)
}

/// Paths of one world's files under a romfs root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldLayout {
    dir: PathBuf,
}

impl WorldLayout {
    #[must_use]
    pub fn new(romfs: &Path, world: &str) -> Self {
        let world = if world.is_empty() { MAIN_FIELD } else { world };
        Self {
            dir: romfs.join(VOLUME_STATS_DIR).join(world),
        }
    }

    /// The world's directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn context_path(&self) -> PathBuf {
        self.dir.join(CONTEXT_FILE)
    }

    /// Path of the unit at `(x, z)`, inside the override folder `flag` if given.
    #[must_use]
    pub fn unit_path(&self, flag: Option<&str>, x: i32, z: i32) -> PathBuf {
        let dir = match flag {
            Some(flag) => self.dir.join(flag),
            None => self.dir.clone(),
        };
        dir.join(unit_file_name(x, z))
    }

    /// Candidate paths for a unit in lookup order: each flag's override
    /// folder in turn, then the world directory itself.
    pub fn unit_candidates<'a, S: AsRef<str>>(
        &'a self,
        flags: &'a [S],
        x: i32,
        z: i32,
    ) -> impl Iterator<Item = PathBuf> + 'a {
        flags
            .iter()
            .map(move |flag| self.unit_path(Some(flag.as_ref()), x, z))
            .chain(std::iter::once_with(move || self.unit_path(None, x, z)))
    }
}
