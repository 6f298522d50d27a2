//! Zstd decompression with the game's dictionaries.
//!
//! Compressed files name their dictionary by id in the frame header. The
//! dictionaries themselves ship in a SARC archive that is itself a plain
//! zstd frame; [`DecompressContext::load`] reads it once and the context is
//! then shared by every decode.

use std::fmt;
use std::io::{self, BufRead, Read};
use std::path::Path;

use vsts_decode::SarcArchive;
use zstd::dict::DecoderDictionary;
use zstd::stream::read::Decoder;

use crate::error::{Error, Result};
use crate::layout;
use crate::source::FileSource;

/// Bytes preceding the magicless frame in a `.mc` file.
pub const MC_HEADER_SIZE: usize = 0xC;

/// The dictionaries found in the dictionary archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DictionaryKind {
    /// `zs.zsdic`, used for most files.
    Generic,
    /// `bcett.byml.zsdic`, used for placement tables.
    ArchiveTable,
    /// `pack.zsdic`, used for pack archives.
    Pack,
}

impl DictionaryKind {
    pub const ALL: [Self; 3] = [Self::Generic, Self::ArchiveTable, Self::Pack];

    /// Select the dictionary for a frame's dictionary id.
    ///
    /// Unknown ids, including 0, fall back to the generic dictionary.
    #[must_use]
    pub fn from_frame_id(id: u32) -> Self {
        match id {
            2 => Self::ArchiveTable,
            3 => Self::Pack,
            _ => Self::Generic,
        }
    }

    /// Entry name inside the dictionary archive.
    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Generic => "zs.zsdic",
            Self::ArchiveTable => "bcett.byml.zsdic",
            Self::Pack => "pack.zsdic",
        }
    }
}

/// How a file's contents are stored, judged by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// `.zs` / `.zstd`: a zstd frame, possibly using a dictionary.
    Zstd,
    /// `.mc`: a 12-byte header then a magicless zstd frame.
    Magicless,
    /// Anything else: stored as is.
    None,
}

impl Compression {
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("zs" | "zstd") => Self::Zstd,
            Some("mc") => Self::Magicless,
            _ => Self::None,
        }
    }
}

struct Dictionaries {
    generic: DecoderDictionary<'static>,
    archive_table: DecoderDictionary<'static>,
    pack: DecoderDictionary<'static>,
}

/// Decompresses romfs files.
///
/// Build one per romfs with [`Self::load`] and share it; it is immutable.
pub struct DecompressContext {
    dictionaries: Option<Dictionaries>,
}

impl fmt::Debug for DecompressContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecompressContext")
            .field("has_dictionaries", &self.dictionaries.is_some())
            .finish()
    }
}

impl DecompressContext {
    /// A context without dictionaries.
    ///
    /// Frames that name no dictionary decode normally; frames that need one
    /// fail with [`Error::MissingDictionary`].
    #[must_use]
    pub fn without_dictionaries() -> Self {
        Self { dictionaries: None }
    }

    /// Load the dictionary archive from `<romfs>/Pack/ZsDic.pack.zs`.
    pub fn load(source: &impl FileSource, romfs: &Path) -> Result<Self> {
        let path = layout::dictionary_path(romfs);
        let compressed = source.read(&path)?;
        let archive = zstd::decode_all(compressed.as_slice()).map_err(|e| Error::Decompress {
            path: path.clone(),
            message: e.to_string(),
        })?;
        Self::from_archive(&path, &archive)
    }

    /// Build a context from an already decompressed dictionary archive.
    ///
    /// `path` is only used in error messages.
    pub fn from_archive(path: &Path, archive: &[u8]) -> Result<Self> {
        let archive = SarcArchive::parse(archive).map_err(|e| Error::decode(path, e))?;
        let prepare = |kind: DictionaryKind| {
            archive
                .get(kind.file_name())
                .map(DecoderDictionary::copy)
                .ok_or(Error::MissingDictionary {
                    name: kind.file_name(),
                })
        };
        let dictionaries = Dictionaries {
            generic: prepare(DictionaryKind::Generic)?,
            archive_table: prepare(DictionaryKind::ArchiveTable)?,
            pack: prepare(DictionaryKind::Pack)?,
        };

        tracing::debug!(
            path = %path.display(),
            entries = archive.entries().len(),
            "Loaded zstd dictionaries"
        );
        Ok(Self {
            dictionaries: Some(dictionaries),
        })
    }

    /// Whether dictionaries were loaded.
    #[must_use]
    pub fn has_dictionaries(&self) -> bool {
        self.dictionaries.is_some()
    }

    fn dictionary(&self, kind: DictionaryKind) -> Option<&DecoderDictionary<'static>> {
        let dictionaries = self.dictionaries.as_ref()?;
        Some(match kind {
            DictionaryKind::Generic => &dictionaries.generic,
            DictionaryKind::ArchiveTable => &dictionaries.archive_table,
            DictionaryKind::Pack => &dictionaries.pack,
        })
    }

    /// Decompress the contents of the file at `path`.
    ///
    /// The extension picks the container (see [`Compression`]); for zstd
    /// frames the dictionary id in the frame header picks the dictionary.
    pub fn decompress(&self, path: &Path, data: &[u8]) -> Result<Vec<u8>> {
        let decoded = match Compression::from_path(path) {
            Compression::None => return Ok(data.to_vec()),
            Compression::Magicless => {
                let frame = data.get(MC_HEADER_SIZE..).ok_or_else(|| Error::Decompress {
                    path: path.to_path_buf(),
                    message: format!(
                        "file of {} bytes is shorter than its {MC_HEADER_SIZE}-byte header",
                        data.len()
                    ),
                })?;
                decode_frame(frame, None, false)
            }
            Compression::Zstd => {
                let id = frame_dictionary_id(data);
                let kind = DictionaryKind::from_frame_id(id);
                match self.dictionary(kind) {
                    Some(dictionary) => decode_frame(data, Some(dictionary), true),
                    None if id == 0 => decode_frame(data, None, true),
                    None => {
                        return Err(Error::MissingDictionary {
                            name: kind.file_name(),
                        });
                    }
                }
            }
        };

        decoded.map_err(|e| Error::Decompress {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Dictionary id stored in a frame header, or 0 if it names none.
#[must_use]
pub fn frame_dictionary_id(data: &[u8]) -> u32 {
    zstd::zstd_safe::get_dict_id_from_frame(data).map_or(0, |id| id.get())
}

fn decode_frame(
    data: &[u8],
    dictionary: Option<&DecoderDictionary<'_>>,
    with_magic: bool,
) -> io::Result<Vec<u8>> {
    match dictionary {
        Some(dictionary) => {
            read_frame(Decoder::with_prepared_dictionary(data, dictionary)?, with_magic)
        }
        None => read_frame(Decoder::with_buffer(data)?, with_magic),
    }
}

fn read_frame<R: BufRead>(mut decoder: Decoder<'_, R>, with_magic: bool) -> io::Result<Vec<u8>> {
    if !with_magic {
        decoder.include_magicbytes(false)?;
    }
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}
