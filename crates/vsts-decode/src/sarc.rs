//! SARC archive reading.
//!
//! Only what is needed to pull named files out of an archive: the header,
//! the file allocation table (SFAT) and the name table (SFNT).

use crate::error::{DecodeError, DecodeResult};
use crate::reader::{ByteReader, Endian};

const SARC_MAGIC: &[u8; 4] = b"SARC";
const SFAT_MAGIC: &[u8; 4] = b"SFAT";
const SFNT_MAGIC: &[u8; 4] = b"SFNT";

/// Size of one SFAT node in bytes.
const NODE_SIZE: usize = 16;

/// Top-byte flag in a node's attributes marking a named entry.
const HAS_NAME: u32 = 0x0100_0000;

/// One file stored in an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SarcEntry<'a> {
    /// Entry name, if the archive stores one.
    pub name: Option<&'a str>,
    pub name_hash: u32,
    pub data: &'a [u8],
}

/// A parsed SARC archive borrowing from its buffer.
#[derive(Debug, Clone)]
pub struct SarcArchive<'a> {
    endian: Endian,
    entries: Vec<SarcEntry<'a>>,
}

impl<'a> SarcArchive<'a> {
    /// Parse an uncompressed archive.
    ///
    /// # Format
    ///
    /// - `"SARC"`, header size (u16), byte-order mark (`FE FF` big-endian,
    ///   `FF FE` little-endian), file size (u32), data offset (u32),
    ///   version (u16), reserved (u16)
    /// - `"SFAT"`, header size (u16), node count (u16), hash key (u32)
    /// - node count × (name hash, attributes, data start, data end), all u32
    /// - `"SFNT"`, header size (u16), reserved (u16), then the names
    ///
    /// Named nodes store the name's offset into the name table, divided by
    /// four, in the low 24 bits of their attributes.
    pub fn parse(data: &'a [u8]) -> DecodeResult<Self> {
        let mut reader = ByteReader::new(data);
        reader.expect_magic(SARC_MAGIC)?;
        let header_size = reader.read_u16()?;

        let endian = match reader.read_array::<2>()? {
            [0xFE, 0xFF] => Endian::Big,
            [0xFF, 0xFE] => Endian::Little,
            other => {
                return Err(DecodeError::InvalidArchive {
                    context: "sarc header",
                    detail: format!("invalid byte-order mark {other:02x?}"),
                });
            }
        };
        reader.set_endian(endian);
        // The header size was read before the byte order was known.
        let header_size = match endian {
            Endian::Little => header_size,
            Endian::Big => header_size.swap_bytes(),
        };

        let _file_size = reader.read_u32()?;
        let data_offset = reader.read_u32()? as usize;
        let _version = reader.read_u16()?;
        let sfat_start = usize::from(header_size);
        reader.seek(sfat_start)?;

        reader.expect_magic(SFAT_MAGIC)?;
        let sfat_header_size = reader.read_u16()?;
        let node_count = usize::from(reader.read_u16()?);
        let _hash_key = reader.read_u32()?;
        let nodes_start = sfat_start + usize::from(sfat_header_size);
        reader.seek(nodes_start)?;

        let mut nodes = Vec::with_capacity(node_count);
        for _ in 0..node_count {
            let name_hash = reader.read_u32()?;
            let attributes = reader.read_u32()?;
            let start = reader.read_u32()? as usize;
            let end = reader.read_u32()? as usize;
            nodes.push((name_hash, attributes, start, end));
        }

        let sfnt_start = nodes_start + node_count * NODE_SIZE;
        reader.seek(sfnt_start)?;
        reader.expect_magic(SFNT_MAGIC)?;
        let sfnt_header_size = reader.read_u16()?;
        let names_start = sfnt_start + usize::from(sfnt_header_size);

        let entries = nodes
            .into_iter()
            .map(|(name_hash, attributes, start, end)| -> DecodeResult<SarcEntry<'a>> {
                let name = if attributes & HAS_NAME != 0 {
                    let offset = names_start + (attributes & 0x00FF_FFFF) as usize * 4;
                    Some(reader.read_string_at(offset)?)
                } else {
                    None
                };
                let file = data
                    .get(data_offset + start..data_offset + end)
                    .filter(|_| start <= end)
                    .ok_or_else(|| DecodeError::InvalidArchive {
                        context: "sfat node",
                        detail: format!(
                            "data range {start:#x}..{end:#x} outside archive of {} bytes",
                            data.len()
                        ),
                    })?;
                Ok(SarcEntry {
                    name,
                    name_hash,
                    data: file,
                })
            })
            .collect::<DecodeResult<_>>()?;

        Ok(Self { endian, entries })
    }

    /// Byte order the archive was written in.
    #[must_use]
    pub fn endian(&self) -> Endian {
        self.endian
    }

    #[must_use]
    pub fn entries(&self) -> &[SarcEntry<'a>] {
        &self.entries
    }

    /// Look up an entry's data by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&'a [u8]> {
        self.entries
            .iter()
            .find(|entry| entry.name == Some(name))
            .map(|entry| entry.data)
    }
}
