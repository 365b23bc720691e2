//! # Record Codec
//!
//! Binary form of a `CachedChunkRecord`.
//!
//! ## Format
//!
//! ```text
//! [4 bytes: magic "SCHK"]
//! [4 bytes: format version]
//! [8 bytes: timestamp, ms since the Unix epoch]
//! [2 bytes: key length]
//! [N bytes: key, "{cx},{cz},{worldType},{version}"]
//! [4 bytes: CRC32 of body]
//! [8 bytes: body length]
//! [M bytes: body, LZ4 block with prepended size]
//!
//! Body (uncompressed), one section per array:
//! [4 bytes: element count][count * size_of::<T>() bytes]
//! ```
//!
//! Header integers are little-endian. Array payloads are cast with
//! `bytemuck` and so use host byte order, which is little-endian on every
//! target STRATA ships for.
//!
//! Sections in order: density, material, the nine terrain channels, the four
//! water channels, a one-byte placement flag and, if set, the four placement
//! arrays.

use std::io::Read;

use bytemuck::Pod;
use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use strata_meshing::{MeshBuffers, TerrainMesh, WaterMesh};
use strata_procedural::{PlacementBuffers, VoxelGrid};

use crate::error::{CacheError, CacheResult};
use crate::key::ChunkKey;
use crate::record::CachedChunkRecord;

/// Magic bytes identifying a chunk record.
const RECORD_MAGIC: &[u8; 4] = b"SCHK";

/// Current record format version.
const FORMAT_VERSION: u32 = 1;

/// Fixed-size prefix of the header before the key.
const HEADER_PREFIX: usize = 4 + 4 + 8 + 2;

/// Header fields readable without touching the body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryHeader {
    /// Key the record was written under.
    pub key: ChunkKey,
    /// Write time in milliseconds since the Unix epoch.
    pub timestamp: u64,
}

/// Encodes a record.
///
/// # Errors
///
/// `InvalidKey` if the key's textual form does not fit the header.
pub fn encode(record: &CachedChunkRecord) -> CacheResult<Vec<u8>> {
    let key = record.key.to_string();
    let key_len = u16::try_from(key.len()).map_err(|_| CacheError::InvalidKey(key.clone()))?;

    let body = compress_prepend_size(&encode_body(record));
    let crc = crc32fast::hash(&body);

    let mut out = Vec::with_capacity(HEADER_PREFIX + key.len() + 12 + body.len());
    out.extend_from_slice(RECORD_MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&record.timestamp.to_le_bytes());
    out.extend_from_slice(&key_len.to_le_bytes());
    out.extend_from_slice(key.as_bytes());
    out.extend_from_slice(&crc.to_le_bytes());
    out.extend_from_slice(&(body.len() as u64).to_le_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

/// Reads and validates the header, leaving `reader` at the CRC field.
///
/// # Errors
///
/// `Corrupted` on a foreign or truncated header, `Io` if reading fails.
pub fn read_header(reader: &mut impl Read) -> CacheResult<EntryHeader> {
    let magic: [u8; 4] = read_array(reader)?;
    if &magic != RECORD_MAGIC {
        return Err(CacheError::Corrupted("bad magic".into()));
    }

    let version = u32::from_le_bytes(read_array(reader)?);
    if version != FORMAT_VERSION {
        return Err(CacheError::Corrupted(format!("unsupported format version {version}")));
    }

    let timestamp = u64::from_le_bytes(read_array(reader)?);
    let key_len = u16::from_le_bytes(read_array(reader)?) as usize;

    let mut key = vec![0u8; key_len];
    read_exact(reader, &mut key)?;
    let key = String::from_utf8(key).map_err(|_| CacheError::Corrupted("key is not UTF-8".into()))?;
    let key = key
        .parse()
        .map_err(|_| CacheError::Corrupted(format!("unparseable key {key:?}")))?;

    Ok(EntryHeader { key, timestamp })
}

/// Decodes a record, checking its integrity.
///
/// # Errors
///
/// `Corrupted` if any check fails.
pub fn decode(bytes: &[u8]) -> CacheResult<CachedChunkRecord> {
    let mut reader = bytes;
    let header = read_header(&mut reader)?;

    let crc = u32::from_le_bytes(read_array(&mut reader)?);
    let body_len = u64::from_le_bytes(read_array(&mut reader)?);
    if body_len != reader.len() as u64 {
        return Err(CacheError::Corrupted(format!(
            "body length {body_len} but {} bytes follow",
            reader.len()
        )));
    }
    if crc32fast::hash(reader) != crc {
        return Err(CacheError::Corrupted("checksum mismatch".into()));
    }

    let body = decompress_size_prepended(reader)
        .map_err(|e| CacheError::Corrupted(format!("decompression failed: {e}")))?;
    decode_body(header, &body)
}

/// Decodes a record and checks it was stored under `expected`.
///
/// # Errors
///
/// `KeyMismatch` if the embedded key differs, otherwise as `decode`.
pub fn decode_for(expected: &ChunkKey, bytes: &[u8]) -> CacheResult<CachedChunkRecord> {
    let record = decode(bytes)?;
    if &record.key != expected {
        return Err(CacheError::KeyMismatch {
            expected: expected.to_string(),
            found: record.key.to_string(),
        });
    }
    Ok(record)
}

fn encode_body(record: &CachedChunkRecord) -> Vec<u8> {
    let mut w = SectionWriter::default();
    w.array(record.grid.density());
    w.array(record.grid.material());

    let terrain = &record.mesh.terrain;
    w.array(&terrain.positions);
    w.array(&terrain.indices);
    w.array(&terrain.normals);
    w.array(&terrain.material_ids);
    w.array(&terrain.material_weights);
    w.array(&terrain.wetness);
    w.array(&terrain.mossiness);
    w.array(&terrain.cavity);
    w.array(&terrain.occlusion);

    let water = &record.mesh.water;
    w.array(&water.positions);
    w.array(&water.indices);
    w.array(&water.normals);
    w.array(&water.shore);

    match &record.placements {
        Some(p) => {
            w.buf.push(1);
            w.array(&p.flora);
            w.array(&p.trees);
            w.array(&p.rocks);
            w.array(&p.hotspots);
        }
        None => w.buf.push(0),
    }
    w.buf
}

fn decode_body(header: EntryHeader, body: &[u8]) -> CacheResult<CachedChunkRecord> {
    let mut r = SectionReader { data: body };

    let density = r.array()?;
    let material = r.array()?;
    let grid = VoxelGrid::from_raw(header.key.coord(), density, material)
        .ok_or_else(|| CacheError::Corrupted("grid buffers have the wrong length".into()))?;

    let terrain = TerrainMesh {
        positions: r.array()?,
        indices: r.array()?,
        normals: r.array()?,
        material_ids: r.array()?,
        material_weights: r.array()?,
        wetness: r.array()?,
        mossiness: r.array()?,
        cavity: r.array()?,
        occlusion: r.array()?,
    };
    let water = WaterMesh {
        positions: r.array()?,
        indices: r.array()?,
        normals: r.array()?,
        shore: r.array()?,
    };
    let mesh = MeshBuffers { terrain, water };
    if !mesh.is_consistent() {
        return Err(CacheError::Corrupted("mesh channels disagree".into()));
    }

    let placements = match r.byte()? {
        0 => None,
        1 => Some(PlacementBuffers {
            flora: r.array()?,
            trees: r.array()?,
            rocks: r.array()?,
            hotspots: r.array()?,
        }),
        flag => return Err(CacheError::Corrupted(format!("bad placement flag {flag}"))),
    };

    if !r.data.is_empty() {
        return Err(CacheError::Corrupted(format!("{} trailing bytes", r.data.len())));
    }

    Ok(CachedChunkRecord {
        key: header.key,
        grid,
        mesh,
        placements,
        timestamp: header.timestamp,
    })
}

#[derive(Default)]
struct SectionWriter {
    buf: Vec<u8>,
}

impl SectionWriter {
    fn array<T: Pod>(&mut self, values: &[T]) {
        self.buf.extend_from_slice(&(values.len() as u32).to_le_bytes());
        self.buf.extend_from_slice(bytemuck::cast_slice(values));
    }
}

struct SectionReader<'a> {
    data: &'a [u8],
}

impl<'a> SectionReader<'a> {
    fn take(&mut self, len: usize) -> CacheResult<&'a [u8]> {
        if self.data.len() < len {
            return Err(CacheError::Corrupted("truncated body".into()));
        }
        let (head, tail) = self.data.split_at(len);
        self.data = tail;
        Ok(head)
    }

    fn byte(&mut self) -> CacheResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn array<T: Pod>(&mut self) -> CacheResult<Vec<T>> {
        let mut count = [0u8; 4];
        count.copy_from_slice(self.take(4)?);
        let count = u32::from_le_bytes(count) as usize;
        let len = count
            .checked_mul(std::mem::size_of::<T>())
            .ok_or_else(|| CacheError::Corrupted("section length overflows".into()))?;
        let bytes = self.take(len)?;

        // Copy instead of casting in place: the body has no alignment guarantee
        let mut values = vec![T::zeroed(); count];
        bytemuck::cast_slice_mut::<T, u8>(&mut values).copy_from_slice(bytes);
        Ok(values)
    }
}

fn read_array<const N: usize>(reader: &mut impl Read) -> CacheResult<[u8; N]> {
    let mut buf = [0u8; N];
    read_exact(reader, &mut buf)?;
    Ok(buf)
}

fn read_exact(reader: &mut impl Read, buf: &mut [u8]) -> CacheResult<()> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            CacheError::Corrupted("truncated header".into())
        } else {
            CacheError::Io(e)
        }
    })
}
