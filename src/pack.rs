//! Storage policy and the `.lz` and `.snd` containers built on it.
//!
//! A payload is only stored compressed when compression makes it strictly
//! smaller; otherwise the original bytes are stored as is. Readers tell the two
//! apart by comparing the stored size with the original size.

use crate::{
    decode::{decompress, Decoder},
    encode::compress,
    errors::LzError,
    format::{AssetHeader, FourCc, SoundHeader},
};
use bitstream_io::{BigEndian, BitReader};
use log::debug;
use std::io::{Cursor, Write};

/// The bytes chosen to be written for some data, compressed or not
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPayload {
    pub bytes: Vec<u8>,
    pub original_size: usize,
}

impl StoredPayload {
    #[inline]
    pub fn is_compressed(&self) -> bool {
        self.bytes.len() < self.original_size
    }

    /// Get back the data that was stored
    pub fn restore(&self) -> Result<Vec<u8>, LzError> {
        restore(&self.bytes, self.original_size)
    }
}

fn restore(stored: &[u8], original_size: usize) -> Result<Vec<u8>, LzError> {
    if stored.len() < original_size {
        decompress(stored, original_size)
    } else {
        Ok(stored.to_vec())
    }
}

/// Compress `data`, falling back to the raw bytes if that doesn't save space
pub fn store(data: &[u8]) -> StoredPayload {
    let compressed = compress(data);

    let bytes = if compressed.len() < data.len() {
        compressed
    } else {
        data.to_vec()
    };

    StoredPayload {
        bytes,
        original_size: data.len(),
    }
}

/// Build a complete `.lz` file for `data`.
///
/// The asset header has no room to mark raw data, so `.lz` payloads are
/// always compressed.
pub fn pack_asset(file_type: FourCc, data: &[u8]) -> Result<Vec<u8>, LzError> {
    let header = AssetHeader::new(file_type, data.len() as u64)?;
    let compressed = compress(data);

    let mut out = Vec::with_capacity(AssetHeader::SIZE + compressed.len());
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(&compressed);

    Ok(out)
}

/// Read an `.lz` file into its header and decompressed data
pub fn unpack_asset(bytes: &[u8]) -> Result<(AssetHeader, Vec<u8>), LzError> {
    let mut decoder = Decoder::for_bytes(bytes);
    let header = decoder.header()?;
    let data = decoder.decode()?;

    Ok((header, data))
}

/// One track of an `.snd` sound bank: its header and the stored payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundTrack {
    pub header: SoundHeader,
    pub payload: Vec<u8>,
}

impl SoundTrack {
    /// Store `data` as a track, compressing it if that makes it smaller
    pub fn new(bit_depth: u64, sample_rate: u64, data: &[u8]) -> Result<Self, LzError> {
        let StoredPayload {
            bytes,
            original_size,
        } = store(data);
        let header = SoundHeader::new(
            bit_depth,
            sample_rate,
            bytes.len() as u64,
            original_size as u64,
        )?;

        Ok(Self {
            header,
            payload: bytes,
        })
    }

    #[inline]
    pub fn is_compressed(&self) -> bool {
        self.header.is_compressed()
    }

    /// The decompressed sample data
    pub fn data(&self) -> Result<Vec<u8>, LzError> {
        restore(&self.payload, self.header.original_size as usize)
    }
}

/// Where a track's header says its payload is inside an `.snd` file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackEntry {
    pub header: SoundHeader,
    /// position of the payload's first byte in the file
    pub offset: usize,
}

/// Walk the headers of an `.snd` file.
///
/// There is no index, so each header's stored size gives the position of the next one.
pub fn track_table(bytes: &[u8]) -> Result<Vec<TrackEntry>, LzError> {
    let mut entries = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let remaining = bytes.len() - pos;
        if remaining < SoundHeader::SIZE {
            return Err(LzError::InvalidContainer(format!(
                "{} trailing bytes at {:#x} are too short for a track header",
                remaining, pos
            )));
        }

        let mut rdr = BitReader::endian(Cursor::new(&bytes[pos..]), BigEndian);
        let header = SoundHeader::from_bitreader(&mut rdr)?;
        let offset = pos + SoundHeader::SIZE;
        let stored = header.stored_size as usize;

        if header.stored_size > header.original_size {
            return Err(LzError::InvalidContainer(format!(
                "track {} stores {} bytes for {} bytes of data",
                entries.len(),
                header.stored_size,
                header.original_size
            )));
        }
        if stored > bytes.len() - offset {
            return Err(LzError::InvalidContainer(format!(
                "track {} payload of {} bytes at {:#x} runs past the end of the file",
                entries.len(),
                stored,
                offset
            )));
        }

        entries.push(TrackEntry { header, offset });
        pos = offset + stored;
    }

    Ok(entries)
}

/// An `.snd` sound bank: tracks concatenated in order, with no outer header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoundContainer {
    tracks: Vec<SoundTrack>,
}

impl SoundContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, track: SoundTrack) {
        debug!(
            "track {}: {} -> {} bytes{}",
            self.tracks.len(),
            track.header.original_size,
            track.header.stored_size,
            if track.is_compressed() { "" } else { " (raw)" }
        );
        self.tracks.push(track);
    }

    pub fn tracks(&self) -> &[SoundTrack] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Parse every track of an `.snd` file
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LzError> {
        let tracks = track_table(bytes)?
            .into_iter()
            .map(|TrackEntry { header, offset }| SoundTrack {
                header,
                payload: bytes[offset..offset + header.stored_size as usize].to_vec(),
            })
            .collect();

        Ok(Self { tracks })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let size = self
            .tracks
            .iter()
            .map(|t| SoundHeader::SIZE + t.payload.len())
            .sum();
        let mut out = Vec::with_capacity(size);

        for track in &self.tracks {
            out.extend_from_slice(&track.header.to_bytes());
            out.extend_from_slice(&track.payload);
        }

        out
    }

    pub fn write_to<W: Write>(&self, mut wtr: W) -> Result<(), LzError> {
        wtr.write_all(&self.to_bytes())?;
        wtr.flush().map_err(Into::into)
    }
}
