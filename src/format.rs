//! Information and structures for LZSS streams and the `.lz` and `.snd` containers.
//!
//! ## LZSS Stream
//! A compressed stream is a series of flag groups. Each group starts with a flag
//! byte whose bits, most significant first, describe the next eight tokens:
//! a `1` is an uncoded literal byte, a `0` is a two byte back-reference.
//! The final group may hold fewer than eight tokens; its unused low bits are zero.
//!
//! A back-reference is a big endian 16 bit record:
//!
//! | Bits  | Description |
//! | :---: | ----------- |
//! | 15..4 | `offset - 1` (distance back into the output, 1..=4096) |
//! | 3..0  | `length - 3` (bytes to copy, 3..=18) |
//!
//! The stream does not record its own length, so the decompressed size has to
//! come from somewhere else, usually one of the headers below.
//!
//! For example, "ABCABCABCD" is compressed to:
//! ```text
//! E8       <- flag byte: 1 1 1 0 1 0 0 0 (literal x3, match, literal)
//! 41 42 43 <- uncoded 'A' 'B' 'C'
//! 00 23    <- offset 3 (encoded 2), length 6 (encoded 3)
//! 44       <- uncoded 'D'
//! ```
//!
//! ## Asset Header
//! An `.lz` file is a twenty byte [`AssetHeader`] followed by the compressed stream.
//!
//! | Byte Num | Description |
//! | :------: | ----------- |
//! | 0..4     | magic bytes ("LZSS") |
//! | 4..8     | version ("v1.0") |
//! | 8..12    | file type FOURCC from the asset's extension (".PCM", ".BIN") |
//! | 12..16   | size in big endian bytes of decompressed data |
//! | 16..20   | reserved, always `0xFFFFFFFF` |
//!
//! ## Sound Header
//! An `.snd` file is a sequence of tracks, each a twelve byte [`SoundHeader`]
//! followed by `stored_size` bytes of payload. There is no file level header.
//!
//! | Byte Num | Description |
//! | :------: | ----------- |
//! | 0..2     | bit depth |
//! | 2..4     | sample rate |
//! | 4..8     | stored payload size |
//! | 8..12    | original (decompressed) size |
//!
//! A payload is compressed exactly when its stored size is smaller than its original size.
//! Older sound banks wrote `0` into the stored size of uncompressed tracks; that
//! is read back as an uncompressed track.

use crate::errors::LzError;
use bitstream_io::{BigEndian, BitReader, BitWriter};
use std::fmt;
use std::io::{Read, Write};
use std::path::Path;

/// Size of the look-behind window, and the largest possible match offset
pub const WINDOW_SIZE: usize = 4096;
/// Largest number of bytes a single match can copy
pub const LOOKAHEAD: usize = 18;
/// Shortest run that is encoded as a match instead of literals
pub const MIN_MATCH: usize = 3;

pub(crate) const OFFSET_BITS: u32 = 12;
pub(crate) const LENGTH_BITS: u32 = 4;

// the record packing only works if the window and lookahead fill their bit fields
const _: () = assert!(1 << OFFSET_BITS == WINDOW_SIZE);
const _: () = assert!((1 << LENGTH_BITS) + MIN_MATCH - 1 == LOOKAHEAD);

pub(crate) const LITERAL: bool = true;
pub(crate) const MATCH: bool = false;

/// Pack a back-reference into its two byte record
pub(crate) fn match_record(offset: usize, length: usize) -> [u8; 2] {
    debug_assert!((1..=WINDOW_SIZE).contains(&offset));
    debug_assert!((MIN_MATCH..=LOOKAHEAD).contains(&length));

    let pair = ((offset - 1) << LENGTH_BITS) | (length - MIN_MATCH);
    (pair as u16).to_be_bytes()
}

/// Read a back-reference record from `rdr` as `(offset, length)`
pub(crate) fn read_match<R: Read>(
    rdr: &mut BitReader<R, BigEndian>,
) -> Result<(usize, usize), LzError> {
    let offset = rdr.read::<u16>(OFFSET_BITS)? as usize + 1;
    let length = rdr.read::<u8>(LENGTH_BITS)? as usize + MIN_MATCH;

    Ok((offset, length))
}

/// Check that `value` fits in a header field of `max`
fn fit<T: Into<u64>>(field: &'static str, value: T, max: u64) -> Result<u64, LzError> {
    let value = value.into();
    if value > max {
        return Err(LzError::FieldOverflow { field, value, max });
    }
    Ok(value)
}

/// A four byte ASCII tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCc([u8; 4]);

impl FourCc {
    pub const MAGIC: Self = Self(*b"LZSS");
    pub const VERSION: Self = Self(*b"v1.0");

    /// Create a tag from a string of exactly four ASCII characters
    pub fn new(tag: &str) -> Result<Self, LzError> {
        if !tag.is_ascii() || tag.len() != 4 {
            return Err(LzError::InvalidFourCc(tag.into()));
        }
        let mut bytes = [0; 4];
        bytes.copy_from_slice(tag.as_bytes());

        Ok(Self(bytes))
    }

    /// Create a file type tag from an extension like `".pcm"`.
    ///
    /// The extension is uppercased, cut to four characters, and padded on
    /// the right with NUL bytes.
    /// ```
    /// # use lzpack::FourCc;
    /// assert_eq!(FourCc::from_extension(".pcm").unwrap().as_bytes(), b".PCM");
    /// assert_eq!(FourCc::from_extension(".jpeg").unwrap().as_bytes(), b".JPE");
    /// assert_eq!(FourCc::from_extension(".h").unwrap().as_bytes(), b".H\0\0");
    /// ```
    pub fn from_extension(ext: &str) -> Result<Self, LzError> {
        if !ext.is_ascii() {
            return Err(LzError::InvalidFourCc(ext.into()));
        }
        let mut bytes = [0; 4];
        for (tag, b) in bytes.iter_mut().zip(ext.bytes()) {
            *tag = b.to_ascii_uppercase();
        }

        Ok(Self(bytes))
    }

    /// The file type tag for `path`, including the leading dot of its extension.
    /// Paths without an extension get an all-NUL tag.
    pub fn for_path<P: AsRef<Path>>(path: P) -> Result<Self, LzError> {
        match path.as_ref().extension() {
            Some(ext) => {
                let ext = ext
                    .to_str()
                    .ok_or_else(|| LzError::InvalidFourCc(ext.to_string_lossy().into()))?;
                Self::from_extension(&format!(".{}", ext))
            }
            None => Ok(Self([0; 4])),
        }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for &b in &self.0 {
            match b {
                0 => write!(f, "\\0")?,
                b => write!(f, "{}", b as char)?,
            }
        }
        Ok(())
    }
}

/// The information stored at the start of an `.lz` file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetHeader {
    pub file_type: FourCc,
    /// size of decompressed data
    pub original_size: u32,
}

impl AssetHeader {
    pub const SIZE: usize = 20;
    const RESERVED: u32 = 0xFFFF_FFFF;

    /// Create a header, checking that `original_size` fits in 32 bits
    pub fn new(file_type: FourCc, original_size: u64) -> Result<Self, LzError> {
        let original_size = fit("original_size", original_size, u32::MAX.into())? as u32;

        Ok(Self {
            file_type,
            original_size,
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0; Self::SIZE];
        buf[0..4].copy_from_slice(FourCc::MAGIC.as_bytes());
        buf[4..8].copy_from_slice(FourCc::VERSION.as_bytes());
        buf[8..12].copy_from_slice(self.file_type.as_bytes());
        buf[12..16].copy_from_slice(&self.original_size.to_be_bytes());
        buf[16..20].copy_from_slice(&Self::RESERVED.to_be_bytes());

        buf
    }

    /// Convenience function to read the `.lz` header from a bitstream
    pub(crate) fn from_bitreader<R: Read>(
        reader: &mut BitReader<R, BigEndian>,
    ) -> Result<Self, LzError> {
        let mut ident = [0u8; 8];
        reader.read_bytes(&mut ident)?;
        if ident[0..4] != FourCc::MAGIC.0 || ident[4..8] != FourCc::VERSION.0 {
            return Err(LzError::InvalidHeader(ident));
        }

        let mut file_type = [0u8; 4];
        reader.read_bytes(&mut file_type)?;
        let original_size = reader.read::<u32>(32)?;
        // reserved
        let _ = reader.read::<u32>(32)?;

        Ok(Self {
            file_type: FourCc(file_type),
            original_size,
        })
    }

    /// Write out `self` to the big endian `BitWriter`
    pub(crate) fn write<W: Write>(&self, wtr: &mut BitWriter<W, BigEndian>) -> Result<(), LzError> {
        wtr.write_bytes(&self.to_bytes()).map_err(Into::into)
    }
}

/// The header in front of every track of an `.snd` file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoundHeader {
    pub bit_depth: u16,
    pub sample_rate: u16,
    /// number of payload bytes following the header
    pub stored_size: u32,
    /// size of the track after decompression
    pub original_size: u32,
}

impl SoundHeader {
    pub const SIZE: usize = 12;

    /// Create a header, checking every field against its width in the file.
    ///
    /// A track never stores more bytes than it decompresses to. A zero stored
    /// size is reserved for empty tracks.
    pub fn new(
        bit_depth: u64,
        sample_rate: u64,
        stored_size: u64,
        original_size: u64,
    ) -> Result<Self, LzError> {
        let u16_max: u64 = u16::MAX.into();
        let u32_max: u64 = u32::MAX.into();

        let header = Self {
            bit_depth: fit("bit_depth", bit_depth, u16_max)? as u16,
            sample_rate: fit("sample_rate", sample_rate, u16_max)? as u16,
            stored_size: fit("stored_size", stored_size, u32_max)? as u32,
            original_size: fit("original_size", original_size, u32_max)? as u32,
        };

        if stored_size > original_size || (stored_size == 0 && original_size > 0) {
            return Err(LzError::StoredSize {
                stored: stored_size,
                original: original_size,
            });
        }

        Ok(header)
    }

    /// Is the payload LZSS compressed, or stored as is
    #[inline]
    pub fn is_compressed(&self) -> bool {
        self.stored_size < self.original_size
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0; Self::SIZE];
        buf[0..2].copy_from_slice(&self.bit_depth.to_be_bytes());
        buf[2..4].copy_from_slice(&self.sample_rate.to_be_bytes());
        buf[4..8].copy_from_slice(&self.stored_size.to_be_bytes());
        buf[8..12].copy_from_slice(&self.original_size.to_be_bytes());

        buf
    }

    pub(crate) fn from_bitreader<R: Read>(
        reader: &mut BitReader<R, BigEndian>,
    ) -> Result<Self, LzError> {
        let bit_depth = reader.read::<u16>(16)?;
        let sample_rate = reader.read::<u16>(16)?;
        let mut stored_size = reader.read::<u32>(32)?;
        let original_size = reader.read::<u32>(32)?;

        // older banks left the stored size of uncompressed tracks at zero
        if stored_size == 0 {
            stored_size = original_size;
        }

        Ok(Self {
            bit_depth,
            sample_rate,
            stored_size,
            original_size,
        })
    }
}
