use crate::errors::LzError;
use crate::format::{self, AssetHeader};
use bitstream_io::{BigEndian, BitReader};
use std::{
    fs::File,
    io::{BufReader, Cursor, Read, Write},
    path::Path,
};

type LogWtr<'a> = &'a mut dyn Write;

/// Don't trust a header's size for more than this much up front allocation
const MAX_PREALLOC: usize = 1 << 20;

/// Specify the decoding settings for an `.lz` file, such as logging and input.
///
/// To create a new `Decoder`, use [`for_reader()`], [`for_bytes()`], or
/// [`for_file()`]. Then, change any of the decoder settings.
/// Finally, decode the input data with [`decode()`].
/// ```
/// # use lzpack::{EncoderBuilder, Decoder, FourCc};
/// let original = b"ABBACABBACD";
/// let compressed = EncoderBuilder::for_bytes(original)
///     .asset_header(FourCc::from_extension(".txt").unwrap())
///     .encode_to_vec()
///     .unwrap();
/// let decompressed = Decoder::for_bytes(&compressed)
///     .decode()
///     .unwrap();
/// assert_eq!(&original[..], decompressed);
/// ```
/// You can use a `Decoder` to get the [`AssetHeader`] with [`header()`]:
/// ```
/// # use lzpack::{EncoderBuilder, Decoder, FourCc};
/// # let original = b"ABBACABBACD";
/// # let compressed = EncoderBuilder::for_bytes(original)
/// #     .asset_header(FourCc::from_extension(".txt").unwrap())
/// #     .encode_to_vec()
/// #     .unwrap();
/// let mut decoder = Decoder::for_bytes(&compressed);
/// let size = decoder.header().unwrap().original_size as usize;
/// assert_eq!(size, original.len());
/// ```
/// [`for_reader()`]: Decoder::for_reader
/// [`for_bytes()`]: Decoder::for_bytes
/// [`for_file()`]: Decoder::for_file
/// [`decode()`]: Decoder::decode
/// [`header()`]: Decoder::header
pub struct Decoder<'a, R: Read> {
    src: BitReader<R, BigEndian>,
    log: Option<LogWtr<'a>>,
    info: Option<AssetHeader>,
}

impl<'a, R: Read> Decoder<'a, R> {
    #[inline]
    pub fn for_reader(rdr: R) -> Self {
        Self {
            src: BitReader::endian(rdr, BigEndian),
            log: None,
            info: None,
        }
    }

    #[inline]
    pub fn with_logging<W: Write>(&mut self, wtr: &'a mut W) -> &mut Self {
        self.log = Some(wtr as LogWtr);
        self
    }

    #[inline]
    pub fn header(&mut self) -> Result<AssetHeader, LzError> {
        self.get_file_info()
    }

    #[inline]
    pub fn decode(&mut self) -> Result<Vec<u8>, LzError> {
        let header = self.get_file_info()?;
        let Decoder { src, log, .. } = self;

        if let Some(wtr) = log.as_mut() {
            writeln!(wtr, "# Header\n{:?}", &header)?;
        }

        do_decode(src, header.original_size as usize, log)
    }

    fn get_file_info(&mut self) -> Result<AssetHeader, LzError> {
        match self.info {
            Some(info) => Ok(info),
            None => {
                let hdr = AssetHeader::from_bitreader(&mut self.src)?;
                self.info = Some(hdr);
                Ok(hdr)
            }
        }
    }
}

impl<'a> Decoder<'a, Cursor<&'a [u8]>> {
    #[inline]
    pub fn for_bytes(bytes: &'a [u8]) -> Self {
        let rdr = Cursor::new(bytes);
        Self::for_reader(rdr)
    }
}

impl<'a> Decoder<'a, BufReader<File>> {
    #[inline]
    pub fn for_file<P: AsRef<Path>>(p: P) -> Result<Self, LzError> {
        File::open(p)
            .map(BufReader::new)
            .map(Self::for_reader)
            .map_err(Into::into)
    }
}

/// Decompress an `.lz` file into a `Vec<u8>`
///
/// This is a convenience function to decode a `Read`er without
/// having to import and set up a [`Decoder`]
pub fn decode<R: Read>(rdr: R) -> Result<Vec<u8>, LzError> {
    Decoder::for_reader(rdr).decode()
}

/// Extract the [`AssetHeader`] from an `.lz` file
pub fn asset_info<R: Read>(rdr: R) -> Result<AssetHeader, LzError> {
    Decoder::for_reader(rdr).header()
}

/// Decompress a bare LZSS stream from a `Read`er until `size` bytes are produced
pub fn decode_stream<R: Read>(rdr: R, size: usize) -> Result<Vec<u8>, LzError> {
    let mut src = BitReader::endian(rdr, BigEndian);
    do_decode(&mut src, size, &mut None)
}

/// Decompress a bare LZSS stream into `size` bytes.
///
/// Fails with [`LzError::CorruptStream`] if a match reaches back before the
/// start of the output, or with an unexpected EOF if `data` runs out first.
/// ```
/// use lzpack::LzError;
/// // a match of offset 1 with nothing decoded yet
/// let bad = [0x00, 0x00, 0x00];
/// match lzpack::decompress(&bad, 3) {
///     Err(LzError::CorruptStream { offset: 1, position: 0 }) => {}
///     other => panic!("{:?}", other),
/// }
/// ```
pub fn decompress(data: &[u8], size: usize) -> Result<Vec<u8>, LzError> {
    decode_stream(Cursor::new(data), size)
}

fn do_decode<R: Read>(
    src: &mut BitReader<R, BigEndian>,
    output_size: usize,
    log: &mut Option<LogWtr<'_>>,
) -> Result<Vec<u8>, LzError> {
    let mut output: Vec<u8> = Vec::with_capacity(output_size.min(MAX_PREALLOC));
    let mut flags = 0u8;
    let mut mask = 0u8;

    while output.len() < output_size {
        if mask == 0 {
            flags = src.read::<u8>(8)?;
            mask = 0x80;
        }

        if (flags & mask != 0) == format::LITERAL {
            let byte = src.read::<u8>(8)?;
            output.push(byte);

            if let Some(wtr) = log.as_mut() {
                writeln!(wtr, "{:04x} - Uncoded: {:02x}", output.len() - 1, byte)?;
            }
        } else {
            let (offset, length) = format::read_match(src)?;

            // get start position in output, and the number of bytes to copy-back
            if offset > output.len() {
                return Err(LzError::CorruptStream {
                    offset,
                    position: output.len(),
                });
            }
            let start = output.len() - offset;
            let size = length.min(output_size - output.len());

            if let Some(wtr) = log.as_mut() {
                writeln!(
                    wtr,
                    "{:04x} - Encoded [Copyback]: size: {} mb: {} | start: {:04x}",
                    output.len(),
                    length,
                    offset,
                    start
                )?;
            }

            // byte by byte, as the source can run into the bytes being copied
            for i in start..start + size {
                let byte = output[i];
                output.push(byte);
            }
        }

        mask >>= 1;
    }

    Ok(output)
}
