use crate::{
    errors::LzError,
    format::{self, AssetHeader, FourCc},
};
use bitstream_io::{BigEndian, BitWriter};
use smallvec::SmallVec;
use std::{
    fs::File,
    io::Write,
    io::{BufReader, BufWriter, Cursor, Read},
    path::Path,
};

pub(crate) mod lzss;

pub use self::lzss::Token;
use self::lzss::Tokens;

type LogWtr<'a> = &'a mut dyn Write;

/// Tokens described by one flag byte
const GROUP_SIZE: usize = 8;

/// The algorithm used to find matches when encoding
///
/// Both backends produce exactly the same output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LzssBackend {
    /// Naive, brute force search of the whole window for every byte
    Brute,
    /// Only search earlier positions that start with the same three bytes
    HashChain,
}

impl Default for LzssBackend {
    fn default() -> Self {
        Self::HashChain
    }
}

/// Specify the encoding settings, such as match search, logging, input, and output
///
/// To create a new `EncoderBuilder`, use [`for_reader()`], [`for_file()`], or [`for_bytes()`].
/// Then, change any of the encoding settings with `EncoderBuilder`'s helper methods.
/// Finally, encode the input data with [`encode_to_writer()`], [`encode_to_file()`], or [`encode_to_vec()`].
/// ```
/// # use lzpack::{EncoderBuilder, FourCc, LzssBackend};
/// let input = b"ABBACABBCADFEGABA";
/// let compressed = EncoderBuilder::for_bytes(input)
///     .lzss_backend(LzssBackend::Brute)
///     .asset_header(FourCc::from_extension(".bin").unwrap())
///     .encode_to_vec()
///     .unwrap();
/// assert_eq!(&compressed[..4], b"LZSS");
/// ```
///
/// By default the output is a bare LZSS stream. Setting an [`asset_header()`]
/// writes a complete `.lz` file instead.
///
/// [`for_reader()`]: EncoderBuilder::for_reader
/// [`for_file()`]: EncoderBuilder::for_file
/// [`for_bytes()`]: EncoderBuilder::for_bytes
/// [`encode_to_writer()`]: EncoderBuilder::encode_to_writer
/// [`encode_to_file()`]: EncoderBuilder::encode_to_file
/// [`encode_to_vec()`]: EncoderBuilder::encode_to_vec
/// [`asset_header()`]: EncoderBuilder::asset_header
pub struct EncoderBuilder<'a, R> {
    rdr: R,
    backend: LzssBackend,
    log: Option<LogWtr<'a>>,
    file_type: Option<FourCc>,
}

impl<'a, R: Read> EncoderBuilder<'a, R> {
    /// Create a new `EncoderBuilder` for the data in `rdr`.
    #[inline]
    pub fn for_reader(rdr: R) -> Self {
        Self {
            rdr,
            backend: LzssBackend::default(),
            log: None,
            file_type: None,
        }
    }

    /// Set the algorithm used to search for LZSS matches when encoding
    #[inline]
    pub fn lzss_backend(&mut self, backend: LzssBackend) -> &mut Self {
        self.backend = backend;
        self
    }

    /// Prefix the output with an `.lz` [`AssetHeader`] for `file_type`
    #[inline]
    pub fn asset_header(&mut self, file_type: FourCc) -> &mut Self {
        self.file_type = Some(file_type);
        self
    }

    /// Write debugging and diagnotic information to `log` while the input is
    /// being encoded.
    #[inline]
    pub fn with_logging<L: Write>(&mut self, log: &'a mut L) -> &mut Self {
        let log = Some(log as &'a mut dyn Write);
        self.log = log;
        self
    }

    /// Start the encoding and write the compressed data out to `wtr`
    #[inline]
    pub fn encode_to_writer<W: Write>(&mut self, wtr: W) -> Result<(), LzError> {
        do_encode(self, wtr)
    }

    /// Start the encoding and write the compressed data out to the newly created
    /// `File` `f`
    #[inline]
    pub fn encode_to_file<P: AsRef<Path>>(&mut self, f: P) -> Result<(), LzError> {
        let wtr = BufWriter::new(File::create(f)?);
        self.encode_to_writer(wtr)
    }

    /// Start the encoding and return the compressed data in a `Vec<u8>`.
    #[inline]
    pub fn encode_to_vec(&mut self) -> Result<Vec<u8>, LzError> {
        let mut data = Vec::new();
        self.encode_to_writer(&mut data).map(|_| data)
    }
}

impl<'a> EncoderBuilder<'a, BufReader<File>> {
    /// Create a new `EncoderBuilder` for the file at `p`.
    #[inline]
    pub fn for_file<P: AsRef<Path>>(p: P) -> Result<Self, LzError> {
        let rdr = BufReader::new(File::open(p)?);
        Ok(Self::for_reader(rdr))
    }
}

impl<'a> EncoderBuilder<'a, Cursor<&'a [u8]>> {
    /// Create a new `EncoderBuilder` for the data the `bytes` slice.
    #[inline]
    pub fn for_bytes(bytes: &'a [u8]) -> Self {
        let rdr = Cursor::new(bytes);
        Self::for_reader(rdr)
    }
}

/// Compress the data from a `Read`er into a bare LZSS stream
///
/// This is a convenience function to encode a `Read`er without having to
/// import and set up an [`EncoderBuilder`].
pub fn encode<R: Read>(rdr: R) -> Result<Vec<u8>, LzError> {
    EncoderBuilder::for_reader(rdr).encode_to_vec()
}

/// Compress `data` into a bare LZSS stream.
///
/// The stream does not record the size of `data`; keep it to pass to
/// [`decompress`](crate::decompress).
/// ```
/// let data = b"aaaaaaaaaaaaaaaaaaaa";
/// let compressed = lzpack::compress(data);
/// assert_eq!(compressed, [0xA0, b'a', 0x00, 0x0F, b'a']);
/// assert_eq!(lzpack::decompress(&compressed, data.len()).unwrap(), data);
/// ```
pub fn compress(data: &[u8]) -> Vec<u8> {
    write_stream(Tokens::new(data, LzssBackend::default()), data.len())
}

/// The greedy LZSS parse of `data`, before it is framed into flag groups
pub fn tokenize(data: &[u8]) -> Vec<Token> {
    Tokens::new(data, LzssBackend::default()).collect()
}

fn do_encode<R: Read, W: Write>(
    opts: &mut EncoderBuilder<'_, R>,
    mut wtr: W,
) -> Result<(), LzError> {
    let EncoderBuilder {
        rdr,
        backend,
        log,
        file_type,
    } = opts;

    let mut input = Vec::new();
    rdr.read_to_end(&mut input)?;

    if let Some(wtr) = log.as_mut() {
        writeln!(wtr, "# Input\n{} bytes, {:?} search", input.len(), backend)?;
    }

    if let Some(file_type) = *file_type {
        let header = AssetHeader::new(file_type, input.len() as u64)?;
        if let Some(wtr) = log.as_mut() {
            writeln!(wtr, "# Header\n{:?}", &header)?;
        }
        let mut out = BitWriter::endian(&mut wtr, BigEndian);
        header.write(&mut out)?;
    }

    let tokens: Vec<Token> = Tokens::new(&input, *backend).collect();
    if let Some(wtr) = log.as_mut() {
        writeln!(wtr, "# Tokens")?;
        let mut position = 0;
        for token in &tokens {
            writeln!(wtr, "{:04x} - {}", position, token)?;
            position += token.size();
        }
    }

    let stream = write_stream(tokens, input.len());

    if let Some(wtr) = log.as_mut() {
        writeln!(wtr, "# Output\n{} -> {} bytes", input.len(), stream.len())?;
    }

    wtr.write_all(&stream)?;
    wtr.flush().map_err(Into::into)
}

/// The tokens of one flag byte, and their encoded bytes
#[derive(Debug, Default)]
struct FlagGroup {
    flags: u8,
    count: usize,
    bytes: SmallVec<[u8; 2 * GROUP_SIZE]>,
}

impl FlagGroup {
    fn push(&mut self, token: Token) {
        let bit = match token {
            Token::Literal(byte) => {
                self.bytes.push(byte);
                format::LITERAL
            }
            Token::Match { offset, length } => {
                self.bytes
                    .extend_from_slice(&format::match_record(offset, length));
                format::MATCH
            }
        };
        self.flags = (self.flags << 1) | bit as u8;
        self.count += 1;
    }

    #[inline]
    fn is_full(&self) -> bool {
        self.count == GROUP_SIZE
    }

    /// Append the flag byte and the token bytes to `out`, and reset for the next group
    fn flush_to(&mut self, out: &mut Vec<u8>) {
        if self.count == 0 {
            return;
        }
        // unused trailing tokens leave zero bits
        out.push(self.flags << (GROUP_SIZE - self.count));
        out.extend_from_slice(&self.bytes);

        *self = Self::default();
    }
}

/// Frame `tokens` into flag groups
fn write_stream<I>(tokens: I, input_size: usize) -> Vec<u8>
where
    I: IntoIterator<Item = Token>,
{
    // worst case is all literals
    let mut out = Vec::with_capacity(input_size + input_size / GROUP_SIZE + 1);
    let mut group = FlagGroup::default();

    for token in tokens {
        group.push(token);
        if group.is_full() {
            group.flush_to(&mut out);
        }
    }
    group.flush_to(&mut out);

    out
}
