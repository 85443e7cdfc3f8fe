//! Compression for small game assets and sound banks with a fixed-window LZSS.
//!
//! The core is a greedy LZSS codec with a 4096 byte window and matches of
//! 3 to 18 bytes, framed eight tokens to a flag byte (see [`format`]).
//! On top of it sit two containers: `.lz` files for single assets, and `.snd`
//! sound banks holding several tracks.
//! ```
//! let data = b"ABBACABBACDABBACABBAC";
//! let compressed = lzpack::compress(data);
//! assert_eq!(lzpack::decompress(&compressed, data.len()).unwrap(), data);
//! ```

mod decode;
mod encode;
mod errors;
pub mod folder;
pub mod format;
pub mod pack;

pub use decode::{asset_info, decode, decode_stream, decompress, Decoder};
pub use encode::{compress, encode, tokenize, EncoderBuilder, LzssBackend, Token};
pub use errors::LzError;
pub use format::{AssetHeader, FourCc, SoundHeader, LOOKAHEAD, MIN_MATCH, WINDOW_SIZE};
pub use pack::{SoundContainer, SoundTrack, StoredPayload};
