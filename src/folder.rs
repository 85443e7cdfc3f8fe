//! Pack whole asset folders: every `*.bin` into an `.lz` file, or the tracks
//! listed in `SOUND.json` into `.snd` sound banks.
//!
//! The track list maps each sound bank to its tracks, in the order they are
//! written:
//! ```json
//! {
//!     "CAT.SND": {
//!         "MEOW.PCM": { "BitDepth": 8, "SampleRate": 15360 },
//!         "PURR.PCM": { "BitDepth": "16", "SampleRate": "22050" }
//!     }
//! }
//! ```

use crate::{
    errors::LzError,
    format::{AssetHeader, FourCc},
    pack::{pack_asset, SoundContainer, SoundTrack},
};
use indexmap::IndexMap;
use log::{debug, info};
use serde::{Deserialize, Deserializer};
use std::{
    fmt, fs,
    io::Write,
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;

/// Name of the track list inside an assets folder
pub const TRACK_LIST: &str = "SOUND.json";

/// Extension of the raw assets picked up by [`compress_folder`]
const ASSET_EXT: &str = "bin";

/// Sizes before and after compressing one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetReport {
    pub name: String,
    pub original_size: usize,
    pub compressed_size: usize,
}

impl AssetReport {
    /// compressed size over original size; zero for empty files
    pub fn ratio(&self) -> f64 {
        if self.original_size == 0 {
            0.0
        } else {
            self.compressed_size as f64 / self.original_size as f64
        }
    }

    /// percentage of the original size saved by compression
    pub fn savings(&self) -> f64 {
        if self.original_size == 0 {
            0.0
        } else {
            100.0 * (1.0 - self.ratio())
        }
    }
}

impl fmt::Display for AssetReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:20} {:8} -> {:8} ratio={:.3}  savings={:+.2}%",
            self.name,
            self.original_size,
            self.compressed_size,
            self.ratio(),
            self.savings()
        )
    }
}

/// Per track settings from the track list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TrackInfo {
    #[serde(rename = "BitDepth", deserialize_with = "number")]
    pub bit_depth: u64,
    #[serde(rename = "SampleRate", deserialize_with = "number")]
    pub sample_rate: u64,
}

/// sound bank name -> track file name -> settings
pub type TrackList = IndexMap<String, IndexMap<String, TrackInfo>>;

#[derive(Deserialize)]
#[serde(untagged)]
enum Number {
    Int(u64),
    Text(String),
}

/// Accept both `16` and `"16"`
fn number<'de, D: Deserializer<'de>>(de: D) -> Result<u64, D::Error> {
    match Number::deserialize(de)? {
        Number::Int(n) => Ok(n),
        Number::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Read a track list file
pub fn load_track_list<P: AsRef<Path>>(path: P) -> Result<TrackList, LzError> {
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(Into::into)
}

/// Sizes of one track written into a sound bank
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackReport {
    pub name: String,
    pub original_size: usize,
    pub stored_size: usize,
}

/// A sound bank written by [`pack_sound_folder`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankReport {
    pub path: PathBuf,
    pub tracks: Vec<TrackReport>,
}

/// Replace the file at `path` with `bytes` in one step
pub fn write_atomic<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<(), LzError> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;

    Ok(())
}

/// Sorted paths of the files in `dir` with extension `ext`
fn files_with_ext(dir: &Path, ext: &str) -> Result<Vec<PathBuf>, LzError> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().map_or(false, |e| e == ext) {
            paths.push(path);
        }
    }
    paths.sort();

    Ok(paths)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Compress every `*.bin` file in `dir` and report how well each compressed.
///
/// With `write_output`, each `name.bin` is written next to itself as a `name.lz` file.
pub fn compress_folder<P: AsRef<Path>>(
    dir: P,
    write_output: bool,
) -> Result<Vec<AssetReport>, LzError> {
    let dir = dir.as_ref();
    info!("LZSS test for folder: {}", dir.display());

    let mut reports = Vec::new();
    for path in files_with_ext(dir, ASSET_EXT)? {
        let data = fs::read(&path)?;
        let file = pack_asset(FourCc::for_path(&path)?, &data)?;

        let report = AssetReport {
            name: file_name(&path),
            original_size: data.len(),
            compressed_size: file.len() - AssetHeader::SIZE,
        };
        info!("{}", report);

        if write_output {
            let out_path = path.with_extension("lz");
            write_atomic(&out_path, &file)?;
            debug!("wrote {}", out_path.display());
        }
        reports.push(report);
    }

    Ok(reports)
}

/// Build every sound bank in `assets/SOUND.json` and write them into `out`
pub fn pack_sound_folder<P, Q>(assets: P, out: Q) -> Result<Vec<BankReport>, LzError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let (assets, out) = (assets.as_ref(), out.as_ref());
    let list = load_track_list(assets.join(TRACK_LIST))?;
    fs::create_dir_all(out)?;

    let mut banks = Vec::with_capacity(list.len());
    for (bank_name, tracks) in &list {
        info!("Building {}", bank_name);

        let mut bank = SoundContainer::new();
        let mut reports = Vec::with_capacity(tracks.len());
        for (track_name, settings) in tracks {
            let data = fs::read(assets.join(track_name))?;
            let track = SoundTrack::new(settings.bit_depth, settings.sample_rate, &data)?;

            info!("  {:12} {:6} -> {:6}", track_name, data.len(), track.payload.len());
            reports.push(TrackReport {
                name: track_name.clone(),
                original_size: data.len(),
                stored_size: track.payload.len(),
            });
            bank.push(track);
        }

        let path = out.join(bank_name);
        write_atomic(&path, &bank.to_bytes())?;
        info!("Saved: {}", path.display());

        banks.push(BankReport {
            path,
            tracks: reports,
        });
    }

    Ok(banks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_list_keeps_order_and_accepts_strings() {
        let json = r#"{
            "B.SND": { "Z.PCM": { "BitDepth": "16", "SampleRate": 22050 },
                       "A.PCM": { "BitDepth": 8, "SampleRate": " 15360 " } },
            "A.SND": {}
        }"#;
        let list: TrackList = serde_json::from_str(json).unwrap();

        let banks: Vec<_> = list.keys().cloned().collect();
        assert_eq!(banks, ["B.SND", "A.SND"]);

        let tracks: Vec<_> = list["B.SND"].iter().collect();
        assert_eq!(tracks[0].0, "Z.PCM");
        assert_eq!(tracks[0].1, &TrackInfo { bit_depth: 16, sample_rate: 22050 });
        assert_eq!(tracks[1].1, &TrackInfo { bit_depth: 8, sample_rate: 15360 });
    }

    #[test]
    fn track_list_rejects_garbage() {
        let json = r#"{ "A.SND": { "A.PCM": { "BitDepth": "sixteen", "SampleRate": 1 } } }"#;
        assert!(serde_json::from_str::<TrackList>(json).is_err());
    }

    #[test]
    fn report_format() {
        let report = AssetReport {
            name: "tiles.bin".into(),
            original_size: 1000,
            compressed_size: 250,
        };
        assert_eq!(
            report.to_string(),
            "tiles.bin                1000 ->      250 ratio=0.250  savings=+75.00%"
        );

        let empty = AssetReport {
            name: "empty.bin".into(),
            original_size: 0,
            compressed_size: 0,
        };
        assert_eq!(empty.ratio(), 0.0);
        assert_eq!(empty.savings(), 0.0);
    }
}
