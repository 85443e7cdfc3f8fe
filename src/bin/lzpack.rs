use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use lzpack::{folder, pack, AssetHeader, Decoder, LzError};

#[derive(Parser, Debug)]
#[command(name = "lzpack")]
#[command(about = "Pack game assets and sound banks with LZSS")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compress every .bin file in a folder and report the ratios
    Lz {
        /// Folder to scan
        dir: PathBuf,

        /// Write a .lz file next to each input
        #[arg(short, long)]
        write: bool,
    },
    /// Build the .snd sound banks listed in <ASSETS>/SOUND.json
    Snd {
        /// Folder with SOUND.json and the track files
        assets: PathBuf,

        /// Folder the sound banks are written to
        out: PathBuf,
    },
    /// Show the header of an .lz file, or the tracks of an .snd file
    Info {
        file: PathBuf,
    },
    /// Decompress an .lz file
    Unpack {
        input: PathBuf,
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), LzError> {
    match args.command {
        Command::Lz { dir, write } => {
            folder::compress_folder(dir, write)?;
        }
        Command::Snd { assets, out } => {
            folder::pack_sound_folder(assets, out)?;
        }
        Command::Info { file } => print_info(&fs::read(file)?)?,
        Command::Unpack { input, output } => {
            let data = Decoder::for_file(&input)?.decode()?;
            folder::write_atomic(&output, &data)?;
            log::info!("{} -> {} ({} bytes)", input.display(), output.display(), data.len());
        }
    }

    Ok(())
}

fn print_info(bytes: &[u8]) -> Result<(), LzError> {
    if bytes.starts_with(b"LZSS") {
        let header = lzpack::asset_info(bytes)?;
        println!("type:            {}", header.file_type);
        println!("original size:   {}", header.original_size);
        println!("compressed size: {}", bytes.len() - AssetHeader::SIZE);
        return Ok(());
    }

    println!(
        "{:>5} {:>9} {:>11} {:>10} {:>10}  compressed",
        "track", "bit depth", "sample rate", "stored", "original"
    );
    for (i, entry) in pack::track_table(bytes)?.iter().enumerate() {
        let hdr = entry.header;
        println!(
            "{:>5} {:>9} {:>11} {:>10} {:>10}  {}",
            i,
            hdr.bit_depth,
            hdr.sample_rate,
            hdr.stored_size,
            hdr.original_size,
            hdr.is_compressed()
        );
    }

    Ok(())
}
