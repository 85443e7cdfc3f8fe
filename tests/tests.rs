use lzpack::{
    folder, pack, AssetHeader, Decoder, EncoderBuilder, FourCc, LzError, LzssBackend,
    SoundContainer, SoundHeader, SoundTrack, Token, LOOKAHEAD, MIN_MATCH, WINDOW_SIZE,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::fs;

fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut buf = vec![0u8; len];
    rng.fill(&mut buf[..]);
    buf
}

/// random data from a tiny alphabet, so that there are many equally long matches
fn low_entropy_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| b"ab"[rng.gen_range(0..2)]).collect()
}

fn samples() -> Vec<(&'static str, Vec<u8>)> {
    let text = b"It was the best of times, it was the worst of times, ".repeat(40);
    let mut spliced = random_bytes(3000, 7);
    spliced.extend_from_slice(&spliced[100..1100].to_vec());
    // period longer than the window, so the repeat can't be found
    let far = random_bytes(WINDOW_SIZE + 500, 8).repeat(2);

    vec![
        ("empty", Vec::new()),
        ("one byte", vec![0x42]),
        ("zeros", vec![0; 10_000]),
        ("text", text),
        ("random", random_bytes(5000, 1)),
        ("low entropy", low_entropy_bytes(6000, 2)),
        ("spliced", spliced),
        ("far repeat", far),
    ]
}

#[test]
fn round_trip() {
    for (name, data) in samples() {
        let compressed = lzpack::compress(&data);
        let decompressed = lzpack::decompress(&compressed, data.len()).unwrap();
        assert_eq!(decompressed, data, "error round tripping {}", name);
    }
}

#[test]
fn backends_agree() {
    for (name, data) in samples() {
        let brute = EncoderBuilder::for_bytes(&data)
            .lzss_backend(LzssBackend::Brute)
            .encode_to_vec()
            .unwrap();
        let chained = EncoderBuilder::for_bytes(&data)
            .lzss_backend(LzssBackend::HashChain)
            .encode_to_vec()
            .unwrap();
        assert_eq!(brute, chained, "backends disagree on {}", name);
    }
}

#[test]
fn tokens_stay_in_bounds() {
    for (name, data) in samples() {
        let mut position = 0;
        for token in lzpack::tokenize(&data) {
            if let Token::Match { offset, length } = token {
                assert!(offset >= 1 && offset <= WINDOW_SIZE, "{}: offset {}", name, offset);
                assert!(offset <= position, "{}: offset {} at {}", name, offset, position);
                assert!(
                    (MIN_MATCH..=LOOKAHEAD).contains(&length),
                    "{}: length {}",
                    name,
                    length
                );
            }
            position += token.size();
        }
        assert_eq!(position, data.len());
    }
}

#[test]
fn compression_helps_repetitive_data() {
    let data = vec![0u8; 10_000];
    // 1 literal, then matches of 18 bytes, 2 bytes each, plus flag bytes
    assert!(lzpack::compress(&data).len() < data.len() / 8);
}

#[test]
fn eight_new_bytes_are_all_literals() {
    let data = [0x10, 0x32, 0x54, 0x76, 0x98, 0xBA, 0xDC, 0xFE];
    let compressed = lzpack::compress(&data);

    assert_eq!(compressed[0], 0xFF);
    assert_eq!(&compressed[1..], &data[..]);
}

#[test]
fn self_overlapping_match() {
    let data = b"aaaaaaaaaaaaaaaaaaaa";
    let compressed = lzpack::compress(data);

    assert!(lzpack::tokenize(data).contains(&Token::Match { offset: 1, length: 18 }));
    assert_eq!(lzpack::decompress(&compressed, data.len()).unwrap(), &data[..]);
}

#[test]
fn reject_match_before_start() {
    // all-match flag byte, then a record for offset 1 at output position 0
    let bad = [0x00, 0x00, 0x00];
    match lzpack::decompress(&bad, 8) {
        Err(LzError::CorruptStream { offset, position }) => assert_eq!((offset, position), (1, 0)),
        other => panic!("Expected error when decoding bad stream, got {:?}", other),
    }

    // largest offset, with only a little output so far
    let bad = [0x80, b'x', 0xFF, 0xF0];
    assert!(matches!(
        lzpack::decompress(&bad, 30),
        Err(LzError::CorruptStream {
            offset: 4096,
            position: 1
        })
    ));
}

#[test]
fn headers_are_deterministic() {
    let file_type = FourCc::from_extension(".pcm").unwrap();
    let a = AssetHeader::new(file_type, 12345).unwrap();
    let b = AssetHeader::new(file_type, 12345).unwrap();
    assert_eq!(a.to_bytes(), b.to_bytes());

    let a = SoundHeader::new(16, 22050, 100, 400).unwrap();
    let b = SoundHeader::new(16, 22050, 100, 400).unwrap();
    assert_eq!(a.to_bytes(), b.to_bytes());
}

#[test]
fn extension_clamp() {
    assert_eq!(FourCc::from_extension(".tiff").unwrap().as_bytes(), b".TIF");
    assert_eq!(FourCc::from_extension(".s").unwrap().as_bytes(), b".S\0\0");
    assert_eq!(FourCc::for_path("tiles/map.jpeg").unwrap().as_bytes(), b".JPE");
    assert!(FourCc::new(".pc").unwrap_err().is_validation());
}

#[test]
fn raw_fallback_round_trip() {
    let short = random_bytes(4, 99);
    let long = b"meow meow meow meow meow meow meow".to_vec();

    let mut bank = SoundContainer::new();
    bank.push(SoundTrack::new(8, 15360, &short).unwrap());
    bank.push(SoundTrack::new(16, 22050, &long).unwrap());
    let bytes = bank.to_bytes();

    let read = SoundContainer::from_bytes(&bytes).unwrap();
    assert_eq!(read, bank);
    assert_eq!(read.len(), 2);

    let tracks = read.tracks();
    assert!(!tracks[0].is_compressed());
    assert_eq!(tracks[0].header.stored_size, 4);
    assert_eq!(tracks[0].data().unwrap(), short);

    assert!(tracks[1].is_compressed());
    assert_eq!(tracks[1].header.bit_depth, 16);
    assert_eq!(tracks[1].header.sample_rate, 22050);
    assert_eq!(tracks[1].data().unwrap(), long);

    let table = pack::track_table(&bytes).unwrap();
    assert_eq!(table[0].offset, SoundHeader::SIZE);
    assert_eq!(table[1].offset, 2 * SoundHeader::SIZE + 4);
}

#[test]
fn legacy_raw_tracks_are_readable() {
    // uncompressed tracks used to be written with a zero stored size
    let mut bytes = vec![0x00, 0x08, 0x3C, 0x00, 0, 0, 0, 0, 0, 0, 0, 4];
    bytes.extend_from_slice(b"\x01\x02\x03\x04");

    let bank = SoundContainer::from_bytes(&bytes).unwrap();
    assert_eq!(bank.tracks()[0].data().unwrap(), b"\x01\x02\x03\x04");
}

#[test]
fn oversized_header_fields() {
    assert!(SoundTrack::new(1 << 16, 8000, b"abc").unwrap_err().is_validation());
    assert!(SoundTrack::new(8, 1 << 16, b"abc").unwrap_err().is_validation());
}

#[test]
fn lz_files_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("lorem.txt");
    let output = dir.path().join("lorem.lz");
    let lorem = b"Lorem ipsum dolor sit amet, lorem ipsum dolor sit amet. ".repeat(20);
    fs::write(&input, &lorem).unwrap();

    EncoderBuilder::for_file(&input)
        .unwrap()
        .asset_header(FourCc::for_path(&input).unwrap())
        .encode_to_file(&output)
        .unwrap();

    let mut decoder = Decoder::for_file(&output).unwrap();
    let header = decoder.header().unwrap();
    assert_eq!(header.file_type.as_bytes(), b".TXT");
    assert_eq!(header.original_size as usize, lorem.len());
    assert_eq!(decoder.decode().unwrap(), lorem);
}

#[test]
fn compress_folder_writes_lz_files() {
    let dir = tempfile::tempdir().unwrap();
    let tiles = vec![3u8; 500];
    let noise = random_bytes(64, 3);
    fs::write(dir.path().join("tiles.bin"), &tiles).unwrap();
    fs::write(dir.path().join("noise.bin"), &noise).unwrap();
    fs::write(dir.path().join("notes.txt"), b"not an asset").unwrap();

    let dry = folder::compress_folder(dir.path(), false).unwrap();
    assert_eq!(dry.len(), 2);
    assert!(!dir.path().join("tiles.lz").exists());

    let reports = folder::compress_folder(dir.path(), true).unwrap();
    assert_eq!(reports, dry);
    assert_eq!(reports[0].name, "noise.bin");
    assert_eq!(reports[1].name, "tiles.bin");
    assert!(reports[1].compressed_size < reports[1].original_size);
    assert!(!dir.path().join("notes.lz").exists());

    let file = fs::read(dir.path().join("tiles.lz")).unwrap();
    assert_eq!(&file[8..12], b".BIN");
    assert_eq!(file.len(), AssetHeader::SIZE + reports[1].compressed_size);
    assert_eq!(lzpack::decode(&file[..]).unwrap(), tiles);

    let (_, data) = pack::unpack_asset(&fs::read(dir.path().join("noise.lz")).unwrap()).unwrap();
    assert_eq!(data, noise);
}

#[test]
fn pack_sound_folder_from_track_list() {
    let assets = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    let meow = b"meowmeowmeowmeowmeowmeowmeowmeow".to_vec();
    let click = random_bytes(4, 5);
    fs::write(assets.path().join("MEOW.PCM"), &meow).unwrap();
    fs::write(assets.path().join("CLICK.PCM"), &click).unwrap();
    fs::write(
        assets.path().join(folder::TRACK_LIST),
        r#"{
            "CAT.SND": {
                "MEOW.PCM": { "BitDepth": 8, "SampleRate": 15360 },
                "CLICK.PCM": { "BitDepth": "16", "SampleRate": "22050" }
            }
        }"#,
    )
    .unwrap();

    let banks = folder::pack_sound_folder(assets.path(), out.path()).unwrap();
    assert_eq!(banks.len(), 1);
    assert_eq!(banks[0].tracks[0].name, "MEOW.PCM");
    assert_eq!(banks[0].tracks[1].stored_size, 4);

    let bank = SoundContainer::from_bytes(&fs::read(out.path().join("CAT.SND")).unwrap()).unwrap();
    let tracks = bank.tracks();
    assert_eq!(tracks.len(), 2);
    assert_eq!((tracks[0].header.bit_depth, tracks[0].header.sample_rate), (8, 15360));
    assert_eq!(tracks[0].data().unwrap(), meow);
    assert_eq!((tracks[1].header.bit_depth, tracks[1].header.sample_rate), (16, 22050));
    assert_eq!(tracks[1].data().unwrap(), click);
}

#[test]
fn missing_track_list() {
    let assets = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    match folder::pack_sound_folder(assets.path(), out.path()) {
        Err(LzError::Io(_)) => {}
        other => panic!("expected an io error, got {:?}", other),
    }
}
