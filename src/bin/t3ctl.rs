//! t3ctl - command-line inspector/encoder for the ternary transport codec
//!
//! Mirrors the conceptual CLI surface of §6: `encode`, `info`, `export-bal`,
//! `export-unb`, `repack`, `cat`, and `dump`. Images are read/written as
//! plain binary PPM (P6) - the pack has no PNG-decoding dependency, and a
//! trivial P6 reader/writer keeps this tool dependency-free beyond what the
//! library itself already carries.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process::exit;

use clap::{Parser, Subcommand};
use colored::*;

use t3codec::body::BodyPipeline;
use t3codec::container::{common, t3p, t3proto, t3v};
use t3codec::header::{BandProfile, BeaconConfig, Coset, FrameProfile, SubwordMode, SuperHeader};
use t3codec::image::{subword_canvas_dim, ImageU8};
use t3codec::trit::{bal_to_unb, BalancedTrit};
use t3codec::CodecError;

#[derive(Parser)]
#[command(name = "t3ctl")]
#[command(about = "Ternary transport codec inspector and encoder", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a PPM (P6) image into a `.t3p` or `.t3proto` file.
    Encode {
        #[arg(long = "in", value_name = "PPM")]
        input: PathBuf,
        #[arg(long = "out", value_name = "FILE")]
        output: PathBuf,
        /// Prototype pipeline tag when writing `.t3proto`; ignored for `.t3p`.
        #[arg(long, value_parser = ["haar", "rc"], default_value = "haar")]
        profile: String,
        /// Write a `.t3proto` record instead of a fully RS-protected `.t3p`.
        #[arg(long)]
        proto: bool,
        #[arg(long)]
        no_pack: bool,
        #[arg(long)]
        no_balanced: bool,
    },
    /// Show structural info for a `.t3p`, `.t3v`, or `.t3proto` file.
    Info { file: PathBuf },
    /// Export a `.t3proto` file's balanced trits as raw signed bytes.
    ExportBal {
        file: PathBuf,
        #[arg(long = "out")]
        output: PathBuf,
    },
    /// Export a `.t3proto` file's trits in unbalanced {0,1,2} form.
    ExportUnb {
        file: PathBuf,
        #[arg(long = "out")]
        output: PathBuf,
    },
    /// Rewrite a `.t3proto` file keeping only the packed or balanced representation.
    Repack {
        input: PathBuf,
        #[arg(long = "to", value_parser = ["packed", "balanced"])]
        to: String,
        #[arg(long = "out")]
        output: PathBuf,
    },
    /// Merge several `.t3p` files into one `.t3v`.
    Cat {
        #[arg(long = "out")]
        output: PathBuf,
        inputs: Vec<PathBuf>,
    },
    /// Dump the header CRC-12 status and a parity-mod-3 checksum of a `.t3p` file.
    Dump { file: PathBuf },
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Encode { input, output, profile, proto, no_pack, no_balanced } => {
            cmd_encode(&input, &output, &profile, proto, no_pack, no_balanced)
        }
        Commands::Info { file } => cmd_info(&file),
        Commands::ExportBal { file, output } => cmd_export_bal(&file, &output),
        Commands::ExportUnb { file, output } => cmd_export_unb(&file, &output),
        Commands::Repack { input, to, output } => cmd_repack(&input, &to, &output),
        Commands::Cat { output, inputs } => cmd_cat(&output, &inputs),
        Commands::Dump { file } => cmd_dump(&file),
    };

    match result {
        Ok(()) => exit(0),
        Err(CliError::Usage(msg)) => {
            eprintln!("{} {}", "usage error:".red().bold(), msg);
            exit(2);
        }
        Err(CliError::Integrity(msg)) => {
            eprintln!("{} {}", "error:".red().bold(), msg);
            exit(1);
        }
    }
}

enum CliError {
    Usage(String),
    Integrity(String),
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Integrity(e.to_string())
    }
}

impl From<CodecError> for CliError {
    fn from(e: CodecError) -> Self {
        CliError::Integrity(e.to_string())
    }
}

type CliResult = Result<(), CliError>;

/// A minimal binary PPM (P6) reader: no comment support, whitespace-separated
/// header fields, maxval assumed to fit one byte (255).
fn read_ppm(path: &PathBuf) -> Result<ImageU8, CliError> {
    let mut f = BufReader::new(File::open(path)?);
    let mut magic = [0u8; 2];
    f.read_exact(&mut magic)?;
    if &magic != b"P6" {
        return Err(CliError::Usage(format!("{}: not a P6 PPM file", path.display())));
    }
    let mut fields = Vec::new();
    while fields.len() < 3 {
        let token = read_whitespace_token(&mut f)?;
        fields.push(token);
    }
    let width: u32 = fields[0].parse().map_err(|_| CliError::Usage("bad PPM width".to_string()))?;
    let height: u32 = fields[1].parse().map_err(|_| CliError::Usage("bad PPM height".to_string()))?;
    let mut rgb = vec![0u8; width as usize * height as usize * 3];
    f.read_exact(&mut rgb)?;
    Ok(ImageU8::new(width, height, rgb))
}

fn read_whitespace_token<R: Read>(r: &mut R) -> std::io::Result<String> {
    let mut byte = [0u8; 1];
    let mut token = String::new();
    loop {
        r.read_exact(&mut byte)?;
        let c = byte[0] as char;
        if c.is_whitespace() {
            if token.is_empty() {
                continue;
            }
            break;
        }
        token.push(c);
    }
    Ok(token)
}

fn write_ppm(path: &PathBuf, img: &ImageU8) -> std::io::Result<()> {
    let mut f = BufWriter::new(File::create(path)?);
    write!(f, "P6\n{} {}\n255\n", img.width, img.height)?;
    f.write_all(&img.rgb)
}

fn default_header(width: u32, height: u32) -> SuperHeader {
    let canvas = subword_canvas_dim(SubwordMode::S27);
    let tile = ((canvas).min(width.max(1)) as u8, (canvas).min(height.max(1)) as u8);
    SuperHeader {
        version: 1,
        frame_profile: FrameProfile::p5(),
        uep: [BandProfile::Standard; 9],
        tile: (tile.0.max(1), tile.1.max(1)),
        scrambler_seed: (1, 1, 1),
        subword: SubwordMode::S27,
        centered: false,
        coset: Coset::C0,
        frame_seq: 0,
        beacon: BeaconConfig { enabled: true, slot: 0, period: 64 },
    }
}

fn cmd_encode(
    input: &PathBuf,
    output: &PathBuf,
    profile: &str,
    proto: bool,
    no_pack: bool,
    no_balanced: bool,
) -> CliResult {
    let img = read_ppm(input)?;

    if proto {
        let proto_profile = match profile {
            "haar" => t3proto::ProtoProfile::Haar,
            _ => t3proto::ProtoProfile::AnisoRc,
        };
        let trits: Vec<BalancedTrit> = img.to_balanced_trits();
        let packed = if no_pack { None } else { Some(t3proto::pack_from_balanced(&trits)) };
        let balanced = if no_balanced { None } else { Some(trits.clone()) };
        let record = t3proto::T3protoRecord {
            profile: proto_profile,
            width: img.width,
            height: img.height,
            n_trits: trits.len(),
            meta: b"{}".to_vec(),
            balanced,
            packed,
        };
        let mut out = BufWriter::new(File::create(output)?);
        t3proto::write(&mut out, &record)?;
        println!("{} wrote {} ({} trits)", "ok:".green().bold(), output.display(), record.n_trits);
        return Ok(());
    }

    let header = default_header(img.width, img.height);
    let pipeline = BodyPipeline::new();
    let pixels = img.to_quantized();
    let encoded = pipeline.encode_frame(&header, &pixels)?;
    let mut words = encoded.header_words.to_vec();
    words.extend(encoded.body_words);

    let mut out = BufWriter::new(File::create(output)?);
    t3p::write(&mut out, header.subword, img.width, img.height, b"{}", &words)?;
    println!(
        "{} wrote {} ({} words, {} pixels)",
        "ok:".green().bold(),
        output.display(),
        words.len(),
        encoded.num_pixels
    );
    Ok(())
}

fn cmd_info(file: &PathBuf) -> CliResult {
    let mut buf = Vec::new();
    File::open(file)?.read_to_end(&mut buf)?;
    let digest = blake3::hash(&buf);
    let mut cursor = buf.as_slice();

    match &buf[0..4.min(buf.len())] {
        b"T3P6" => {
            let (info, words) = t3p::read(&mut cursor, |_m| true)?;
            println!("{} .t3p", "format:".cyan().bold());
            println!("  version     {}", info.version);
            println!("  subword     {:?}", info.subword);
            println!("  size        {}x{}", info.width, info.height);
            println!("  words       {}", info.words_count);
            println!("  bytes       {}", words.len() * common::WORD_BYTES);
        }
        b"T3V6" => {
            let (header, meta, locations) = t3v::read_header(&mut cursor)?;
            println!("{} .t3v", "format:".cyan().bold());
            println!("  version     {}", header.version);
            println!("  subword     {:?}", header.subword);
            println!("  size        {}x{}", header.width, header.height);
            println!("  frames      {}", header.frame_count);
            println!("  global meta {} bytes", meta.len());
            for (i, loc) in locations.iter().enumerate() {
                println!("    frame {i}: {} words, {} meta bytes", loc.words, loc.meta_len);
            }
        }
        b"T3PT" => {
            let rec = t3proto::read(&mut cursor)?;
            println!("{} .t3proto", "format:".cyan().bold());
            println!("  profile     {:?}", rec.profile);
            println!("  size        {}x{}", rec.width, rec.height);
            println!("  trits       {}", rec.n_trits);
            println!("  balanced    {}", rec.balanced.is_some());
            println!("  packed      {}", rec.packed.is_some());
        }
        _ => return Err(CliError::Usage(format!("{}: unrecognized magic", file.display()))),
    }
    println!("  content hash {}", hex::encode(digest.as_bytes()));
    Ok(())
}

fn cmd_export_bal(file: &PathBuf, output: &PathBuf) -> CliResult {
    let mut buf = Vec::new();
    File::open(file)?.read_to_end(&mut buf)?;
    let mut cursor = buf.as_slice();
    let rec = t3proto::read(&mut cursor)?;
    let balanced = rec
        .balanced
        .or_else(|| rec.packed.as_ref().map(|p| t3proto::unpack_to_balanced(p, rec.n_trits)))
        .ok_or_else(|| CliError::Integrity("record carries neither representation".to_string()))?;
    let bytes: Vec<u8> = balanced.into_iter().map(|t| t as u8).collect();
    File::create(output)?.write_all(&bytes)?;
    println!("{} exported {} balanced trits to {}", "ok:".green().bold(), bytes.len(), output.display());
    Ok(())
}

fn cmd_export_unb(file: &PathBuf, output: &PathBuf) -> CliResult {
    let mut buf = Vec::new();
    File::open(file)?.read_to_end(&mut buf)?;
    let mut cursor = buf.as_slice();
    let rec = t3proto::read(&mut cursor)?;
    let balanced = rec
        .balanced
        .or_else(|| rec.packed.as_ref().map(|p| t3proto::unpack_to_balanced(p, rec.n_trits)))
        .ok_or_else(|| CliError::Integrity("record carries neither representation".to_string()))?;
    let bytes: Vec<u8> = balanced.into_iter().map(bal_to_unb).collect();
    File::create(output)?.write_all(&bytes)?;
    println!("{} exported {} unbalanced trits to {}", "ok:".green().bold(), bytes.len(), output.display());
    Ok(())
}

fn cmd_repack(input: &PathBuf, to: &str, output: &PathBuf) -> CliResult {
    let mut buf = Vec::new();
    File::open(input)?.read_to_end(&mut buf)?;
    let mut cursor = buf.as_slice();
    let mut rec = t3proto::read(&mut cursor)?;

    match to {
        "packed" => {
            if rec.packed.is_none() {
                let bal = rec.balanced.clone().ok_or_else(|| {
                    CliError::Integrity("record carries neither representation".to_string())
                })?;
                rec.packed = Some(t3proto::pack_from_balanced(&bal));
            }
            rec.balanced = None;
        }
        "balanced" => {
            if rec.balanced.is_none() {
                let packed = rec.packed.clone().ok_or_else(|| {
                    CliError::Integrity("record carries neither representation".to_string())
                })?;
                rec.balanced = Some(t3proto::unpack_to_balanced(&packed, rec.n_trits));
            }
            rec.packed = None;
        }
        other => return Err(CliError::Usage(format!("unknown --to {other}"))),
    }

    let mut out = BufWriter::new(File::create(output)?);
    t3proto::write(&mut out, &rec)?;
    println!("{} repacked to {} ({})", "ok:".green().bold(), output.display(), to);
    Ok(())
}

fn cmd_cat(output: &PathBuf, inputs: &[PathBuf]) -> CliResult {
    if inputs.is_empty() {
        return Err(CliError::Usage("cat requires at least one input file".to_string()));
    }
    let mut loaded = Vec::new();
    let mut subword = SubwordMode::S27;
    let mut width = 0u32;
    let mut height = 0u32;
    for path in inputs {
        let mut buf = Vec::new();
        File::open(path)?.read_to_end(&mut buf)?;
        let mut cursor = buf.as_slice();
        let (info, words) = t3p::read(&mut cursor, |_m| true)?;
        subword = info.subword;
        width = info.width;
        height = info.height;
        loaded.push(words);
    }

    let metas: Vec<Vec<u8>> = (0..loaded.len()).map(|i| format!("{{\"frame_seq\":{i}}}").into_bytes()).collect();
    let frames: Vec<t3v::FrameIn<'_>> =
        loaded.iter().zip(metas.iter()).map(|(w, m)| t3v::FrameIn { meta: m, words: w }).collect();

    let mut out_file = std::fs::OpenOptions::new().create(true).write(true).truncate(true).open(output)?;
    t3v::write(&mut out_file, subword, width, height, b"{}", &frames)?;
    println!("{} merged {} frames into {}", "ok:".green().bold(), frames.len(), output.display());
    Ok(())
}

fn cmd_dump(file: &PathBuf) -> CliResult {
    let mut buf = Vec::new();
    File::open(file)?.read_to_end(&mut buf)?;
    let mut cursor = buf.as_slice();
    let (info, words) = t3p::read(&mut cursor, |_m| true)?;
    if words.len() < 6 {
        return Err(CliError::Integrity("stream too short to carry a header transport".to_string()));
    }

    let parity: u32 = words.iter().flat_map(|w| w.symbols().iter().copied()).map(|s| s as u32).sum::<u32>() % 3;

    let pipeline = BodyPipeline::new();
    let mut header_words = [t3codec::word::Word27::zero(); 6];
    header_words.copy_from_slice(&words[0..6]);
    let body_words = &words[6..];
    let num_pixels = info.width as usize * info.height as usize;

    match pipeline.decode_frame(&header_words, body_words, num_pixels) {
        Ok(frame) => {
            println!("{} CRC12 valid, header and body recovered", "dump:".cyan().bold());
            println!("  frame_seq        {}", frame.header.frame_seq);
            println!("  header corrected {:?}", frame.header_corrected);
            println!("  body corrected   {:?}", frame.body_corrected);
            println!("  beacon values    {:?}", frame.beacon_values);
            println!("  parity mod 3     {}", parity);

            let canvas = ImageU8::from_quantized(info.width, info.height, &frame.pixels);
            let out_path = file.with_extension("dump.ppm");
            write_ppm(&out_path, &canvas)?;
            println!("  extracted image  {}", out_path.display());
        }
        Err(e) => {
            println!("{} recovery failed: {}", "dump:".yellow().bold(), e);
            println!("  parity mod 3     {}", parity);
            return Err(CliError::Integrity(e.to_string()));
        }
    }
    Ok(())
}
