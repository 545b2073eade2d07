use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use bivm::data::cursor::BinCursor;
use bivm::data::skins::{SkinResolver, UnresolvedSkins, VfsSkinResolver};
use bivm::models::bvm;
use bivm::models::model::Model;
use bivm::sniff::{AssetKind, sniff};
use bivm::textures::{TextureAsset, btf};
use clap::{ArgAction, Parser, Subcommand};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use itertools::Itertools;
use rayon::prelude::*;
use rootcause::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use vfs::{PhysicalFS, VfsPath};

/// Inspect and convert BVM models and BTF textures
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Raise log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Detect each file's format and print a short summary
    Info {
        /// .bvm / .btf files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print summaries as JSON
        #[arg(long)]
        json: bool,
    },
    /// Decode a model and list its frames and surfaces
    Model {
        file: PathBuf,

        /// Game data directory that skin paths are relative to. Skins are not
        /// loaded when omitted.
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
    },
    /// Decode a texture, optionally writing it out as PNG
    Texture {
        file: PathBuf,

        /// Flip rows after decoding
        #[arg(long)]
        flip: bool,

        /// PNG output path
        #[arg(long)]
        png: Option<PathBuf>,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Summary {
    Model {
        path: PathBuf,
        surfaces: usize,
        frames: usize,
        skins: Vec<String>,
    },
    Texture {
        path: PathBuf,
        width: u32,
        height: u32,
        version: String,
        frame_count: usize,
        has_embedded_defaults: bool,
    },
    Unknown {
        path: PathBuf,
    },
    Failed {
        path: PathBuf,
        error: String,
    },
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Summary::Model {
                path,
                surfaces,
                frames,
                skins,
            } => write!(
                f,
                "{}: {} with {surfaces} surfaces, {frames} frames, skins [{}]",
                path.display(),
                AssetKind::Model,
                skins.iter().join(", ")
            ),
            Summary::Texture {
                path,
                width,
                height,
                version,
                frame_count,
                ..
            } => write!(
                f,
                "{}: {} {version}, {width}x{height}, {frame_count} frames",
                path.display(),
                AssetKind::Texture
            ),
            Summary::Unknown { path } => write!(f, "{}: unrecognized", path.display()),
            Summary::Failed { path, error } => write!(f, "{}: failed: {error}", path.display()),
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_file(path: &Path) -> Result<Vec<u8>, Report> {
    let data = fs::read(path).context_with(|| format!("Could not read {}", path.display()))?;
    Ok(data)
}

fn model_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn decode_model(path: &Path, data: &[u8], skins: &dyn SkinResolver) -> Result<Model, Report> {
    let model = bvm::decode_model(&mut BinCursor::new(data), &model_name(path), skins)
        .context_with(|| format!("Failed to decode model {}", path.display()))?;
    Ok(model)
}

fn decode_texture(path: &Path, data: &[u8], flip: bool) -> Result<TextureAsset, Report> {
    let texture = btf::decode_texture(&mut BinCursor::new(data), flip)
        .context_with(|| format!("Failed to decode texture {}", path.display()))?;
    Ok(texture)
}

fn summarize(path: &Path) -> Result<Summary, Report> {
    let data = read_file(path)?;
    let path = path.to_path_buf();
    let summary = match sniff(&path, &data) {
        Some(AssetKind::Model) => {
            let model = decode_model(&path, &data, &UnresolvedSkins)?;
            let skins = model
                .surfaces
                .iter()
                .flat_map(|surface| surface.skins.iter().map(|skin| skin.name.clone()))
                .unique()
                .collect();
            Summary::Model {
                path,
                surfaces: model.surfaces.len(),
                frames: model.frames.len(),
                skins,
            }
        }
        Some(AssetKind::Texture) => {
            let texture = decode_texture(&path, &data, false)?;
            Summary::Texture {
                path,
                width: texture.width,
                height: texture.height,
                version: texture.version.to_string(),
                frame_count: texture.frame_count,
                has_embedded_defaults: texture.embedded_defaults.is_some(),
            }
        }
        None => Summary::Unknown { path },
    };
    Ok(summary)
}

/// Like [`summarize`], but a file that cannot be read or decoded becomes a
/// `Failed` entry so the other files are still reported.
fn summarize_or_failure(path: &Path) -> Summary {
    summarize(path).unwrap_or_else(|report| {
        warn!("{}: {report}", path.display());
        Summary::Failed {
            path: path.to_path_buf(),
            error: report.to_string(),
        }
    })
}

fn run_info(files: &[PathBuf], json: bool) -> Result<(), Report> {
    let summaries: Vec<Summary> = files.par_iter().map(|path| summarize_or_failure(path)).collect();

    if json {
        let out = serde_json::to_string_pretty(&summaries).context("Failed to serialize summaries")?;
        println!("{out}");
    } else {
        for summary in &summaries {
            println!("{summary}");
        }
    }
    Ok(())
}

fn run_model(file: &Path, data_dir: Option<PathBuf>) -> Result<(), Report> {
    let data = read_file(file)?;
    let resolver: Box<dyn SkinResolver> = match data_dir {
        Some(dir) => {
            debug!("resolving skins under {}", dir.display());
            Box::new(VfsSkinResolver::new(VfsPath::new(PhysicalFS::new(dir))))
        }
        None => Box::new(UnresolvedSkins),
    };
    let model = decode_model(file, &data, resolver.as_ref())?;

    println!("model {}", model.name);
    for (index, frame) in model.frames.iter().enumerate() {
        let size = frame.bounds.size();
        println!(
            "  frame {index:>4} {:<24} size {:.3} x {:.3} x {:.3}",
            frame.name, size[0], size[1], size[2]
        );
    }
    for surface in &model.surfaces {
        let triangles = surface
            .meshes
            .first()
            .map_or(0, |mesh| mesh.ranges.iter().map(|range| range.count).sum::<usize>() / 3);
        let skins = surface
            .skins
            .iter()
            .map(|skin| {
                let status = if skin.is_resolved() { "" } else { " (missing)" };
                format!("{}{status}", skin.name)
            })
            .join(", ");
        println!("  surface {}: {triangles} triangles, skins [{skins}]", surface.name);
    }
    Ok(())
}

fn write_png(texture: &TextureAsset, out: &Path) -> Result<(), Report> {
    let file = File::create(out).context_with(|| format!("Could not create {}", out.display()))?;
    PngEncoder::new(BufWriter::new(file))
        .write_image(
            &texture.pixels,
            texture.width,
            texture.height,
            ExtendedColorType::Rgba8,
        )
        .context("Failed to encode PNG")?;
    Ok(())
}

fn run_texture(file: &Path, flip: bool, png: Option<PathBuf>) -> Result<(), Report> {
    let data = read_file(file)?;
    let texture = decode_texture(file, &data, flip)?;

    println!(
        "texture {}: version {}, {}x{}, {} frames",
        file.display(),
        texture.version,
        texture.width,
        texture.height,
        texture.frame_count
    );
    if let Some(defaults) = &texture.embedded_defaults {
        println!(
            "  surface flags {:#X}, contents {:#X}, light {}, surface type {:?}",
            defaults.surface_flags, defaults.contents, defaults.light_value, defaults.surface_type
        );
    }
    if let Some(sprite) = &texture.sprite {
        println!(
            "  sprite orientation {}, render type {}",
            sprite.orientation, sprite.render_type
        );
    }

    if let Some(out) = png {
        write_png(&texture, &out)?;
        info!("wrote {}", out.display());
    }
    Ok(())
}

fn main() -> Result<(), Report> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Command::Info { files, json } => run_info(&files, json),
        Command::Model { file, data_dir } => run_model(&file, data_dir),
        Command::Texture { file, flip, png } => run_texture(&file, flip, png),
    }
}
