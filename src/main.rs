use chrono::Utc;
use clap::{Parser, Subcommand};
use image::DynamicImage;
use photokit::config::{self, KitConfig};
use photokit::imaging::{
    self, DecodeRequest, OutputFormat, Rotation, RustBackend, circular_bitmap,
    circular_bitmap_sized, decode_bands, image_dimensions, load_bitmap, save_image, save_jpeg,
};
use photokit::naming::ImageStore;
use photokit::output::{self, ImageReport};
use photokit::remote;
use photokit::source::{DirectoryResolver, ImageSource, SourceOpener};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

#[derive(Parser)]
#[command(name = "photokit")]
#[command(about = "Load, shrink, reshape and store photos")]
#[command(long_about = "\
Load, shrink, reshape and store photos

A SOURCE is a local path, a file:// URI, a content:// handle (resolved under
--content-root) or an http(s):// URL. Large images are decoded at a coarser
sample size and retried with an even coarser one when they do not fit the
memory budget.

Output format follows the -o extension: .png writes PNG, anything else JPEG.

Run 'photokit gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Directory containing config.toml
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    /// Directory that content:// handles resolve under
    #[arg(long, global = true)]
    content_root: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show dimensions and decode hints for an image
    Info {
        source: String,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Decode, shrink to fit and optionally rotate
    Resize {
        source: String,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        max_width: Option<u32>,
        #[arg(long)]
        max_height: Option<u32>,
        /// Clockwise rotation in degrees (multiple of 90)
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        rotate: i32,
    },
    /// Cut a round avatar out of an image
    Circle {
        source: String,
        #[arg(short, long)]
        output: PathBuf,
        /// Scale the whole image to N×N before masking
        #[arg(long)]
        size: Option<u32>,
    },
    /// Split a very tall image into horizontal JPEG bands
    Bands {
        source: String,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Download a remote image as-is
    Fetch {
        url: Url,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Decode and store as a timestamp-named JPEG in the image directory
    Save { source: String },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = config::load_config(&cli.config_dir)?;
    let backend = RustBackend::with_memory_budget(config.decode.memory_budget_bytes());
    let mut opener = SourceOpener::new(config.network.clone());
    if let Some(root) = &cli.content_root {
        opener = opener.with_resolver(DirectoryResolver::new(root));
    }

    match cli.command {
        Command::Info { source, json } => {
            let source = ImageSource::parse(&source)?;
            let dims = image_dimensions(&backend, &opener, &source)?;
            let report = ImageReport::new(&source, dims, config.decode.max_width);
            if json {
                println!("{}", output::format_info_json(&report)?);
            } else {
                output::print_info(&report);
            }
        }
        Command::Resize {
            source,
            output: out,
            max_width,
            max_height,
            rotate,
        } => {
            let source = ImageSource::parse(&source)?;
            let defaults = config.decode.request();
            let request = DecodeRequest {
                max_width: max_width.unwrap_or(defaults.max_width),
                max_height: max_height.unwrap_or(defaults.max_height),
                rotation: Rotation::from_degrees(rotate)?,
                ..defaults
            };
            let image = load_bitmap(&backend, &opener, &source, &request)?;
            write_output(&backend, &config, &source, &image, &out)?;
        }
        Command::Circle {
            source,
            output: out,
            size,
        } => {
            let source = ImageSource::parse(&source)?;
            let image = load_bitmap(&backend, &opener, &source, &config.decode.request())?;
            let round = match size {
                Some(n) => circular_bitmap_sized(&image, n, n)?,
                None => circular_bitmap(&image),
            };
            write_output(&backend, &config, &source, &DynamicImage::ImageRgba8(round), &out)?;
        }
        Command::Bands {
            source,
            output: out,
        } => {
            let source = ImageSource::parse(&source)?;
            let data = opener.read_all(&source)?;
            let bands = decode_bands(&backend, &data, config.decode.band_height)?;
            std::fs::create_dir_all(&out)?;

            let quality = config.output.quality(OutputFormat::Jpeg);
            let mut written = Vec::with_capacity(bands.len());
            for (i, band) in bands.iter().enumerate() {
                let path = out.join(format!("band-{:03}.jpg", i + 1));
                save_jpeg(&backend, band, &path, quality)?;
                written.push((path, (band.width(), band.height())));
            }
            info!(source = %source, bands = written.len(), "split into bands");
            output::print_bands(&source.uri(), &written);
        }
        Command::Fetch { url, output: out } => {
            let bytes = remote::download_bytes(&url, &config.network)?;
            std::fs::write(&out, &bytes)?;
            output::print_fetched(url.as_str(), &out, bytes.len());
        }
        Command::Save { source } => {
            let source = ImageSource::parse(&source)?;
            let image = load_bitmap(&backend, &opener, &source, &config.decode.request())?;
            let mut output_config = config.output.clone();
            output_config.image_dir = std::path::absolute(&output_config.image_dir)?;
            let store = ImageStore::from_config(&output_config);
            let path = store.save_bitmap(&backend, &image, Utc::now())?;
            output::print_saved(
                &source.uri(),
                &path,
                (image.width(), image.height()),
                OutputFormat::Jpeg,
            );
        }
        Command::GenConfig => unreachable!("handled before config is loaded"),
    }

    Ok(())
}

/// Encode `image` to `out` in the format its extension names.
fn write_output(
    backend: &RustBackend,
    config: &KitConfig,
    source: &ImageSource,
    image: &DynamicImage,
    out: &Path,
) -> Result<(), imaging::ImagingError> {
    let format = OutputFormat::from_path(out);
    let path = save_image(backend, image, out, format, config.output.quality(format))?;
    output::print_saved(&source.uri(), &path, (image.width(), image.height()), format);
    Ok(())
}

fn init_logger(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("photokit=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("photokit=warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}
