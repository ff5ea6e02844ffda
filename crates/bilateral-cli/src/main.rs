use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use argh::FromArgs;

use bilateral_image::{ops, Image};
use bilateral_imgproc::{color, filter};
use bilateral_io::functional::read_image_any;
use bilateral_io::png::{write_image_png_mono8, write_image_png_rgb8};

/// The filtering engine to run.
enum Engine {
    /// Exact per-pixel formulation, output shrinks by twice the radius.
    Direct,
    /// Fast approximation through a bilateral grid, full-size output.
    Grid,
}

impl FromStr for Engine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(Engine::Direct),
            "grid" => Ok(Engine::Grid),
            _ => Err(format!("unknown engine: {s} (expected direct or grid)")),
        }
    }
}

#[derive(FromArgs)]
/// Apply an edge-preserving bilateral filter to an image
struct Args {
    /// path to the input image
    #[argh(positional)]
    input: PathBuf,

    /// the neighborhood half-width for the direct engine
    #[argh(positional)]
    radius: usize,

    /// the sigma of the range (value) Gaussian
    #[argh(positional)]
    range_sigma: f32,

    /// path to the output image
    #[argh(positional)]
    output: PathBuf,

    /// append the filter timing to the output filename
    #[argh(switch, short = 'b')]
    benchmark: bool,

    /// the engine to run: direct or grid
    #[argh(option, default = "Engine::Direct")]
    engine: Engine,

    /// the sigma of the spatial Gaussian, defaults to radius / 2
    #[argh(option)]
    sigma_space: Option<f32>,
}

/// Insert a `_<N>ms` timing suffix before the output file extension.
fn timed_output_path(path: &Path, elapsed_ms: u128) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let file_name = match path.extension() {
        Some(ext) => format!("{}_{}ms.{}", stem, elapsed_ms, ext.to_string_lossy()),
        None => format!("{stem}_{elapsed_ms}ms"),
    };

    path.with_file_name(file_name)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Args = argh::from_env();
    env_logger::init();

    let sigma_space = args
        .sigma_space
        .unwrap_or_else(|| args.radius.max(1) as f32 / 2.0);

    // decode and move to the floating point working range [0, 1]
    let img = read_image_any(&args.input)?;
    log::info!(
        "loaded {} ({} x {})",
        args.input.display(),
        img.cols(),
        img.rows()
    );

    let mut img_f32 = Image::<f32, 3>::from_size_val(img.size(), 0.0)?;
    ops::cast_and_scale(&img, &mut img_f32, 1.0 / 255.0)?;

    let (elapsed_ms, output) = match args.engine {
        Engine::Direct => {
            if 2 * args.radius >= img.rows() || 2 * args.radius >= img.cols() {
                return Err(
                    filter::FilterError::InvalidRadius(args.radius, img.rows(), img.cols()).into(),
                );
            }

            let out_size = [
                img.cols() - 2 * args.radius,
                img.rows() - 2 * args.radius,
            ]
            .into();
            let mut filtered = Image::<f32, 3>::from_size_val(out_size, 0.0)?;

            let start = Instant::now();
            filter::bilateral_filter_direct(
                &img_f32,
                &mut filtered,
                args.radius,
                sigma_space,
                args.range_sigma,
            )?;
            let elapsed = start.elapsed();

            let mut out_u8 = Image::<u8, 3>::from_size_val(out_size, 0)?;
            ops::scale_and_cast(&filtered, &mut out_u8, 255.0)?;

            (elapsed.as_millis(), Output::Rgb(out_u8))
        }
        Engine::Grid => {
            // the grid engine is defined over a scalar value axis
            let mut gray = Image::<f32, 1>::from_size_val(img.size(), 0.0)?;
            color::gray_from_rgb(&img_f32, &mut gray)?;

            let mut filtered = Image::<f32, 1>::from_size_val(img.size(), 0.0)?;

            let start = Instant::now();
            filter::bilateral_filter_grid(&gray, &mut filtered, sigma_space, args.range_sigma)?;
            let elapsed = start.elapsed();

            let mut out_u8 = Image::<u8, 1>::from_size_val(img.size(), 0)?;
            ops::scale_and_cast(&filtered, &mut out_u8, 255.0)?;

            (elapsed.as_millis(), Output::Gray(out_u8))
        }
    };

    log::info!("filtered in {elapsed_ms} ms");

    let output_path = if args.benchmark {
        timed_output_path(&args.output, elapsed_ms)
    } else {
        args.output.clone()
    };

    match output {
        Output::Rgb(image) => write_image_png_rgb8(&output_path, &image)?,
        Output::Gray(image) => write_image_png_mono8(&output_path, &image)?,
    }

    log::info!("wrote {}", output_path.display());

    Ok(())
}

enum Output {
    Rgb(Image<u8, 3>),
    Gray(Image<u8, 1>),
}
