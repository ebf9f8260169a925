use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use voxscope::{Options, VolumeFormat, VolumeSource};

#[derive(Parser, Debug)]
#[command(name = "voxscope", version, about = "Interactive scalar volume viewer")]
struct Cli {
    /// Volume file to open
    path: Option<PathBuf>,

    /// File format (guessed from the extension when omitted)
    #[arg(long, value_enum)]
    format: Option<Format>,

    /// Width in voxels, for headerless formats
    #[arg(long)]
    width: Option<u32>,

    /// Height in voxels, for headerless formats
    #[arg(long)]
    height: Option<u32>,

    /// Depth in voxels, for headerless formats
    #[arg(long)]
    depth: Option<u32>,

    /// JSON options file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Render one frame to this image file instead of opening a window
    #[arg(long, value_name = "OUT")]
    headless: Option<PathBuf>,

    /// Output size for headless rendering
    #[arg(long, value_name = "WxH", value_parser = parse_size)]
    size: Option<(u32, u32)>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Format {
    Raw8,
    Raw16,
    Raw,
    Pvm,
}

impl From<Format> for VolumeFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Raw8 => VolumeFormat::Raw8,
            Format::Raw16 => VolumeFormat::Raw16,
            Format::Raw => VolumeFormat::Raw,
            Format::Pvm => VolumeFormat::Pvm,
        }
    }
}

fn parse_size(text: &str) -> Result<(u32, u32), String> {
    let (w, h) = text
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got '{text}'"))?;
    let parse = |s: &str| {
        s.trim()
            .parse::<u32>()
            .ok()
            .filter(|&v| v > 0)
            .ok_or_else(|| format!("invalid size component '{s}'"))
    };
    Ok((parse(w)?, parse(h)?))
}

impl Cli {
    fn source(&self) -> Option<VolumeSource> {
        let path = self.path.clone()?;
        let format = self
            .format
            .map_or_else(|| VolumeFormat::from_path(&path), VolumeFormat::from);
        let mut source = VolumeSource::new(path, format);
        source.width = self.width;
        source.height = self.height;
        source.depth = self.depth;
        Some(source)
    }

    fn options(&self) -> voxscope::Result<Options> {
        let options = match &self.config {
            Some(path) => Options::from_json_file(path)?,
            None => Options::default(),
        };
        Ok(options.sanitized())
    }
}

fn run(cli: &Cli) -> voxscope::Result<()> {
    let options = cli.options()?;
    let source = cli.source();

    match &cli.headless {
        Some(out) => {
            let (width, height) = cli
                .size
                .unwrap_or((options.window_width, options.window_height));
            voxscope::render_to_file(&options, source, out, width, height)
        }
        None => voxscope::show(options, source),
    }
}

fn main() -> ExitCode {
    voxscope::init();
    let cli = Cli::parse();
    log::debug!("{cli:?}");

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("voxscope: {e}");
            ExitCode::FAILURE
        }
    }
}
