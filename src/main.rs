use std::path::PathBuf;
use std::process::ExitCode;

use boxtree_pdf::{Config, Converter, DirFontLoader, Error, FsRasterizer, convert_json_file};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about = "Render a laid-out box tree (JSON) to PDF", long_about = None)]
struct Args {
    /// Box tree: one root object or an array of roots
    input: PathBuf,

    /// Output PDF path
    output: PathBuf,

    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Outline every box
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// Abort on the first missing image or font
    #[arg(long, default_value_t = false)]
    strict: bool,

    /// Directory holding <id>.ttf / <id>-bold.ttf fonts for non-Latin text
    #[arg(long)]
    font_dir: Option<PathBuf>,

    /// Base directory for image references (defaults to the input's directory)
    #[arg(long)]
    asset_dir: Option<PathBuf>,
}

fn load_config(args: &Args) -> Result<Config, Error> {
    let mut config = match &args.config {
        Some(path) => Config::from_json(&std::fs::read_to_string(path)?)?,
        None => Config::default(),
    };
    config.debug_overlay |= args.debug;
    config.strict_assets |= args.strict;
    Ok(config)
}

fn run(args: Args) -> Result<(), Error> {
    let config = load_config(&args)?;
    let asset_dir = args
        .asset_dir
        .clone()
        .or_else(|| args.input.parent().map(PathBuf::from))
        .unwrap_or_default();

    let mut converter = Converter::new(config).with_rasterizer(FsRasterizer::new(asset_dir));
    if let Some(dir) = &args.font_dir {
        converter = converter.with_font_loader(DirFontLoader::new(dir));
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(convert_json_file(&converter, &args.input, &args.output))
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    let output = args.output.clone();
    match run(args) {
        Ok(()) => {
            println!("Wrote {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error [{}]: {e}", e.code());
            ExitCode::FAILURE
        }
    }
}
