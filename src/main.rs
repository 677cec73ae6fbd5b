//! Command-line front end: exports a saved labeling session as YOLO labels.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use yolo_labeler::AppConfig;
use yolo_labeler::format::{ExportMode, LABELS_DIR, archive_name, write_dir, write_zip};
use yolo_labeler::image_source::FsImageSource;
use yolo_labeler::session::{ImageEntry, LabelingSession, MemoryPersistence, SessionFile};

#[derive(Parser, Debug)]
#[command(
    name = "yolo-labeler",
    version,
    about = "Export labeling sessions as YOLO BBox/OBB label files"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write the labels of a saved session as a zip or a labels directory
    Export(ExportArgs),
    /// Print the effective configuration as JSON
    Config,
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// Session file saved by the labeler
    #[arg(long)]
    session: PathBuf,
    /// Directory holding the session's images
    #[arg(long)]
    images: PathBuf,
    /// Label layout (bbox or obb); defaults to the configured mode
    #[arg(long)]
    mode: Option<ExportMode>,
    /// Output zip file, or output directory with --dir
    #[arg(long)]
    out: Option<PathBuf>,
    /// Write a labels directory instead of a zip
    #[arg(long)]
    dir: bool,
}

fn run_export(config: &AppConfig, args: ExportArgs) -> Result<(), String> {
    let file = SessionFile::load(&args.session).map_err(|e| e.to_string())?;
    let source = FsImageSource::new(&args.images);
    let entries = source
        .list_images()
        .map_err(|e| e.to_string())?
        .into_iter()
        .map(ImageEntry::new)
        .collect();

    let mut session = LabelingSession::new(entries);
    session.restore(file, &mut MemoryPersistence::new());

    let mut options = config.export_options();
    if let Some(mode) = args.mode {
        options.mode = mode;
    }
    let result = session.export(source, &options);
    for warning in &result.warnings {
        eprintln!("{}: {}", warning.image.as_deref().unwrap_or("-"), warning.message);
    }

    let base = if config.preferences.export_folder.is_empty() {
        args.images
    } else {
        PathBuf::from(&config.preferences.export_folder)
    };
    if args.dir {
        let dir = args.out.unwrap_or_else(|| base.join(LABELS_DIR));
        let written = write_dir(&result, &dir).map_err(|e| e.to_string())?;
        println!("Wrote {} files to {}", written.len(), dir.display());
    } else {
        let path = args.out.unwrap_or_else(|| base.join(archive_name(options.mode)));
        write_zip(&result, &path).map_err(|e| e.to_string())?;
        println!(
            "Exported {} boxes from {} images to {}",
            result.boxes_exported,
            result.images_exported,
            path.display()
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // The logger is not up yet, so a broken config file is reported directly
    let config = match AppConfig::try_load_from_default_path() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            eprintln!("Ignoring config file: {e}");
            AppConfig::default()
        }
    };

    // RUST_LOG wins over the configured level
    let mut logger = env_logger::Builder::new();
    logger.filter_level(config.preferences.log_level.to_level_filter());
    logger.parse_env("RUST_LOG");
    logger.init();

    let outcome = match cli.command {
        Commands::Export(args) => run_export(&config, args),
        Commands::Config => config
            .to_json()
            .map(|json| println!("{json}"))
            .map_err(|e| e.to_string()),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}
