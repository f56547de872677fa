use clap::{Parser, Subcommand};
use dicom_codec::{CodecOptions, DicomDocument, Tag};
use dicom_scan::{walk_directory, Config, FileOutcome};
use dicom_tool as tool;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dicom-tool", about = "Inspect, scan and edit DICOM files")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Print every element of a file in tag order
    Dump {
        input: PathBuf,
    },
    /// Decode every file under a directory
    Scan {
        root: PathBuf,
        /// Number of files decoded at once (overrides the config file)
        #[arg(short, long)]
        workers: Option<usize>,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove one element from a file without re-encoding the rest
    Strip {
        #[arg(short, long)]
        input: PathBuf,
        /// Tag to remove, e.g. 0010,0010
        #[arg(short, long)]
        tag: Tag,
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    dicom_scan::init_logging(&config.logging)?;

    match cli.cmd {
        Cmd::Dump { input } => {
            let document = DicomDocument::open(&input, &config.codec_options())?;
            println!("# {}", input.display());
            println!("# Transfer syntax: {}", document.transfer_syntax);
            for line in document.describe() {
                println!("{}", line);
            }
            Ok(())
        }
        Cmd::Scan {
            root,
            workers,
            json,
        } => {
            if let Some(workers) = workers {
                config.scan.workers = workers;
                config.validate()?;
            }
            let summary = walk_directory(&root, &config, |outcome| {
                if json {
                    return;
                }
                match outcome {
                    FileOutcome::Parsed { path, document } => println!(
                        "OK    {} ({} elements, {})",
                        path.display(),
                        document.dataset.len(),
                        document.transfer_syntax
                    ),
                    FileOutcome::Skipped { path, .. } => println!("SKIP  {}", path.display()),
                    FileOutcome::Failed { path, error } => {
                        println!("FAIL  {}: {}", path.display(), error)
                    }
                }
            })
            .await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!(
                    "{} files: {} parsed, {} skipped, {} failed",
                    summary.total, summary.parsed, summary.skipped, summary.failed
                );
            }
            Ok(())
        }
        Cmd::Strip { input, tag, output } => {
            let source = std::fs::read(&input)?;
            let options: CodecOptions = config.codec_options();
            let stripped = tool::strip_tag(&source, tag, &options)?;
            std::fs::write(&output, &stripped)?;
            tracing::info!(
                "Removed {} ({} bytes) from {}",
                tag,
                source.len() - stripped.len(),
                input.display()
            );
            eprintln!("Wrote {}", output.display());
            Ok(())
        }
    }
}
