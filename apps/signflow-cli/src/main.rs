//! signflow command line
//!
//! Signs, edits, merges and converts documents stored on local disk.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use clap::{Parser, Subcommand};
use signflow_core::{
    Config, Converter, Document, EditCommand, EditPipeline, EditRequest, OverlayEngine,
    SignatureRequest, StorageLayout, TargetFormat, TextBlock,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "signflow")]
#[command(version, about = "Sign, edit and convert stored documents")]
struct Args {
    /// LibreOffice executable (overrides SIGNFLOW_SOFFICE_PATH)
    #[arg(long, global = true)]
    soffice: Option<PathBuf>,

    /// Root for relative document paths (overrides SIGNFLOW_UPLOAD_DIR)
    #[arg(long, global = true)]
    upload_dir: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stamp a signature image onto a stored PDF
    Sign {
        document: PathBuf,
        /// PNG or JPEG signature image
        #[arg(long)]
        image: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        x: i32,
        #[arg(long)]
        y: i32,
        #[arg(long)]
        width: Option<i32>,
        #[arg(long)]
        height: Option<i32>,
    },
    /// Apply text, image and replacement blocks from a JSON edit request
    Edit {
        document: PathBuf,
        #[arg(long)]
        request: PathBuf,
    },
    /// Insert free text at a baseline position
    AddText {
        document: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        x: i32,
        #[arg(long)]
        y: i32,
        #[arg(long)]
        font_size: Option<f32>,
        text: String,
    },
    /// Run a JSON edit command ({"type": "Sign" | "ApplyEdits" | "SaveHtml", ...})
    Run {
        document: PathBuf,
        #[arg(long)]
        command: PathBuf,
    },
    /// Concatenate PDFs in the given order
    Merge {
        #[arg(short, long)]
        output: PathBuf,
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// Convert a file with LibreOffice
    Convert {
        input: PathBuf,
        #[arg(long)]
        to: TargetFormat,
        #[arg(long)]
        out_dir: PathBuf,
    },
    /// Print the editable HTML for a stored document
    EditHtml {
        document: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Render edited HTML back into the stored document
    SaveHtml {
        document: PathBuf,
        #[arg(long)]
        html: PathBuf,
    },
    /// Write a converted copy of a stored document
    Export {
        document: PathBuf,
        #[arg(long)]
        to: TargetFormat,
        /// Defaults to the document's base name with the target extension
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Remove a stored document's file
    Delete { document: PathBuf },
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn stored_document(path: &Path) -> Document {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Document::new(0, file_name, path)
}

fn export_name(doc: &Document, format: TargetFormat) -> PathBuf {
    PathBuf::from(format!("{}.{}", doc.base_name(), format.extension()))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = Config::from_env();
    if let Some(soffice) = args.soffice {
        config.soffice_path = soffice;
    }
    if let Some(upload_dir) = args.upload_dir {
        config.upload_dir = upload_dir;
    }

    let overlay = OverlayEngine::default();
    let converter = Converter::from_config(&config);
    let storage = StorageLayout::from_config(&config);
    let pipeline = EditPipeline::new(&overlay, &converter, &storage);

    match args.command {
        Command::Sign {
            document,
            image,
            page,
            x,
            y,
            width,
            height,
        } => {
            let bytes = fs::read(&image).with_context(|| format!("reading {}", image.display()))?;
            let request = SignatureRequest {
                signature_image: STANDARD.encode(bytes),
                page,
                x,
                y,
                width,
                height,
            };
            let mut doc = stored_document(&document);
            pipeline.sign(&mut doc, &request).context("signing failed")?;
            info!("{} is now {:?}", document.display(), doc.status);
        }
        Command::Edit { document, request } => {
            let edits: EditRequest = read_json(&request)?;
            let mut doc = stored_document(&document);
            pipeline
                .apply_edits(&mut doc, &edits)
                .context("editing failed")?;
        }
        Command::AddText {
            document,
            page,
            x,
            y,
            font_size,
            text,
        } => {
            let block = TextBlock {
                page,
                x,
                y,
                text,
                font_size,
            };
            let mut doc = stored_document(&document);
            pipeline
                .add_text(&mut doc, &block)
                .context("adding text failed")?;
        }
        Command::Run { document, command } => {
            let command: EditCommand = read_json(&command)?;
            let mut doc = stored_document(&document);
            let outcome = pipeline
                .run(&mut doc, &command)
                .with_context(|| format!("{} failed", command.name()))?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::Merge { output, inputs } => {
            let merged = overlay.merge_documents(inputs.as_slice()).context("merge failed")?;
            fs::write(&output, merged).with_context(|| format!("writing {}", output.display()))?;
            info!("Merged {} files into {}", inputs.len(), output.display());
        }
        Command::Convert { input, to, out_dir } => {
            let converted = converter
                .convert(&input, &out_dir, to)
                .context("conversion failed")?;
            println!("{}", converted.display());
        }
        Command::EditHtml { document, output } => {
            let html = pipeline
                .editable_html(&stored_document(&document))
                .context("HTML conversion failed")?;
            match output {
                Some(path) => fs::write(&path, html)
                    .with_context(|| format!("writing {}", path.display()))?,
                None => std::io::stdout().write_all(html.as_bytes())?,
            }
        }
        Command::SaveHtml { document, html } => {
            let edited =
                fs::read_to_string(&html).with_context(|| format!("reading {}", html.display()))?;
            let mut doc = stored_document(&document);
            pipeline
                .save_html(&mut doc, &edited)
                .context("saving HTML failed")?;
        }
        Command::Export {
            document,
            to,
            output,
        } => {
            let doc = stored_document(&document);
            let bytes = pipeline.export(&doc, to).context("export failed")?;
            let output = output.unwrap_or_else(|| export_name(&doc, to));
            fs::write(&output, bytes).with_context(|| format!("writing {}", output.display()))?;
            info!("Exported {} to {}", document.display(), output.display());
        }
        Command::Delete { document } => {
            pipeline.delete_file(&stored_document(&document));
        }
    }

    Ok(())
}
