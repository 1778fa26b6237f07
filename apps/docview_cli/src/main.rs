use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use docview_core::{load_settings, DocumentView, PendingFile};
use shared::{domain::DocumentId, protocol::Document};
use tracing_subscriber::EnvFilter;

const LIST_PREVIEW_CHARS: usize = 80;

#[derive(Parser, Debug)]
#[command(name = "docview", about = "Browse and manage OCR-processed documents")]
struct Args {
    /// Overrides the API base from docview.toml / DOCVIEW_API_BASE.
    #[arg(long, global = true)]
    api_base: Option<String>,
    /// Print store records as JSON.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List processed documents.
    List,
    /// Upload a file for OCR processing.
    Upload { path: PathBuf },
    /// Delete documents by id; several ids are removed in one batch request.
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Show a document's full text and embedding preview.
    Detail { id: String },
    /// Similarity search over document texts.
    Search { text: String },
    /// Number of stored documents.
    Count,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();
    tracing::debug!(command = ?args.command, "running command");

    let settings = load_settings().with_api_base_override(args.api_base.clone());
    let view = DocumentView::from_settings(&settings);

    match args.command {
        Command::List => {
            view.mount().await.context("failed to list documents")?;
            print_documents(&view.documents().await, args.json)?;
        }
        Command::Upload { path } => {
            let file = read_pending_file(&path).await?;
            view.choose_file(file).await;
            view.upload()
                .await
                .with_context(|| format!("failed to upload {}", path.display()))?;
            println!("Uploaded {}", path.display());
            print_documents(&view.documents().await, args.json)?;
        }
        Command::Delete { ids } => {
            if let [id] = ids.as_slice() {
                view.delete(&DocumentId::new(id.clone()))
                    .await
                    .with_context(|| format!("failed to delete document {id}"))?;
                println!("Deleted {id}");
            } else {
                let ids: Vec<DocumentId> = ids.into_iter().map(DocumentId::new).collect();
                let message = view
                    .delete_many(&ids)
                    .await
                    .context("failed to delete documents")?;
                println!("{}", message.unwrap_or_default());
            }
            print_documents(&view.documents().await, args.json)?;
        }
        Command::Detail { id } => {
            view.select(&DocumentId::new(id.clone()))
                .await
                .with_context(|| format!("failed to load document {id}"))?;
            let snapshot = view.snapshot().await;
            let doc = snapshot
                .selected_document()
                .ok_or_else(|| anyhow!("document {id} was not loaded"))?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(doc)?);
            } else {
                print_detail(doc);
            }
        }
        Command::Search { text } => {
            let hits = view.search(&text).await.context("search failed")?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else if hits.is_empty() {
                println!("No matches");
            } else {
                for hit in hits {
                    println!(
                        "{:.4}\t{}\t{}",
                        hit.similarity,
                        hit.id,
                        preview_line(&hit.text)
                    );
                }
            }
        }
        Command::Count => {
            let count = view.count().await.context("failed to count documents")?;
            println!("{count}");
        }
    }

    Ok(())
}

async fn read_pending_file(path: &Path) -> Result<PendingFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("{} has no file name", path.display()))?;
    Ok(PendingFile::new(filename, bytes))
}

fn print_documents(documents: &[Document], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(documents)?);
        return Ok(());
    }
    if documents.is_empty() {
        println!("No documents");
    }
    for doc in documents {
        println!("{}\t{}\t{}", doc.id, doc.created_at, preview_line(&doc.text));
    }
    Ok(())
}

fn print_detail(doc: &Document) {
    println!("{}", doc.text);
    println!();
    println!("ID: {}", doc.id);
    println!("Created: {}", doc.created_at);
    println!("Vector: {}", doc.embedding_preview());
}

fn preview_line(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default();
    let mut preview: String = line.chars().take(LIST_PREVIEW_CHARS).collect();
    if line.chars().count() > LIST_PREVIEW_CHARS || text.lines().nth(1).is_some() {
        preview.push_str("...");
    }
    preview
}
