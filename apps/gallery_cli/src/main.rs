use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use gallery_core::{
    load_config, CacheStatus, FetchOutcome, FileBlob, GalleryViewModel, GallerySession,
    NoticeKind, UploadDraft, UploadOutcome,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gallery", about = "Browse and upload images to a remote gallery")]
struct Args {
    /// Overrides the configured gallery API base url.
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[arg(long, global = true)]
    file_host_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the gallery, loading up to `pages` pages.
    List {
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    /// Validate and upload an image, then register it in the gallery.
    Upload {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
    },
    /// Print the original link of the image at `index`.
    View {
        #[arg(long)]
        index: usize,
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut config = load_config().context("failed to load gallery configuration")?;
    if let Some(url) = args.api_url {
        config.api_base_url = url;
    }
    if let Some(url) = args.file_host_url {
        config.file_host_url = url;
    }
    config.validate()?;
    debug!(api = %config.api_base_url, "gallery: configuration loaded");

    let mut session = GallerySession::from_config(&config)?;

    match args.command {
        Command::List { pages } => {
            load_pages(&session.view, pages).await?;
            print_gallery(&mut session.view).await;
        }
        Command::Upload {
            file,
            title,
            description,
        } => {
            let mut draft = UploadDraft::new(title, description).with_file(read_file(&file).await?);
            let outcome = session.uploads.submit_upload(&mut draft).await;
            draft.reset();
            report_upload(&outcome)?;
        }
        Command::View { index, pages } => {
            load_pages(&session.view, pages).await?;
            if !session.view.select_index(index).await {
                bail!("no image at index {index}");
            }
            if let Some(link) = session.view.selected().original_link() {
                println!("{link}");
            }
            session.view.clear_selection();
        }
    }

    Ok(())
}

async fn load_pages(view: &GalleryViewModel, pages: usize) -> Result<()> {
    if let FetchOutcome::Failed(err) = view.fetch_initial().await {
        bail!("failed to load gallery: {err}");
    }
    for _ in 1..pages {
        if !view.has_more().await {
            break;
        }
        if let FetchOutcome::Failed(err) = view.fetch_next().await {
            eprintln!("failed to load more images: {err}");
            break;
        }
    }
    Ok(())
}

async fn print_gallery(view: &mut GalleryViewModel) {
    for (idx, record) in view.flattened_images().await.iter().enumerate() {
        println!(
            "{idx:>3}  {}  {}  {}",
            record.title, record.description, record.url
        );
    }

    let snapshot = view.snapshot().await;
    let status = match snapshot.status {
        CacheStatus::Idle => "idle",
        CacheStatus::Loading => "loading",
        CacheStatus::Ready => "ready",
        CacheStatus::LoadingMore => "loading more",
        CacheStatus::Error => "error",
    };
    println!(
        "-- {} images, status {status}{}",
        snapshot.item_count,
        if snapshot.has_more {
            ", more available (use --pages)"
        } else {
            ""
        }
    );
}

async fn read_file(path: &Path) -> Result<FileBlob> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    let mime_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Ok(FileBlob::new(name, mime_type, bytes))
}

fn report_upload(outcome: &UploadOutcome) -> Result<()> {
    if let UploadOutcome::ValidationFailed(errors) = outcome {
        for failure in errors.failures() {
            eprintln!("{:?}: {failure}", failure.field());
        }
    }

    let Some(notice) = outcome.notice() else {
        bail!("another upload is still in progress");
    };
    match notice.kind {
        NoticeKind::Success => {
            println!("{}: {}", notice.title, notice.description);
            Ok(())
        }
        NoticeKind::Error => bail!("{}: {}", notice.title, notice.description),
    }
}
