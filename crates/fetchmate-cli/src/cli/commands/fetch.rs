//! Fetch command handler: the CLI face of the fetch-link workflow.

use std::path::Path;

use anyhow::{Context, Result, bail};
use fetchmate_core::api::ApiClient;
use fetchmate_core::config::Config;
use fetchmate_core::fetch::{self, FetchOutcome, LinkMetadata};
use fetchmate_core::guard::{self, ENTRY_POINT_HINT, GuardDecision};

pub struct FetchRunOptions<'a> {
    pub api: &'a ApiClient,
    pub config: &'a Config,
    pub url: &'a str,
    pub convert_mp3: bool,
    pub download: bool,
    pub format_index: Option<usize>,
    pub output: Option<&'a Path>,
}

pub async fn run(opts: FetchRunOptions<'_>) -> Result<()> {
    // Guarded action: unauthenticated users get sent to the entry point.
    if guard::evaluate(opts.api.store()) == GuardDecision::RedirectToEntry {
        bail!(ENTRY_POINT_HINT);
    }

    let output_dir = opts
        .output
        .map_or_else(|| opts.config.resolve_download_dir(), Path::to_path_buf);

    let outcome = fetch::fetch_link(opts.api, opts.url, opts.convert_mp3).await?;

    match outcome {
        FetchOutcome::BinaryFile {
            bytes,
            suggested_name,
            ..
        } => {
            let saved = fetch::save_binary(&output_dir, &suggested_name, &bytes).await?;
            println!("Saved {}", saved.display());
            Ok(())
        }
        FetchOutcome::Metadata(metadata) => {
            render_metadata(&metadata);
            if opts.download {
                download_selected(&opts, &metadata, &output_dir).await
            } else {
                if metadata.default_selection().is_some() {
                    println!("\nRe-run with --download [--format N] to save one.");
                }
                Ok(())
            }
        }
        FetchOutcome::Failure { message } => bail!(message),
    }
}

async fn download_selected(
    opts: &FetchRunOptions<'_>,
    metadata: &LinkMetadata,
    output_dir: &Path,
) -> Result<()> {
    let index = opts.format_index.unwrap_or(0);
    let Some(format) = metadata.formats.get(index) else {
        bail!(
            "No format #{index}: this link offers {} format(s)",
            metadata.formats.len()
        );
    };

    let title = metadata.title.as_deref().unwrap_or_default();
    let saved = fetch::download_format(opts.api, format, title, output_dir)
        .await
        .context("Download failed")?;
    println!("Saved {}", saved.display());
    Ok(())
}

fn render_metadata(metadata: &LinkMetadata) {
    if let Some(title) = &metadata.title {
        println!("Title:    {title}");
    }
    if let Some(uploader) = &metadata.uploader {
        println!("Uploader: {uploader}");
    }
    if let Some(thumbnail) = &metadata.thumbnail {
        println!("Thumb:    {thumbnail}");
    }
    if let Some(label) = &metadata.format_label {
        println!("Format:   {label}");
    }
    if metadata.is_audio_auto() {
        println!("Audio link detected; `fetch --mp3` downloads it as audio.mp3.");
    }

    if metadata.formats.is_empty() {
        println!("No downloadable formats offered.");
        return;
    }
    println!("Formats:");
    for (i, format) in metadata.formats.iter().enumerate() {
        let marker = if i == 0 { "*" } else { " " };
        println!("  {marker} [{i}] {}", format.label());
    }
}
