use std::{
    collections::VecDeque,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use log::{error, info, warn};

use crate::frontmatter;
use crate::gitlog::DateSource;
use crate::infer::{self, MAX_CATEGORY_CHARS};

#[derive(Debug, Clone)]
pub(crate) struct Options {
    pub repair_duplicates: bool,
    pub max_tags: Option<usize>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            repair_duplicates: true,
            max_tags: Some(5),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Summary {
    pub discovered: usize,
    pub processed: usize,
    pub updated: usize,
    pub failed: usize,
}

enum Outcome {
    Updated,
    Unchanged,
    // handled without touching the file, but not a success either
    Skipped,
}

pub(crate) fn discover(root: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut found = Vec::new();

    let mut pending = VecDeque::new();
    pending.push_back(PathBuf::new());
    while let Some(relative) = pending.pop_front() {
        let directory = root.join(&relative);
        for entry in fs::read_dir(&directory)
            .with_context(|| format!("while reading directory {:?}", directory))?
        {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            let meta = entry.metadata()?;

            if meta.is_dir() {
                if !name.starts_with('.') {
                    pending.push_back(relative.join(entry.file_name()));
                }
            } else if meta.is_file() && name.ends_with(".md") {
                found.push(relative.join(entry.file_name()));
            }
        }
    }

    Ok(found)
}

pub(crate) fn run_upsert(
    root: &Path,
    options: &Options,
    dates: &dyn DateSource,
) -> anyhow::Result<Summary> {
    let files = discover(root)?;
    println!("Found {} markdown files", files.len());

    let mut summary = Summary {
        discovered: files.len(),
        ..Summary::default()
    };
    for relative in &files {
        match process_file(root, relative, options, dates) {
            Ok(Outcome::Updated) => {
                summary.processed += 1;
                summary.updated += 1;
            }
            Ok(Outcome::Unchanged) => summary.processed += 1,
            Ok(Outcome::Skipped) => summary.failed += 1,
            Err(error) => {
                error!("{}: {:#}", relative.display(), error);
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

pub(crate) fn run_strip(root: &Path) -> anyhow::Result<Summary> {
    let files = discover(root)?;
    println!("Found {} markdown files", files.len());

    let mut summary = Summary {
        discovered: files.len(),
        ..Summary::default()
    };
    for relative in &files {
        match strip_file(root, relative) {
            Ok(Outcome::Updated) => {
                summary.processed += 1;
                summary.updated += 1;
            }
            Ok(Outcome::Unchanged) => summary.processed += 1,
            Ok(Outcome::Skipped) => summary.failed += 1,
            Err(error) => {
                error!("{}: {:#}", relative.display(), error);
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

fn process_file(
    root: &Path,
    relative: &Path,
    options: &Options,
    dates: &dyn DateSource,
) -> anyhow::Result<Outcome> {
    info!("Processing: {}", relative.display());

    let date = match dates.last_modified(relative) {
        Some(date) => date,
        None => {
            warn!(
                "Could not determine a modification date for {}, skipping",
                relative.display()
            );
            return Ok(Outcome::Skipped);
        }
    };

    let full_path = root.join(relative);
    let mut content = fs::read_to_string(&full_path)
        .with_context(|| format!("while reading {:?}", full_path))?;

    if options.repair_duplicates {
        if let Some(repaired) = frontmatter::repair_duplicate_headers(&content) {
            warn!(
                "Removed duplicate header blocks in {}",
                relative.display()
            );
            fs::write(&full_path, &repaired)
                .with_context(|| format!("while writing {:?}", full_path))?;
            content = repaired;
        }
    }

    let (header, body) = frontmatter::parse_document(&content);
    // a document that is all header still needs something to infer from
    let subject = if body.is_empty() { content.as_str() } else { body };
    let inferred = infer::infer_metadata(subject, relative);

    match header {
        None => {
            let rendered = frontmatter::serialize_header(
                &inferred.title,
                date,
                &inferred.description,
                &inferred.tags,
                &inferred.categories,
            )?;
            fs::write(&full_path, format!("{rendered}{body}"))
                .with_context(|| format!("while writing {:?}", full_path))?;
            info!("Added a new header to {}", relative.display());
            Ok(Outcome::Updated)
        }
        Some(mut existing) => {
            let mut changed = false;

            if existing.date != Some(date) {
                existing.date = Some(date);
                changed = true;
            }

            let no_categories = existing.categories.as_ref().map_or(true, |c| c.is_empty());
            if no_categories {
                if !inferred.categories.is_empty() {
                    existing.categories = Some(inferred.categories.clone());
                    changed = true;
                }
            } else if let Some(categories) = existing.categories.as_mut() {
                for category in categories.iter_mut() {
                    if category.chars().count() > MAX_CATEGORY_CHARS {
                        *category = category.chars().take(MAX_CATEGORY_CHARS).collect();
                        changed = true;
                    }
                }
            }

            if let (Some(cap), Some(tags)) = (options.max_tags, existing.tags.as_mut()) {
                if tags.len() > cap {
                    tags.truncate(cap);
                    changed = true;
                }
            }

            if !changed {
                info!("No updates needed for {}", relative.display());
                return Ok(Outcome::Unchanged);
            }

            let rendered = frontmatter::serialize_header(
                existing.title.as_deref().unwrap_or(&inferred.title),
                date,
                existing.description.as_deref().unwrap_or(&inferred.description),
                existing.tags.as_deref().unwrap_or(&inferred.tags),
                existing.categories.as_deref().unwrap_or(&inferred.categories),
            )?;
            fs::write(&full_path, format!("{rendered}{body}"))
                .with_context(|| format!("while writing {:?}", full_path))?;
            info!("Updated the header of {}", relative.display());
            Ok(Outcome::Updated)
        }
    }
}

fn strip_file(root: &Path, relative: &Path) -> anyhow::Result<Outcome> {
    info!("Processing: {}", relative.display());

    let full_path = root.join(relative);
    let content = fs::read_to_string(&full_path)
        .with_context(|| format!("while reading {:?}", full_path))?;

    if !frontmatter::starts_with_marker(&content) {
        info!("No header found in {}, skipping", relative.display());
        return Ok(Outcome::Unchanged);
    }

    match frontmatter::split_header_block(&content) {
        Some((_, body)) => {
            fs::write(&full_path, body)
                .with_context(|| format!("while writing {:?}", full_path))?;
            info!("Removed the header of {}", relative.display());
            Ok(Outcome::Updated)
        }
        None => {
            warn!(
                "Malformed header in {} (no closing marker), leaving it untouched",
                relative.display()
            );
            Ok(Outcome::Skipped)
        }
    }
}
