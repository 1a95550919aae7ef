use std::collections::BTreeSet;
use std::path::{Component, Path};

use crate::frontmatter::is_marker_line;

pub(crate) const MAX_CATEGORY_CHARS: usize = 12;
const MAX_DESCRIPTION_CHARS: usize = 150;
const MAX_INFERRED_TAGS: usize = 5;

// Fixed vocabulary matched as substrings against the file stem and the
// lowercased content.
const TECH_KEYWORDS: &[&str] = &[
    "docker",
    "python",
    "redis",
    "mysql",
    "database",
    "networking",
    "ssh",
    "vpn",
    "kvm",
    "virtualization",
    "linux",
    "arch",
    "ubuntu",
    "nginx",
    "apache",
    "ssl",
    "tls",
    "dns",
    "proxy",
    "cloudflare",
    "frappe",
    "react",
    "native",
    "mobile",
    "api",
    "rest",
    "json",
    "yaml",
    "bash",
    "shell",
    "script",
    "automation",
    "devops",
    "security",
    "firewall",
    "certificate",
    "backup",
    "restore",
];

#[derive(Debug, Clone)]
pub(crate) struct Inferred {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub categories: Vec<String>,
}

pub(crate) fn infer_metadata(text: &str, path: &Path) -> Inferred {
    let title = infer_title(text, path);
    let description = infer_description(text, &title);
    let categories: Vec<String> = infer_category(path).into_iter().collect();
    let tags = infer_tags(text, path, categories.first());

    Inferred {
        title,
        description,
        tags,
        categories,
    }
}

fn infer_title(text: &str, path: &Path) -> String {
    for line in text.lines() {
        if let Some(rest) = line.trim().strip_prefix("# ") {
            return rest.trim().to_string();
        }
    }

    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    title_case(&stem.replace(['-', '_'], " "))
}

// First non-empty, non-heading line outside a leading marker-delimited block.
// Once an opening marker is seen, lines are skipped until the block closes;
// a block that never closes yields no description at all.
fn infer_description(text: &str, title: &str) -> String {
    let mut in_block = false;
    let mut block_ended = false;

    for line in text.lines() {
        if is_marker_line(line) {
            if !in_block {
                in_block = true;
            } else {
                block_ended = true;
                continue;
            }
        }
        if in_block && !block_ended {
            continue;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut description: String = trimmed.chars().take(MAX_DESCRIPTION_CHARS).collect();
        if trimmed.chars().count() > MAX_DESCRIPTION_CHARS {
            description.push_str("...");
        }
        return description;
    }

    format!("Technical documentation about {}", title.to_lowercase())
}

// The first directory segment of the relative path; root-level files have
// no category.
pub(crate) fn infer_category(path: &Path) -> Option<String> {
    let mut segments = path.components().filter_map(|component| match component {
        Component::Normal(segment) => Some(segment),
        _ => None,
    });
    let first = segments.next()?;
    segments.next()?;

    let name = first.to_string_lossy();
    Some(name.chars().take(MAX_CATEGORY_CHARS).collect())
}

fn infer_tags(text: &str, path: &Path, category: Option<&String>) -> Vec<String> {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let lowered = text.to_lowercase();

    let mut candidates: BTreeSet<&str> = BTreeSet::new();
    if let Some(category) = category {
        candidates.insert(category.as_str());
    }
    for &keyword in TECH_KEYWORDS {
        if stem.contains(keyword) || lowered.contains(keyword) {
            candidates.insert(keyword);
        }
    }
    // the category already lives in its own field
    if let Some(category) = category {
        candidates.remove(category.as_str());
    }

    candidates
        .into_iter()
        .take(MAX_INFERRED_TAGS)
        .map(str::to_string)
        .collect()
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
