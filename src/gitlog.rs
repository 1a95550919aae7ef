use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, NaiveDate};

// git's default --format=%ad output, e.g. "Mon Jan 6 14:21:07 2025 +0900"
const GIT_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %Y %z";

pub(crate) trait DateSource {
    fn last_modified(&self, path: &Path) -> Option<NaiveDate>;
}

pub(crate) struct GitDateSource {
    root: PathBuf,
}

impl GitDateSource {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl DateSource for GitDateSource {
    fn last_modified(&self, path: &Path) -> Option<NaiveDate> {
        let output = Command::new("git")
            .args(["log", "-1", "--format=%ad", "--"])
            .arg(path)
            .current_dir(&self.root)
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        parse_git_date(String::from_utf8_lossy(&output.stdout).trim())
    }
}

fn parse_git_date(raw: &str) -> Option<NaiveDate> {
    if raw.is_empty() {
        // untracked paths produce no log output at all
        return None;
    }
    DateTime::parse_from_str(raw, GIT_DATE_FORMAT)
        .ok()
        .map(|moment| moment.date_naive())
}
