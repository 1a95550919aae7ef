use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

pub(crate) const RECOGNIZED_KEYS: [&str; 6] = [
    "title:",
    "date:",
    "description:",
    "tags:",
    "categories:",
    "permalink:",
];

const PERMALINK_TEMPLATE: &str = "posts/{{ title | slug }}/index.html";

// Parsed form of an existing header. Fields of the wrong shape fail
// deserialization as a whole, which callers treat as "no header".
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub(crate) struct Header {
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
    pub permalink: Option<String>,
    pub tags: Option<Vec<String>>,
    pub categories: Option<Vec<String>>,
}

#[derive(Serialize)]
struct HeaderDoc<'a> {
    title: &'a str,
    date: NaiveDate,
    description: &'a str,
    permalink: &'a str,
    tags: &'a [String],
    categories: &'a [String],
}

// Two-token grammar over marker lines:
//   HeaderStart    := MarkerLine KeyLine
//   HorizontalRule := MarkerLine not followed by a KeyLine
pub(crate) fn is_marker_line(line: &str) -> bool {
    line.trim() == "---"
}

pub(crate) fn is_key_line(line: &str) -> bool {
    let lowered = line.to_lowercase();
    RECOGNIZED_KEYS.iter().any(|key| lowered.contains(key))
}

fn is_header_start(lines: &[&str], at: usize) -> bool {
    is_marker_line(lines[at]) && lines.get(at + 1).map_or(false, |next| is_key_line(next))
}

fn header_block_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        RegexBuilder::new(r"\A---[ \t]*\r?\n(.*?)\r?\n---[ \t]*(?:\r?\n(.*))?\z")
            .dot_matches_new_line(true)
            .build()
            .unwrap()
    })
}

pub(crate) fn starts_with_marker(content: &str) -> bool {
    // the opening marker must sit at column 0, like the block pattern expects
    content.starts_with("---") && content.lines().next().map_or(false, is_marker_line)
}

// Splits a document into its leading delimited block and the remaining body
// (leading blank lines stripped). None if the document does not start with a
// marker line or the block never closes.
pub(crate) fn split_header_block(content: &str) -> Option<(&str, &str)> {
    let captures = header_block_pattern().captures(content)?;
    let block = captures.get(1)?.as_str();
    let body = captures.get(2).map_or("", |m| m.as_str());
    Some((block, body.trim_start_matches('\n')))
}

pub(crate) fn parse_document(content: &str) -> (Option<Header>, &str) {
    match split_header_block(content) {
        Some((block, body)) => match serde_yaml::from_str::<Header>(block) {
            Ok(header) => (Some(header), body),
            Err(error) => {
                log::debug!("unparseable header block, treating as content: {error}");
                (None, content)
            }
        },
        None => (None, content),
    }
}

pub(crate) fn serialize_header(
    title: &str,
    date: NaiveDate,
    description: &str,
    tags: &[String],
    categories: &[String],
) -> anyhow::Result<String> {
    let doc = HeaderDoc {
        title,
        date,
        description,
        // the template is evaluated downstream, never here
        permalink: PERMALINK_TEMPLATE,
        tags,
        categories,
    };
    let yaml = serde_yaml::to_string(&doc)?;
    Ok(format!("---\n{yaml}---\n\n"))
}

fn complete_header_blocks(lines: &[&str]) -> Vec<(usize, usize)> {
    let mut blocks = Vec::new();
    let mut at = 0;
    while at < lines.len() {
        if !is_header_start(lines, at) {
            at += 1;
            continue;
        }
        let mut close = at + 1;
        while close < lines.len() && !is_marker_line(lines[close]) {
            close += 1;
        }
        if close == lines.len() {
            // unterminated block: everything from here on is content
            break;
        }
        blocks.push((at, close));
        at = close + 1;
    }
    blocks
}

// Keeps the first complete header block verbatim and drops every later
// complete block. Returns None when there is nothing to repair.
pub(crate) fn repair_duplicate_headers(content: &str) -> Option<String> {
    let lines: Vec<&str> = content.split('\n').collect();
    let blocks = complete_header_blocks(&lines);
    if blocks.len() < 2 {
        return None;
    }

    let mut keep = vec![true; lines.len()];
    for &(start, end) in &blocks[1..] {
        for flag in &mut keep[start..=end] {
            *flag = false;
        }
    }

    let kept: Vec<&str> = lines
        .iter()
        .zip(&keep)
        .filter(|(_, keep)| **keep)
        .map(|(line, _)| *line)
        .collect();
    Some(kept.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn marker_line_grammar() {
        assert!(is_marker_line("---"));
        assert!(is_marker_line("---  "));
        assert!(is_marker_line("  ---"));
        assert!(!is_marker_line("----"));
        assert!(!is_marker_line("--- x"));
        assert!(!is_marker_line(""));
    }

    #[test]
    fn key_line_grammar() {
        assert!(is_key_line("title: Hello"));
        assert!(is_key_line("  Tags: [a]"));
        assert!(is_key_line("permalink: /x"));
        assert!(!is_key_line("just some prose"));
        assert!(!is_key_line("***"));
    }

    #[test]
    fn parse_document_with_header() {
        let content = "---\ntitle: Hello\ndate: 2024-01-05\ntags:\n- docker\n---\n\nBody text.\n";
        let (header, body) = parse_document(content);
        let header = header.unwrap();
        assert_eq!(header.title.as_deref(), Some("Hello"));
        assert_eq!(header.date, Some(date(2024, 1, 5)));
        assert_eq!(header.tags, Some(vec!["docker".to_string()]));
        assert_eq!(header.description, None);
        assert_eq!(body, "Body text.\n");
    }

    #[test]
    fn parse_document_without_marker() {
        let content = "# Just a heading\n\nText.\n";
        let (header, body) = parse_document(content);
        assert!(header.is_none());
        assert_eq!(body, content);
    }

    #[test]
    fn parse_document_unterminated_block() {
        let content = "---\ntitle: Hello\nno closing marker\n";
        let (header, body) = parse_document(content);
        assert!(header.is_none());
        assert_eq!(body, content);
    }

    #[test]
    fn parse_document_malformed_yaml_falls_back() {
        let content = "---\ntitle: [unclosed\n---\n\nBody.\n";
        let (header, body) = parse_document(content);
        assert!(header.is_none());
        assert_eq!(body, content);
    }

    #[test]
    fn parse_document_rejects_wrong_shapes() {
        // tags must be a sequence; a scalar fails the whole header
        let content = "---\ntitle: Hello\ntags: docker\n---\n\nBody.\n";
        let (header, body) = parse_document(content);
        assert!(header.is_none());
        assert_eq!(body, content);
    }

    #[test]
    fn parse_document_drops_unknown_keys() {
        let content = "---\ntitle: Hello\nauthor: someone\n---\n\nBody.\n";
        let (header, _) = parse_document(content);
        assert_eq!(header.unwrap().title.as_deref(), Some("Hello"));
    }

    #[test]
    fn serialize_header_canonical_form() {
        let tags = vec!["docker".to_string(), "ssh".to_string()];
        let categories = vec!["docs".to_string()];
        let rendered = serialize_header(
            "Setup Guide",
            date(2024, 1, 5),
            "Install with docker and ssh.",
            &tags,
            &categories,
        )
        .unwrap();
        assert_eq!(
            rendered,
            "---\n\
             title: Setup Guide\n\
             date: 2024-01-05\n\
             description: Install with docker and ssh.\n\
             permalink: posts/{{ title | slug }}/index.html\n\
             tags:\n\
             - docker\n\
             - ssh\n\
             categories:\n\
             - docs\n\
             ---\n\n"
        );
    }

    #[test]
    fn serialize_header_empty_lists() {
        let rendered = serialize_header("Note", date(2024, 1, 5), "Text.", &[], &[]).unwrap();
        assert!(rendered.contains("tags: []\n"));
        assert!(rendered.contains("categories: []\n"));
    }

    #[test]
    fn serialized_header_parses_back() {
        let tags = vec!["docker".to_string()];
        let categories = vec!["docs".to_string()];
        let rendered =
            serialize_header("Hello", date(2024, 1, 5), "Some text.", &tags, &categories).unwrap();
        let content = format!("{rendered}Body.\n");
        let (header, body) = parse_document(&content);
        let header = header.unwrap();
        assert_eq!(header.title.as_deref(), Some("Hello"));
        assert_eq!(header.date, Some(date(2024, 1, 5)));
        assert_eq!(header.description.as_deref(), Some("Some text."));
        assert_eq!(header.tags, Some(tags));
        assert_eq!(header.categories, Some(categories));
        assert_eq!(body, "Body.\n");
    }

    #[test]
    fn repair_removes_later_blocks() {
        let content = "---\ntitle: A\n---\n\n---\ntitle: B\n---\n\nBody\n";
        let repaired = repair_duplicate_headers(content).unwrap();
        assert_eq!(repaired, "---\ntitle: A\n---\n\n\nBody\n");
    }

    #[test]
    fn repair_keeps_first_block_verbatim() {
        let content = "---\ntitle: A\ndate: 2020-02-02\n---\nText\n---\ntitle: B\n---\nMore\n";
        let repaired = repair_duplicate_headers(content).unwrap();
        assert!(repaired.starts_with("---\ntitle: A\ndate: 2020-02-02\n---\n"));
        assert!(!repaired.contains("title: B"));
        assert!(repaired.contains("Text"));
        assert!(repaired.contains("More"));
    }

    #[test]
    fn repair_ignores_horizontal_rules() {
        let content = "---\ntitle: A\n---\n\nSome text\n\n---\n\nMore text\n";
        assert!(repair_duplicate_headers(content).is_none());
    }

    #[test]
    fn repair_retains_unterminated_block() {
        let content = "---\ntitle: A\n---\n\n---\ntitle: B\nnever closed\n";
        assert!(repair_duplicate_headers(content).is_none());
    }

    #[test]
    fn split_strips_leading_blank_lines_from_body() {
        let content = "---\ntitle: A\n---\n\n\nHello\n";
        let (_, body) = split_header_block(content).unwrap();
        assert_eq!(body, "Hello\n");
    }

    #[test]
    fn split_handles_marker_at_end_of_file() {
        let content = "---\ntitle: A\n---";
        let (block, body) = split_header_block(content).unwrap();
        assert_eq!(block, "title: A");
        assert_eq!(body, "");
    }
}
