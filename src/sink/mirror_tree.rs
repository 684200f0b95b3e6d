//! Mirror tree sink
//!
//! Writes one markdown file per page under `mirror/<host>/`, following the
//! page's URL path. Files are written as documents arrive; `finalize` only
//! counts what the tree holds.

use crate::document::Document;
use crate::sink::traits::{FinalizeSummary, Sink, SinkError, SinkResult};
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Directory of the mirror inside a collection directory
pub const MIRROR_DIR: &str = "mirror";

/// Hex characters of the query hash appended to file names
const QUERY_SUFFIX_LEN: usize = 8;

pub struct MirrorTreeSink {
    root: PathBuf,
    documents_written: u64,
}

impl MirrorTreeSink {
    pub fn new(collection_dir: &Path) -> Self {
        Self {
            root: collection_dir.join(MIRROR_DIR),
            documents_written: 0,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Sink for MirrorTreeSink {
    fn write(&mut self, document: &Document) -> SinkResult<()> {
        let url = Url::parse(&document.url)
            .map_err(|e| SinkError::InvalidUrl(format!("{}: {}", document.url, e)))?;
        let path = mirror_path(&self.root, &url)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, render_page(document))?;

        self.documents_written += 1;
        Ok(())
    }

    fn finalize(&mut self) -> SinkResult<FinalizeSummary> {
        Ok(FinalizeSummary {
            documents_written: self.documents_written,
            document_count: count_markdown_files(&self.root)?,
        })
    }
}

/// Maps a page URL to its file under `root`
///
/// # Mapping Rules
///
/// - `https://host/a/b` → `root/host/a/b.md`
/// - root or trailing-slash paths → `…/index.md`
/// - `.html` / `.htm` extensions are replaced with `.md`
/// - a query string adds a short hash suffix so variants do not collide
///
/// `:`, `\` and NUL inside a segment are percent-escaped, so
/// `/wiki/Help:Contents` lands in `wiki/Help%3AContents.md`. Segments equal
/// to `.` or `..` (also percent-encoded) are rejected, so no URL can escape
/// `root`.
pub fn mirror_path(root: &Path, url: &Url) -> SinkResult<PathBuf> {
    let host = url
        .host_str()
        .ok_or_else(|| SinkError::InvalidUrl(format!("{} has no host", url)))?;
    check_segment(url, host)?;

    let mut path = root.join(escape_segment(&host.to_lowercase()).as_ref());
    let raw_path = url.path();
    let segments: Vec<&str> = raw_path.split('/').filter(|s| !s.is_empty()).collect();
    for segment in &segments {
        check_segment(url, segment)?;
    }

    let (dirs, file_stem) = if raw_path.ends_with('/') || segments.is_empty() {
        (segments.as_slice(), "index".to_string())
    } else {
        let (last, dirs) = segments
            .split_last()
            .ok_or_else(|| SinkError::InvalidUrl(url.to_string()))?;
        (dirs, strip_html_extension(last).to_string())
    };

    for dir in dirs {
        path.push(escape_segment(dir).as_ref());
    }

    let file_stem = escape_segment(&file_stem);
    let file_name = match url.query() {
        Some(query) => format!("{}-{}.md", file_stem, query_suffix(query)),
        None => format!("{}.md", file_stem),
    };
    path.push(file_name);

    Ok(path)
}

fn check_segment(url: &Url, segment: &str) -> SinkResult<()> {
    let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
    if decoded == "." || decoded == ".." || segment.contains('/') {
        return Err(SinkError::UnsafePath {
            url: url.to_string(),
            segment: segment.to_string(),
        });
    }
    Ok(())
}

/// Percent-escapes the characters a file name cannot hold on every platform
fn escape_segment(segment: &str) -> Cow<'_, str> {
    if !segment.contains(&[':', '\\', '\0'][..]) {
        return Cow::Borrowed(segment);
    }

    let mut escaped = String::with_capacity(segment.len() + 4);
    for c in segment.chars() {
        match c {
            ':' => escaped.push_str("%3A"),
            '\\' => escaped.push_str("%5C"),
            '\0' => escaped.push_str("%00"),
            _ => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

fn strip_html_extension(segment: &str) -> &str {
    let lower = segment.to_ascii_lowercase();
    for extension in [".html", ".htm"] {
        if lower.ends_with(extension) && segment.len() > extension.len() {
            return &segment[..segment.len() - extension.len()];
        }
    }
    segment
}

fn query_suffix(query: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(query.as_bytes());
    hex::encode(hasher.finalize())[..QUERY_SUFFIX_LEN].to_string()
}

/// The file body: `# title` followed by the extracted markdown
fn render_page(document: &Document) -> String {
    let heading = format!("# {}", document.title);
    if document.title.is_empty() || document.body_markdown.starts_with(&heading) {
        format!("{}\n", document.body_markdown)
    } else {
        format!("{}\n\n{}\n", heading, document.body_markdown)
    }
}

fn count_markdown_files(dir: &Path) -> std::io::Result<u64> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            count += count_markdown_files(&entry.path())?;
        } else if entry.path().extension().map_or(false, |ext| ext == "md") {
            count += 1;
        }
    }
    Ok(count)
}
