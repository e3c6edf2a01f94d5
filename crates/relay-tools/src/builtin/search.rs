use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context};
use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::definition::{parse_params, title_field, ToolDefinition, ToolError, ToolOutput};
use crate::ToolContext;

/// `*` stays within one path segment. Leading dots are checked per segment
/// by [`Segment::Name`], not by the matcher.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// File selection used by `grep` when no `include` is given.
const DEFAULT_INCLUDE: &str = "**/*";

/// One `/`-separated piece of a glob pattern.
#[derive(Debug)]
enum Segment {
    /// `**`: zero or more visible, non-symlinked directories.
    AnyDirs,
    /// A single entry name. Hidden entries only match when the segment
    /// itself starts with a literal `.`.
    Name { pattern: Pattern, dotted: bool },
}

/// A pattern split into the literal directory it starts from and the
/// segments matched while walking below it.
#[derive(Debug)]
struct GlobSpec {
    root: PathBuf,
    segments: Vec<Segment>,
}

impl GlobSpec {
    fn parse(base: &Path, pattern: &str) -> anyhow::Result<Self> {
        let mut root = if pattern.starts_with('/') {
            PathBuf::from("/")
        } else {
            base.to_path_buf()
        };
        let mut segments = Vec::new();

        for part in pattern.split('/').filter(|p| !p.is_empty()) {
            let magic = part.contains(['*', '?', '[']);
            if segments.is_empty() && !magic {
                root.push(part);
                continue;
            }
            if part == "**" {
                if !matches!(segments.last(), Some(Segment::AnyDirs)) {
                    segments.push(Segment::AnyDirs);
                }
                continue;
            }
            let compiled = Pattern::new(part)
                .with_context(|| format!("invalid glob pattern: {pattern}"))?;
            segments.push(Segment::Name {
                pattern: compiled,
                dotted: part.starts_with('.'),
            });
        }

        Ok(Self {
            root: normalize(&root),
            segments,
        })
    }
}

/// Lexically resolve `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// Collect every path below `dir` matching `segments`.
///
/// `**` never descends into hidden directories or through symlinks, so a
/// link back to an ancestor cannot loop. Names that are not valid UTF-8
/// never match a pattern segment. Unreadable directories are skipped.
fn walk(dir: &Path, segments: &[Segment], out: &mut Vec<PathBuf>) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(dir = %dir.display(), error = %e, "cannot read directory, skipping");
            return;
        }
    };

    match first {
        Segment::AnyDirs => {
            if !rest.is_empty() {
                walk(dir, rest, out);
            }
            for entry in entries.flatten() {
                if is_hidden(&entry.file_name()) {
                    continue;
                }
                let path = entry.path();
                if rest.is_empty() {
                    out.push(path.clone());
                }
                if entry.file_type().is_ok_and(|t| t.is_dir()) {
                    walk(&path, segments, out);
                }
            }
        }
        Segment::Name { pattern, dotted } => {
            for entry in entries.flatten() {
                let file_name = entry.file_name();
                let Some(name) = file_name.to_str() else {
                    tracing::debug!(name = ?file_name, "non UTF-8 file name, skipping");
                    continue;
                };
                if name.starts_with('.') && !dotted {
                    continue;
                }
                if !pattern.matches_with(name, MATCH_OPTIONS) {
                    continue;
                }
                let path = entry.path();
                if rest.is_empty() {
                    out.push(path);
                } else if path.is_dir() {
                    walk(&path, rest, out);
                }
            }
        }
    }
}

/// Expand `pattern` relative to `base` into sorted, lexically normalized
/// paths. A pattern without wildcards yields its path when it exists.
fn glob_under(base: &Path, pattern: &str) -> anyhow::Result<Vec<PathBuf>> {
    if !base.is_dir() {
        bail!("{} is not a directory", base.display());
    }

    let spec = GlobSpec::parse(base, pattern)?;
    let mut matches = Vec::new();
    if spec.segments.is_empty() {
        if spec.root.symlink_metadata().is_ok() {
            matches.push(spec.root);
        }
        return Ok(matches);
    }

    walk(&spec.root, &spec.segments, &mut matches);
    matches.sort();
    matches.dedup();
    Ok(matches)
}

/// Run a directory walk on the blocking pool.
async fn blocking<T, F>(f: F) -> anyhow::Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .context("search task panicked")?
}

// ---------------------------------------------------------------------------
// GlobTool
// ---------------------------------------------------------------------------

/// Find paths matching a glob pattern.
pub struct GlobTool;

#[derive(Debug, Deserialize)]
struct GlobParams {
    pattern: String,
    #[serde(default)]
    path: Option<String>,
}

#[derive(Debug, Serialize)]
struct GlobResult {
    matches: Vec<String>,
}

#[async_trait::async_trait]
impl ToolDefinition for GlobTool {
    fn name(&self) -> &str {
        "glob"
    }

    fn description(&self) -> &str {
        "Find files matching a glob pattern (e.g., \"**/*.rs\"), returning absolute paths"
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "pattern": {
                    "type": "string",
                    "description": "Glob pattern, relative to path (e.g., \"*.txt\", \"src/**/*.rs\")"
                },
                "path": {
                    "type": "string",
                    "description": "Base directory to search in (defaults to the working directory)"
                }
            },
            "required": ["pattern"]
        })
    }

    fn title(&self, params: &Value) -> String {
        format!("glob {}", title_field(params, "pattern"))
    }

    async fn execute(&self, ctx: &ToolContext, params: Value) -> Result<ToolOutput, ToolError> {
        let params: GlobParams = parse_params(self.name(), params)?;
        let base = ctx.resolve(params.path.as_deref().unwrap_or("."));
        let pattern = params.pattern.clone();

        let paths = blocking(move || glob_under(&base, &pattern))
            .await
            .with_context(|| format!("Failed to glob pattern {}", params.pattern))?;

        let matches = paths
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        ToolOutput::from_result(&GlobResult { matches })
    }
}

// ---------------------------------------------------------------------------
// GrepTool
// ---------------------------------------------------------------------------

/// Substring search over the lines of every file selected by `include`.
pub struct GrepTool;

#[derive(Debug, Deserialize)]
struct GrepParams {
    pattern: String,
    #[serde(default)]
    include: Option<String>,
    #[serde(default)]
    path: Option<String>,
}

#[derive(Debug, Serialize)]
struct GrepResult {
    matches: Vec<GrepMatch>,
}

#[derive(Debug, Serialize)]
struct GrepMatch {
    file: String,
    /// 1-based.
    line: usize,
    content: String,
}

/// Search each file for lines containing `needle`. Files that cannot be
/// read as UTF-8 text, directories included, are skipped.
fn search_files(files: &[PathBuf], needle: &str) -> Vec<GrepMatch> {
    let mut matches = Vec::new();
    for file in files {
        let content = match std::fs::read_to_string(file) {
            Ok(c) => c,
            Err(_) => continue,
        };
        let file_str = file.to_string_lossy().into_owned();
        for (index, line) in content.split('\n').enumerate() {
            if line.contains(needle) {
                matches.push(GrepMatch {
                    file: file_str.clone(),
                    line: index + 1,
                    content: line.to_string(),
                });
            }
        }
    }
    matches
}

#[async_trait::async_trait]
impl ToolDefinition for GrepTool {
    fn name(&self) -> &str {
        "grep"
    }

    fn description(&self) -> &str {
        "Search file contents for a literal string, returning matching lines"
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "pattern": {
                    "type": "string",
                    "description": "Text to search for (case-sensitive substring)"
                },
                "include": {
                    "type": "string",
                    "description": "Glob selecting files to search, relative to path (defaults to \"**/*\")"
                },
                "path": {
                    "type": "string",
                    "description": "Base directory to search in (defaults to the working directory)"
                }
            },
            "required": ["pattern"]
        })
    }

    fn title(&self, params: &Value) -> String {
        format!("grep {}", title_field(params, "pattern"))
    }

    async fn execute(&self, ctx: &ToolContext, params: Value) -> Result<ToolOutput, ToolError> {
        let params: GrepParams = parse_params(self.name(), params)?;
        let base = ctx.resolve(params.path.as_deref().unwrap_or("."));
        let include = params
            .include
            .clone()
            .filter(|i| !i.is_empty())
            .unwrap_or_else(|| DEFAULT_INCLUDE.to_string());
        let needle = params.pattern.clone();

        let matches = blocking(move || {
            let files = glob_under(&base, &include)?;
            Ok(search_files(&files, &needle))
        })
        .await
        .with_context(|| format!("Failed to grep pattern {}", params.pattern))?;

        tracing::debug!(pattern = %params.pattern, count = matches.len(), "grep finished");
        ToolOutput::from_result(&GrepResult { matches })
    }
}
