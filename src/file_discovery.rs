//! Glob expansion of schema and document patterns.
//!
//! One pattern expands to the sorted list of existing files matching it.
//! Patterns support `*`, `?`, `[...]`, `**`, and brace alternation
//! (`content/{xml,files}/**/*.xml`). A pattern matching nothing expands to
//! an empty list, never an error. Expansion never de-duplicates across
//! patterns: a file matched by two patterns is validated twice.

use globset::{GlobBuilder, GlobMatcher};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{Result, XmlValidatorError};

/// Expand one glob pattern into matching file paths, sorted
/// lexicographically.
pub async fn expand_pattern(pattern: &str) -> Result<Vec<PathBuf>> {
    let normalized = normalize_pattern(pattern);

    // A pattern without metacharacters is a literal path: it expands to
    // itself iff it names an existing regular file.
    if !has_glob_meta(&normalized) {
        let path = PathBuf::from(pattern);
        return Ok(match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => vec![path],
            _ => Vec::new(),
        });
    }

    let matcher = GlobBuilder::new(&normalized)
        .literal_separator(true)
        .build()
        .map_err(|e| XmlValidatorError::Pattern {
            pattern: pattern.to_string(),
            details: e.to_string(),
        })?
        .compile_matcher();

    let mut matches = Vec::new();
    walk_files(&literal_prefix(&normalized), &matcher, &mut matches).await;
    matches.sort();
    Ok(matches)
}

/// Expand several patterns in order, flattening the results without
/// de-duplication.
pub async fn expand_patterns(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for pattern in patterns {
        paths.extend(expand_pattern(pattern).await?);
    }
    Ok(paths)
}

fn has_glob_meta(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

/// Normalize separators so patterns behave identically across platforms,
/// and drop a redundant leading `./`.
fn normalize_pattern(pattern: &str) -> String {
    let pattern = if cfg!(windows) {
        pattern.replace('\\', "/")
    } else {
        pattern.to_string()
    };
    match pattern.strip_prefix("./") {
        Some(rest) => rest.to_string(),
        None => pattern,
    }
}

/// The longest literal directory prefix of a pattern; the walk starts here
/// instead of the filesystem root.
fn literal_prefix(pattern: &str) -> PathBuf {
    let mut root = if pattern.starts_with('/') {
        PathBuf::from("/")
    } else {
        PathBuf::new()
    };

    // The last component is the file part; it either contains
    // metacharacters (breaking the loop) or the pattern was literal and
    // never reaches here.
    for component in pattern.split('/') {
        if component.is_empty() {
            continue;
        }
        if has_glob_meta(component) {
            break;
        }
        root.push(component);
    }

    if root.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        root
    }
}

fn matches_candidate(matcher: &GlobMatcher, path: &Path) -> bool {
    let mut candidate = path.to_string_lossy().replace('\\', "/");
    if let Some(rest) = candidate.strip_prefix("./") {
        candidate = rest.to_string();
    }
    matcher.is_match(&candidate)
}

/// Recursive walk collecting regular files that match. A missing or
/// unreadable directory contributes nothing; symbolic links are not
/// followed.
fn walk_files<'a>(
    dir: &'a Path,
    matcher: &'a GlobMatcher,
    out: &'a mut Vec<PathBuf>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + 'a>> {
    Box::pin(async move {
        let Ok(mut read_dir) = fs::read_dir(dir).await else {
            return;
        };

        while let Ok(Some(entry)) = read_dir.next_entry().await {
            let path = entry.path();
            let Ok(file_type) = entry.file_type().await else {
                continue;
            };

            if file_type.is_dir() {
                walk_files(&path, matcher, out).await;
            } else if file_type.is_file() && matches_candidate(matcher, &path) {
                out.push(path);
            }
        }
    })
}
