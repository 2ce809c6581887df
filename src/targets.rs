use crate::config::FileTarget;
use anyhow::{Context, Result};
use globset::GlobBuilder;
use log::debug;
use regex::Regex;
use std::path::{Component, Path, PathBuf};

const GLOB_CHARS: &[char] = &['*', '?', '[', '{', '('];

/// Whether a file name contains wildcard syntax and has to be expanded.
pub fn is_glob(pattern: &str) -> bool {
    pattern.contains(GLOB_CHARS)
}

/// Rewrites extglob style alternation, `(a|b)`, into the `{a,b}` form globset understands.
fn normalize_pattern(pattern: &str) -> Result<String> {
    let alternation = Regex::new(r"\(([^()|]*(?:\|[^()|]*)+)\)")?;
    let pattern = alternation.replace_all(pattern, |captures: &regex::Captures| {
        format!("{{{}}}", captures[1].replace('|', ","))
    });
    Ok(pattern.replace('\\', "/"))
}

/// The directory to walk: every leading component of `pattern` that holds no wildcard.
fn base_dir(pattern: &str) -> (PathBuf, usize) {
    let components: Vec<&str> = pattern.split('/').collect();
    let literal = components
        .iter()
        .take_while(|component| !is_glob(component))
        .count()
        .min(components.len().saturating_sub(1));
    let remaining = components.len() - literal;
    let base = components[..literal].join("/");
    let base = match base.as_str() {
        "" if pattern.starts_with('/') => PathBuf::from("/"),
        "" => PathBuf::from("."),
        _ => PathBuf::from(base),
    };
    (base, remaining)
}

fn display_path(path: &Path) -> String {
    let text = path.to_string_lossy().replace('\\', "/");
    match text.strip_prefix("./") {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}

/// Resolves a file pattern to the existing files it matches, sorted by path.
pub fn find_matching_files(pattern: &str) -> Result<Vec<PathBuf>> {
    debug!("Expanding pattern '{}'", pattern);
    let normalized = normalize_pattern(pattern)?;
    let matcher_pattern = normalized.strip_prefix("./").unwrap_or(&normalized);
    let matcher = GlobBuilder::new(matcher_pattern)
        .literal_separator(true)
        .build()
        .with_context(|| format!("Invalid file pattern '{}'", pattern))?
        .compile_matcher();

    let (base, depth) = base_dir(&normalized);
    let mut walker = walkdir::WalkDir::new(&base).min_depth(1);
    if !normalized.contains("**") {
        walker = walker.max_depth(depth);
    }

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry while expanding '{}': {}", pattern, e);
                continue;
            }
        };
        if entry.file_type().is_file() && matcher.is_match(display_path(entry.path())) {
            files.push(entry.into_path());
        }
    }
    files.sort();

    debug!("Found files: {:?}", files);
    Ok(files)
}

/// Expands every target whose file is a glob into one target per matching file.
///
/// A target without wildcards is kept as is, even when its file does not exist yet.
pub fn expand_targets(targets: Vec<FileTarget>) -> Result<Vec<FileTarget>> {
    let mut expanded = Vec::with_capacity(targets.len());
    for target in targets {
        let pattern = target.file.to_string_lossy().to_string();
        if !is_glob(&pattern) {
            expanded.push(target);
            continue;
        }
        let files = find_matching_files(&pattern)?;
        if files.is_empty() {
            debug!("Pattern '{}' matched no files", pattern);
        }
        expanded.extend(files.into_iter().map(|file| target.with_file(file)));
    }
    Ok(expanded)
}

/// Groups targets naming the same file, in order of first appearance.
///
/// Each group is written by one task, one target after the other, so no update to a shared
/// file is lost.
pub fn group_by_file(targets: Vec<FileTarget>) -> Vec<Vec<FileTarget>> {
    let key = |file: &Path| -> PathBuf {
        file.components()
            .filter(|component| !matches!(component, Component::CurDir))
            .collect()
    };
    let mut groups: Vec<(PathBuf, Vec<FileTarget>)> = Vec::new();
    for target in targets {
        let file = key(&target.file);
        match groups.iter_mut().find(|(existing, _)| *existing == file) {
            Some((_, group)) => {
                debug!("'{}' is named by more than one output", target.file.display());
                group.push(target);
            }
            None => groups.push((file, vec![target])),
        }
    }
    groups.into_iter().map(|(_, group)| group).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "1.0.0\n").unwrap();
    }

    fn names(files: &[PathBuf], dir: &Path) -> Vec<String> {
        files
            .iter()
            .map(|file| display_path(file.strip_prefix(dir).unwrap()))
            .collect()
    }

    #[test]
    fn test_is_glob() {
        assert!(is_glob("./foo*.txt"));
        assert!(is_glob("./(bower|manifest).json"));
        assert!(is_glob("src/**/version.rs"));
        assert!(!is_glob("./package.json"));
        assert!(!is_glob("VERSION"));
    }

    #[test]
    fn test_normalize_extglob_alternation() {
        assert_eq!(normalize_pattern("./(bower|manifest).json").unwrap(), "./{bower,manifest}.json");
        assert_eq!(normalize_pattern("a/(x|y|z)/*.json").unwrap(), "a/{x,y,z}/*.json");
        assert_eq!(normalize_pattern("./foo*.txt").unwrap(), "./foo*.txt");
    }

    #[test]
    fn test_base_dir() {
        assert_eq!(base_dir("./foo*.txt"), (PathBuf::from("."), 1));
        assert_eq!(base_dir("foo*.txt"), (PathBuf::from("."), 1));
        assert_eq!(base_dir("/tmp/x/*/VERSION"), (PathBuf::from("/tmp/x"), 2));
    }

    #[test]
    fn test_find_star_pattern() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "foo.txt");
        touch(dir.path(), "foo2.txt");
        touch(dir.path(), "bar.txt");
        touch(dir.path(), "nested/foo3.txt");

        let pattern = format!("{}/foo*.txt", display_path(dir.path()));
        let files = find_matching_files(&pattern).unwrap();
        assert_eq!(names(&files, dir.path()), vec!["foo.txt", "foo2.txt"]);
    }

    #[test]
    fn test_find_alternation_pattern() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "bower.json");
        touch(dir.path(), "manifest.json");
        touch(dir.path(), "package.json");

        let pattern = format!("{}/(bower|manifest).json", display_path(dir.path()));
        let files = find_matching_files(&pattern).unwrap();
        assert_eq!(names(&files, dir.path()), vec!["bower.json", "manifest.json"]);
    }

    #[test]
    fn test_find_recursive_pattern() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "crates/a/VERSION");
        touch(dir.path(), "crates/b/deep/VERSION");

        let pattern = format!("{}/crates/**/VERSION", display_path(dir.path()));
        let files = find_matching_files(&pattern).unwrap();
        assert_eq!(names(&files, dir.path()), vec!["crates/a/VERSION", "crates/b/deep/VERSION"]);
    }

    #[test]
    fn test_expand_targets_copies_options() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "foo.txt");
        touch(dir.path(), "foo2.txt");

        let mut target = FileTarget::new(format!("{}/foo*.txt", display_path(dir.path())));
        target.consume_whole_file = true;
        let literal = FileTarget::new(dir.path().join("missing.json"));

        let expanded = expand_targets(vec![target, literal.clone()]).unwrap();
        assert_eq!(expanded.len(), 3);
        assert!(expanded[..2].iter().all(|target| target.consume_whole_file));
        assert_eq!(expanded[2], literal);
    }

    #[test]
    fn test_expand_without_matches_is_empty() {
        let dir = TempDir::new().unwrap();
        let target = FileTarget::new(format!("{}/*.yaml", display_path(dir.path())));
        assert!(expand_targets(vec![target]).unwrap().is_empty());
    }

    #[test]
    fn test_group_by_file_keeps_first_appearance_order() {
        let mut deep = FileTarget::new("./package.json");
        deep.paths = vec!["deep.version".to_string()];
        let targets = vec![
            FileTarget::new("package.json"),
            FileTarget::new("VERSION"),
            deep.clone(),
        ];

        let groups = group_by_file(targets);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[0][1], deep);
        assert_eq!(groups[1], vec![FileTarget::new("VERSION")]);
    }
}
