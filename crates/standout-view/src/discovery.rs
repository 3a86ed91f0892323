//! Template discovery on the filesystem.
//!
//! Views find their templates by scanning a lookup root for files matching
//! `root/pattern.{ext1,ext2,...}`, where the extensions are those of the
//! registered template engines:
//!
//! | Pattern | Engines | Matches |
//! |---------|---------|---------|
//! | `*` | `jinja`, `yaml` | `index.html.jinja`, `show.json.yaml` |
//! | `**/*` | `jinja` | `index.html.jinja`, `user/show.html.jinja` |
//!
//! Globs follow shell wildcard rules: `*` never crosses a `/`, `**` spans
//! directories, and dot-files are skipped.
//!
//! # Name Resolution
//!
//! A file's template name is its path relative to the lookup root with the engine
//! extension stripped and the output-format extension kept:
//!
//! | File Path | Template Name |
//! |-----------|---------------|
//! | `templates/user/index.html.jinja` | `"index.html"` (root `templates/user`) |
//! | `templates/user/show.json.yaml` | `"user/show.json"` (root `templates`) |
//!
//! # Recompile Hash
//!
//! [`hash`] digests the sorted list of matching paths. It changes when files are
//! added or removed, never when an existing file is edited; build tooling uses it
//! to decide whether a view needs to be recompiled.

use std::fmt;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use sha2::{Digest, Sha256};
use walkdir::{DirEntry, WalkDir};

/// Builds the glob `pattern.{ext1,ext2,...}` for the given engine extensions.
///
/// Extensions are sorted so the glob is independent of registration order.
pub fn glob_for(pattern: &str, extensions: &[String]) -> String {
    let mut exts: Vec<&str> = extensions.iter().map(|e| e.trim_start_matches('.')).collect();
    exts.sort_unstable();
    exts.dedup();
    match exts.as_slice() {
        [single] => format!("{}.{}", pattern, single),
        many => format!("{}.{{{}}}", pattern, many.join(",")),
    }
}

/// Compiles the discovery matcher for a pattern.
///
/// # Errors
///
/// Returns the glob error if `pattern` is not a valid glob.
pub fn matcher(pattern: &str, extensions: &[String]) -> Result<GlobMatcher, globset::Error> {
    let glob = GlobBuilder::new(&glob_for(pattern, extensions))
        .literal_separator(true)
        .build()?;
    Ok(glob.compile_matcher())
}

/// Returns every file under `root` matching `pattern.{extensions}`.
///
/// A missing root, an empty extension list or an invalid pattern all yield an
/// empty list. Results are sorted.
pub fn find_all(root: impl AsRef<Path>, pattern: &str, extensions: &[String]) -> Vec<PathBuf> {
    let root = root.as_ref();
    if extensions.is_empty() || !root.is_dir() {
        return Vec::new();
    }

    let matcher = match matcher(pattern, extensions) {
        Ok(m) => m,
        Err(err) => {
            tracing::warn!(pattern, error = %err, "invalid template pattern");
            return Vec::new();
        }
    };

    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(root = %root.display(), error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        if matcher.is_match(to_slash(relative)) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    files
}

/// Digests the set of files [`find_all`] returns.
pub fn hash(root: impl AsRef<Path>, pattern: &str, extensions: &[String]) -> TemplateHash {
    digest_paths(find_all(root, pattern, extensions))
}

/// Digests a set of paths, independent of their order.
pub fn digest_paths(mut paths: Vec<PathBuf>) -> TemplateHash {
    paths.sort();
    let mut hasher = Sha256::new();
    for path in &paths {
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update([0u8]);
    }
    TemplateHash(hasher.finalize().into())
}

/// Derives a template name from a file path and the lookup root it was found under.
///
/// Only the last extension (the engine's) is stripped; separators become `/`.
///
/// ```rust
/// use standout_view::discovery::template_path_to_name;
/// use std::path::Path;
///
/// let name = template_path_to_name(
///     Path::new("/app/templates/user/index.html.jinja"),
///     Path::new("/app/templates"),
/// );
/// assert_eq!(name, "user/index.html");
/// ```
pub fn template_path_to_name(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let stem = relative.with_extension("");
    to_slash(&stem)
}

/// Returns the engine extension of a template file (`index.html.jinja` → `jinja`).
pub fn engine_extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Digest identifying a set of discovered template paths.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TemplateHash([u8; 32]);

impl TemplateHash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TemplateHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for TemplateHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TemplateHash({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_file(dir: &Path, relative_path: &str, content: &str) {
        let full_path = dir.join(relative_path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let mut file = std::fs::File::create(&full_path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    fn exts(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn names(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| template_path_to_name(f, root))
            .collect()
    }

    // =========================================================================
    // glob_for tests
    // =========================================================================

    #[test]
    fn test_glob_for_sorts_and_braces() {
        assert_eq!(glob_for("*", &exts(&["yaml", "jinja"])), "*.{jinja,yaml}");
        assert_eq!(glob_for("**/*", &exts(&["jinja"])), "**/*.jinja");
        assert_eq!(glob_for("*", &exts(&[".j2", "j2"])), "*.j2");
    }

    // =========================================================================
    // find_all tests
    // =========================================================================

    #[test]
    fn test_find_all_filters_by_extension() {
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "index.html.jinja", "");
        create_file(dir.path(), "show.json.yaml", "");
        create_file(dir.path(), "notes.md", "");
        create_file(dir.path(), "raw.html", "");

        let files = find_all(dir.path(), "*", &exts(&["jinja", "yaml"]));
        assert_eq!(names(dir.path(), &files), vec!["index.html", "show.json"]);
    }

    #[test]
    fn test_find_all_star_does_not_recurse() {
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "top.html.jinja", "");
        create_file(dir.path(), "nested/deep.html.jinja", "");

        let files = find_all(dir.path(), "*", &exts(&["jinja"]));
        assert_eq!(names(dir.path(), &files), vec!["top.html"]);
    }

    #[test]
    fn test_find_all_double_star_recurses() {
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "top.html.jinja", "");
        create_file(dir.path(), "nested/deep.html.jinja", "");
        create_file(dir.path(), "nested/more/deeper.txt.tmpl", "");

        let files = find_all(dir.path(), "**/*", &exts(&["jinja", "tmpl"]));
        assert_eq!(
            names(dir.path(), &files),
            vec!["nested/deep.html", "nested/more/deeper.txt", "top.html"]
        );
    }

    #[test]
    fn test_find_all_respects_subdirectory_pattern() {
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "user/index.html.jinja", "");
        create_file(dir.path(), "admin/index.html.jinja", "");

        let files = find_all(dir.path(), "user/*", &exts(&["jinja"]));
        assert_eq!(names(dir.path(), &files), vec!["user/index.html"]);
    }

    #[test]
    fn test_find_all_skips_hidden() {
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), ".swap.html.jinja", "");
        create_file(dir.path(), ".cache/x.html.jinja", "");
        create_file(dir.path(), "ok.html.jinja", "");

        let files = find_all(dir.path(), "**/*", &exts(&["jinja"]));
        assert_eq!(names(dir.path(), &files), vec!["ok.html"]);
    }

    #[test]
    fn test_find_all_missing_root_is_empty() {
        let files = find_all("/nonexistent/templates", "*", &exts(&["jinja"]));
        assert!(files.is_empty());
    }

    #[test]
    fn test_find_all_no_extensions_is_empty() {
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "index.html.jinja", "");
        assert!(find_all(dir.path(), "*", &[]).is_empty());
    }

    #[test]
    fn test_find_all_invalid_pattern_is_empty() {
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "index.html.jinja", "");
        assert!(find_all(dir.path(), "[", &exts(&["jinja"])).is_empty());
    }

    // =========================================================================
    // hash tests
    // =========================================================================

    #[test]
    fn test_hash_ignores_content_edits() {
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "index.html.jinja", "v1");
        let before = hash(dir.path(), "*", &exts(&["jinja"]));

        create_file(dir.path(), "index.html.jinja", "v2 with more content");
        let after = hash(dir.path(), "*", &exts(&["jinja"]));

        assert_eq!(before, after);
    }

    #[test]
    fn test_hash_changes_when_set_changes() {
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "index.html.jinja", "");
        let before = hash(dir.path(), "*", &exts(&["jinja"]));

        create_file(dir.path(), "show.html.jinja", "");
        let added = hash(dir.path(), "*", &exts(&["jinja"]));
        assert_ne!(before, added);

        std::fs::remove_file(dir.path().join("show.html.jinja")).unwrap();
        assert_eq!(hash(dir.path(), "*", &exts(&["jinja"])), before);
    }

    #[test]
    fn test_hash_ignores_non_matching_files() {
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "index.html.jinja", "");
        let before = hash(dir.path(), "*", &exts(&["jinja"]));

        create_file(dir.path(), "README.md", "");
        assert_eq!(hash(dir.path(), "*", &exts(&["jinja"])), before);
    }

    #[test]
    fn test_hash_display_is_hex() {
        let digest = digest_paths(vec![PathBuf::from("/a")]);
        let text = digest.to_string();
        assert_eq!(text.len(), 64);
        assert!(text.chars().all(|c| c.is_ascii_hexdigit()));
    }

    proptest! {
        #[test]
        fn prop_digest_is_order_independent(
            paths in proptest::collection::vec("[a-z]{1,8}(/[a-z]{1,8}){0,2}\\.html\\.jinja", 0..12),
            seed in any::<u64>(),
        ) {
            let forward: Vec<PathBuf> = paths.iter().map(PathBuf::from).collect();
            let mut shuffled = forward.clone();
            // Deterministic rotation + reversal stands in for an arbitrary permutation.
            if !shuffled.is_empty() {
                let len = shuffled.len();
                shuffled.rotate_left((seed as usize) % len);
            }
            if seed % 2 == 0 {
                shuffled.reverse();
            }
            prop_assert_eq!(digest_paths(forward), digest_paths(shuffled));
        }
    }

    // =========================================================================
    // naming tests
    // =========================================================================

    #[test]
    fn test_template_path_to_name_strips_engine_extension_only() {
        let root = Path::new("/app/templates");
        assert_eq!(
            template_path_to_name(Path::new("/app/templates/show.json.yaml"), root),
            "show.json"
        );
        assert_eq!(
            template_path_to_name(Path::new("/app/templates/a/b/c.txt.tmpl"), root),
            "a/b/c.txt"
        );
    }

    #[test]
    fn test_engine_extension() {
        assert_eq!(engine_extension(Path::new("x/index.html.jinja")), Some("jinja"));
        assert_eq!(engine_extension(Path::new("x/noext")), None);
    }
}
