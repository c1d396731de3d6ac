//! Path canonicalization for git log output.
//!
//! Git reports renames inline (`src/{old.rs => new.rs}`); [`normalize`]
//! resolves these to the new path so a file keeps one identity across a
//! rename. [`abbreviate`] shortens deep paths for display.

use once_cell::sync::Lazy;
use regex::Regex;

static BRACE_RENAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^{}]*) => ([^{}]*)\}").expect("valid rename pattern"));

/// Resolve git's rename notation to the new path.
///
/// `prefix{old => new}suffix` becomes `prefix` + `new` + `suffix`. An empty
/// side leaves a doubled separator, which collapses to one. A whole-path
/// rename (`old => new`) resolves to `new`. Anything else is returned
/// unchanged.
///
/// # Examples
///
/// ```
/// use churnmap_gitpulse::paths::normalize;
///
/// assert_eq!(normalize("src/{old.py => new.py}"), "src/new.py");
/// assert_eq!(normalize("{lib => src}/main.rs"), "src/main.rs");
/// assert_eq!(normalize("src/{ => nested}/a.rs"), "src/nested/a.rs");
/// assert_eq!(normalize("README"), "README");
/// ```
pub fn normalize(raw_path: &str) -> String {
    if raw_path.contains('{') && raw_path.contains(" => ") {
        let resolved = BRACE_RENAME_RE.replace_all(raw_path, "$2");
        if resolved != raw_path {
            return collapse_separators(&resolved);
        }
    }
    if let Some((_, new)) = raw_path.rsplit_once(" => ") {
        return new.to_string();
    }
    raw_path.to_string()
}

fn collapse_separators(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev_slash = false;
    for ch in path.chars() {
        if ch == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        out.push(ch);
    }
    out.trim_start_matches('/').to_string()
}

/// Shorten a deep path for display.
///
/// Paths with four or more segments keep the first segment and the last
/// two, joined by `...`. Never use the result as a lookup key.
///
/// # Examples
///
/// ```
/// use churnmap_gitpulse::paths::abbreviate;
///
/// assert_eq!(abbreviate("app/models/billing/invoice.rb"), "app/.../billing/invoice.rb");
/// assert_eq!(abbreviate("src/core/lib.rs"), "src/core/lib.rs");
/// ```
pub fn abbreviate(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').collect();
    let n = segments.len();
    if n >= 4 {
        format!("{}/.../{}/{}", segments[0], segments[n - 2], segments[n - 1])
    } else {
        path.to_string()
    }
}

/// Directory part of a `/`-separated path; empty for top-level files.
pub(crate) fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_inside_braces_resolves_to_new_name() {
        assert_eq!(normalize("src/{old.py => new.py}"), "src/new.py");
    }

    #[test]
    fn rename_of_middle_directory() {
        assert_eq!(
            normalize("app/{models => entities}/user.rb"),
            "app/entities/user.rb"
        );
    }

    #[test]
    fn rename_into_parent_collapses_separator() {
        assert_eq!(normalize("src/{nested => }/a.rs"), "src/a.rs");
    }

    #[test]
    fn rename_at_root_drops_leading_separator() {
        assert_eq!(normalize("{legacy => }/main.rs"), "main.rs");
    }

    #[test]
    fn whole_path_rename_takes_new_side() {
        assert_eq!(normalize("old_name.rs => src/new_name.rs"), "src/new_name.rs");
    }

    #[test]
    fn plain_paths_are_unchanged() {
        assert_eq!(normalize("src/lib.rs"), "src/lib.rs");
        assert_eq!(normalize("Makefile"), "Makefile");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn braces_without_rename_marker_are_unchanged() {
        assert_eq!(normalize("templates/{name}.html"), "templates/{name}.html");
    }

    #[test]
    fn abbreviate_keeps_short_paths() {
        assert_eq!(abbreviate("a"), "a");
        assert_eq!(abbreviate("a/b"), "a/b");
        assert_eq!(abbreviate("a/b/c"), "a/b/c");
    }

    #[test]
    fn abbreviate_compresses_four_or_more_segments() {
        assert_eq!(abbreviate("a/b/c/d"), "a/.../c/d");
        assert_eq!(abbreviate("a/b/c/d/e/f"), "a/.../e/f");
    }

    #[test]
    fn dirname_of_top_level_file_is_empty() {
        assert_eq!(dirname("main.rs"), "");
        assert_eq!(dirname("a/b/c.rs"), "a/b");
    }
}
