use std::path::{Component, Path};

/// Case-insensitive subsequence match: every character of `query` has to show
/// up in `target`, in order, though not necessarily next to each other.
/// An empty query matches anything. There is no scoring.
pub fn fuzzy_match(query: &str, target: &str) -> bool {
    let mut haystack = target.chars().flat_map(char::to_lowercase);
    query
        .chars()
        .flat_map(char::to_lowercase)
        .all(|needle| haystack.any(|c| c == needle))
}

/// Number of normal components in `rel` (`.` and `""` are depth 0).
pub fn depth(rel: &Path) -> usize {
    rel.components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count()
}

/// Display name of a path: its last component, or the path itself for `/`.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn empty_query_matches_everything() {
        assert!(fuzzy_match("", ""));
        assert!(fuzzy_match("", "anything.rs"));
    }

    #[test]
    fn subsequence_is_case_insensitive_and_ordered() {
        assert!(fuzzy_match("at", "a.txt"));
        assert!(fuzzy_match("MRs", "src/main.rs"));
        assert!(fuzzy_match("cargo", "Cargo.toml"));
        assert!(!fuzzy_match("ta", "at"));
        assert!(!fuzzy_match("xyz", "x-y"));
    }

    #[test]
    fn longer_query_never_matches() {
        assert!(!fuzzy_match("abcd", "abc"));
    }

    #[test]
    fn depth_counts_normal_components() {
        assert_eq!(depth(Path::new(".")), 0);
        assert_eq!(depth(Path::new("")), 0);
        assert_eq!(depth(Path::new("a.txt")), 1);
        assert_eq!(depth(Path::new("b/c/d.txt")), 3);
    }

    #[test]
    fn display_name_falls_back_for_root() {
        assert_eq!(display_name(&PathBuf::from("/tmp/x/notes.md")), "notes.md");
        assert_eq!(display_name(Path::new("/")), "/");
    }
}
