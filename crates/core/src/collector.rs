//! Discovers class files under the configured source roots.

use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Extension of class source files.
pub const SOURCE_EXTENSION: &str = "uc";

pub fn is_source_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(SOURCE_EXTENSION))
}

/// Walk every root recursively and collect all class files. No ordering
/// guarantee between files; duplicates can only arise from overlapping
/// roots and are removed.
pub fn collect_paths(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for root in roots {
        for entry in WalkBuilder::new(root).build().flatten() {
            let path = entry.path();
            if path.is_file() && is_source_file(path) {
                paths.push(path.to_path_buf());
            }
        }
    }
    paths.sort();
    paths.dedup();
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_extension_case_insensitively() {
        assert!(is_source_file(Path::new("Pawn.uc")));
        assert!(is_source_file(Path::new("Pawn.UC")));
        assert!(!is_source_file(Path::new("Pawn.txt")));
        assert!(!is_source_file(Path::new("Pawn")));
    }

    #[test]
    fn collects_only_source_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("Classes");
        std::fs::create_dir_all(&nested).expect("mkdir");
        std::fs::write(nested.join("Pawn.uc"), "class Pawn;").expect("write");
        std::fs::write(nested.join("readme.txt"), "nope").expect("write");
        std::fs::write(dir.path().join("Object.uc"), "class Object;").expect("write");

        let paths = collect_paths(&[dir.path().to_path_buf()]);
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| is_source_file(p)));
    }
}
