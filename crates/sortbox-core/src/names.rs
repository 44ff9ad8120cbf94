//! Deterministic clash renaming. A clash always yields a new name; contents
//! are never combined.

use std::collections::HashSet;
use std::io;
use std::path::Path;

use crate::fsys::FileSystem;

/// Returns `candidate` if no sibling uses it, else `"<base> (n)<ext>"` with
/// the smallest free `n >= 2`. Directory names are never split.
pub fn resolve_unique_name(existing: &HashSet<String>, candidate: &str, is_dir: bool) -> String {
    first_free(candidate, is_dir, |name| existing.contains(name))
}

fn first_free(candidate: &str, is_dir: bool, taken: impl Fn(&str) -> bool) -> String {
    if !taken(candidate) {
        return candidate.to_string();
    }

    let (base, ext) = if is_dir {
        (candidate, "")
    } else {
        split_extension(candidate)
    };

    let mut n = 2u64;
    loop {
        let name = format!("{base} ({n}){ext}");
        if !taken(&name) {
            return name;
        }
        n += 1;
    }
}

/// Split at the last `.`; the extension keeps its dot. Leading-dot names
/// (`.bashrc`) and names ending in a dot have no extension.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(0) | None => (name, ""),
        Some(i) if i + 1 == name.len() => (name, ""),
        Some(i) => name.split_at(i),
    }
}

/// Live variant: reads `dir` now, so the answer reflects the directory as it
/// is at move time rather than when the plan was made.
pub fn unique_child_name(
    fs: &dyn FileSystem,
    dir: &Path,
    candidate: &str,
    is_dir: bool,
) -> io::Result<String> {
    if !fs.child_exists(dir, candidate) {
        return Ok(candidate.to_string());
    }
    let existing: HashSet<String> = fs.list_dir(dir)?.into_iter().map(|c| c.name).collect();
    if existing.contains(candidate) {
        return Ok(resolve_unique_name(&existing, candidate, is_dir));
    }
    // The lookup matched a sibling that differs only in case, so the volume
    // folds case and suffixed names must be compared the same way.
    let folded: HashSet<String> = existing.iter().map(|name| name.to_lowercase()).collect();
    Ok(first_free(candidate, is_dir, |name| {
        folded.contains(&name.to_lowercase())
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsys::{ChildEntry, LocalFs};
    use std::path::PathBuf;
    use tempfile::tempdir;

    /// Local disk whose name lookups ignore case, like a default macOS or
    /// Windows volume.
    struct CaseFoldingFs;

    impl FileSystem for CaseFoldingFs {
        fn list_dir(&self, dir: &Path) -> io::Result<Vec<ChildEntry>> {
            LocalFs.list_dir(dir)
        }
        fn entry(&self, path: &Path) -> io::Result<ChildEntry> {
            LocalFs.entry(path)
        }
        fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
            LocalFs.read_link(path)
        }
        fn create_dir(&self, path: &Path) -> io::Result<()> {
            LocalFs.create_dir(path)
        }
        fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
            LocalFs.rename(from, to)
        }
        fn copy_file(&self, from: &Path, to: &Path) -> io::Result<u64> {
            LocalFs.copy_file(from, to)
        }
        fn copy_link(&self, from: &Path, to: &Path) -> io::Result<()> {
            LocalFs.copy_link(from, to)
        }
        fn remove_file(&self, path: &Path) -> io::Result<()> {
            LocalFs.remove_file(path)
        }
        fn remove_dir(&self, path: &Path) -> io::Result<()> {
            LocalFs.remove_dir(path)
        }
        fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
            LocalFs.remove_dir_all(path)
        }
        fn child_exists(&self, dir: &Path, name: &str) -> bool {
            let wanted = name.to_lowercase();
            LocalFs
                .list_dir(dir)
                .map(|children| children.iter().any(|c| c.name.to_lowercase() == wanted))
                .unwrap_or(false)
        }
    }

    fn names(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_clash_returns_input() {
        assert_eq!(resolve_unique_name(&names(&[]), "a.txt", false), "a.txt");
        assert_eq!(resolve_unique_name(&names(&["b.txt"]), "a.txt", false), "a.txt");
    }

    #[test]
    fn skips_taken_suffixes() {
        let existing = names(&["a.txt", "a (2).txt"]);
        assert_eq!(resolve_unique_name(&existing, "a.txt", false), "a (3).txt");
    }

    #[test]
    fn directories_are_not_split() {
        let existing = names(&["Photos"]);
        assert_eq!(resolve_unique_name(&existing, "Photos", true), "Photos (2)");

        let existing = names(&["v1.2"]);
        assert_eq!(resolve_unique_name(&existing, "v1.2", true), "v1.2 (2)");
    }

    #[test]
    fn splits_at_last_dot() {
        let existing = names(&["archive.tar.gz"]);
        assert_eq!(
            resolve_unique_name(&existing, "archive.tar.gz", false),
            "archive.tar (2).gz"
        );
    }

    #[test]
    fn dotfiles_have_no_extension() {
        assert_eq!(split_extension(".bashrc"), (".bashrc", ""));
        assert_eq!(split_extension("notes."), ("notes.", ""));
        assert_eq!(split_extension("README"), ("README", ""));
        let existing = names(&[".bashrc"]);
        assert_eq!(resolve_unique_name(&existing, ".bashrc", false), ".bashrc (2)");
    }

    #[test]
    fn case_only_clash_gets_a_suffix() {
        let tmp = tempdir().unwrap();
        std::fs::write(tmp.path().join("Report.pdf"), b"x").unwrap();
        std::fs::write(tmp.path().join("REPORT (2).pdf"), b"x").unwrap();

        let name = unique_child_name(&CaseFoldingFs, tmp.path(), "report.pdf", false).unwrap();
        assert_eq!(name, "report (3).pdf");

        if cfg!(target_os = "linux") {
            let name = unique_child_name(&LocalFs, tmp.path(), "report.pdf", false).unwrap();
            assert_eq!(name, "report.pdf");
        }
    }

    #[test]
    fn deterministic_for_fixed_snapshot() {
        let existing = names(&["x.md", "x (2).md", "x (4).md"]);
        let first = resolve_unique_name(&existing, "x.md", false);
        let second = resolve_unique_name(&existing, "x.md", false);
        assert_eq!(first, "x (3).md");
        assert_eq!(first, second);
    }
}
