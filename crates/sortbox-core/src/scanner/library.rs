use std::path::Path;
use std::time::Instant;

use glob::Pattern;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::source::compile_patterns;
use super::walk::is_ignored;
use crate::cancel::CancelToken;
use crate::error::Error;
use crate::fsys::{ChildEntry, EntryKind, FileSystem};
use crate::model::{now_rfc3339, LibCategory, LibSubcategory, LibraryIndex, ROOT_SUBCATEGORY};
use crate::progress::ProgressReporter;

pub const NOTE_EMPTY: &str = "empty";
pub const NOTE_UNREADABLE: &str = "unreadable";

/// Read-only inventory of the two-level LIBRARY tree.
pub struct LibraryIndexer<'a> {
    fs: &'a dyn FileSystem,
    sample_limit: usize,
    ignore_patterns: Vec<Pattern>,
}

fn visible(entry: &ChildEntry, patterns: &[Pattern]) -> bool {
    !entry.name.starts_with('.') && !is_ignored(&entry.name, patterns)
}

fn is_file_like(entry: &ChildEntry) -> bool {
    matches!(entry.kind, EntryKind::File | EntryKind::Symlink | EntryKind::Other)
}

impl<'a> LibraryIndexer<'a> {
    pub fn new(fs: &'a dyn FileSystem, sample_limit: usize, ignore_patterns: &[String]) -> Self {
        Self {
            fs,
            sample_limit,
            ignore_patterns: compile_patterns(ignore_patterns),
        }
    }

    pub fn index(
        &self,
        root: &Path,
        cancel: &CancelToken,
        reporter: &dyn ProgressReporter,
    ) -> Result<LibraryIndex, Error> {
        let start = Instant::now();
        let children = self
            .fs
            .list_dir(root)
            .map_err(|source| Error::LibraryRootUnavailable {
                path: root.to_path_buf(),
                source,
            })?;

        let mut category_dirs = Vec::new();
        for child in children {
            if !visible(&child, &self.ignore_patterns) {
                continue;
            }
            if child.kind == EntryKind::Directory {
                category_dirs.push(child);
            } else {
                debug!("Ignoring loose library file {}", child.path.display());
            }
        }
        category_dirs.sort_by(|a, b| a.name.cmp(&b.name));
        info!("Indexing {} categories in {}", category_dirs.len(), root.display());

        let categories = category_dirs
            .par_iter()
            .map(|dir| {
                if cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                Ok(self.index_category(dir))
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let duration = start.elapsed();
        reporter.on_index_complete(categories.len(), duration.as_secs_f64());

        Ok(LibraryIndex {
            library_root: root.to_string_lossy().into_owned(),
            generated_at: now_rfc3339(),
            categories,
        })
    }

    fn index_category(&self, dir: &ChildEntry) -> LibCategory {
        let mut children = match self.fs.list_dir(&dir.path) {
            Ok(children) => children,
            Err(err) => {
                warn!("Unreadable category {}: {}", dir.path.display(), err);
                return LibCategory {
                    name: dir.name.clone(),
                    subcategories: Vec::new(),
                    notes: NOTE_UNREADABLE.to_string(),
                };
            }
        };
        children.retain(|c| visible(c, &self.ignore_patterns));
        children.sort_by(|a, b| a.name.cmp(&b.name));

        let root_files: Vec<&ChildEntry> = children.iter().filter(|c| is_file_like(c)).collect();
        let mut subcategories = Vec::new();
        if !root_files.is_empty() {
            subcategories.push(LibSubcategory {
                name: ROOT_SUBCATEGORY.to_string(),
                file_count: root_files.len() as u64,
                sample_files: root_files
                    .iter()
                    .take(self.sample_limit)
                    .map(|c| c.name.clone())
                    .collect(),
            });
        }

        for sub in children.iter().filter(|c| c.kind == EntryKind::Directory) {
            subcategories.push(self.index_subcategory(sub));
        }

        let notes = if subcategories.is_empty() {
            NOTE_EMPTY.to_string()
        } else {
            String::new()
        };
        LibCategory {
            name: dir.name.clone(),
            subcategories,
            notes,
        }
    }

    /// Files directly inside the subcategory; a third level is not counted.
    fn index_subcategory(&self, dir: &ChildEntry) -> LibSubcategory {
        let mut files: Vec<String> = match self.fs.list_dir(&dir.path) {
            Ok(children) => children
                .into_iter()
                .filter(|c| visible(c, &self.ignore_patterns) && is_file_like(c))
                .map(|c| c.name)
                .collect(),
            Err(err) => {
                warn!("Unreadable subcategory {}: {}", dir.path.display(), err);
                Vec::new()
            }
        };
        files.sort();
        LibSubcategory {
            name: dir.name.clone(),
            file_count: files.len() as u64,
            sample_files: files.into_iter().take(self.sample_limit).collect(),
        }
    }
}
