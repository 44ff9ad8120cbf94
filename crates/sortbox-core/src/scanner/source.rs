use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use dashmap::DashMap;
use glob::Pattern;
use rayon::prelude::*;
use tracing::{debug, error, info};

use super::walk::{self, extension_key, is_ignored};
use crate::cancel::CancelToken;
use crate::error::Error;
use crate::fsys::{ChildEntry, EntryKind, FileSystem};
use crate::model::{now_rfc3339, SourceEntry, SourceOverview};
use crate::progress::ProgressReporter;

pub const DEFAULT_SAMPLE_LIMIT: usize = 8;
const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Maximum `sample_children` / `sample_files` per entry.
    pub sample_limit: usize,
    /// Glob patterns matched against entry names at every depth.
    pub ignore_patterns: Vec<String>,
    /// Paths never offered as entries (the library or workspace when they
    /// sit inside SOURCE).
    pub excluded_paths: Vec<PathBuf>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            sample_limit: DEFAULT_SAMPLE_LIMIT,
            ignore_patterns: Vec::new(),
            excluded_paths: Vec::new(),
        }
    }
}

pub(crate) fn compile_patterns(globs: &[String]) -> Vec<Pattern> {
    globs
        .iter()
        .filter_map(|glob| match Pattern::new(glob) {
            Ok(p) => Some(p),
            Err(e) => {
                error!("Invalid glob pattern '{}': {}", glob, e);
                None
            }
        })
        .collect()
}

/// Best-effort content type from the extension; never fails.
pub fn content_type_for(name: &str) -> String {
    mime_guess::from_path(name)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| OCTET_STREAM.to_string())
}

/// Summarizes SOURCE one level deep.
pub struct SourceScanner<'a> {
    fs: &'a dyn FileSystem,
    options: ScanOptions,
}

impl<'a> SourceScanner<'a> {
    pub fn new(fs: &'a dyn FileSystem, options: ScanOptions) -> Self {
        Self { fs, options }
    }

    pub fn scan(
        &self,
        root: &Path,
        cancel: &CancelToken,
        reporter: &dyn ProgressReporter,
    ) -> Result<SourceOverview, Error> {
        let start = Instant::now();
        let children = self
            .fs
            .list_dir(root)
            .map_err(|source| Error::SourceRootUnavailable {
                path: root.to_path_buf(),
                source,
            })?;

        let patterns = compile_patterns(&self.options.ignore_patterns);
        let excluded: Vec<ChildEntry> = self
            .options
            .excluded_paths
            .iter()
            .filter_map(|p| self.fs.entry(p).ok())
            .collect();

        let mut children: Vec<ChildEntry> = children
            .into_iter()
            .filter(|c| !is_ignored(&c.name, &patterns))
            .filter(|c| {
                let skip = excluded.iter().any(|ex| {
                    ex.path == c.path || (ex.identity.is_some() && ex.identity == c.identity)
                });
                if skip {
                    debug!("Excluding {} from the source scan", c.path.display());
                }
                !skip
            })
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));

        info!("Scanning {} entries in {}", children.len(), root.display());
        reporter.on_scan_start(children.len());

        let extension_counts: DashMap<String, usize> = DashMap::new();
        let done = AtomicUsize::new(0);

        let entries = children
            .par_iter()
            .map(|child| {
                if cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                let entry = self.describe(child, &patterns, &extension_counts, cancel)?;
                let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                reporter.on_scan_progress(finished, &child.name);
                Ok(entry)
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let file_extension_counts: BTreeMap<String, usize> =
            extension_counts.into_iter().collect();

        let duration = start.elapsed();
        debug!(
            "Source scan completed in {:.2}s: {} entries, {} extensions",
            duration.as_secs_f64(),
            entries.len(),
            file_extension_counts.len()
        );
        reporter.on_scan_complete(entries.len(), duration.as_secs_f64());

        Ok(SourceOverview {
            source_root: root.to_string_lossy().into_owned(),
            generated_at: now_rfc3339(),
            total_entries: entries.len(),
            entries,
            file_extension_counts,
        })
    }

    fn describe(
        &self,
        child: &ChildEntry,
        patterns: &[Pattern],
        extension_counts: &DashMap<String, usize>,
        cancel: &CancelToken,
    ) -> Result<SourceEntry, Error> {
        match child.kind {
            EntryKind::Directory => {
                let summary = walk::walk_subtree(
                    self.fs,
                    &child.path,
                    self.options.sample_limit,
                    patterns,
                    cancel,
                )?;
                for (ext, count) in summary.extension_counts {
                    *extension_counts.entry(ext).or_default() += count;
                }
                Ok(SourceEntry::Directory {
                    rel_path: child.name.clone(),
                    counts: summary.counts,
                    sample_children: summary.sample_children,
                    top_big_files: summary.top_files.into_result(),
                    unreadable: summary.unreadable,
                })
            }
            EntryKind::Symlink => {
                let target = self
                    .fs
                    .read_link(&child.path)
                    .ok()
                    .map(|t| t.to_string_lossy().into_owned());
                Ok(SourceEntry::Link {
                    rel_path: child.name.clone(),
                    target,
                })
            }
            EntryKind::File | EntryKind::Other => {
                let extension = Path::new(&child.name)
                    .extension()
                    .map(|e| e.to_string_lossy().into_owned())
                    .filter(|e| !e.is_empty());
                if let Some(ext) = extension_key(&child.name) {
                    *extension_counts.entry(ext).or_default() += 1;
                }
                Ok(SourceEntry::File {
                    rel_path: child.name.clone(),
                    size: child.size,
                    extension,
                    content_type: content_type_for(&child.name),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_defaults_to_octet_stream() {
        assert_eq!(content_type_for("report.pdf"), "application/pdf");
        assert_eq!(content_type_for("blob.zzqx"), OCTET_STREAM);
        assert_eq!(content_type_for("README"), OCTET_STREAM);
    }

    #[test]
    fn invalid_patterns_are_dropped() {
        let patterns = compile_patterns(&["*.tmp".to_string(), "[".to_string()]);
        assert_eq!(patterns.len(), 1);
    }
}
