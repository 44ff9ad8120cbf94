use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::Planner;
use crate::error::Error;
use crate::model::{FolderRequest, LibraryIndex, Placement, Plan, PlannerInput, SourceEntry};
use crate::scanner::walk::extension_key;

const PROJECT_MARKERS: &[&str] = &[
    ".git",
    "Cargo.toml",
    "package.json",
    "pyproject.toml",
    "go.mod",
    "pom.xml",
    "Makefile",
    "CMakeLists.txt",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Family {
    Documents,
    Images,
    Video,
    Audio,
    Archives,
    Code,
    Data,
    Other,
}

impl Family {
    fn category(self) -> &'static str {
        match self {
            Self::Documents => "Documents",
            Self::Images => "Images",
            Self::Video => "Videos",
            Self::Audio => "Audio",
            Self::Archives => "Archives",
            Self::Code => "Code",
            Self::Data => "Data",
            Self::Other => "Other",
        }
    }

    /// Existing library folder names accepted as this family's category.
    fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Documents => &["documents", "docs", "papers"],
            Self::Images => &["images", "pictures", "photos"],
            Self::Video => &["videos", "video", "movies"],
            Self::Audio => &["audio", "music", "sounds"],
            Self::Archives => &["archives", "compressed"],
            Self::Code => &["code", "projects", "source"],
            Self::Data => &["data", "datasets"],
            Self::Other => &["other", "misc", "miscellaneous"],
        }
    }

    fn from_extension(ext: &str) -> Option<Self> {
        let family = match ext {
            "pdf" | "doc" | "docx" | "odt" | "rtf" | "txt" | "md" | "pages" | "epub" | "ppt"
            | "pptx" | "key" | "odp" | "tex" => Self::Documents,
            "xls" | "xlsx" | "ods" | "numbers" | "csv" | "tsv" | "json" | "xml" | "parquet"
            | "sqlite" | "db" => Self::Data,
            "jpg" | "jpeg" | "png" | "gif" | "bmp" | "tiff" | "tif" | "webp" | "heic" | "svg"
            | "raw" | "cr2" | "nef" | "psd" => Self::Images,
            "mp4" | "mov" | "mkv" | "avi" | "wmv" | "webm" | "m4v" => Self::Video,
            "mp3" | "wav" | "flac" | "aac" | "ogg" | "m4a" | "aiff" => Self::Audio,
            "zip" | "rar" | "7z" | "tar" | "gz" | "tgz" | "bz2" | "xz" | "dmg" | "iso" => {
                Self::Archives
            }
            "rs" | "py" | "js" | "ts" | "go" | "java" | "c" | "h" | "cpp" | "hpp" | "cs"
            | "rb" | "php" | "swift" | "kt" | "sh" | "toml" | "yaml" | "yml" => Self::Code,
            _ => return None,
        };
        Some(family)
    }

    fn from_content_type(content_type: &str) -> Option<Self> {
        let top = content_type.split('/').next().unwrap_or_default();
        match top {
            "image" => Some(Self::Images),
            "video" => Some(Self::Video),
            "audio" => Some(Self::Audio),
            "text" => Some(Self::Documents),
            _ => None,
        }
    }
}

/// Offline, deterministic planner: buckets items by content family and
/// reuses matching library categories where they exist.
#[derive(Debug, Default)]
pub struct HeuristicPlanner;

impl HeuristicPlanner {
    pub fn new() -> Self {
        Self
    }

    fn classify(entry: &SourceEntry) -> (Family, String) {
        match entry {
            SourceEntry::File {
                extension,
                content_type,
                ..
            } => {
                let ext = extension.as_deref().map(str::to_lowercase);
                let family = ext
                    .as_deref()
                    .and_then(Family::from_extension)
                    .or_else(|| Family::from_content_type(content_type))
                    .unwrap_or(Family::Other);
                let why = match ext {
                    Some(ext) => format!("{ext} file"),
                    None => format!("{content_type} file"),
                };
                (family, why)
            }
            SourceEntry::Directory {
                sample_children,
                top_big_files,
                ..
            } => {
                if sample_children
                    .iter()
                    .any(|c| PROJECT_MARKERS.contains(&c.as_str()))
                {
                    return (Family::Code, "project folder".to_string());
                }
                let mut votes: HashMap<Family, usize> = HashMap::new();
                let names = if top_big_files.is_empty() {
                    sample_children
                } else {
                    top_big_files
                };
                for name in names {
                    if let Some(family) = extension_key(name)
                        .as_deref()
                        .and_then(Family::from_extension)
                    {
                        *votes.entry(family).or_default() += 1;
                    }
                }
                // Highest vote wins; ties go to the earlier family in
                // declaration order so the choice is stable.
                let winner = votes
                    .into_iter()
                    .max_by(|a, b| a.1.cmp(&b.1).then((b.0 as u8).cmp(&(a.0 as u8))))
                    .map(|(family, _)| family)
                    .unwrap_or(Family::Other);
                (winner, format!("folder mostly {}", winner.category().to_lowercase()))
            }
            SourceEntry::Link { .. } => (Family::Other, "link".to_string()),
        }
    }

    fn existing_category(library: &LibraryIndex, family: Family) -> Option<String> {
        library
            .categories
            .iter()
            .find(|c| family.aliases().contains(&c.name.to_lowercase().as_str()))
            .map(|c| c.name.clone())
    }

    /// An existing subcategory named after the file's extension (`PDF`).
    fn existing_subcategory(
        library: &LibraryIndex,
        category: &str,
        entry: &SourceEntry,
    ) -> Option<String> {
        let SourceEntry::File {
            extension: Some(ext),
            ..
        } = entry
        else {
            return None;
        };
        library.category(category).and_then(|c| {
            c.subcategories
                .iter()
                .find(|s| s.name.eq_ignore_ascii_case(ext))
                .map(|s| s.name.clone())
        })
    }
}

impl Planner for HeuristicPlanner {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn plan(&self, input: &PlannerInput) -> Result<Plan, Error> {
        let library = &input.library;
        let mut plan = Plan {
            notes: "generated by the local heuristic planner".to_string(),
            ..Plan::default()
        };
        let mut requested: HashSet<String> = HashSet::new();

        for entry in &input.source.entries {
            let (family, why) = Self::classify(entry);
            let category = match Self::existing_category(library, family) {
                Some(existing) => existing,
                None => {
                    let name = family.category().to_string();
                    if requested.insert(name.clone()) {
                        plan.new_folders.push(FolderRequest {
                            category: name.clone(),
                            subcategory: None,
                            reason: format!("no existing category for {}", name.to_lowercase()),
                        });
                    }
                    name
                }
            };
            let subcategory = Self::existing_subcategory(library, &category, entry);
            debug!("{} -> {}/{:?} ({})", entry.rel_path(), category, subcategory, why);
            plan.placements.push(Placement {
                path: entry.rel_path().to_string(),
                category,
                subcategory,
                reason: why,
            });
        }

        Ok(plan)
    }
}
