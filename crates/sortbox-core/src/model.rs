use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Name of the pseudo subcategory for files placed directly in a category.
pub const ROOT_SUBCATEGORY: &str = "_root";

/// Depth-1 description of SOURCE handed to the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceOverview {
    pub source_root: String,
    pub generated_at: String,
    pub total_entries: usize,
    pub entries: Vec<SourceEntry>,
    pub file_extension_counts: BTreeMap<String, usize>,
}

impl SourceOverview {
    pub fn find(&self, rel_path: &str) -> Option<&SourceEntry> {
        self.entries.iter().find(|e| e.rel_path() == rel_path)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirCounts {
    pub directories: u64,
    pub files: u64,
}

/// One top-level item of SOURCE. `rel_path` is always a single name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceEntry {
    File {
        rel_path: String,
        size: u64,
        extension: Option<String>,
        content_type: String,
    },
    Directory {
        rel_path: String,
        counts: DirCounts,
        sample_children: Vec<String>,
        top_big_files: Vec<String>,
        #[serde(default)]
        unreadable: bool,
    },
    /// A symbolic link or reparse point; moved as the link itself.
    Link {
        rel_path: String,
        target: Option<String>,
    },
}

impl SourceEntry {
    pub fn rel_path(&self) -> &str {
        match self {
            Self::File { rel_path, .. }
            | Self::Directory { rel_path, .. }
            | Self::Link { rel_path, .. } => rel_path,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryIndex {
    pub library_root: String,
    pub generated_at: String,
    pub categories: Vec<LibCategory>,
}

impl LibraryIndex {
    pub fn category(&self, name: &str) -> Option<&LibCategory> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// True when `category[/subcategory]` already exists on disk.
    /// A `None` subcategory only needs the category.
    pub fn has_target(&self, category: &str, subcategory: Option<&str>) -> bool {
        match (self.category(category), subcategory) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(cat), Some(sub)) => cat.subcategories.iter().any(|s| s.name == sub),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibCategory {
    pub name: String,
    pub subcategories: Vec<LibSubcategory>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibSubcategory {
    pub name: String,
    pub file_count: u64,
    pub sample_files: Vec<String>,
}

/// Categorization decision returned by a planner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub placements: Vec<Placement>,
    #[serde(default)]
    pub new_folders: Vec<FolderRequest>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub path: String,
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub reason: String,
}

impl Placement {
    /// Subcategory with `""` and `_root` folded into `None`.
    pub fn target_subcategory(&self) -> Option<&str> {
        normalize_subcategory(self.subcategory.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderRequest {
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub reason: String,
}

impl FolderRequest {
    pub fn target_subcategory(&self) -> Option<&str> {
        normalize_subcategory(self.subcategory.as_deref())
    }
}

pub(crate) fn normalize_subcategory(sub: Option<&str>) -> Option<&str> {
    match sub.map(str::trim) {
        None | Some("") => None,
        Some(ROOT_SUBCATEGORY) => None,
        Some(s) => Some(s),
    }
}

/// One completed move. Appended once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOp {
    pub source_rel: String,
    pub destination_rel: String,
    pub reason: String,
}

/// Durable record of one plan application, read back by undo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveLog {
    pub executed_at: String,
    pub source_root: String,
    pub library_root: String,
    pub operations: Vec<MoveOp>,
}

/// `{source, library}` as sent to a planner.
#[derive(Debug, Clone, Serialize)]
pub struct PlannerInput {
    pub source: SourceOverview,
    pub library: LibraryIndex,
}

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_entry_is_tagged_by_kind() {
        let entry = SourceEntry::File {
            rel_path: "a.pdf".to_string(),
            size: 10,
            extension: Some("pdf".to_string()),
            content_type: "application/pdf".to_string(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["kind"], "file");
        assert_eq!(json["rel_path"], "a.pdf");
    }

    #[test]
    fn plan_fields_default_when_missing() {
        let plan: Plan =
            serde_json::from_str(r#"{"placements":[{"path":"x","category":"Docs"}]}"#).unwrap();
        assert_eq!(plan.placements.len(), 1);
        assert!(plan.placements[0].subcategory.is_none());
        assert!(plan.new_folders.is_empty());
    }

    #[test]
    fn root_subcategory_folds_to_none() {
        assert_eq!(normalize_subcategory(Some("_root")), None);
        assert_eq!(normalize_subcategory(Some("  ")), None);
        assert_eq!(normalize_subcategory(Some("Taxes")), Some("Taxes"));
    }

    #[test]
    fn move_log_shape_is_exact() {
        let log = MoveLog {
            executed_at: "t".to_string(),
            source_root: "/s".to_string(),
            library_root: "/l".to_string(),
            operations: vec![MoveOp {
                source_rel: "a".to_string(),
                destination_rel: "Docs/a".to_string(),
                reason: "r".to_string(),
            }],
        };
        let json = serde_json::to_value(&log).unwrap();
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(
            keys,
            vec!["executed_at", "library_root", "operations", "source_root"]
        );
    }
}
