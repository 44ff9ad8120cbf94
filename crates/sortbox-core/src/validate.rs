use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{SkipReason, SkipRecord};
use crate::model::{
    FolderRequest, LibraryIndex, Placement, Plan, SourceOverview, ROOT_SUBCATEGORY,
};

const MAX_NAME_BYTES: usize = 255;
const FORBIDDEN_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

/// Plan filtered down to what may be executed, plus why the rest was dropped.
#[derive(Debug, Clone, Serialize)]
pub struct ValidatedPlan {
    pub plan: Plan,
    pub skipped: Vec<SkipRecord>,
}

/// Check one destination folder name. Separators imply a third level.
pub fn check_folder_name(name: &str) -> Result<(), SkipReason> {
    if name.contains('/') || name.contains('\\') {
        return Err(SkipReason::InvalidDepth);
    }
    let invalid = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.len() > MAX_NAME_BYTES
        || name.ends_with('.')
        || name.ends_with(' ')
        || name.chars().any(|c| c.is_control() || FORBIDDEN_CHARS.contains(&c));
    if invalid {
        Err(SkipReason::InvalidName)
    } else {
        Ok(())
    }
}

fn check_target(category: &str, subcategory: Option<&str>) -> Result<(), SkipReason> {
    if category == ROOT_SUBCATEGORY {
        return Err(SkipReason::InvalidName);
    }
    check_folder_name(category)?;
    if let Some(sub) = subcategory {
        check_folder_name(sub)?;
    }
    Ok(())
}

fn folder_label(category: &str, subcategory: Option<&str>) -> String {
    match subcategory {
        Some(sub) => format!("{category}/{sub}"),
        None => category.to_string(),
    }
}

/// Validate `plan` against the current SOURCE overview and LIBRARY index.
///
/// Offending placements and folder requests are dropped with a reason;
/// nothing is repaired or redirected to a guessed category.
pub fn validate_plan(
    source: &SourceOverview,
    library: &LibraryIndex,
    plan: &Plan,
) -> ValidatedPlan {
    let mut skipped = Vec::new();

    let mut new_folders: Vec<FolderRequest> = Vec::new();
    let mut declared: HashSet<(String, Option<String>)> = HashSet::new();
    for request in &plan.new_folders {
        let sub = request.target_subcategory();
        let label = folder_label(&request.category, sub);
        if let Err(reason) = check_target(&request.category, sub) {
            debug!("Dropping folder request {}: {}", label, reason);
            skipped.push(SkipRecord::new(label, &reason));
            continue;
        }
        let key = (request.category.clone(), sub.map(str::to_string));
        if declared.insert(key) {
            new_folders.push(FolderRequest {
                category: request.category.clone(),
                subcategory: sub.map(str::to_string),
                reason: request.reason.clone(),
            });
        }
    }
    let declared_categories: HashSet<&str> = declared.iter().map(|(c, _)| c.as_str()).collect();

    let mut placed: HashSet<&str> = HashSet::new();
    let mut placements: Vec<Placement> = Vec::new();
    for placement in &plan.placements {
        let checked = check_placement(
            placement,
            source,
            library,
            &declared,
            &declared_categories,
            &placed,
        );
        match checked {
            Ok(()) => {
                placed.insert(placement.path.as_str());
                placements.push(placement.clone());
            }
            Err(reason) => {
                debug!("Dropping placement {}: {}", placement.path, reason);
                skipped.push(SkipRecord::new(placement.path.clone(), &reason));
            }
        }
    }

    info!(
        "Plan validated: {} placements accepted, {} items skipped",
        placements.len(),
        skipped.len()
    );

    ValidatedPlan {
        plan: Plan {
            placements,
            new_folders,
            notes: plan.notes.clone(),
        },
        skipped,
    }
}

fn check_placement(
    placement: &Placement,
    source: &SourceOverview,
    library: &LibraryIndex,
    declared: &HashSet<(String, Option<String>)>,
    declared_categories: &HashSet<&str>,
    placed: &HashSet<&str>,
) -> Result<(), SkipReason> {
    if source.find(&placement.path).is_none() {
        return Err(SkipReason::SourceNotFound);
    }
    if placed.contains(placement.path.as_str()) {
        return Err(SkipReason::DuplicatePlacement);
    }

    let sub = placement.target_subcategory();
    check_target(&placement.category, sub)?;

    let known = library.has_target(&placement.category, sub)
        || match sub {
            None => declared_categories.contains(placement.category.as_str()),
            Some(s) => declared.contains(&(placement.category.clone(), Some(s.to_string()))),
        };
    if known {
        Ok(())
    } else {
        Err(SkipReason::MissingCategory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DirCounts, LibCategory, LibSubcategory, SourceEntry};
    use std::collections::BTreeMap;

    fn source(names: &[&str]) -> SourceOverview {
        SourceOverview {
            source_root: "/src".to_string(),
            generated_at: String::new(),
            total_entries: names.len(),
            entries: names
                .iter()
                .map(|n| SourceEntry::Directory {
                    rel_path: n.to_string(),
                    counts: DirCounts::default(),
                    sample_children: vec![],
                    top_big_files: vec![],
                    unreadable: false,
                })
                .collect(),
            file_extension_counts: BTreeMap::new(),
        }
    }

    fn library() -> LibraryIndex {
        LibraryIndex {
            library_root: "/lib".to_string(),
            generated_at: String::new(),
            categories: vec![LibCategory {
                name: "Documents".to_string(),
                subcategories: vec![LibSubcategory {
                    name: "Taxes".to_string(),
                    file_count: 2,
                    sample_files: vec![],
                }],
                notes: String::new(),
            }],
        }
    }

    fn placement(path: &str, category: &str, sub: Option<&str>) -> Placement {
        Placement {
            path: path.to_string(),
            category: category.to_string(),
            subcategory: sub.map(str::to_string),
            reason: String::new(),
        }
    }

    #[test]
    fn unknown_source_is_dropped_alone() {
        let plan = Plan {
            placements: vec![
                placement("a", "Documents", None),
                placement("ghost", "Documents", None),
                placement("b", "Documents", Some("Taxes")),
            ],
            ..Plan::default()
        };
        let result = validate_plan(&source(&["a", "b"]), &library(), &plan);
        assert_eq!(result.plan.placements.len(), 2);
        assert_eq!(
            result.skipped,
            vec![SkipRecord {
                item: "ghost".to_string(),
                reason: "source not found".to_string()
            }]
        );
    }

    #[test]
    fn undeclared_category_is_missing() {
        let plan = Plan {
            placements: vec![
                placement("a", "Photos", None),
                placement("b", "Documents", Some("Receipts")),
            ],
            ..Plan::default()
        };
        let result = validate_plan(&source(&["a", "b"]), &library(), &plan);
        assert!(result.plan.placements.is_empty());
        assert!(result.skipped.iter().all(|s| s.reason == "missing category"));
    }

    #[test]
    fn declared_folders_make_targets_valid() {
        let plan = Plan {
            placements: vec![
                placement("a", "Photos", Some("_root")),
                placement("b", "Documents", Some("Receipts")),
                placement("c", "Photos", Some("2024")),
            ],
            new_folders: vec![
                FolderRequest {
                    category: "Photos".to_string(),
                    subcategory: None,
                    reason: String::new(),
                },
                FolderRequest {
                    category: "Documents".to_string(),
                    subcategory: Some("Receipts".to_string()),
                    reason: String::new(),
                },
            ],
            notes: String::new(),
        };
        let result = validate_plan(&source(&["a", "b", "c"]), &library(), &plan);
        let accepted: Vec<_> = result.plan.placements.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(accepted, vec!["a", "b"]);
        assert_eq!(result.skipped[0].item, "c");
        assert_eq!(result.skipped[0].reason, "missing category");
    }

    #[test]
    fn deep_or_invalid_names_are_rejected() {
        let plan = Plan {
            placements: vec![
                placement("a", "Documents", Some("Taxes/2024")),
                placement("b", "Docu:ments", None),
                placement("c", "..", None),
                placement("d", "_root", None),
            ],
            ..Plan::default()
        };
        let result = validate_plan(&source(&["a", "b", "c", "d"]), &library(), &plan);
        assert!(result.plan.placements.is_empty());
        let reasons: Vec<_> = result.skipped.iter().map(|s| s.reason.as_str()).collect();
        assert_eq!(
            reasons,
            vec![
                "invalid destination depth",
                "invalid destination name",
                "invalid destination name",
                "invalid destination name"
            ]
        );
    }

    #[test]
    fn second_placement_of_same_item_is_dropped() {
        let plan = Plan {
            placements: vec![
                placement("a", "Documents", None),
                placement("a", "Documents", Some("Taxes")),
            ],
            ..Plan::default()
        };
        let result = validate_plan(&source(&["a"]), &library(), &plan);
        assert_eq!(result.plan.placements.len(), 1);
        assert_eq!(result.plan.placements[0].subcategory, None);
        assert_eq!(result.skipped[0].reason, "duplicate placement");
    }

    #[test]
    fn duplicate_folder_requests_collapse() {
        let request = FolderRequest {
            category: "Music".to_string(),
            subcategory: None,
            reason: String::new(),
        };
        let plan = Plan {
            new_folders: vec![request.clone(), request],
            ..Plan::default()
        };
        let result = validate_plan(&source(&[]), &library(), &plan);
        assert_eq!(result.plan.new_folders.len(), 1);
        assert!(result.skipped.is_empty());
    }
}
