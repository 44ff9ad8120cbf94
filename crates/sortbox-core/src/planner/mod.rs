//! The categorization decision is an opaque collaborator behind [`Planner`].
//!
//! The core only builds its input and checks its output; whether a plan
//! comes from a remote model or a local rule set makes no difference to
//! validation and execution.

mod heuristic;
mod remote;

pub use heuristic::HeuristicPlanner;
pub use remote::RemotePlanner;

use crate::config::{PlannerConfig, PlannerKind};
use crate::error::Error;
use crate::model::{Plan, PlannerInput};

pub trait Planner: Send + Sync {
    fn name(&self) -> &str;

    /// Produce a plan or fail. Failures are surfaced as-is; the core does
    /// not retry.
    fn plan(&self, input: &PlannerInput) -> Result<Plan, Error>;
}

pub fn build_planner(config: &PlannerConfig) -> Result<Box<dyn Planner>, Error> {
    match config.kind {
        PlannerKind::Heuristic => Ok(Box::new(HeuristicPlanner::new())),
        PlannerKind::Remote => Ok(Box::new(RemotePlanner::from_config(config)?)),
    }
}

/// Parse a planner response into a [`Plan`].
///
/// Accepts bare JSON or JSON wrapped in prose / a fenced code block; the
/// outermost `{...}` is taken. Anything else is a planner failure.
pub fn parse_plan_response(text: &str) -> Result<Plan, Error> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::Planner("empty response".to_string()));
    }
    let start = trimmed
        .find('{')
        .ok_or_else(|| Error::Planner("response contains no JSON object".to_string()))?;
    let end = trimmed
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| Error::Planner("response contains no JSON object".to_string()))?;

    let value: serde_json::Value = serde_json::from_str(&trimmed[start..=end])
        .map_err(|e| Error::Planner(format!("malformed JSON: {e}")))?;
    if !value.get("placements").is_some_and(|p| p.is_array()) {
        return Err(Error::Planner(
            "response is missing a `placements` array".to_string(),
        ));
    }
    serde_json::from_value(value).map_err(|e| Error::Planner(format!("schema violation: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_json() {
        let text = r#"{"placements":[{"path":"a.pdf","category":"Documents",
            "subcategory":null,"reason":"pdf"}],"new_folders":[],"notes":""}"#;
        let plan = parse_plan_response(text).unwrap();
        assert_eq!(plan.placements.len(), 1);
        assert_eq!(plan.placements[0].category, "Documents");
    }

    #[test]
    fn parses_fenced_json() {
        let text = "Here is the plan:\n```json\n{\"placements\": [], \"new_folders\": \
                    [{\"category\": \"Music\", \"subcategory\": null, \
                    \"reason\": \"audio\"}]}\n```\n";
        let plan = parse_plan_response(text).unwrap();
        assert!(plan.placements.is_empty());
        assert_eq!(plan.new_folders[0].category, "Music");
    }

    #[test]
    fn rejects_malformed_responses() {
        for text in ["", "no json here", "{\"placements\": [", "{\"notes\": \"x\"}"] {
            let err = parse_plan_response(text).unwrap_err();
            assert!(matches!(err, Error::Planner(_)), "{text:?} gave {err}");
        }
    }

    #[test]
    fn rejects_wrong_field_types() {
        let err = parse_plan_response(r#"{"placements":[{"path":1,"category":"A"}]}"#).unwrap_err();
        assert!(err.to_string().contains("schema violation"));
    }
}
