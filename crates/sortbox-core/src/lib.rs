pub mod cancel;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod fsys;
pub mod model;
pub mod names;
pub mod planner;
pub mod platform;
pub mod progress;
pub mod relocate;
pub mod scanner;
pub mod undo;
pub mod validate;
pub mod workspace;

pub use cancel::CancelToken;
pub use config::AppConfig;
pub use engine::{ApplyResult, Organizer, PlanResult, UndoResult};
pub use error::{Error, SkipReason, SkipRecord};
pub use executor::{ApplyReport, PlanExecutor};
pub use fsys::{FileSystem, LocalFs};
pub use model::{
    FolderRequest, LibraryIndex, MoveLog, MoveOp, Placement, Plan, PlannerInput, SourceEntry,
    SourceOverview,
};
pub use planner::{build_planner, HeuristicPlanner, Planner, RemotePlanner};
pub use progress::{ProgressReporter, SilentReporter};
pub use undo::{UndoEngine, UndoOptions, UndoReport};
pub use validate::{validate_plan, ValidatedPlan};
pub use workspace::{ArtifactKind, Workspace};
