// ABOUTME: Blue/green release and rollback orchestration using the type state pattern.
// ABOUTME: Exports the workflows, their state markers, records, audit, and the orchestrator.

mod audit;
mod cancel;
mod confirm;
mod context;
mod error;
mod orchestrator;
mod phase;
mod record;
mod rollback;
mod smoke;
mod state;
mod steps;
mod transitions;

pub use audit::{AuditLog, AuditRecord};
pub use cancel::{CancelHandle, CancelSignal};
pub use confirm::{ConfirmationGate, FixedAnswer, StdinGate};
pub use context::{Aborted, Finished, TransitionResult};
pub use error::{ClusterResultExt, DeployError, ErrorKind};
pub use orchestrator::{Orchestrator, Plan, RunReport};
pub use phase::Phase;
pub use record::{DeploymentRecord, Operation};
pub use rollback::Rollback;
pub use smoke::SmokeOutcome;
pub use state::{
    Completed, Confirmed, CutOver, Deployed, Healthy, Monitored, Pending, Resolved, Tested,
};
pub use transitions::Release;
