mod controller;
mod events;
mod progress;
mod state;
mod timer;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use controller::{AssessmentController, ControllerStatus};
pub use events::{AssessmentHooks, NoopHooks, SessionEvent};
pub use progress::{SessionPhase, SessionSnapshot};
pub use state::{Advance, AssessmentSession, SubmitRequest, TickOutcome};
