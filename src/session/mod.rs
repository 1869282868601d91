//! Live detection sessions: one actor task per session, addressed by id.

pub mod actor;
pub mod events;
pub mod registry;

use thiserror::Error;
use uuid::Uuid;

pub use actor::{IngestReport, SessionHandle};
pub use events::{SessionEvent, SessionSnapshot};
pub use registry::SessionRegistry;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(Uuid),
    #[error("session limit of {0} reached")]
    LimitReached(usize),
    #[error("session {0} is closed")]
    Closed(Uuid),
}
