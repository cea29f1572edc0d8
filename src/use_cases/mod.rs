// Use cases layer: session workflows for the survival server.

pub mod registry;
pub mod session;
pub mod types;

pub use registry::{SessionError, SessionHandle, SessionRegistry, SessionSettings};
pub use session::{Session, session_task};
pub use types::{Command, GameEvent, SessionState, WorldUpdate};
