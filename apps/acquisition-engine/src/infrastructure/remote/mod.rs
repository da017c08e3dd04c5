//! Remote Booking Service Adapters
//!
//! reqwest implementations of the session, submitter and time probe ports,
//! plus scripted doubles for tests.

mod error;
pub mod markup;
pub mod mock;
mod session;
mod submitter;
mod time_probe;

pub use error::RemoteError;
pub use mock::{
    FixedOffsetProbe, ScriptedLoad, ScriptedSession, ScriptedSessionFactory, ScriptedSubmitter,
    SessionEvent,
};
pub use session::{HttpSession, HttpSessionFactory};
pub use submitter::HttpSubmitter;
pub use time_probe::HttpTimeProbe;
