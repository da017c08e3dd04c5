//! Infrastructure Layer
//!
//! Adapters implementing the ports defined in the application layer:
//!
//! - `remote/`: the remote booking service over HTTP (session, submitter,
//!   time probe) and scripted doubles
//! - `persistence/`: upstream request/result store
//! - `credentials/`: credential decryption

pub mod credentials;
pub mod persistence;
pub mod remote;
