//! Authentication types: operator credentials and the per-run session.
//!
//! - `Credentials`: email and password, validated and redacted in diagnostics
//! - `SessionToken`: access token and profile used to build the realms cookie
//!
//! Neither is persisted; both live for one process invocation.

pub mod credentials;
pub mod session;

pub use credentials::Credentials;
pub use session::SessionToken;
