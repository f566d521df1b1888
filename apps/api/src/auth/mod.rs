// Session authentication: password hashing, signed tokens, session
// verification and revocation. HTTP wiring lives in `middleware` and
// `routes::auth`.

pub mod cache;
pub mod cookies;
pub mod password;
pub mod service;
pub mod sweeper;
pub mod token;
pub mod validation;

pub use service::{AuthError, PasswordChangePolicy, SessionService};
