// Request-level auth: the `AuthUser` extractor for API routes and the page
// gatekeeper layered over the whole router.

pub mod authorizer;
pub mod gatekeeper;

pub use authorizer::{AuthUser, SessionToken};
