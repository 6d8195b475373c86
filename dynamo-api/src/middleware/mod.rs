//! Sequential middleware pipeline: request-id → auth → scan → budget → router →
//! audit-setup → proxy handler. Each stage injects typed context into request
//! extensions for later stages, mirroring `caliber-api/src/middleware/auth.rs`.

pub mod audit_setup;
pub mod auth;
pub(crate) mod body;
pub mod budget;
pub mod request_id;
pub mod router;
pub mod scan;

pub use audit_setup::audit_setup_middleware;
pub use auth::auth_middleware;
pub use budget::budget_middleware;
pub use request_id::request_id_middleware;
pub use router::router_middleware;
pub use scan::scan_middleware;
