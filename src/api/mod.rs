//! Minimal local-only operability surface (§10.5): `/health` and `/status`.
//! Distinct from the matching directory's own HTTP API in `directory_client`.

pub mod routes;

pub use routes::{router, AppState, BotHandle};
