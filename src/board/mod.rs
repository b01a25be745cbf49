//! Issue board back-end: storage, access policy and the HTTP API.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐   HTTP   ┌──────────────────────────────────────────────────┐
//! │  Client  │ ───────> │  server.rs  (axum Router, ServerConfig)          │
//! │  (UI or  │ <─────── │    └─ api.rs  (route handlers, AppState)         │
//! │  client) │   JSON   │         │                                        │
//! └──────────┘          │         │ Credential (per-request, auth.rs)      │
//!                       │         v                                        │
//!                       │  db.rs  (DbHandle → BoardDb, SQLite)             │
//!                       │         │                                        │
//!                       │         │ IssueRecord → rank::to_view()          │
//!                       │         v                                        │
//!                       │  IssueView JSON (category, aiSummary, aiRank)    │
//!                       └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Supporting Modules
//!
//! | Module   | Responsibility                                           |
//! |----------|----------------------------------------------------------|
//! | `models` | Stored types: `Issue`, `Comment`, status/priority enums  |
//! | `auth`   | `Credential` extractor and `AccessPolicy`                |
//! | `seed`   | Sample issues for demos, operator-only bulk operations   |
//!
//! ## Typical Request Flow (like an issue)
//!
//! 1. `POST /api/issues/{id}/like` → `api::like_issue()`
//! 2. The `Authorization: Bearer` header becomes a `Credential`.
//! 3. `DbHandle::call` runs `BoardDb::like_issue` on the blocking pool; the
//!    policy check and the single-statement increment happen there.
//! 4. The updated record is turned into an `IssueView` at the request's
//!    instant and returned.

pub mod api;
pub mod auth;
pub mod db;
pub mod models;
pub mod seed;
pub mod server;
