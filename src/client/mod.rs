//! Client side of the board API.
//!
//! `http::BoardClient` wraps the REST routes with typed responses;
//! `optimistic::OptimisticLikes` layers immediate like feedback on top.

pub mod http;
pub mod optimistic;

pub use http::{BoardClient, IssueQuery, IssueReport};
pub use optimistic::{LikeRemote, OptimisticLikes};
