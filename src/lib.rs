pub mod board;
pub mod client;
pub mod config;
pub mod errors;
pub mod estimate;
pub mod logging;
pub mod rank;
