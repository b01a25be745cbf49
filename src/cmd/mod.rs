//! CLI command implementations.
//!
//! | Module   | Commands handled                    |
//! |----------|-------------------------------------|
//! | `serve`  | `Serve`                             |
//! | `board`  | `Init`, `Seed`, `Clear`, `List`     |
//! | `config` | `Config`                            |

pub mod board;
pub mod config;
pub mod serve;

pub use board::{ListArgs, cmd_clear, cmd_init, cmd_list, cmd_seed};
pub use config::{cmd_config, cmd_config_init};
pub use serve::cmd_serve;
