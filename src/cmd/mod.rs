//! CLI command implementations.
//!
//! | Module    | Commands handled        |
//! |-----------|-------------------------|
//! | `review`  | `Review`, `Component`   |
//! | `ask`     | `Ask`                   |
//! | `config`  | `Config`                |

pub mod ask;
pub mod config;
pub mod review;

pub use ask::cmd_ask;
pub use config::cmd_config;
pub use review::{cmd_component, cmd_review};
