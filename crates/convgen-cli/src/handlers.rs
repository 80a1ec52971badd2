//! Command handlers for CLI subcommands
//!
//! Each subcommand lives in its own module under `handlers/`; shared
//! loading helpers are in [`utils`].

mod check;
mod completions;
mod config;
mod generate;
mod tag;
mod utils;

pub use check::handle_check;
pub use completions::handle_completions;
pub use config::handle_config;
pub use generate::handle_generate;
pub use tag::handle_tag;
