//! # CLI Module
//!
//! Command-line front end of the `brrtkit` binary.
//!
//! ## Commands
//!
//! ```bash
//! # Serve the application
//! brrtkit serve --config config/app.yaml --addr 127.0.0.1:8080
//!
//! # Print the route table in registration order
//! brrtkit routes --config config/app.yaml
//!
//! # Print activated modules and their shortcut tables
//! brrtkit modules --config config/app.yaml
//! ```
//!
//! `--config` falls back to `BRRTK_CONFIG`. Handlers and middleware are compiled in:
//! the binary passes a setup closure to [`run_cli`] that registers them on the
//! [`ApplicationBuilder`](crate::app::ApplicationBuilder).

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{print_modules, print_routes, run_cli, Cli, Commands};
