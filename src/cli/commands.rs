use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::app::{Application, ApplicationBuilder};
use crate::logging::{init_logging_with_config, LogConfig};
use crate::runtime_config::AppConfig;
use crate::server::{configure_runtime, AppService, HttpServer};

/// Command-line interface for brrtkit
#[derive(Parser)]
#[command(name = "brrtkit")]
#[command(about = "Modular request router and dispatcher", long_about = None, version)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Boot the application and serve it over HTTP
    Serve {
        /// Configuration file (YAML, JSON or TOML)
        #[arg(short, long, env = "BRRTK_CONFIG")]
        config: PathBuf,

        /// Address and port to bind the server to
        #[arg(long, default_value = "0.0.0.0:8080")]
        addr: String,
    },
    /// Boot the application and print the route table in registration order
    Routes {
        /// Configuration file (YAML, JSON or TOML)
        #[arg(short, long, env = "BRRTK_CONFIG")]
        config: PathBuf,
    },
    /// Boot the application and print activated modules with their shortcuts
    Modules {
        /// Configuration file (YAML, JSON or TOML)
        #[arg(short, long, env = "BRRTK_CONFIG")]
        config: PathBuf,
    },
}

/// Execute the CLI command.
///
/// `setup` registers the handlers, middleware, installers and application routes
/// compiled into the binary.
///
/// # Errors
///
/// Returns an error if:
/// - The configuration cannot be loaded or is invalid
/// - Building the application fails (registration or module activation)
/// - The server cannot bind or its coroutine panics
pub fn run_cli<F>(cli: Cli, setup: F) -> Result<()>
where
    F: FnOnce(ApplicationBuilder) -> ApplicationBuilder,
{
    match cli.command {
        Commands::Serve { config, addr } => {
            let config = AppConfig::load(&config)?;
            let _logging =
                init_logging_with_config(&LogConfig::from_env().with_default_log_dir(config.log_dir()))?;
            let app = boot(config, setup)?;
            serve(app, &addr)
        }
        Commands::Routes { config } => {
            let app = boot_from(&config, setup)?;
            print_routes(&app, &mut io::stdout().lock())?;
            Ok(())
        }
        Commands::Modules { config } => {
            let app = boot_from(&config, setup)?;
            print_modules(&app, &mut io::stdout().lock())?;
            Ok(())
        }
    }
}

fn boot_from<F>(path: &Path, setup: F) -> Result<Application>
where
    F: FnOnce(ApplicationBuilder) -> ApplicationBuilder,
{
    boot(AppConfig::load(path)?, setup)
}

fn boot<F>(config: AppConfig, setup: F) -> Result<Application>
where
    F: FnOnce(ApplicationBuilder) -> ApplicationBuilder,
{
    setup(Application::builder(config)).build()
}

fn serve(app: Application, addr: &str) -> Result<()> {
    let stack_size = configure_runtime();
    info!(addr, stack_size, routes = app.routes().len(), "Starting server");
    let handle = HttpServer(AppService::new(Arc::new(app)))
        .start(addr)
        .with_context(|| format!("Failed to start server on {addr}"))?;
    handle.wait_ready()?;
    handle
        .join()
        .map_err(|e| anyhow!("Server coroutine panicked: {e:?}"))
}

/// Write the route table of `app`.
///
/// # Errors
///
/// Any error from `out`.
pub fn print_routes<W: Write>(app: &Application, out: &mut W) -> io::Result<()> {
    app.routes().write_routes(out)
}

/// Write activated modules in activation order, each with its shortcut table.
///
/// # Errors
///
/// Any error from `out`.
pub fn print_modules<W: Write>(app: &Application, out: &mut W) -> io::Result<()> {
    let modules = app.modules();
    writeln!(out, "[modules] count={}", modules.len())?;
    for module in modules.modules() {
        let manifest = &module.manifest;
        writeln!(
            out,
            "[module] {} {} uuid={} routes={} dir={}",
            manifest.display_name(),
            manifest.version,
            manifest.uuid,
            module.routes_added,
            module.dir.display()
        )?;
        if let Some(shortcuts) = modules.shortcuts(&manifest.slug) {
            for (alias, path) in shortcuts {
                writeln!(out, "  [shortcut] {alias} -> {path}")?;
            }
        }
    }
    Ok(())
}
