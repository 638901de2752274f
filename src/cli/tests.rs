//! Unit tests for CLI commands

use std::fs;

use crate::app::Application;
use crate::cli::{print_modules, print_routes, Cli, Commands};
use crate::dispatcher::{HandlerRequest, HandlerResponse, ResponseMode};
use crate::runtime_config::AppConfig;
use clap::Parser;

#[test]
fn test_serve_command_defaults() {
    let cli = Cli::try_parse_from(["brrtkit", "serve", "--config", "app.yaml"]).unwrap();
    match cli.command {
        Commands::Serve { config, addr } => {
            assert_eq!(config.to_string_lossy(), "app.yaml");
            assert_eq!(addr, "0.0.0.0:8080");
        }
        _ => panic!("Expected Serve command"),
    }
}

#[test]
fn test_all_commands_parse() {
    let commands = vec![
        vec!["brrtkit", "serve", "-c", "app.yaml", "--addr", "127.0.0.1:9000"],
        vec!["brrtkit", "routes", "--config", "app.toml"],
        vec!["brrtkit", "modules", "--config", "app.json"],
    ];

    for args in commands {
        let cli = Cli::try_parse_from(&args);
        assert!(cli.is_ok(), "Failed to parse command: {:?}", args);
    }
}

#[test]
fn test_unknown_command_rejected() {
    assert!(Cli::try_parse_from(["brrtkit", "generate", "--config", "app.yaml"]).is_err());
}

#[test]
fn test_print_routes_and_modules() {
    let root = tempfile::tempdir().unwrap();
    let modules = root.path().join("modules");
    fs::create_dir_all(modules.join("Blog/routes")).unwrap();
    fs::write(
        modules.join("Blog/manifest.json"),
        r#"{"uuid":"b-1","slug":"Blog","version":"1.0","name":"Blog"}"#,
    )
    .unwrap();
    fs::write(
        modules.join("Blog/routes/routes.json"),
        r#"[{"method":"GET","path":"/blog","handler":"Blog@index"}]"#,
    )
    .unwrap();
    fs::write(modules.join("Blog/routes/shortcuts.json"), r#"{"home":"/blog"}"#).unwrap();
    let ini = root.path().join("system-ini.json");
    fs::write(&ini, r#"{"Modules":{"essentials":["blog@1.0"],"active":[]}}"#).unwrap();

    let config = AppConfig {
        router_mode: Some(ResponseMode::Json),
        module_path: Some(modules),
        ini_path: Some(ini),
        ..AppConfig::default()
    };
    let noop = |_: &HandlerRequest, _: &mut HandlerResponse| {};
    let app = Application::builder(config)
        .handler("Blog", "index", noop)
        .handler("Home", "index", noop)
        .routes(|t| t.get("/", ("Home", "index"), &[]))
        .build()
        .unwrap();

    let mut out = Vec::new();
    print_routes(&app, &mut out).unwrap();
    let routes = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = routes.lines().collect();
    assert_eq!(lines[0], "[routes] count=2");
    assert_eq!(lines[1], "[route] GET / -> Home@index");
    assert_eq!(lines[2], "[route] GET /blog -> Blog@index");

    let mut out = Vec::new();
    print_modules(&app, &mut out).unwrap();
    let listing = String::from_utf8(out).unwrap();
    assert!(listing.starts_with("[modules] count=1"));
    assert!(listing.contains("[module] Blog 1.0 uuid=b-1 routes=1"));
    assert!(listing.contains("  [shortcut] home -> /blog"));
}
