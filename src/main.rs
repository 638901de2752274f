use brrtkit::cli::{run_cli, Cli};
use brrtkit::dispatcher::{HandlerRequest, HandlerResponse};
use clap::Parser;
use serde_json::json;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_cli(cli, |builder| {
        builder
            .handler("System", "health", |_: &HandlerRequest, res: &mut HandlerResponse| {
                *res = HandlerResponse::json(200, json!({ "status": "ok" }));
            })
            .routes(|t| t.get("/health", ("System", "health"), &[]))
    })
}
