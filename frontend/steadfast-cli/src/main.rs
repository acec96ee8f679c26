mod cli;
mod renderer;
mod repl;

use steadfast_core::service::ScriptedService;
use steadfast_core::{Session, Steadfast};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("steadfast failed: {error}");
        std::process::exit(1);
    }
}

async fn run() -> steadfast_core::Result<()> {
    let args = cli::Cli::parse_args();

    let (mut config, source) =
        steadfast_core::config::load_with_source(Some(args.config.as_path()))?;
    args.apply_overrides(&mut config);
    steadfast_core::logging::init_tracing(&config.logging.level);
    tracing::debug!(%source, "configuration loaded");

    let app = Steadfast::new(config)?;
    let session = match &args.script {
        Some(path) => {
            tracing::info!(script = %path.display(), "replaying scripted service");
            Session::new(ScriptedService::from_file(path)?)
        }
        None => app.open_http_session().await?,
    };

    repl::Repl::new(app, args.format).run(session).await
}
