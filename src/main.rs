use rmcp::{ServiceExt, transport::stdio};

use chemparse::config::Config;
use chemparse::server::ChemParseServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    // .env next to the binary first; the server may be started from any CWD.
    let exe_env = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(".env")))
        .filter(|p| p.exists());
    match exe_env {
        Some(path) => {
            dotenvy::from_path(&path).ok();
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }

    tracing::info!("chemparse starting");

    let config = Config::load();
    tracing::info!(
        working_dir = %config.working_dir,
        interpreter = %config.interpreter,
        timeout_secs = config.timeout_secs,
        "config loaded"
    );
    let server = ChemParseServer::new(config);

    let service = server
        .serve(stdio())
        .await
        .inspect_err(|e| tracing::error!("serving error: {e:?}"))?;

    service.waiting().await?;

    tracing::info!("chemparse shutting down");
    Ok(())
}
