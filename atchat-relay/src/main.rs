use std::sync::Arc;

use atchat_relay::config::load_dotenv;
use atchat_relay::{GeminiClient, RelayArgs, RelayState, router, serve};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::try_from_env("ATCHAT_RELAY_LOG")
            .unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    load_dotenv();
    let args = RelayArgs::parse();

    let Some(api_key) = args.api_key() else {
        tracing::error!("GEMINI_API_KEY is not set; add it to the environment or a .env file");
        std::process::exit(1);
    };

    let client = GeminiClient::new(api_key, &args.model, &args.api_base, args.timeout())?;
    tracing::info!(model = client.model(), path = %args.path, "starting relay");

    let app = router(RelayState::new(Arc::new(client)), &args.path);
    let listener = tokio::net::TcpListener::bind(args.bind_addr()).await?;
    serve(listener, app).await?;

    Ok(())
}
