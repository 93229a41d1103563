use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("127.0.0.1:{port}");
    let account = mock_server::Account::from_env();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, api_key = %account.api_key, "mock Moodstocks API listening");
    mock_server::run(listener, account).await
}
