use tokio::net::TcpListener;

/// Runs the fixture on `HOST:PORT` (default `127.0.0.1:3000`) for manual
/// runs of the plugin binary.
#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let listener = TcpListener::bind((host.as_str(), port)).await?;
    println!(
        "mock server listening on {} (MKCOL under /dav/)",
        listener.local_addr()?
    );
    mock_server::run(listener).await
}
