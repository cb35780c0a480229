//! Read a blob with secondary failover enabled.
//!
//! ```bash
//! export GEOSTORE_ENDPOINT=https://account.blob.example.net
//! export GEOSTORE_SECONDARY_HOST=account-secondary.blob.example.net
//! export GEOSTORE_TOKEN=...
//! RUST_LOG=geostore=debug,geostore_transport=debug cargo run --example failover -- container/blob.txt
//! ```

use geostore::{Client, Error};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "container/blob.txt".to_string());

    let client = Client::from_env()?;
    println!("Retry options: {:?}", client.retry_options());

    match client.get(&path).await {
        Ok(blob) => println!("{} bytes from {}", blob.body.len(), path),
        Err(Error::NotFound(message)) => println!("{} not found: {}", path, message),
        Err(err) => return Err(err.into()),
    }

    Ok(())
}
