use anyhow::{anyhow, Context, Result};
use tracing::{error, info};

use request_throttle::{build_router, ThrottleConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting request throttle service...");

    let config = ThrottleConfig::from_env().context("invalid throttle configuration")?;
    info!(
        "Throttling GET / to {} calls per {:?}",
        config.max_calls, config.time_frame
    );

    let app = build_router(&config)?;

    // Start server with fallback port binding
    let listener = bind_with_fallback(config.port).await?;
    let addr = listener.local_addr()?;
    info!("Server listening on http://{}:{}", addr.ip(), addr.port());
    info!("Available endpoints:");
    info!("  GET  /       - Greeting (rate limited)");
    info!("  GET  /health - Health check");

    axum::serve(listener, app).await?;

    Ok(())
}

async fn bind_with_fallback(preferred_port: u16) -> Result<tokio::net::TcpListener> {
    // Try preferred, then a small range, then ephemeral (0)
    let mut candidates: Vec<u16> = vec![preferred_port];
    if preferred_port != 3000 {
        candidates.push(3000);
    }
    candidates.extend(3001..=3010);
    candidates.push(0);

    for port in candidates {
        let addr = format!("0.0.0.0:{}", port);
        match tokio::net::TcpListener::bind(&addr).await {
            Ok(listener) => {
                if port == 0 {
                    info!("Bound to ephemeral port");
                } else {
                    info!("Bound to {}", addr);
                }
                return Ok(listener);
            }
            Err(e) => {
                if e.kind() != std::io::ErrorKind::AddrInUse {
                    error!("Failed to bind {}: {}", addr, e);
                } else {
                    info!("Port {} in use, trying next...", port);
                }
            }
        }
    }

    Err(anyhow!("Unable to bind to any port"))
}
