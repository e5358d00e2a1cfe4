//! mediacast service binary
//!
//! Run with: mediacast [BIND_ADDR]
//!
//! Examples:
//!   mediacast                    # binds to 127.0.0.1:3001
//!   mediacast localhost          # binds to 127.0.0.1:3001
//!   mediacast 0.0.0.0:4040      # binds to 0.0.0.0:4040
//!
//! Subscribers connect to `ws://<addr>/ws` and receive one JSON payload per
//! second describing the current media session.
//!
//! This binary wires in [`IdleProvider`]; platform integrations (e.g. a
//! Windows SMTC query) supply their own `SessionProvider` implementation
//! and embed [`MediaServer`] as a library.

use std::net::{SocketAddr, ToSocketAddrs};

use mediacast::{IdleProvider, MediaServer, ServerConfig};

/// Resolve a bind address from a command line argument
///
/// The argument is a host, an address, or either with an explicit port
/// (`localhost`, `localhost:4040`, `0.0.0.0:4040`). Without a port the
/// default 3001 applies. Hostnames go through the system resolver; the
/// first resolved address wins.
fn parse_bind_addr(arg: &str) -> Result<SocketAddr, String> {
    const DEFAULT_PORT: u16 = 3001;

    let target = if arg.contains(':') {
        arg.to_string()
    } else {
        format!("{arg}:{DEFAULT_PORT}")
    };

    target
        .to_socket_addrs()
        .map_err(|e| format!("Invalid bind address '{arg}': {e}"))?
        .next()
        .ok_or_else(|| format!("Bind address '{arg}' did not resolve to anything"))
}

fn print_usage() {
    eprintln!("Usage: mediacast [BIND_ADDR]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_ADDR    Address to bind to (default: 127.0.0.1:3001)");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let bind_addr = match args.get(1) {
        Some(addr_str) => match parse_bind_addr(addr_str) {
            Ok(addr) => addr,
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        },
        None => SocketAddr::from(([127, 0, 0, 1], 3001)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mediacast=info".parse()?),
        )
        .init();

    let config = ServerConfig::with_addr(bind_addr);
    let mut server = MediaServer::new(config, IdleProvider);
    server.start().await?;

    println!("Service running on ws://{}/ws. Press Ctrl+C to stop.", bind_addr);
    tokio::signal::ctrl_c().await?;

    server.stop().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bind_addr() {
        // localhost may resolve to 127.0.0.1 or ::1 depending on the host
        let addr = parse_bind_addr("localhost").unwrap();
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 3001);

        let addr = parse_bind_addr("localhost:4040").unwrap();
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 4040);

        assert_eq!(
            parse_bind_addr("0.0.0.0:9000").unwrap(),
            "0.0.0.0:9000".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            parse_bind_addr("127.0.0.1").unwrap(),
            "127.0.0.1:3001".parse::<SocketAddr>().unwrap()
        );
        assert!(parse_bind_addr("not an address").is_err());
    }
}
