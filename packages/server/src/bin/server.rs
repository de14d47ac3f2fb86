//! Chat room signaling server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin tsunagi-server
//! cargo run --bin tsunagi-server -- --host 0.0.0.0 --port 3000 --auth-token secret
//! ```

use clap::Parser;
use tsunagi_server::{bootstrap::build_in_memory_state, ui::Server};
use tsunagi_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "Signaling server for pairwise chat rooms", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Bearer token clients must present (disabled when omitted)
    #[arg(long, env = "TSUNAGI_AUTH_TOKEN")]
    auth_token: Option<String>,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();
    if args.auth_token.is_some() {
        tracing::info!("Bearer token authentication enabled");
    }

    let server = Server::new(build_in_memory_state(args.auth_token));
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
