//! Interactive chat client with room creation, reconnection and session restore.
//!
//! Connects to the signaling server as the given user, opens a room with the
//! target user and relays stdin lines into it. Dropped connections are retried
//! (at most 5 attempts, waiting 3s, 6s, then 9s). Without `--user-id` the
//! session persisted in the state directory is restored.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin tsunagi-client -- --user-id alice --target bob
//! cargo run --bin tsunagi-client -- -u bob -t alice --auth-token secret
//! cargo run --bin tsunagi-client
//! ```

use std::path::PathBuf;

use clap::Parser;
use tsunagi_client::{
    cli::{CliOptions, run_client_session},
    config::{ClientConfig, DEFAULT_HTTP_URL, DEFAULT_WS_URL},
};
use tsunagi_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "client")]
#[command(about = "Chat client with pairwise rooms and automatic reconnection", long_about = None)]
struct Args {
    /// User ID to connect as (restores the saved session when omitted)
    #[arg(short = 'u', long)]
    user_id: Option<String>,

    /// User to open a chat room with on start
    #[arg(short = 't', long)]
    target: Option<String>,

    /// WebSocket server URL
    #[arg(long, default_value = DEFAULT_WS_URL)]
    url: String,

    /// HTTP API base URL used when room creation over WebSocket fails
    #[arg(long, default_value = DEFAULT_HTTP_URL)]
    http_url: String,

    /// Directory for the persisted session and auth token
    #[arg(long, default_value = ".tsunagi")]
    state_dir: PathBuf,

    /// Bearer token to store and present to the server
    #[arg(long, env = "TSUNAGI_AUTH_TOKEN")]
    auth_token: Option<String>,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();
    let options = CliOptions {
        user_id: args.user_id,
        target: args.target,
        config: ClientConfig {
            ws_url: args.url,
            http_url: args.http_url,
            ..ClientConfig::default()
        },
        state_dir: args.state_dir,
        auth_token: args.auth_token,
    };

    if let Err(e) = run_client_session(options).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
