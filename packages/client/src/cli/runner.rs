//! Interactive chat session on top of [`ChatClient`].

use std::{io::Write, path::PathBuf, sync::Arc};

use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::{sync::mpsc, task::JoinHandle};
use tsunagi_shared::time::{Clock, SystemClock};

use crate::{
    chat_client::ChatClient, config::ClientConfig, connection::ConnectionState,
    error::ClientError, storage::FileStore,
};

use super::formatter::MessageFormatter;

/// Options collected from the command line
#[derive(Debug, Clone)]
pub struct CliOptions {
    /// `None` restores the persisted session
    pub user_id: Option<String>,
    /// Peer to open a room with on start
    pub target: Option<String>,
    pub config: ClientConfig,
    /// Directory holding the session and auth token
    pub state_dir: PathBuf,
    /// Token to persist before connecting
    pub auth_token: Option<String>,
}

/// A line typed by the user
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Room(String),
    Leave,
    Logout,
    Quit,
    Say(String),
    Empty,
}

fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    match line.split_once(' ') {
        Some(("/room", target)) if !target.trim().is_empty() => {
            Command::Room(target.trim().to_string())
        }
        _ => match line {
            "/leave" => Command::Leave,
            "/logout" => Command::Logout,
            "/quit" => Command::Quit,
            _ => Command::Say(line.to_string()),
        },
    }
}

/// Print the prompt again below output that arrived while the user was typing
fn redisplay_prompt(user_id: &str) {
    print!("{}> ", user_id);
    std::io::stdout().flush().ok();
}

/// Room the user is currently talking in
struct CurrentRoom {
    room_id: String,
    printer: JoinHandle<()>,
}

/// Run the interactive session until the user quits or the connection gives up
pub async fn run_client_session(options: CliOptions) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(FileStore::new(&options.state_dir));
    let client = Arc::new(ChatClient::new(options.config, store));

    if let Some(token) = options.auth_token.as_deref() {
        client.connection().tokens().save(token);
    }

    let handle = match options.user_id.as_deref() {
        Some(user_id) => client.connect_socket(user_id),
        None => client.restore_socket_session(),
    }
    .ok_or(ClientError::NoSession)?;
    let user_id = handle.user_id().to_string();

    if !handle.wait_connected().await {
        let status = handle.status();
        let formatted = MessageFormatter::format_status(&status)
            .unwrap_or_else(|| "connection closed".to_string());
        return Err(Box::new(ClientError::CannotConnect(
            formatted.trim().trim_start_matches("* ").to_string(),
        )));
    }

    tracing::info!("Connected to chat server as '{}'", user_id);
    println!(
        "\nYou are '{}'. Commands: /room <user>, /leave, /logout, /quit. Anything else is sent to the current room.\n",
        user_id
    );

    // Status changes after the first connect
    let (failure_tx, mut failure_rx) = mpsc::unbounded_channel::<()>();
    let mut status_rx = client.subscribe_status();
    let status_user = user_id.clone();
    let status_task = tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            let status = status_rx.borrow_and_update().clone();
            if let Some(formatted) = MessageFormatter::format_status(&status) {
                print!("{}", formatted);
                redisplay_prompt(&status_user);
            }
            if status.is_final_failure() {
                let _ = failure_tx.send(());
                break;
            }
        }
    });

    let mut current: Option<CurrentRoom> = None;
    if let Some(target) = options.target.as_deref() {
        current = Some(open_room(&client, &user_id, target).await);
    }

    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();
    let prompt = format!("{}> ", user_id);
    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(editor) => editor,
            Err(e) => {
                tracing::error!("Failed to create readline editor: {}", e);
                return;
            }
        };

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let _ = rl.add_history_entry(line.as_str());
                    if input_tx.send(line).is_err() {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                    let _ = input_tx.send("/quit".to_string());
                    break;
                }
                Err(e) => {
                    tracing::error!("Error reading line: {}", e);
                    break;
                }
            }
        }
    });

    let result = loop {
        tokio::select! {
            line = input_rx.recv() => {
                let Some(line) = line else { break Ok(()) };
                match parse_command(&line) {
                    Command::Empty => {}
                    Command::Quit => break Ok(()),
                    Command::Logout => {
                        client.disconnect_socket();
                        println!("Signed out, session discarded.");
                        break Ok(());
                    }
                    Command::Room(target) => {
                        if let Some(previous) = current.take() {
                            previous.printer.abort();
                            client.leave_room(&previous.room_id);
                        }
                        current = Some(open_room(&client, &user_id, &target).await);
                    }
                    Command::Leave => match current.take() {
                        Some(previous) => {
                            previous.printer.abort();
                            client.leave_room(&previous.room_id);
                            println!("Left {}", previous.room_id);
                        }
                        None => println!("Not in a room. Use /room <user> first."),
                    },
                    Command::Say(content) => match current.as_ref() {
                        Some(room) => {
                            if client.send_message(&room.room_id, &content, &user_id) {
                                let sent_at = SystemClock.now_millis();
                                print!("{}", MessageFormatter::format_sent_confirmation(sent_at));
                            } else if client.status().state != ConnectionState::Connected {
                                println!("Not connected, message not sent.");
                            } else {
                                println!("Failed to send message.");
                            }
                        }
                        None => println!("Not in a room. Use /room <user> first."),
                    },
                }
            }
            _ = failure_rx.recv() => {
                break Err(ClientError::CannotConnect("gave up reconnecting".to_string()));
            }
        }
    };

    if let Some(room) = current {
        room.printer.abort();
    }
    status_task.abort();

    result.map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
}

/// Create or reuse the room with `target` and print what arrives in it
async fn open_room(client: &Arc<ChatClient>, user_id: &str, target: &str) -> CurrentRoom {
    let outcome = client.create_chat_room(user_id, target).await;
    print!("{}", MessageFormatter::format_room_ready(&outcome));

    let mut messages = client.subscribe(&outcome.room_id);
    let prompt_user = user_id.to_string();
    let printer = tokio::spawn(async move {
        while let Some(message) = messages.recv().await {
            let formatted = MessageFormatter::format_chat_message(
                &message.user_id,
                &message.content,
                message.timestamp,
            );
            print!("{}", formatted);
            redisplay_prompt(&prompt_user);
        }
    });

    CurrentRoom {
        room_id: outcome.room_id,
        printer,
    }
}
