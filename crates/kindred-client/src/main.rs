mod commands;
mod config;

use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use kindred_api::{ApiClient, ChatApi};
use kindred_inbox::{Delivery, Inbox};
use kindred_types::api::ProofPhoto;
use kindred_types::events::{InboxEvent, NoticeLevel};

use commands::{Command, HELP};
use config::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kindred=info,kindred_inbox=info,kindred_api=info".into()),
        )
        .init();

    let settings = Settings::from_env()?;
    let api: Arc<dyn ChatApi> = Arc::new(ApiClient::new(settings.client_config())?);
    info!(api_url = %settings.api_url, profile_id = settings.viewer.profile_id, "starting kindred");

    let inbox = Inbox::new(api, settings.viewer, settings.inbox_config());
    let printer = tokio::spawn(print_events(inbox.subscribe()));
    inbox.mount();

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        match line.parse::<Command>() {
            Ok(Command::Quit) => break,
            Ok(command) => {
                if let Err(err) = run(&inbox, command).await {
                    println!("! {err}");
                }
            }
            Err(err) => println!("! {err}"),
        }
    }

    inbox.unmount().await;
    printer.abort();
    info!("bye");
    Ok(())
}

async fn run(inbox: &Inbox, command: Command) -> anyhow::Result<()> {
    match command {
        Command::List => print_list(inbox).await,
        Command::Open(conversation_id) => {
            inbox.select(conversation_id).await?;
        }
        Command::Chat(user_id) => {
            if inbox.open_with_counterpart(user_id).await?.is_none() {
                println!("no chat opened");
            }
        }
        Command::Back => inbox.back().await,
        Command::Send(text) => {
            inbox.send_text(text).await?;
        }
        Command::Show => print_thread(inbox).await,
        Command::Unlike(user_id) => inbox.unlike(user_id).await?,
        Command::Block(user_id) => {
            let outcome = inbox.block(user_id).await?;
            println!("{outcome:?}");
        }
        Command::Report {
            user_id,
            report_type,
            description,
        } => {
            let moderation = inbox.moderation();
            moderation.open_report(user_id);
            moderation.set_report_type(report_type)?;
            moderation.set_description(description)?;
            println!("report started, attach photos with `proof <path>` then `submit`");
        }
        Command::Proof(path) => {
            let photo = read_proof(&path).await?;
            let count = inbox.moderation().add_proof(photo)?;
            println!("{count} photo(s) attached");
        }
        Command::Submit => inbox.moderation().submit_report().await?,
        Command::Cancel => inbox.moderation().cancel_report(),
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
    Ok(())
}

async fn read_proof(path: &Path) -> anyhow::Result<ProofPhoto> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "proof".into());
    Ok(ProofPhoto { file_name, bytes })
}

async fn print_list(inbox: &Inbox) {
    let store = inbox.conversations();
    let new_matches = store.new_matches().await;
    let active = store.active_chats().await;

    println!("new matches ({}):", new_matches.len());
    for conv in &new_matches {
        println!("  [{}] {} (user {})", conv.id, conv.display_name(), conv.counterpart());
    }

    println!("active chats ({}):", active.len());
    for conv in &active {
        let unread = match conv.unread_count {
            0 => String::new(),
            n => format!(" ({n} unread)"),
        };
        let blocked = if conv.is_blocked { " [blocked]" } else { "" };
        println!(
            "  [{}] {}{}{}: {}",
            conv.id,
            conv.display_name(),
            unread,
            blocked,
            conv.preview()
        );
    }
}

async fn print_thread(inbox: &Inbox) {
    let Some(conversation_id) = inbox.selected().await else {
        println!("no chat open");
        return;
    };
    let title = match inbox.conversations().get(conversation_id).await {
        Some(conv) => conv.display_name(),
        None => format!("conversation {conversation_id}"),
    };
    println!("--- {title} ---");

    if inbox.messages().is_loading().await {
        println!("  loading...");
    }
    for entry in inbox.messages().entries().await {
        let who = if inbox.is_own(&entry.message) { "me" } else { "them" };
        let status = match entry.delivery {
            Delivery::Sent => "",
            Delivery::Sending(_) => " (sending)",
            Delivery::Failed(_) => " (not sent)",
        };
        println!(
            "  {} {:>4}: {}{}",
            entry.message.time_label(),
            who,
            entry.message.content,
            status
        );
    }

    let compose = inbox.compose().await;
    if compose.blocked {
        println!("  You have blocked this user. Messaging is disabled.");
    }
}

async fn print_events(mut rx: tokio::sync::broadcast::Receiver<InboxEvent>) {
    loop {
        match rx.recv().await {
            Ok(InboxEvent::Notice { level, text }) => {
                let tag = match level {
                    NoticeLevel::Success => "ok",
                    NoticeLevel::Error => "error",
                    NoticeLevel::Info => "info",
                };
                println!("[{tag}] {text}");
            }
            Ok(InboxEvent::SelectionChanged {
                conversation_id: Some(id),
            }) => println!("* opened conversation {id}"),
            Ok(InboxEvent::SelectionChanged { conversation_id: None }) => {
                println!("* back to conversation list")
            }
            Ok(InboxEvent::ConversationRemoved { conversation_id }) => {
                println!("* conversation {conversation_id} removed")
            }
            Ok(_) => {}
            Err(RecvError::Lagged(n)) => warn!(skipped = n, "event printer lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}
