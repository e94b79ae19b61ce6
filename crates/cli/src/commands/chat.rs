use std::time::Duration;

use clap::Subcommand;
use uuid::Uuid;

use operis_api::chat::ChatPoller;
use operis_api::endpoints::projects;
use operis_core::domain::message::ChatMessage;
use operis_core::domain::project::ProjectId;

use super::{api_failure, build_context, require_role, CommandResult, GlobalArgs};

#[derive(Debug, Subcommand)]
pub enum ChatCommand {
    #[command(about = "Tail project chat live until Ctrl-C")]
    Watch { project: Uuid },
    #[command(about = "Send one message to the project chat")]
    Send { project: Uuid, message: String },
    #[command(about = "Show the unread message count")]
    Unread { project: Uuid },
}

fn format_message(message: &ChatMessage, own_id: &str) -> String {
    let stamp = message.created_at.format("%H:%M:%S");
    if message.is_system() {
        format!("[{stamp}] * {}", message.message)
    } else if message.is_from(own_id) {
        format!("[{stamp}] you: {}", message.message)
    } else {
        format!("[{stamp}] {}: {}", message.sender.full_name, message.message)
    }
}

pub async fn run(globals: &GlobalArgs, command: ChatCommand) -> CommandResult {
    let context = match build_context(globals, "chat") {
        Ok(context) => context,
        Err(failure) => return failure,
    };
    let profile = match require_role(&context.client, &[], "chat") {
        Ok(profile) => profile,
        Err(failure) => return failure,
    };
    let own_id = profile.id.to_string();

    match command {
        ChatCommand::Watch { project } => {
            let interval = Duration::from_secs(context.config.api.chat_poll_interval_secs);
            let handle =
                ChatPoller::new(context.client.clone(), ProjectId(project), interval).spawn();
            let mut messages = handle.messages();
            let mut seen = 0usize;

            println!("watching chat for project {project} (Ctrl-C to stop)");
            loop {
                tokio::select! {
                    changed = messages.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let snapshot = messages.borrow_and_update().clone();
                        for message in snapshot.iter().skip(seen) {
                            println!("{}", format_message(message, &own_id));
                        }
                        seen = snapshot.len();
                    }
                    _ = tokio::signal::ctrl_c() => {
                        break;
                    }
                }
            }

            handle.stop().await;
            CommandResult::success("chat", "stopped watching")
        }
        ChatCommand::Send { project, message } => {
            let interval = Duration::from_secs(context.config.api.chat_poll_interval_secs);
            let handle =
                ChatPoller::new(context.client.clone(), ProjectId(project), interval).spawn();
            let result = match handle.send(&message).await {
                Ok(sent) => {
                    CommandResult::success("chat", format!("sent message {}", sent.id))
                }
                Err(error) => api_failure("chat", error),
            };
            handle.stop().await;
            result
        }
        ChatCommand::Unread { project } => {
            match projects::unread_count(&context.client, ProjectId(project)).await {
                Ok(count) => CommandResult::listing(format!("{count} unread message(s)")),
                Err(error) => api_failure("chat", error),
            }
        }
    }
}
