//! Interactive terminal client for a document-grounded chat backend.
//!
//! # Usage
//!
//! ```bash
//! # Chat against the default backend, tokens from the environment
//! citeline-chat
//!
//! # Point at a deployed backend and persist tokens to a file
//! citeline-chat --api-url https://rag.example.com/api/v1/ \
//!     --credentials ~/.citeline/credentials.json
//!
//! # Resume a session, scoped to two documents
//! citeline-chat --session 42 --docs 7,9
//!
//! # Disable colors (useful for piping output)
//! citeline-chat --no-color
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands; `/help` lists them all.
//! Anything that doesn't start with `/` is sent to the assistant.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use citeline::chat::{
    ChatArgs, ChatConfig, ChatController, ChatEntry, Command, Input, PlainTextRenderer, Renderer,
    SubmitOutcome, help_text, parse_line,
};
use citeline::credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
use citeline::types::{MessageRole, SessionUpdateParams};
use citeline::Citeline;

/// Main entry point for the citeline-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("citeline-chat [OPTIONS]");
    let config = ChatConfig::try_from(args)?;
    let use_color = config.use_color;

    let store: Arc<dyn CredentialStore> = match &config.credentials_path {
        Some(path) => Arc::new(FileCredentialStore::open(path)?),
        None => Arc::new(MemoryCredentialStore::from_env()),
    };
    let client = Citeline::with_options(store, Some(config.base_url.clone()), None)?
        .with_auth_failure_hook(Arc::new(|| {
            eprintln!("session expired; sign in again and restart");
        }));

    let mut controller = ChatController::new(client.clone());
    controller.set_scoped_documents(config.document_ids.clone());
    let mut renderer = PlainTextRenderer::with_color(use_color);
    let mut rl = DefaultEditor::new()?;

    if let Some(session_id) = config.session_id {
        match controller.load_existing(session_id).await {
            Ok(()) => {
                let stats = controller.stats();
                renderer.print_info(&format!(
                    "Resumed session {} ({} messages)",
                    session_id, stats.entry_count
                ));
            }
            Err(err) => renderer.print_error(&err.user_message()),
        }
    }

    // Flag for interrupt handling during the reveal animation
    let interrupted = Arc::new(AtomicBool::new(false));

    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::Relaxed);
    })?;

    println!("Citeline Chat ({})", config.base_url);
    println!("Type /help for commands, /quit to exit\n");

    loop {
        // Reset interrupt flag before each input
        interrupted.store(false, Ordering::Relaxed);

        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let input = parse_line(&line);
                if input == Input::Empty {
                    continue;
                }
                let _ = rl.add_history_entry(line.trim());

                match input {
                    Input::Empty => {}
                    Input::Unrecognized(text) => {
                        renderer.print_error(&format!("unknown command: {text}"));
                    }
                    Input::Command(Command::Quit) => {
                        println!("Goodbye!");
                        break;
                    }
                    Input::Command(command) => {
                        run_command(command, &client, &mut controller, &mut renderer).await;
                    }
                    Input::Message(text) => {
                        send_message(&text, &mut controller, &mut renderer, &interrupted).await;
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

async fn send_message(
    text: &str,
    controller: &mut ChatController<Citeline>,
    renderer: &mut PlainTextRenderer,
    interrupted: &Arc<AtomicBool>,
) {
    renderer.begin_answer();
    match controller.submit(text).await {
        Ok(SubmitOutcome::Ignored) => {
            renderer.end_answer();
        }
        Ok(SubmitOutcome::Sent) => {
            controller.play_reveal(renderer, interrupted.clone()).await;
            renderer.end_answer();
            if let Some(entry) = last_answer(controller) {
                renderer.print_sources(&entry.message.sources);
            }
            renderer.print_suggestions(controller.suggestions());
        }
        Err(err) => {
            renderer.end_answer();
            renderer.print_error(&err.user_message());
        }
    }
}

async fn run_command(
    command: Command,
    client: &Citeline,
    controller: &mut ChatController<Citeline>,
    renderer: &mut PlainTextRenderer,
) {
    if let Some((nth, verdict)) = command.verdict() {
        match nth_recent_answer(controller, nth) {
            Some(message_id) => {
                controller.feedback(message_id, verdict).await;
                renderer.print_info(&format!("Recorded {verdict}."));
            }
            None => renderer.print_error("no such answer"),
        }
        return;
    }

    match command {
        Command::Sessions { page } => match client.list_sessions(page, 20).await {
            Ok(listing) => {
                if listing.items.is_empty() {
                    renderer.print_info("No sessions.");
                }
                for session in &listing.items {
                    let pin = if session.is_pinned { "*" } else { " " };
                    renderer.print_info(&format!(
                        "{pin} [{}] {} ({} messages)",
                        session.id,
                        session.display_title(),
                        session.message_count
                    ));
                }
                renderer.print_info(&format!(
                    "page {} of {} sessions",
                    listing.page, listing.total
                ));
            }
            Err(err) => renderer.print_error(&err.user_message()),
        },
        Command::Open { session_id } => match controller.load_existing(session_id).await {
            Ok(()) => {
                let stats = controller.stats();
                renderer.print_info(&format!(
                    "Opened session {} ({} messages)",
                    session_id, stats.entry_count
                ));
            }
            Err(err) => renderer.print_error(&err.user_message()),
        },
        Command::New => {
            controller.reset();
            renderer.print_info("Started a fresh conversation.");
        }
        Command::Title { title } => {
            update_session(
                client,
                controller,
                renderer,
                SessionUpdateParams::new().with_title(title),
            )
            .await;
        }
        Command::Pin { pinned } => {
            update_session(
                client,
                controller,
                renderer,
                SessionUpdateParams::new().with_pinned(pinned),
            )
            .await;
        }
        Command::Delete { permanent } => {
            let Some(session_id) = controller.session().map(|s| s.id) else {
                renderer.print_error("no open session");
                return;
            };
            match client.delete_session(session_id, permanent).await {
                Ok(()) => {
                    controller.reset();
                    renderer.print_info(&format!("Deleted session {session_id}."));
                }
                Err(err) => renderer.print_error(&err.user_message()),
            }
        }
        Command::DocsList => match client.list_documents().await {
            Ok(listing) => {
                if listing.items.is_empty() {
                    renderer.print_info("No documents.");
                }
                for document in &listing.items {
                    let ready = if document.is_ready() { "" } else { " (processing)" };
                    renderer.print_info(&format!(
                        "[{}] {}{}",
                        document.id, document.filename, ready
                    ));
                }
            }
            Err(err) => renderer.print_error(&err.user_message()),
        },
        Command::DocsSet { document_ids } => {
            renderer.print_info(&format!("Scoped to documents {document_ids:?}."));
            controller.set_scoped_documents(document_ids);
        }
        Command::DocsClear => {
            controller.set_scoped_documents(Vec::new());
            renderer.print_info("Document scoping cleared.");
        }
        Command::Suggest => match controller.next_suggestion() {
            Some(suggestion) => {
                let text = format!("You could ask: {suggestion}");
                renderer.print_info(&text);
            }
            None => renderer.print_info("No suggestions yet."),
        },
        Command::Sources { nth } => {
            let sources = nth_recent_answer_entry(controller, nth)
                .map(|entry| entry.message.sources.clone());
            match sources {
                Some(sources) if !sources.is_empty() => renderer.print_sources(&sources),
                Some(_) => renderer.print_info("No sources for that answer."),
                None => renderer.print_error("no such answer"),
            }
        }
        Command::Stats => print_stats(controller),
        Command::Help => {
            for line in help_text().lines() {
                println!("    {}", line);
            }
        }
        // Quit and the feedback commands are handled by the caller.
        Command::Quit
        | Command::ThumbsUp { .. }
        | Command::ThumbsDown { .. }
        | Command::Report { .. } => {}
    }
}

async fn update_session(
    client: &Citeline,
    controller: &mut ChatController<Citeline>,
    renderer: &mut PlainTextRenderer,
    params: SessionUpdateParams,
) {
    let Some(session_id) = controller.session().map(|s| s.id) else {
        renderer.print_error("no open session");
        return;
    };
    match client.update_session(session_id, params).await {
        Ok(session) => {
            renderer.print_info(&format!(
                "Session {}: {}{}",
                session.id,
                session.display_title(),
                if session.is_pinned { " (pinned)" } else { "" }
            ));
            controller.set_session(session);
        }
        Err(err) => renderer.print_error(&err.user_message()),
    }
}

/// The id of the nth most recent assistant answer (1 is the latest).
fn nth_recent_answer(controller: &ChatController<Citeline>, nth: usize) -> Option<i64> {
    nth_recent_answer_entry(controller, nth).map(|entry| entry.message.id)
}

fn nth_recent_answer_entry(
    controller: &ChatController<Citeline>,
    nth: usize,
) -> Option<&ChatEntry> {
    controller
        .entries()
        .iter()
        .rev()
        .filter(|entry| entry.message.role == MessageRole::Assistant && !entry.is_loading)
        .nth(nth.checked_sub(1)?)
}

fn last_answer(controller: &ChatController<Citeline>) -> Option<&ChatEntry> {
    nth_recent_answer_entry(controller, 1)
}

fn print_stats(controller: &ChatController<Citeline>) {
    let stats = controller.stats();
    println!("    Conversation:");
    match stats.session_id {
        Some(id) => println!("      Session: {id}"),
        None => println!("      Session: (not yet created)"),
    }
    match stats.title.as_deref() {
        Some(title) => println!("      Title: {title}"),
        None => println!("      Title: (untitled)"),
    }
    println!("      Pinned: {}", if stats.is_pinned { "yes" } else { "no" });
    println!("      Messages: {}", stats.entry_count);
    if stats.scoped_documents.is_empty() {
        println!("      Documents: (all)");
    } else {
        println!("      Documents: {:?}", stats.scoped_documents);
    }
    println!("      Suggestions pending: {}", stats.suggestion_count);
}
