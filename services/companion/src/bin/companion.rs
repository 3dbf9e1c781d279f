//! services/companion/src/bin/companion.rs

use calmmind_core::constants::PRIVACY_MESSAGE;
use calmmind_core::domain::{Message, Sender};
use calmmind_core::mood::mood_band;
use calmmind_core::support::{CbtFlow, GroundingCycle, CBT_STEPS};
use calmmind_core::MoodDirection;
use companion_lib::{
    adapters::{
        entry_store::{sanitize_filename, EntryStore},
        preferred_model, FileStorage, OpenAiCompanionAdapter,
    },
    config::Config,
    error::AppError,
    session::{
        command::{parse_command, CbtAction, Command, GroundingAction, HELP_TEXT},
        AppState, ConversationController, SendOutcome,
    },
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!("Configuration loaded. Starting CalmMind...");

    // --- 2. Open Local Storage ---
    let storage = Arc::new(FileStorage::new(&config.storage_dir)?);
    info!("Storing entries in {:?}", storage.dir());
    let entry_store = Arc::new(EntryStore::new(storage.clone()));

    // --- 3. Initialize the Model Adapter ---
    let chat_model = preferred_model(storage.as_ref()).unwrap_or_else(|| config.chat_model.clone());
    info!("Using model {}", chat_model);
    let model_adapter = Arc::new(OpenAiCompanionAdapter::new(
        &config.model_api_base,
        config.gemini_api_key.as_deref().unwrap_or_default(),
        chat_model,
    ));

    // --- 4. Build the Shared AppState & Controller ---
    let app_state = Arc::new(AppState {
        entries: entry_store,
        model: model_adapter,
        config: Arc::new(config),
    });
    let mut controller = ConversationController::start(app_state);

    // --- 5. Run the Conversation Loop ---
    println!("CalmMind · Mental Wellness\n{}\n", PRIVACY_MESSAGE);
    if !controller.is_configured() {
        println!("⚠️  API Key Missing: chat is disabled until GEMINI_API_KEY is set.\n");
    }
    for message in controller.messages() {
        print_message(message);
    }
    println!("\nType /help for commands.");

    let mut cbt = CbtFlow::new();
    let mut grounding = GroundingCycle::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        match command {
            Command::Send(text) => send(&mut controller, &text).await,
            Command::Mood(score) => {
                let change = controller.record_mood(score);
                let band = mood_band(score);
                println!(
                    "{} {}/10 saved: {}. {}",
                    band.emoji(),
                    score,
                    band.description(),
                    band.encouragement()
                );
                if change.changed {
                    let direction = match change.direction {
                        MoodDirection::Up => "up",
                        _ => "down",
                    };
                    println!("Mood moved {}; CalmMind will take that into account.", direction);
                }
            }
            Command::NewEntry => {
                controller.new_entry();
                for message in controller.messages() {
                    print_message(message);
                }
            }
            Command::List => {
                let current = controller.current_entry_id().map(str::to_string);
                for entry in controller.entries() {
                    let marker = if Some(&entry.id) == current.as_ref() { "*" } else { " " };
                    let mood = entry
                        .mood_score
                        .map(|score| format!("{}/10", score))
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{} {}  {}  [{} messages, mood {}]  {}",
                        marker,
                        entry.id,
                        entry.updated_at.format("%Y-%m-%d %H:%M"),
                        entry.messages.len(),
                        mood,
                        entry.title
                    );
                }
            }
            Command::Switch(id) => {
                if controller.switch_entry(&id) {
                    for message in controller.messages() {
                        print_message(message);
                    }
                } else {
                    println!("No entry with id {}.", id);
                }
            }
            Command::Delete(id) => {
                controller.delete_entry(&id);
                println!("Deleted {}. Current entry: {}", id, controller.current_entry_id().unwrap_or("-"));
            }
            Command::Stats => {
                let stats = controller.stats();
                let average = stats
                    .average_mood
                    .map(|avg| format!("{} {}", avg, mood_band(avg).emoji()))
                    .unwrap_or_else(|| "-".to_string());
                println!("Total entries: {}  Avg. mood: {}", stats.total_entries, average);
            }
            Command::Cbt(action) => {
                let step = match action {
                    CbtAction::Show => cbt.current(),
                    CbtAction::Next => cbt.next(),
                    CbtAction::Back => cbt.previous(),
                    CbtAction::Restart => cbt.restart(),
                    CbtAction::Chat => {
                        send(&mut controller, &cbt.chat_prompt()).await;
                        continue;
                    }
                };
                println!(
                    "CBT {}/{}: {}\n{}",
                    cbt.position() + 1,
                    CBT_STEPS.len(),
                    step.description,
                    step.question
                );
            }
            Command::Grounding(action) => match action {
                GroundingAction::Show => println!("{}", grounding.current()),
                GroundingAction::Next => println!("{}", grounding.next()),
                GroundingAction::Chat => {
                    let prompt = format!("I'd like to try this grounding exercise: {}", grounding.current());
                    send(&mut controller, &prompt).await;
                }
            },
            Command::Export => match export_current(&controller) {
                Ok(path) => println!("Exported to {}", path),
                Err(e) => println!("Export failed: {}", e),
            },
            Command::Help => println!("{}", HELP_TEXT),
            Command::Quit => break,
        }
    }

    info!("Goodbye.");
    Ok(())
}

async fn send(controller: &mut ConversationController, text: &str) {
    println!("…");
    match controller.send_message(text).await {
        SendOutcome::Replied(reply) | SendOutcome::Recovered { reply, .. } => print_message(&reply),
        SendOutcome::NotConfigured(notice) => println!("{}", notice),
    }
}

fn export_current(controller: &ConversationController) -> Result<String, AppError> {
    let entry = controller
        .current_entry()
        .ok_or_else(|| AppError::Internal("the current entry is not stored".to_string()))?;
    let json = EntryStore::export_json(&entry)?;
    let path = format!("{}_{}.json", sanitize_filename(&entry.title), entry.id);
    std::fs::write(&path, json)?;
    Ok(path)
}

fn print_message(message: &Message) {
    let who = match message.sender {
        Sender::User => "You",
        Sender::Bot => "CalmMind",
    };
    println!("\n[{}] {}:\n{}", message.timestamp.format("%H:%M"), who, message.text);
}
