use anyhow::{bail, Result};
use dotenv::dotenv;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use flashcards_service::client::{ApiClient, DEFAULT_API_URL};
use flashcards_service::study::{StudySession, TRANSITION_DELAY};

fn render(session: &StudySession) {
    let (position, total) = session.progress();
    let snap = session.snapshot();
    let side = if snap.is_flipped { "back" } else { "front" };

    println!();
    println!("Card {} of {} ({})", position, total, side);
    match session.visible_face() {
        Some(text) => println!("  {}", text),
        None => println!("  ..."),
    }

    let mut controls = Vec::new();
    if session.can_prev() {
        controls.push("[p]rev");
    }
    controls.push("[f]lip");
    if session.can_next() {
        controls.push("[n]ext");
    }
    controls.push("[q]uit");
    println!("{}", controls.join("  "));
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("warn"));

    let base_url = std::env::var("FLASHCARDS_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
    let token = std::env::var("FLASHCARDS_TOKEN").ok();
    let client = ApiClient::new(&base_url, token);

    let set_id = match std::env::args().nth(1) {
        Some(id) => id,
        None => {
            println!("Usage: study <set-id>\n\nPublic sets:");
            for set in client.browse("").await? {
                println!("  {}  {} ({} cards)", set.id, set.name, set.card_count);
            }
            return Ok(());
        }
    };

    let set = client.get_set(&set_id).await?;
    if set.cards.is_empty() {
        bail!("Set '{}' has no cards", set.name);
    }
    log::info!("📚 Loaded set {} with {} cards", set.id, set.cards.len());

    println!("{}: {}", set.name, set.description);
    let session = StudySession::from_set(&set)?;
    render(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let moved = match line.trim() {
            "n" => session.next(),
            "p" => session.prev(),
            "f" => {
                session.flip();
                false
            }
            "q" => break,
            _ => false,
        };

        if moved {
            render(&session);
            tokio::time::sleep(TRANSITION_DELAY + Duration::from_millis(20)).await;
        }
        render(&session);
    }

    Ok(())
}
