//! Session maintenance CLI commands: history, delete-session.
//!
//! Both go through `SessionManager`, the same path the HTTP layer uses, so
//! neither needs inference credentials and a missing session is an error
//! (non-zero exit) in text and JSON mode alike.

use anyhow::Result;
use console::style;

use parley_core::chat::repository::ConversationStore;
use parley_core::chat::session::SessionManager;
use parley_types::chat::{SessionId, Turn};

/// Print the most recent turns of a session, oldest first.
///
/// # Examples
///
/// ```bash
/// parley history 0192f6a4-... --limit 5
/// parley history 0192f6a4-... --json
/// ```
pub async fn show_history<S: ConversationStore>(
    sessions: &SessionManager<S>,
    session_id: &str,
    limit: u32,
    json: bool,
) -> Result<()> {
    let session_id = SessionId::new(session_id);
    let turns = sessions.history(&session_id, limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&turns)?);
        return Ok(());
    }

    println!();
    println!("  Session {}", style(&session_id).cyan().bold());
    println!();
    print!("{}", format_transcript(&turns));
    println!(
        "  {} turn{}",
        style(turns.len()).bold(),
        if turns.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}

/// Delete every turn of a session.
pub async fn delete_session<S: ConversationStore>(
    sessions: &SessionManager<S>,
    session_id: &str,
    json: bool,
) -> Result<()> {
    let session_id = SessionId::new(session_id);
    let removed = sessions.delete(&session_id).await?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "deleted": true,
                "session_id": session_id.as_str(),
                "turns_removed": removed,
            })
        );
        return Ok(());
    }

    println!();
    println!(
        "  {} Deleted session '{}' ({} turn{})",
        style("✓").green().bold(),
        style(&session_id).cyan(),
        removed,
        if removed == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}

/// Plain-text transcript, one block per turn.
fn format_transcript(turns: &[Turn]) -> String {
    let mut out = String::new();
    for turn in turns {
        let timestamp = turn.created_at.format("%Y-%m-%d %H:%M:%S UTC");
        out.push_str(&format!("  [{timestamp}]\n"));
        out.push_str(&format!("  You:       {}\n", turn.user_message));
        out.push_str(&format!("  Assistant: {}\n\n", turn.ai_response));
    }
    out
}
