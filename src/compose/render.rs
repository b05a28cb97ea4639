//! Thread document rendering.
//!
//! Output is a pure function of the issue and comment records, so identical
//! input bytes always produce an identical document.

use crate::error::Result;
use crate::model::{Comment, Issue};
use crate::util::format_display;

const PART_SEPARATOR: &str = "\n\n";

fn heavy_rule() -> String {
    format!("\n{}\n", "=".repeat(80))
}

fn light_rule() -> String {
    "-".repeat(80)
}

fn comment_rule() -> String {
    "-".repeat(40)
}

/// Render an issue and its comments as a flat thread document.
///
/// The comments section is emitted only when `comments` is non-empty, and
/// comments appear in slice order.
#[must_use]
pub fn render_thread(issue: &Issue, comments: &[Comment]) -> String {
    let mut parts = vec![
        format!("Title: {}", issue.title),
        format!(
            "Created by: {} on {}",
            issue.user.login,
            format_display(&issue.created_at)
        ),
        format!("State: {}", issue.state),
        format!("Labels: {}", issue.label_names()),
        heavy_rule(),
        "INITIAL POST:".to_string(),
        light_rule(),
        issue.body_text().to_string(),
    ];

    if !comments.is_empty() {
        parts.push(heavy_rule());
        parts.push("COMMENTS:".to_string());
        parts.push(light_rule());

        for comment in comments {
            parts.push(format!(
                "\nOn {}, {} wrote:",
                format_display(&comment.created_at),
                comment.user.login
            ));
            parts.push(comment_rule());
            parts.push(comment.body_text().to_string());
        }
    }

    parts.join(PART_SEPARATOR)
}

/// Decode raw record bytes and render them.
///
/// # Errors
///
/// Returns a JSON error if either record is malformed, including timestamps
/// outside the wire format.
pub fn render_from_bytes(issue: &[u8], comments: Option<&[u8]>) -> Result<String> {
    let issue: Issue = serde_json::from_slice(issue)?;
    let comments: Vec<Comment> = match comments {
        Some(bytes) => serde_json::from_slice(bytes)?,
        None => Vec::new(),
    };
    Ok(render_thread(&issue, &comments))
}
