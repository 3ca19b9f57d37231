//! Message formatting helpers shared by commands, dialog and reminders
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use chrono::NaiveDateTime;

/// Discord message content limit
pub const MESSAGE_LIMIT: usize = 2000;

/// User-facing date-time format, e.g. `25/03/2025 às 14:30`
pub const DISPLAY_FORMAT: &str = "%d/%m/%Y às %H:%M";

pub fn format_when(when: NaiveDateTime) -> String {
    when.format(DISPLAY_FORMAT).to_string()
}

/// Split text into message-sized pieces, preferring paragraph boundaries
///
/// Paragraphs (blank-line separated blocks) are packed greedily; a single
/// paragraph that is still too long is cut on character boundaries.
pub fn chunk_for_message(text: &str) -> Vec<String> {
    chunk_paragraphs(text, MESSAGE_LIMIT)
}

fn chunk_paragraphs(text: &str, limit: usize) -> Vec<String> {
    if text.len() <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in text.split("\n\n").filter(|p| !p.trim().is_empty()) {
        let separator = if current.is_empty() { 0 } else { 2 };
        if current.len() + separator + paragraph.len() <= limit {
            if separator > 0 {
                current.push_str("\n\n");
            }
            current.push_str(paragraph);
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }

        if paragraph.len() <= limit {
            current.push_str(paragraph);
        } else {
            let mut piece = String::new();
            for ch in paragraph.chars() {
                if piece.len() + ch.len_utf8() > limit {
                    chunks.push(std::mem::take(&mut piece));
                }
                piece.push(ch);
            }
            current = piece;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
