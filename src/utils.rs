//! Display helpers shared by frontends.

use colored::*;

/// Longest notes preview shown in listings, in characters.
pub const NOTES_PREVIEW_LIMIT: usize = 80;

/// Replace every character with a bullet.
pub fn mask_password(password: &str) -> String {
    "•".repeat(password.chars().count())
}

/// Single-line notes, cut to fit a table cell.
pub fn notes_preview(notes: &str) -> String {
    let flat = notes.replace('\n', " ");
    if flat.chars().count() > NOTES_PREVIEW_LIMIT {
        let cut: String = flat.chars().take(NOTES_PREVIEW_LIMIT - 3).collect();
        format!("{cut}…")
    } else {
        flat
    }
}

/// Tags joined for display, or a dash when there are none.
pub fn format_tags(tags: &[String]) -> String {
    if tags.is_empty() {
        "—".to_string()
    } else {
        tags.join(", ")
    }
}

/// Print an error message and exit.
pub fn error_exit(message: &str, code: i32) -> ! {
    eprintln!("{} {}", "Error:".red().bold(), message);
    std::process::exit(code);
}

/// Print a success message.
pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print a warning message.
pub fn warning(message: &str) {
    eprintln!("{} {}", "Warning:".yellow(), message);
}
