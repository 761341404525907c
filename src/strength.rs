//! Heuristic password strength scoring.

use serde::Serialize;

pub const EMPTY_COLOR: &str = "#808080";

/// Result of [`estimate_strength`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrengthReport {
    /// 0 for an empty password, otherwise 1..=4
    pub score: u8,
    pub label: &'static str,
    pub color: &'static str,
    pub suggestions: Vec<String>,
}

impl StrengthReport {
    fn from_score(score: u8, suggestions: Vec<String>) -> Self {
        let (label, color) = match score {
            0 => ("Empty", EMPTY_COLOR),
            1 => ("Weak", "red"),
            2 => ("Fair", "orange"),
            3 => ("Strong", "blue"),
            _ => ("Very strong", "green"),
        };
        Self {
            score,
            label,
            color,
            suggestions,
        }
    }
}

/// Number of character classes present: lowercase, uppercase, digit, ASCII punctuation.
pub fn character_diversity(password: &str) -> usize {
    let lower = password.chars().any(char::is_lowercase);
    let upper = password.chars().any(char::is_uppercase);
    let digit = password.chars().any(|c| c.is_ascii_digit());
    let symbol = password.chars().any(|c| c.is_ascii_punctuation());
    [lower, upper, digit, symbol].iter().filter(|&&b| b).count()
}

/// Score a password from 0 to 4 and collect improvement suggestions.
pub fn estimate_strength(password: &str) -> StrengthReport {
    if password.is_empty() {
        return StrengthReport::from_score(0, vec!["Use at least 12 characters.".to_string()]);
    }

    let mut score: u8 = 0;
    let mut suggestions = Vec::new();
    let length = password.chars().count();

    if length >= 8 {
        score += 1;
    } else {
        suggestions.push("Use at least 8 characters.".to_string());
    }

    if length >= 12 {
        score += 1;
    } else {
        suggestions.push("Aim for 12 or more characters.".to_string());
    }

    let diversity = character_diversity(password);
    if diversity >= 3 {
        score += 1;
    } else {
        suggestions.push("Mix lowercase, uppercase, digits and symbols.".to_string());
    }

    if diversity == 4 && length >= 14 {
        score += 1;
    } else if diversity < 4 {
        suggestions.push("Add more character types.".to_string());
    }

    StrengthReport::from_score(score.clamp(1, 4), suggestions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_password() {
        let report = estimate_strength("");
        assert_eq!(report.score, 0);
        assert_eq!(report.label, "Empty");
        assert_eq!(report.color, EMPTY_COLOR);
        assert_eq!(report.suggestions.len(), 1);
        assert!(report.suggestions[0].contains("12"));
    }

    #[test]
    fn test_length_only() {
        let report = estimate_strength("abcdefgh");
        assert_eq!(report.score, 1);
        assert_eq!(report.label, "Weak");
        assert_eq!(report.color, "red");
        assert_eq!(report.suggestions.len(), 3);
    }

    #[test]
    fn test_short_password_clamped_to_one() {
        let report = estimate_strength("ab");
        assert_eq!(report.score, 1);
        assert_eq!(report.label, "Weak");
        assert_eq!(report.suggestions.len(), 4);
    }

    #[test]
    fn test_long_single_class_is_fair() {
        let report = estimate_strength("abcdefghijkl");
        assert_eq!(report.score, 2);
        assert_eq!(report.label, "Fair");
        assert_eq!(report.color, "orange");
    }

    #[test]
    fn test_three_classes_is_strong() {
        let report = estimate_strength("Abcdefghijk1");
        assert_eq!(report.score, 3);
        assert_eq!(report.label, "Strong");
        assert_eq!(report.suggestions, vec!["Add more character types."]);
    }

    #[test]
    fn test_all_classes_short_of_fourteen() {
        // Four classes but only 12 characters: no bonus and no suggestion for it.
        let report = estimate_strength("Abcdefghij1!");
        assert_eq!(report.score, 3);
        assert!(report.suggestions.is_empty());
    }

    #[test]
    fn test_very_strong() {
        let report = estimate_strength("Abcdefghijkl1!");
        assert_eq!(report.score, 4);
        assert_eq!(report.label, "Very strong");
        assert_eq!(report.color, "green");
        assert!(report.suggestions.is_empty());
    }

    #[test]
    fn test_length_counts_characters() {
        // Eight characters, more than eight bytes.
        let report = estimate_strength("ééééééé1");
        assert_eq!(report.score, 1);
        assert_eq!(character_diversity("ééééééé1"), 2);
    }
}
