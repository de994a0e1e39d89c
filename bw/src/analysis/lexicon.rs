//! Keyword tables shared by the profiler and the planner
//!
//! Each table compiles to one case-insensitive regex over English and German
//! phrasing. Phrases match whole words only, so "lost" does not fire inside
//! "closet" and "short" does not fire inside "shortfall".

use std::sync::LazyLock;

use regex::Regex;

/// A phrase table compiled to a single word-bounded alternation
pub struct Lexicon {
    pattern: Option<Regex>,
}

impl Lexicon {
    fn new(phrases: &[&str]) -> Self {
        let alternation = phrases.iter().map(|p| bounded(p)).collect::<Vec<_>>().join("|");
        Self {
            pattern: Regex::new(&format!("(?i)(?:{})", alternation)).ok(),
        }
    }

    /// Non-overlapping phrase occurrences in `text`
    pub fn count(&self, text: &str) -> usize {
        self.pattern.as_ref().map(|re| re.find_iter(text).count()).unwrap_or(0)
    }
}

/// Escape a phrase and anchor it at word boundaries where it starts or ends
/// with a word character
fn bounded(phrase: &str) -> String {
    let word_start = phrase.chars().next().is_some_and(char::is_alphanumeric);
    let word_end = phrase.chars().last().is_some_and(char::is_alphanumeric);
    format!(
        "{}{}{}",
        if word_start { r"\b" } else { "" },
        regex::escape(phrase),
        if word_end { r"\b" } else { "" }
    )
}

pub static DISTRESS: LazyLock<Lexicon> = LazyLock::new(|| {
    Lexicon::new(&[
        "overwhelmed",
        "overwhelming",
        "too much",
        "stressed",
        "don't know where to start",
        "dont know where to start",
        "lost",
        "scared",
        "worried",
        "überfordert",
        "zu viel",
        "keine ahnung",
        "angst",
        "sorgen",
    ])
});

pub static CLARIFICATION: LazyLock<Lexicon> = LazyLock::new(|| {
    Lexicon::new(&[
        "what do you mean",
        "what does that mean",
        "what does it mean",
        "what is meant",
        "what's that",
        "don't understand",
        "dont understand",
        "explain",
        "unclear",
        "confused",
        "was bedeutet",
        "was heißt das",
        "verstehe nicht",
        "erklären",
        "unklar",
    ])
});

pub static BREVITY: LazyLock<Lexicon> = LazyLock::new(|| {
    Lexicon::new(&[
        "keep it short",
        "shorter",
        "quick answer",
        "just tell me",
        "get to the point",
        "tl;dr",
        "tldr",
        "faster",
        "fass dich kurz",
        "kürzer",
        "schneller",
        "auf den punkt",
    ])
});

pub static TECHNICAL: LazyLock<Lexicon> = LazyLock::new(|| {
    Lexicon::new(&[
        "u-value",
        "u-wert",
        "kfw",
        "gebäudeenergiegesetz",
        "heat pump",
        "wärmepumpe",
        "load-bearing",
        "tragend",
        "kwh",
        "insulation",
        "dämmung",
        "photovoltaic",
        "screed",
        "estrich",
        "thermal bridge",
        "wärmebrücke",
        "blower door",
    ])
});

pub static EXPLORATORY: LazyLock<Lexicon> = LazyLock::new(|| {
    Lexicon::new(&[
        "compare",
        "comparison",
        "alternative",
        "alternatives",
        "versus",
        "vs",
        "option",
        "options",
        "pros and cons",
        "what if",
        "which is better",
        "vergleich",
        "vergleichen",
        "möglichkeit",
        "möglichkeiten",
        "oder lieber",
        "was wäre wenn",
        "vor- und nachteile",
    ])
});

pub static COMMITMENT: LazyLock<Lexicon> = LazyLock::new(|| {
    Lexicon::new(&[
        "we want",
        "we will",
        "we decided",
        "i want",
        "i'd like",
        "we'd like",
        "definitely",
        "let's take",
        "budget is",
        "wir wollen",
        "wir möchten",
        "ich möchte",
        "wir nehmen",
        "auf jeden fall",
        "haben uns entschieden",
    ])
});

/// Amounts with a currency, area or percentage unit, or a currency prefix
static FIGURE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)\d[\d.,']*\s*(?:€|eur\b|euro|k\b|tsd\b|m²|m2\b|qm\b|sqm\b|%|kwh\b)|€\s*\d").ok()
});

/// Bare quantities such as "3 rooms" or "2 bathrooms"
static QUANTITY: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d+\s*(?:rooms?|zimmer|bathrooms?|bäder|bad|floors?|etagen?|stockwerke?|people|personen|kids|kinder)\b").ok()
});

/// Count whole-word phrase occurrences of one table in `text`
pub fn count_hits(text: &str, lexicon: &Lexicon) -> usize {
    lexicon.count(text)
}

/// Count concrete figures (amounts with units)
pub fn count_figures(text: &str) -> usize {
    FIGURE.as_ref().map(|re| re.find_iter(text).count()).unwrap_or(0)
}

/// Whether a message carries concrete data worth storing
pub fn has_data_pattern(text: &str) -> bool {
    let lower = text.to_lowercase();
    count_figures(&lower) > 0
        || QUANTITY.as_ref().map(|re| re.is_match(&lower)).unwrap_or(false)
        || count_hits(&lower, &COMMITMENT) > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_hits() {
        assert_eq!(count_hits("too much, way too much", &DISTRESS), 2);
        assert_eq!(count_hits("nothing here", &DISTRESS), 0);
        assert_eq!(count_hits("Zu viel auf einmal", &DISTRESS), 1);
    }

    #[test]
    fn test_phrases_match_whole_words_only() {
        assert_eq!(count_hits("the coat closet stays", &DISTRESS), 0);
        assert_eq!(count_hits("I'm lost", &DISTRESS), 1);
        assert_eq!(count_hits("we cover the shortfall later", &BREVITY), 0);
        assert_eq!(count_hits("keep it short", &BREVITY), 1);
        assert_eq!(count_hits("what is the budget for the roof?", &CLARIFICATION), 0);
        assert_eq!(count_hits("what do you mean by screed?", &CLARIFICATION), 1);
        assert_eq!(count_hits("tiles vs. parquet", &EXPLORATORY), 1);
        assert_eq!(count_hits("optional extras", &EXPLORATORY), 0);
    }

    #[test]
    fn test_count_figures() {
        assert_eq!(count_figures("budget 250.000 € and 140 m²"), 2);
        assert_eq!(count_figures("about €30000"), 1);
        assert_eq!(count_figures("3 children"), 0);
    }

    #[test]
    fn test_has_data_pattern() {
        assert!(has_data_pattern("Our budget is 300k"));
        assert!(has_data_pattern("We need 4 rooms"));
        assert!(has_data_pattern("Wir nehmen die Wärmepumpe"));
        assert!(!has_data_pattern("Hmm, not sure yet"));
    }
}
