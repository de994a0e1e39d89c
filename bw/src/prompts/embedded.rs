//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// Chat turn prompt
pub const TURN: &str = include_str!("../../prompts/turn.pmt");

/// System-initiated (auto) turn prompt
pub const AUTO_TURN: &str = include_str!("../../prompts/auto_turn.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "turn" => Some(TURN),
        "auto_turn" => Some(AUTO_TURN),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_embedded_turn() {
        let turn = get_embedded("turn").unwrap();
        assert!(turn.contains("\"reply\""));
        assert!(turn.contains("{{goal_instruction}}"));
    }

    #[test]
    fn test_get_embedded_auto_turn() {
        let auto = get_embedded("auto_turn").unwrap();
        assert!(auto.contains("Context:"));
        assert!(auto.contains("Insight:"));
        assert!(auto.contains("Action:"));
    }

    #[test]
    fn test_get_embedded_unknown() {
        assert!(get_embedded("unknown-template").is_none());
    }
}
