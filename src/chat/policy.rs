//! Content Policy
//!
//! Decides which chat lines are knuckle-tattoo material: exactly two
//! four-character words with no lowercase letters. Digits pass, so
//! `"1234 5678"` is accepted.

/// Return true if a chat line should be forwarded to the hub
pub fn should_forward(text: &str) -> bool {
    let words: Vec<&str> = text.split(' ').collect();
    if words.len() != 2 {
        return false;
    }
    if words.iter().any(|w| w.chars().count() != 4) {
        return false;
    }
    // Not the same as "all uppercase": digits have no case
    !words.iter().flat_map(|w| w.chars()).any(char::is_lowercase)
}
