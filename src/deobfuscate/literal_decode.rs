//! Guesses at what an obfuscated string literal used to say. Only feeds the
//! report; generated names never depend on it.

const SUBSTITUTIONS: [(char, char); 4] = [('@', 'a'), ('#', 'e'), ('k', 'r'), ('f', 't')];

const SHIFTS: [u8; 5] = [1, 2, 3, 13, 25];

const COMMON_WORDS: [&str; 15] = [
    "the", "and", "you", "for", "are", "not", "get", "set", "run", "win", "key", "click", "send",
    "mouse", "activate",
];

pub fn decode_hint(encoded: &str) -> Option<String> {
    let substituted: String = encoded
        .chars()
        .map(|c| {
            SUBSTITUTIONS
                .iter()
                .find(|(from, _)| *from == c)
                .map_or(c, |(_, to)| *to)
        })
        .collect();
    if looks_like_text(&substituted) {
        return Some(substituted);
    }

    let reversed: String = substituted.chars().rev().collect();
    if looks_like_text(&reversed) {
        return Some(reversed);
    }

    SHIFTS
        .iter()
        .map(|&shift| caesar(encoded, shift))
        .find(|candidate| looks_like_text(candidate))
}

fn caesar(text: &str, shift: u8) -> String {
    text.chars()
        .map(|c| {
            if c.is_ascii_lowercase() {
                (b'a' + (c as u8 - b'a' + shift) % 26) as char
            } else if c.is_ascii_uppercase() {
                (b'A' + (c as u8 - b'A' + shift) % 26) as char
            } else {
                c
            }
        })
        .collect()
}

fn looks_like_text(text: &str) -> bool {
    let lower = text.to_lowercase();
    COMMON_WORDS.iter().any(|w| lower.contains(w))
}
