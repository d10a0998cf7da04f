/// Line fingerprinting for the duplicate tracker.
///
/// Lines are compared after removing every whitespace character, so
/// re-indented or re-spaced copies still collide. The fingerprint is a
/// 64-bit FNV-1a hash of the normalized text.
use std::sync::LazyLock;

use regex::Regex;

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// Normalized lines shorter than this are too common to be meaningful.
pub const MIN_SIGNIFICANT_LEN: usize = 15;

static TRIVIAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\*|^/\*|^#|import|export|from|package").expect("valid regex")
});

/// Strip all whitespace (spaces, tabs, newlines).
pub fn normalize(content: &str) -> String {
    content.chars().filter(|c| !c.is_whitespace()).collect()
}

pub fn fnv1a(text: &str) -> u64 {
    let mut hash = FNV_OFFSET;
    for byte in text.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Comment leaders, import/package boilerplate and very short lines.
pub fn is_trivial(normalized: &str) -> bool {
    normalized.len() < MIN_SIGNIFICANT_LEN || TRIVIAL.is_match(normalized)
}
