/// Counts how many times `needle` appears in `haystack`.
pub fn count_occurrences(haystack: &str, needle: char) -> usize {
    haystack.chars().filter(|&c| c == needle).count()
}

/// Decodes bytes as ISO-8859-1. Every byte maps to the code point of the
/// same value, so decoding never fails.
pub fn latin1_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}
