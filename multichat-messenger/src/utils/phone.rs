//! Phone number normalization.

/// Keep only ASCII digits, dropping `+`, spaces, dashes and parentheses.
pub fn digits_only(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}
