//! Character-substitution cipher applied to outgoing answer text.

/// Replace `s`, `x`, `z` with `f` and `S`, `X`, `Z` with `F`.
///
/// The mapping is one character to one character, so the output length
/// equals the input length, and no output character is itself a source
/// character, so applying it twice changes nothing.
pub fn apply(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            's' | 'x' | 'z' => 'f',
            'S' | 'X' | 'Z' => 'F',
            _ => c,
        })
        .collect()
}
