//! Token-set matching against a normalized transcript

/// Normalize a transcript for matching
#[must_use]
pub fn normalize(transcript: &str) -> String {
    transcript.to_lowercase()
}

/// Check whether every token occurs somewhere in the transcript
///
/// Pure substring containment: no word splitting, token order is irrelevant and
/// overlapping tokens are checked independently. The caller normalizes the transcript.
#[must_use]
pub fn matches<S: AsRef<str>>(transcript: &str, tokens: &[S]) -> bool {
    tokens.iter().all(|token| transcript.contains(token.as_ref()))
}

/// Check whether the transcript contains at least one of the given words
#[must_use]
pub fn contains_any<S: AsRef<str>>(transcript: &str, words: &[S]) -> bool {
    words.iter().any(|word| transcript.contains(word.as_ref()))
}
