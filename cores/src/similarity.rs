
/// Similarity between two names on a 0..=100 scale.
///
/// Both sides are trimmed and lowercased first. Equal strings score 100. When
/// `containment` is on and one string contains the other, the score is the
/// length ratio of the shorter to the longer. Otherwise the score is the
/// Levenshtein distance normalized by the longer length.
///
/// Lengths are counted in chars, so two empty strings score 100 and an empty
/// string against anything else scores 0.
pub fn score(a: &str, b: &str, containment: bool) -> f64 {
    let a = normalize(a);
    let b = normalize(b);
    if a == b {
        return 100.0;
    }
    let a_len = a.chars().count();
    let b_len = b.chars().count();
    let max_len = a_len.max(b_len);
    if containment && (a.contains(&b) || b.contains(&a)) {
        let min_len = a_len.min(b_len);
        return ratio(min_len, max_len);
    }
    let distance = strsim::levenshtein(&a, &b);
    ratio(max_len.saturating_sub(distance), max_len)
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

// max_len is never zero here: equal strings (including two empties) return early.
fn ratio(numerator: usize, max_len: usize) -> f64 {
    (numerator as f64 * 100.0) / max_len as f64
}
