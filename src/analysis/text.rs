//! Similarity between two OCR transcripts.

/// Collapses whitespace runs to a single space and trims.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Case-insensitive Levenshtein distance with unit costs.
pub fn levenshtein(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }

    let a = a.chars().flat_map(char::to_lowercase).collect::<Vec<_>>();
    let b = b.chars().flat_map(char::to_lowercase).collect::<Vec<_>>();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev = (0..=b.len()).collect::<Vec<_>>();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(substitution);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Normalized similarity in `[0, 1]`. Two empty strings are identical; one
/// empty side scores zero.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    let a = normalize_whitespace(a);
    let b = normalize_whitespace(b);

    match (a.is_empty(), b.is_empty()) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return 0.0,
        _ => {}
    }
    if a == b {
        return 1.0;
    }

    let distance = levenshtein(&a, &b) as f64;
    // Lengths are taken before case folding; folding can lengthen a string,
    // in which case the clamp below keeps the score at zero.
    let max_len = a.chars().count().max(b.chars().count()) as f64;
    (1.0 - distance / max_len).max(0.0)
}

/// Similarity as a rounded percentage, or `None` unless both transcripts are
/// non-empty.
pub fn similarity_percent(a: &str, b: &str) -> Option<u8> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    Some((text_similarity(a, b) * 100.0).round() as u8)
}
