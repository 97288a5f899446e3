//! Fuzzy product-name matching over the catalog name list.

/// Minimum token length considered for word-level comparisons. Shorter
/// tokens ("a", "of") produce meaningless similarity scores.
const MIN_TOKEN_LEN: usize = 3;

#[derive(Clone, Debug, PartialEq)]
pub struct CatalogMatch {
    pub name: String,
    pub score: f32,
}

/// Read-only index of catalog product names, shared across sessions.
#[derive(Clone, Debug, Default)]
pub struct CatalogIndex {
    names: Vec<String>,
}

impl CatalogIndex {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Scans word n-grams of the utterance against every catalog name and
    /// returns matches scoring at or above the threshold, best first. Ties
    /// between distinct names are preserved so the caller can detect
    /// ambiguity instead of guessing.
    pub fn best_matches(&self, utterance: &str, threshold: f32) -> Vec<CatalogMatch> {
        let normalized = normalize_name(utterance);
        let tokens: Vec<&str> = normalized.split_whitespace().collect();
        if tokens.is_empty() {
            return Vec::new();
        }

        let mut matches = Vec::new();
        for name in &self.names {
            let score = score_against_name(&tokens, name);
            if score >= threshold {
                matches.push(CatalogMatch { name: name.clone(), score });
            }
        }

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        matches
    }
}

fn score_against_name(utterance_tokens: &[&str], name: &str) -> f32 {
    let normalized_name = normalize_name(name);
    let name_tokens: Vec<&str> = normalized_name.split_whitespace().collect();
    let max_window = name_tokens.len().max(1) + 1;

    let mut best = 0.0f32;
    for window_len in 1..=max_window.min(utterance_tokens.len()) {
        for window in utterance_tokens.windows(window_len) {
            let candidate = window.join(" ");
            if window_len == 1 && candidate.len() < MIN_TOKEN_LEN {
                continue;
            }
            best = best.max(name_similarity(&candidate, &normalized_name));
            // Single tokens also score against individual name words, so
            // "backpacks" finds "Backcountry Blaze Backpack".
            if window_len == 1 {
                for word in &name_tokens {
                    if word.len() >= MIN_TOKEN_LEN {
                        best = best.max(name_similarity(&candidate, word));
                    }
                }
            }
        }
    }
    best
}

/// Similarity between two normalized names in `[0.0, 1.0]`: exact match is
/// 1.0, substring containment 0.9, otherwise Levenshtein-based.
pub fn name_similarity(a: &str, b: &str) -> f32 {
    let a = normalize_name(a);
    let b = normalize_name(b);

    if a == b {
        return 1.0;
    }
    if !a.is_empty() && !b.is_empty() && (a.contains(&b) || b.contains(&a)) {
        return 0.9;
    }

    let max_len = a.len().max(b.len());
    if max_len == 0 {
        return 1.0;
    }
    let distance = levenshtein_distance(&a, &b);
    (1.0 - distance as f32 / max_len as f32).max(0.0)
}

fn normalize_name(raw: &str) -> String {
    let mut normalized = String::with_capacity(raw.len());
    for character in raw.chars() {
        if character.is_alphanumeric() {
            normalized.extend(character.to_lowercase());
        } else {
            normalized.push(' ');
        }
    }
    normalized.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut previous_row: Vec<usize> = (0..=b_chars.len()).collect();
    let mut current_row = vec![0usize; b_chars.len() + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        current_row[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let substitution_cost = usize::from(a_char != b_char);
            current_row[j + 1] = (previous_row[j + 1] + 1)
                .min(current_row[j] + 1)
                .min(previous_row[j] + substitution_cost);
        }
        previous_row.copy_from_slice(&current_row);
    }

    previous_row[b_chars.len()]
}
