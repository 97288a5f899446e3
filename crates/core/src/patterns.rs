use regex::Regex;

/// Static recognizers for structured identifiers. Compiled once and shared
/// read-only across sessions.
#[derive(Clone, Debug)]
pub struct PatternLibrary {
    order_id: Regex,
    tracking: Regex,
}

impl PatternLibrary {
    pub fn new() -> Self {
        // Order ids are a single letter prefix followed by digits, with an
        // optional `#` (e.g. `#W001`). Short digit runs are still captured so
        // a malformed id flows through to a not-found lookup instead of being
        // silently dropped. Tracking numbers are `TRK` plus digits.
        Self {
            order_id: Regex::new(r"(?i)#?\b([A-Z][0-9]+)\b").expect("order id pattern compiles"),
            tracking: Regex::new(r"(?i)\b(TRK[0-9]+)\b").expect("tracking pattern compiles"),
        }
    }

    /// All order-id candidates in positional order, uppercased, `#` stripped.
    pub fn find_order_ids(&self, text: &str) -> Vec<String> {
        self.order_id
            .captures_iter(text)
            .map(|captures| captures[1].to_uppercase())
            .collect()
    }

    /// All tracking-number candidates in positional order, uppercased.
    pub fn find_tracking_numbers(&self, text: &str) -> Vec<String> {
        self.tracking
            .captures_iter(text)
            .map(|captures| captures[1].to_uppercase())
            .collect()
    }
}

impl Default for PatternLibrary {
    fn default() -> Self {
        Self::new()
    }
}
