use serde::{Deserialize, Serialize};

/// Requests longer than this are cut when listed.
pub const DEFAULT_SUMMARY_WIDTH: usize = 50;

/// One answered meal request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub id: String,
    pub request: String,
    pub response: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl ConversationEntry {
    pub fn new(request: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            request: request.into(),
            response: response.into(),
            created_at: chrono::Utc::now(),
        }
    }

    /// The request, truncated to `width` characters with a trailing "...".
    pub fn summary(&self, width: usize) -> String {
        if self.request.chars().count() > width {
            let cut: String = self.request.chars().take(width).collect();
            format!("{}...", cut)
        } else {
            self.request.clone()
        }
    }
}

/// Append-only, session-lifetime record of answered requests.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ConversationHistory {
    entries: Vec<ConversationEntry>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, request: impl Into<String>, response: impl Into<String>) {
        self.entries.push(ConversationEntry::new(request, response));
    }

    /// Entries in insertion order, most recent last.
    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    /// 1-based lookup, matching the numbering shown by `/history`.
    pub fn get(&self, index: usize) -> Option<&ConversationEntry> {
        index.checked_sub(1).and_then(|i| self.entries.get(i))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_keeps_insertion_order() {
        let mut history = ConversationHistory::new();
        history.push("vegan lunch", "**Lunch:** tofu. Fry.");
        history.push("quick snack", "**Snack:** nuts. Eat.");

        assert_eq!(history.entries().len(), 2);
        assert_eq!(history.entries()[0].request, "vegan lunch");
        assert_eq!(history.entries().last().unwrap().request, "quick snack");
        assert_eq!(history.get(1).unwrap().request, "vegan lunch");
        assert!(history.get(0).is_none());
        assert!(history.get(3).is_none());
    }

    #[test]
    fn test_summary_truncates_long_requests() {
        let long = "a".repeat(60);
        let entry = ConversationEntry::new(long, "");
        let summary = entry.summary(DEFAULT_SUMMARY_WIDTH);
        assert_eq!(summary, format!("{}...", "a".repeat(50)));

        let short = ConversationEntry::new("high-protein breakfast", "");
        assert_eq!(short.summary(DEFAULT_SUMMARY_WIDTH), "high-protein breakfast");
    }

    #[test]
    fn test_summary_counts_characters_not_bytes() {
        let entry = ConversationEntry::new("🥑".repeat(51), "");
        assert_eq!(entry.summary(50), format!("{}...", "🥑".repeat(50)));
    }
}
