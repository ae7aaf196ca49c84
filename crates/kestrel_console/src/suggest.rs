//! Tab completion.

/// A prefix completer over a registered vocabulary.
#[derive(Debug, Default)]
pub struct Suggester {
    words: Vec<String>,
}

impl Suggester {
    /// Creates an empty suggester.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a completable word.
    pub fn add_word(&mut self, word: &str) {
        if !self.words.iter().any(|w| w == word) {
            self.words.push(word.to_string());
        }
    }

    /// Returns the completions for `prefix`, ordered.
    pub fn suggest(&self, prefix: &str) -> Vec<String> {
        let mut matches: Vec<String> = self
            .words
            .iter()
            .filter(|w| w.starts_with(prefix))
            .cloned()
            .collect();
        matches.sort();
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_ordered_matches() {
        let mut s = Suggester::new();
        s.add_word("route");
        s.add_word("report_timing");
        s.add_word("read_json");
        s.add_word("place");
        assert_eq!(s.suggest("r"), vec!["read_json", "report_timing", "route"]);
        assert_eq!(s.suggest("pl"), vec!["place"]);
        assert!(s.suggest("z").is_empty());
    }

    #[test]
    fn duplicates_are_ignored() {
        let mut s = Suggester::new();
        s.add_word("route");
        s.add_word("route");
        assert_eq!(s.suggest("route").len(), 1);
    }
}
