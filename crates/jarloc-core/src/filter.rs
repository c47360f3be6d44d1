//! Word filtering over found strings.

use crate::scanner::FoundString;

/// Settings applied on every filter call
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Drop strings that are empty or whitespace only
    pub hide_empty_strings: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            hide_empty_strings: true,
        }
    }
}

impl FilterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hide_empty_strings(mut self, hide: bool) -> Self {
        self.hide_empty_strings = hide;
        self
    }
}

/// Whether `value` passes the filter for the already split `words`
pub fn matches(value: &str, words: &[String], config: &FilterConfig) -> bool {
    if config.hide_empty_strings && value.trim().is_empty() {
        return false;
    }
    let value = value.to_lowercase();
    words.iter().all(|word| value.contains(word.as_str()))
}

/// Keeps the strings whose value contains every space-separated word of
/// `query`, ignoring case. An empty query keeps every string that is not
/// hidden.
pub fn filter_strings<'a>(
    strings: impl IntoIterator<Item = &'a FoundString>,
    query: &str,
    config: &FilterConfig,
) -> Vec<&'a FoundString> {
    let words: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
    strings
        .into_iter()
        .filter(|found| matches(&found.value, &words, config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn found(value: &str) -> FoundString {
        FoundString {
            id: 0,
            owner_entry: "A.class".to_string(),
            utf8_index: 1,
            string_index: 2,
            value: value.to_string(),
            class_name: "A".to_string(),
            method_signature: "run()V".to_string(),
            line_number: None,
            context: None,
        }
    }

    fn values<'a>(strings: &[&'a FoundString]) -> Vec<&'a str> {
        strings.iter().map(|s| s.value.as_str()).collect()
    }

    #[test]
    fn test_all_words_required() {
        let strings = [
            found("You have been Teleported home"),
            found("Teleport failed"),
            found("home sweet home"),
        ];
        let kept = filter_strings(&strings, "teleported HOME", &FilterConfig::default());
        assert_eq!(values(&kept), vec!["You have been Teleported home"]);
    }

    #[test]
    fn test_empty_query_keeps_visible_strings() {
        let strings = [found("a"), found("   "), found(""), found("b")];
        let kept = filter_strings(&strings, "", &FilterConfig::default());
        assert_eq!(values(&kept), vec!["a", "b"]);

        let config = FilterConfig::new().hide_empty_strings(false);
        let kept = filter_strings(&strings, "  ", &config);
        assert_eq!(kept.len(), 4);
    }

    #[test]
    fn test_hidden_strings_never_match() {
        let strings = [found(" \t ")];
        assert!(filter_strings(&strings, "", &FilterConfig::default()).is_empty());
        let config = FilterConfig::new().hide_empty_strings(false);
        assert!(filter_strings(&strings, "x", &config).is_empty());
    }

    #[test]
    fn test_non_ascii_case_folding() {
        let strings = [found("ÜBER alles")];
        let kept = filter_strings(&strings, "über", &FilterConfig::default());
        assert_eq!(kept.len(), 1);
    }
}
