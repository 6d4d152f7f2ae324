use serde::Serialize;

/// Keywords found in a description, in the order of the search's keyword list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeywordMatch {
    matched: Vec<String>,
}

impl KeywordMatch {
    pub fn keywords(&self) -> &[String] {
        &self.matched
    }

    pub fn count(&self) -> usize {
        self.matched.len()
    }
}

/// Scores `text` against `keywords` by case-insensitive substring containment.
///
/// There is no word-boundary handling: "AI" matches inside "contains".
/// Matched keywords keep their original casing.
pub fn match_keywords(text: &str, keywords: &[String]) -> KeywordMatch {
    let text_lower = text.to_lowercase();
    let matched = keywords
        .iter()
        .filter(|keyword| text_lower.contains(&keyword.to_lowercase()))
        .cloned()
        .collect();
    KeywordMatch { matched }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords(list: &[&str]) -> Vec<String> {
        list.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn counts_case_insensitive_substrings() {
        let result = match_keywords(
            "Experience with Python and distributed SQL systems",
            &keywords(&["python", "sql"]),
        );
        assert_eq!(result.count(), 2);
        assert_eq!(result.keywords(), ["python", "sql"]);
    }

    #[test]
    fn keeps_keyword_order_and_casing() {
        let result = match_keywords(
            "kubernetes, then some rust, then AWS",
            &keywords(&["AWS", "Go", "Rust", "Kubernetes"]),
        );
        assert_eq!(result.keywords(), ["AWS", "Rust", "Kubernetes"]);
        assert_eq!(result.count(), result.keywords().len());
    }

    #[test]
    fn matches_inside_words() {
        let result = match_keywords("This role contains nothing relevant", &keywords(&["AI"]));
        assert_eq!(result.count(), 1);
    }

    #[test]
    fn empty_description_matches_nothing() {
        let result = match_keywords("", &keywords(&["rust", "sql"]));
        assert_eq!(result.count(), 0);
        assert!(result.keywords().is_empty());
    }

    #[test]
    fn repeated_calls_agree() {
        let list = keywords(&["docker", "linux", "nix"]);
        let text = "Linux admins with Docker experience";
        assert_eq!(match_keywords(text, &list), match_keywords(text, &list));
    }
}
