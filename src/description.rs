//! Human readable text derived from a snapshot's theme and keywords

/// Number of keywords mentioned in a description
const DESCRIBED_KEYWORDS: usize = 3;

/// Number of keywords turned into hashtags
const HASHTAG_KEYWORDS: usize = 5;

fn theme_phrase(theme: &str) -> String {
    let theme = theme.trim();
    if theme.is_empty() || theme.eq_ignore_ascii_case("unknown") || theme.eq_ignore_ascii_case("general") {
        "general".to_string()
    } else {
        theme.to_lowercase()
    }
}

/// Generates the one-sentence description shown in the catalog
///
/// ```
/// use sumi_folio::description::describe;
///
/// let keywords = vec!["coffee".to_string(), "roasting".to_string()];
/// assert_eq!(
///     describe("Food", &keywords),
///     "This food website focuses on coffee, roasting."
/// );
/// assert_eq!(describe("Unknown", &[]), "This appears to be a general website.");
/// ```
pub fn describe(theme: &str, keywords: &[String]) -> String {
    let theme = theme_phrase(theme);
    let focus: Vec<&str> = keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .take(DESCRIBED_KEYWORDS)
        .collect();

    if focus.is_empty() {
        format!("This appears to be a {} website.", theme)
    } else {
        format!("This {} website focuses on {}.", theme, focus.join(", "))
    }
}

/// Builds `#keyword` tags for the leading keywords plus a `#Theme` tag
pub fn hashtags(theme: &str, keywords: &[String]) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();

    for keyword in keywords.iter().take(HASHTAG_KEYWORDS) {
        let tag: String = keyword.split_whitespace().collect();
        if tag.is_empty() {
            continue;
        }
        let tag = format!("#{}", tag);
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }

    let theme: String = theme.split_whitespace().collect();
    if !theme.is_empty() {
        let tag = format!("#{}", theme);
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }

    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_describe_uses_first_three_keywords() {
        let keywords = words(&["rust", "compiler", "borrow checker", "traits"]);
        assert_eq!(
            describe("Technology", &keywords),
            "This technology website focuses on rust, compiler, borrow checker."
        );
    }

    #[test]
    fn test_describe_without_keywords() {
        assert_eq!(describe("News", &[]), "This appears to be a news website.");
        assert_eq!(
            describe("General", &words(&["", " "])),
            "This appears to be a general website."
        );
    }

    #[test]
    fn test_describe_maps_unknown_to_general() {
        assert_eq!(
            describe("Unknown", &words(&["shop"])),
            "This general website focuses on shop."
        );
    }

    #[test]
    fn test_hashtags() {
        let keywords = words(&["a", "b c", "d", "e", "f", "g"]);
        assert_eq!(
            hashtags("Blog", &keywords),
            vec!["#a", "#bc", "#d", "#e", "#f", "#Blog"]
        );
    }

    #[test]
    fn test_hashtags_skip_duplicates() {
        let keywords = words(&["blog", "Blog"]);
        assert_eq!(hashtags("Blog", &keywords), vec!["#blog", "#Blog"]);
        assert_eq!(hashtags("", &words(&["x"])), vec!["#x"]);
    }
}
