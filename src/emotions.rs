//! Parsing of the free-form emotion tags attached to a whisper.

/// Normalizes a tag by stripping surrounding whitespace and composing
/// it into Unicode Normalization Form C.
///
/// ```
/// use whispr::emotions::normalize_tag;
/// assert_eq!(normalize_tag(" cafe\u{0301} "), "caf\u{e9}");
/// ```
pub fn normalize_tag(tag: impl AsRef<str>) -> String {
    use unicode_normalization::UnicodeNormalization;

    tag.as_ref().trim().nfc().collect()
}

/// Parses the `emotions` form field.
///
/// The field is a JSON array of strings; anything else is read as a
/// comma-separated list. Tags are normalized, empty ones are dropped,
/// and repeated tags keep only their first occurrence.
pub fn parse_emotions(raw: &str) -> Vec<String> {
    let tags = match serde_json::from_str::<Vec<String>>(raw) {
        Ok(tags) => tags,
        Err(_) => raw.split(',').map(str::to_owned).collect(),
    };

    let mut result: Vec<String> = Vec::with_capacity(tags.len());

    for tag in tags.iter().map(normalize_tag) {
        if !tag.is_empty() && !result.contains(&tag) {
            result.push(tag);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use unicode_normalization::is_nfc;

    use super::{normalize_tag, parse_emotions};

    #[test]
    fn json_arrays_are_parsed() {
        assert_eq!(parse_emotions(r#"["happy", "sad"]"#), vec!["happy", "sad"]);
    }

    #[test]
    fn comma_lists_are_trimmed() {
        assert_eq!(parse_emotions(" happy ,sad,, ,calm "), vec!["happy", "sad", "calm"]);
    }

    #[test]
    fn json_entries_are_trimmed_and_blank_ones_dropped() {
        assert_eq!(parse_emotions(r#"[" joy ", "", "  "]"#), vec!["joy"]);
    }

    #[test]
    fn json_that_is_not_a_string_array_is_read_as_a_list() {
        assert_eq!(parse_emotions("[1, 2]"), vec!["[1", "2]"]);
    }

    #[test]
    fn duplicates_keep_first_position() {
        assert_eq!(parse_emotions("sad,happy,sad"), vec!["sad", "happy"]);
    }

    #[test]
    fn empty_input_yields_no_tags() {
        assert!(parse_emotions("").is_empty());
        assert!(parse_emotions("[]").is_empty());
        assert!(parse_emotions(" , ,").is_empty());
    }

    fn count_whitespace(s: impl AsRef<str>) -> usize {
        s.as_ref().chars().filter(|c| c.is_whitespace()).count()
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 1000, ..ProptestConfig::default()
        })]

        #[test]
        fn normalization_works(tag in "(\\S.*\\S|\\S+)", space_before in "\\s*", space_after in "\\s*") {
            let normalized = normalize_tag(format!("{}{}{}", space_before, tag, space_after));

            prop_assert!(is_nfc(&normalized), "{:?} (normalized form of {:?}) is in NFC", normalized, tag);

            prop_assert!(!normalized.starts_with(char::is_whitespace) && !normalized.ends_with(char::is_whitespace), "{:?} (normalized form of {:?}) has no leading or trailing whitespace", normalized, tag);

            let trimmed = normalized.trim();

            prop_assert_eq!(count_whitespace(&normalized), count_whitespace(&trimmed), "{:?} (normalized form of {:?}) preserves inner whitespace", normalized, tag);
        }

        #[test]
        fn parsed_tags_are_never_blank(raw in ".*") {
            for tag in parse_emotions(&raw) {
                prop_assert!(!tag.trim().is_empty());
            }
        }
    }
}
