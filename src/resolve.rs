use crate::formats::SelectOption;

/// Minimum normalized similarity for a fuzzy label match.
const SIMILARITY_FLOOR: f64 = 0.6;

#[derive(Debug, PartialEq)]
pub enum Resolution<'a> {
    Matched(&'a SelectOption),
    /// More than one label contains the input. Never resolved silently;
    /// the caller decides how to disambiguate.
    Ambiguous(Vec<&'a SelectOption>),
    NotFound,
}

/// Resolve free-text operator input against a portal option list.
///
/// Priority order, first hit wins: exact code match, exact case-insensitive
/// label match, unique case-insensitive substring match, then nearest fuzzy
/// label at or above the similarity floor. Pure function; blank input is
/// always `NotFound`.
pub fn resolve<'a>(options: &'a [SelectOption], input: &str) -> Resolution<'a> {
    let input = input.trim();
    if input.is_empty() {
        return Resolution::NotFound;
    }

    if let Some(option) = options.iter().find(|o| o.code == input) {
        return Resolution::Matched(option);
    }

    let needle = input.to_lowercase();
    if let Some(option) = options.iter().find(|o| o.label.to_lowercase() == needle) {
        return Resolution::Matched(option);
    }

    let substring_hits: Vec<&SelectOption> = options
        .iter()
        .filter(|o| o.label.to_lowercase().contains(&needle))
        .collect();
    match substring_hits.len() {
        1 => return Resolution::Matched(substring_hits[0]),
        n if n > 1 => return Resolution::Ambiguous(substring_hits),
        _ => {}
    }

    let best = options
        .iter()
        .map(|o| {
            let score = strsim::normalized_levenshtein(&needle, &o.label.to_lowercase());
            (o, score)
        })
        .max_by(|a, b| a.1.total_cmp(&b.1));
    match best {
        Some((option, score)) if score >= SIMILARITY_FLOOR => Resolution::Matched(option),
        _ => Resolution::NotFound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(code: &str, label: &str) -> SelectOption {
        SelectOption {
            code: code.to_owned(),
            label: label.to_owned(),
        }
    }

    #[test]
    fn code_match_beats_label_match() {
        let options = vec![option("2", "1"), option("1", "Pune")];
        let Resolution::Matched(hit) = resolve(&options, "1") else {
            panic!("expected a match");
        };
        assert_eq!(hit.label, "Pune");
    }

    #[test]
    fn exact_label_beats_substring_and_fuzzy_candidates() {
        // "Pune" is also a substring of "Pune Rural" and fuzzily close to
        // "Punea"; the exact hit must win regardless.
        let options = vec![
            option("1", "Pune Rural"),
            option("2", "Punea"),
            option("3", "PUNE"),
        ];
        let Resolution::Matched(hit) = resolve(&options, "pune") else {
            panic!("expected a match");
        };
        assert_eq!(hit.code, "3");
    }

    #[test]
    fn unique_substring_matches() {
        let options = vec![option("1", "Maharashtra"), option("2", "Karnataka")];
        let Resolution::Matched(hit) = resolve(&options, "karna") else {
            panic!("expected a match");
        };
        assert_eq!(hit.code, "2");
    }

    #[test]
    fn multiple_substrings_are_ambiguous_not_guessed() {
        let options = vec![
            option("1", "Civil Court Junior Division"),
            option("2", "Civil Court Senior Division"),
        ];
        let Resolution::Ambiguous(candidates) = resolve(&options, "civil") else {
            panic!("expected ambiguity");
        };
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn fuzzy_match_above_floor() {
        let options = vec![option("1", "Maharashtra"), option("2", "Karnataka")];
        let Resolution::Matched(hit) = resolve(&options, "maharashtr") else {
            panic!("expected a fuzzy match");
        };
        assert_eq!(hit.code, "1");
    }

    #[test]
    fn fuzzy_match_below_floor_is_not_found() {
        let options = vec![option("1", "Maharashtra")];
        assert_eq!(resolve(&options, "zzzzzz"), Resolution::NotFound);
    }

    #[test]
    fn blank_input_is_not_found() {
        let options = vec![option("1", "Maharashtra")];
        assert_eq!(resolve(&options, "   "), Resolution::NotFound);
        assert_eq!(resolve(&options, ""), Resolution::NotFound);
    }
}
