//! Laws of the occurrence-counting offset mapper.

use proptest::prelude::*;
use stencil::base::TextSize;
use stencil::dialect::{OffsetMapper, dialect_to_markup};

fn starts(haystack: &str, needle: &str) -> Vec<TextSize> {
    haystack
        .match_indices(needle)
        .map(|(start, _)| TextSize::from(start as u32))
        .collect()
}

fn arb_text() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(vec!["ab", "cd", "ab ", "x", " ", "\n", "cd\n"]), 0..24)
        .prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn prop_queries_are_deterministic(
        original in arb_text(),
        generated in arb_text(),
        needle in prop::sample::select(vec!["ab", "cd", "x", "b c"]),
        offset in 0u32..128,
    ) {
        let mapper = OffsetMapper::new(&original, &generated);
        let offset = TextSize::from(offset);
        let first = mapper.map(needle, offset);
        prop_assert_eq!(first, mapper.map(needle, offset));

        // a second mapper over the same texts agrees with the cached one
        let fresh = OffsetMapper::new(&original, &generated);
        prop_assert_eq!(first, fresh.map(needle, offset));
    }

    #[test]
    fn prop_count_mismatch_is_unknown(
        original in arb_text(),
        generated in arb_text(),
        needle in prop::sample::select(vec!["ab", "cd", "x"]),
    ) {
        let mapper = OffsetMapper::new(&original, &generated);
        let in_original = starts(&original, needle);
        let in_generated = starts(&generated, needle);

        for (i, &offset) in in_generated.iter().enumerate() {
            let mapped = mapper.map(needle, offset);
            if in_original.len() == in_generated.len() {
                prop_assert_eq!(mapped, Some(in_original[i]));
            } else {
                prop_assert_eq!(mapped, None);
            }
        }
    }

    #[test]
    fn prop_unique_tokens_map_into_dialect(
        words in prop::collection::btree_set("[a-z]{3,8}", 1..6),
    ) {
        let words: Vec<String> = words.into_iter().collect();
        let dialect: String = words
            .iter()
            .map(|word| format!("p {word}\n"))
            .collect();
        let markup = dialect_to_markup(&dialect);
        let mapper = OffsetMapper::new(&dialect, &markup);

        for word in &words {
            // a word that also occurs inside another word is ambiguous
            if words.iter().any(|other| other != word && other.contains(word.as_str())) {
                continue;
            }
            let Some(at) = markup.find(word.as_str()) else {
                continue;
            };
            let mapped = mapper.map(word, TextSize::from(at as u32));
            let dialect_at = dialect.find(word.as_str()).map(|i| TextSize::from(i as u32));
            prop_assert_eq!(mapped, dialect_at);
        }
    }
}
