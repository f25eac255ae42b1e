use proptest::collection::vec;
use proptest::prelude::*;
use storyloom_common::section::parser::heading_title;
use storyloom_common::section::{compose_sections, merge_section, parse_sections, SectionEdit};
use storyloom_common::types::Section;

fn body_char() -> impl Strategy<Value = char> {
    prop_oneof![
        (b'a'..=b'z').prop_map(char::from),
        (b'A'..=b'Z').prop_map(char::from),
        Just(' '),
        Just(' '),
        Just('\n'),
        Just('\n'),
        Just('\t'),
        Just('\r'),
        Just('#'),
        Just('-'),
        Just('*'),
        Just('é'),
        Just('中'),
    ]
}

fn title() -> impl Strategy<Value = String> {
    vec(prop_oneof![(b'a'..=b'z').prop_map(char::from), Just(' '), Just('é')], 1..12)
        .prop_map(|chars| chars.into_iter().collect::<String>().trim().to_string())
        .prop_filter("title must not be blank", |title| !title.is_empty())
}

fn body() -> impl Strategy<Value = String> {
    vec(body_char(), 0..60)
        .prop_map(|chars| chars.into_iter().collect::<String>())
        .prop_filter("body lines must not look like headings", |body| {
            body.split('\n').all(|line| heading_title(line).is_none())
        })
}

fn sections() -> impl Strategy<Value = Vec<Section>> {
    vec((title(), body()).prop_map(|(title, body)| Section::new(title, body)), 0..8)
}

proptest! {
    #[test]
    fn parse_is_left_inverse_of_compose(sections in sections()) {
        let composed = compose_sections(&sections);
        prop_assert_eq!(parse_sections(&composed), sections);
    }

    #[test]
    fn merging_a_stored_body_verbatim_is_a_no_op(
        sections in sections(),
        pick in any::<prop::sample::Index>(),
    ) {
        prop_assume!(!sections.is_empty());
        let composed = compose_sections(&sections);
        let title = &sections[pick.index(sections.len())].title;
        // Lookup by title hits the first occurrence.
        let stored = sections.iter().find(|section| &section.title == title).unwrap();

        let outcome = merge_section(&composed, &SectionEdit::new(title, &stored.body)).unwrap();
        prop_assert!(outcome.is_unchanged());
    }
}
