use proptest::prelude::*;
use survey::{CommandLine, IndexRange, RangeEndpoint, RangeSelector, ResponseQuery, TokenizeError};

fn word() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[A-Za-z0-9_.,-]{1,8}").unwrap()
}

fn blanks() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[ \t]{1,4}").unwrap()
}

fn endpoint() -> impl Strategy<Value = RangeEndpoint> {
    prop_oneof![
        any::<i64>().prop_map(RangeEndpoint::first),
        any::<i64>().prop_map(RangeEndpoint::last),
        any::<u32>().prop_map(RangeEndpoint::index),
        (-20i64..20).prop_map(RangeEndpoint::first),
        (-20i64..20).prop_map(RangeEndpoint::last),
        (0u32..20).prop_map(RangeEndpoint::index),
    ]
}

fn tokens(line: &str) -> Vec<String> {
    let parsed = CommandLine::parse(line).expect("tokenize");
    let mut tokens = vec![parsed.command];
    tokens.extend(parsed.args);
    tokens.retain(|t| !t.is_empty());
    tokens
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn whitespace_runs_fold_to_single_separator(
        words in proptest::collection::vec(word(), 1..6),
        lead in "[ \t]{0,3}",
        trail in "[ \t]{0,3}",
        seps in proptest::collection::vec(blanks(), 5),
    ) {
        let mut padded = lead.clone();
        for (i, w) in words.iter().enumerate() {
            if i > 0 {
                padded.push_str(&seps[i - 1]);
            }
            padded.push_str(w);
        }
        padded.push_str(&trail);

        prop_assert_eq!(tokens(&padded), tokens(&words.join(" ")));
        prop_assert_eq!(tokens(&padded), words);
    }

    #[test]
    fn quoted_run_is_one_token(before in word(), inner in "[a-z ]{1,12}", after in word()) {
        for quote in ['\'', '"'] {
            let line = format!("{} {}{}{} {}", before, quote, inner, quote, after);
            prop_assert_eq!(tokens(&line), vec![before.clone(), inner.clone(), after.clone()]);
        }
    }

    #[test]
    fn escaped_space_joins_words(a in word(), b in word()) {
        let line = format!("cmd {}\\ {}", a, b);
        prop_assert_eq!(tokens(&line), vec!["cmd".to_string(), format!("{} {}", a, b)]);
    }

    #[test]
    fn unclosed_quote_always_fails(prefix in "[a-z ]{0,10}", suffix in "[a-z ]{0,10}") {
        for quote in ['\'', '"'] {
            let line = format!("{}{}{}", prefix, quote, suffix);
            prop_assert_eq!(
                CommandLine::parse(&line),
                Err(TokenizeError::UnterminatedQuote { quote })
            );
        }
    }

    #[test]
    fn evaluate_stays_in_bounds(start in endpoint(), end in endpoint(), len in 0usize..1000) {
        let selector = RangeSelector::new(start, end);
        if let Some(IndexRange { start, end }) = selector.evaluate(len) {
            prop_assert!(start <= end);
            prop_assert!(end < len);
        }
    }

    #[test]
    fn default_query_selects_everything(len in 1usize..10_000) {
        let query: ResponseQuery = "".parse().unwrap();
        prop_assert!(query.keys.is_empty());
        prop_assert_eq!(query.range.evaluate(len), Some(IndexRange { start: 0, end: len - 1 }));
    }

    #[test]
    fn limit_is_a_contiguous_subslice(
        start in endpoint(),
        end in endpoint(),
        items in proptest::collection::vec(any::<u16>(), 0..50),
    ) {
        let query = ResponseQuery { keys: Vec::new(), range: RangeSelector::new(start, end) };
        let limited = query.limit(&items);
        match query.range.evaluate(items.len()) {
            Some(range) => {
                prop_assert_eq!(limited.len(), range.len());
                prop_assert_eq!(limited, &items[range.as_range()]);
            }
            None => prop_assert!(limited.is_empty()),
        }
    }

    #[test]
    fn selector_text_parses_back(start in endpoint(), end in endpoint()) {
        let selector = RangeSelector::new(start, end);
        let query: ResponseQuery = format!("range={}", selector).parse().unwrap();
        prop_assert_eq!(query.range, selector);
    }
}
