// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! However a response is cut into fragments, the filter reaches the same
//! final text, shows the same answer text, and never shows reasoning content.

use mnemo_stream::{Delimiters, ReasoningFilter, StreamEvent};
use proptest::prelude::*;

fn run(fragments: &[String]) -> Vec<StreamEvent> {
    let mut filter = ReasoningFilter::new(Delimiters::new("<think>", "</think>").unwrap());
    let mut events: Vec<StreamEvent> = fragments.iter().flat_map(|f| filter.push(f)).collect();
    events.extend(filter.finish());
    events
}

fn split_at_points(text: &str, mut points: Vec<usize>) -> Vec<String> {
    points.retain(|p| *p < text.len() && text.is_char_boundary(*p));
    points.sort_unstable();
    points.dedup();
    let mut parts = Vec::new();
    let mut start = 0;
    for p in points {
        parts.push(text[start..p].to_string());
        start = p;
    }
    parts.push(text[start..].to_string());
    parts
}

fn displayed(events: &[StreamEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Token(t) => Some(t.as_str()),
            _ => None,
        })
        .collect()
}

fn without_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// A response and the answer text a reader should see from it.
fn response() -> impl Strategy<Value = (String, String)> {
    ("[a-z ]{0,12}", "[a-z ]{0,12}", "[a-z ]{0,12}", any::<bool>()).prop_map(
        |(before, reasoning, after, closed)| {
            if closed {
                let visible = format!("{before}{after}");
                (format!("{before}<think>SECRET{reasoning}</think>{after}"), visible)
            } else {
                (format!("{before}<think>SECRET{reasoning}"), before)
            }
        },
    )
}

fn plain_after_close() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z ]{1,6}", 1..6)
}

proptest! {
    #[test]
    fn final_text_ignores_fragmentation(
        (text, _) in response(),
        points in prop::collection::vec(0usize..60, 0..8),
    ) {
        let whole = run(std::slice::from_ref(&text));
        let pieces = run(&split_at_points(&text, points));
        prop_assert_eq!(whole.last(), pieces.last());
    }

    #[test]
    fn reasoning_is_never_displayed(
        (text, _) in response(),
        points in prop::collection::vec(0usize..60, 0..8),
    ) {
        let events = run(&split_at_points(&text, points));
        let started = events.iter().filter(|e| **e == StreamEvent::ReasoningStarted).count();
        prop_assert_eq!(started, 1);
        for event in &events {
            if let StreamEvent::Token(t) = event {
                prop_assert!(!t.contains("SECRET"));
                prop_assert!(!t.contains("<think>"));
            }
        }
    }

    #[test]
    fn displayed_answer_ignores_fragmentation(
        (text, visible) in response(),
        points in prop::collection::vec(0usize..60, 0..8),
    ) {
        let whole = displayed(&run(std::slice::from_ref(&text)));
        let pieces = displayed(&run(&split_at_points(&text, points)));
        prop_assert_eq!(without_whitespace(&whole), without_whitespace(&visible));
        prop_assert_eq!(without_whitespace(&pieces), without_whitespace(&visible));
    }

    #[test]
    fn fragments_after_the_closing_one_pass_through(later in plain_after_close()) {
        let mut fragments = vec!["<think>plan</think>".to_string()];
        fragments.extend(later.iter().cloned());
        let events = run(&fragments);
        prop_assert_eq!(displayed(&events), later.concat());
    }
}
