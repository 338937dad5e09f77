//! Lexical extractors that turn the raw text left of the cursor into a
//! minimal access chain, e.g. `x = other + function(a, b).foo` into
//! `function(a, b).foo`, and `foo(a.b, c.d()).go(x)` into `foo().go()`.
//!
//! All functions here are pure and total: malformed or unbalanced input
//! never panics, an unmatched `(` simply acts as a chain boundary.

/// Isolate the trailing expression chain from statement/assignment prefixes
/// and sibling call arguments.
///
/// Scans right-to-left tracking parenthesis depth. The chain ends at the
/// first whitespace or comma at depth zero, or at an unmatched `(`.
pub fn extract_relevant_chain(text: &str) -> String {
    let trimmed = text.trim_start();
    let mut depth = 0i32;
    let mut collected: Vec<char> = Vec::new();

    for c in trimmed.chars().rev() {
        match c {
            ')' => depth += 1,
            '(' => depth -= 1,
            _ => {}
        }
        if (c == ' ' || c == '\t' || c == ',') && depth == 0 {
            return collected.iter().rev().collect::<String>().trim_start().to_string();
        }
        if c == '(' && depth == -1 {
            return collected.iter().rev().collect::<String>().trim_start().to_string();
        }
        collected.push(c);
    }

    collected.iter().rev().collect::<String>().trim_start().to_string()
}

/// Replace every balanced parenthesized argument list with an empty `()`,
/// preserving the dotted segments around it.
///
/// Returns the input unchanged when no balanced span is found, which also
/// makes the function idempotent.
pub fn strip_call_arguments(text: &str) -> String {
    let mut depth = 0i32;
    let mut result = String::new();
    let mut end = 0usize;
    let mut replaced = false;

    for (i, c) in text.char_indices() {
        match c {
            '(' => {
                if depth == 0 {
                    result.push_str(&text[end..i]);
                }
                depth += 1;
            }
            ')' => {
                depth -= 1;
                if depth == 0 {
                    end = i + 1;
                    result.push_str("()");
                    replaced = true;
                }
            }
            _ => {}
        }
    }

    if !replaced {
        return text.to_string();
    }
    result.push_str(&text[end..]);
    result
}

/// Split a chain into dot-separated segments, reporting whether it ended in
/// a trailing dot ("list the members of the type before the dot").
pub fn split_segments(chain: &str) -> (Vec<&str>, bool) {
    let trailing_dot = chain.ends_with('.');
    let body = chain.strip_suffix('.').unwrap_or(chain);
    if body.is_empty() {
        return (Vec::new(), trailing_dot);
    }
    (body.split('.').collect(), trailing_dot)
}

/// Strip the `()` left behind by [`strip_call_arguments`] from a segment,
/// yielding the bare symbol name.
pub fn segment_name(segment: &str) -> &str {
    segment.trim().trim_end_matches("()").trim_end()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_trailing_expression_from_statement() {
        assert_eq!(
            extract_relevant_chain("x = other + function(a, b).foo"),
            "function(a, b).foo"
        );
    }

    #[test]
    fn extracts_through_nested_calls() {
        assert_eq!(
            extract_relevant_chain("something = other + function(a, b).foo."),
            "function(a, b).foo."
        );
    }

    #[test]
    fn unmatched_open_paren_is_a_boundary() {
        // Cursor inside a call argument list: only the argument chain counts.
        assert_eq!(extract_relevant_chain("foo(bar.baz"), "bar.baz");
        assert_eq!(extract_relevant_chain("foo(a, bar."), "bar.");
    }

    #[test]
    fn whole_line_is_kept_without_boundary() {
        assert_eq!(extract_relevant_chain("  self.pawn."), "self.pawn.");
    }

    #[test]
    fn strips_argument_lists() {
        assert_eq!(
            strip_call_arguments("foo(a.ssdd, asd.eef.sd()).go(sd, ds())"),
            "foo().go()"
        );
    }

    #[test]
    fn strip_is_idempotent_on_balanced_input() {
        let once = strip_call_arguments("foo(a,b()).go(c)");
        assert_eq!(once, "foo().go()");
        assert_eq!(strip_call_arguments(&once), once);
    }

    #[test]
    fn strip_leaves_input_without_parens_unchanged() {
        assert_eq!(strip_call_arguments("a.b.c"), "a.b.c");
    }

    #[test]
    fn strip_tolerates_unbalanced_input() {
        assert_eq!(strip_call_arguments("foo(bar"), "foo(bar");
        assert_eq!(strip_call_arguments("a)b"), "a)b");
    }

    #[test]
    fn splits_segments_and_trailing_dot() {
        let (segs, trailing) = split_segments("self.weapon.");
        assert_eq!(segs, vec!["self", "weapon"]);
        assert!(trailing);

        let (segs, trailing) = split_segments("foo().bar");
        assert_eq!(segs, vec!["foo()", "bar"]);
        assert!(!trailing);

        let (segs, trailing) = split_segments(".");
        assert!(segs.is_empty());
        assert!(trailing);
    }

    #[test]
    fn segment_names_drop_call_parens() {
        assert_eq!(segment_name("foo()"), "foo");
        assert_eq!(segment_name(" bar "), "bar");
    }
}
