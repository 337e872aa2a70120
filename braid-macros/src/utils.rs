use proc_macro::{TokenStream, TokenTree};

/// Splits a `TokenStream` into comma-separated arguments.
///
/// Each argument is returned as a `Vec<TokenTree>`.
/// Commas at the top level are used as separators.
///
/// Delimited groups arrive as single token trees, so commas nested inside
/// parentheses, brackets or braces never split an argument.
pub(crate) fn split_args(input: TokenStream) -> Vec<Vec<TokenTree>> {
    let mut args = Vec::new();
    let mut current = Vec::new();

    for token in input {
        match &token {
            TokenTree::Punct(p) if p.as_char() == ',' => {
                if !current.is_empty() {
                    args.push(current);
                    current = Vec::new();
                }
            }
            _ => current.push(token),
        }
    }

    if !current.is_empty() {
        args.push(current);
    }

    args
}

/// Converts a slice of tokens into a Rust source string.
///
/// This function preserves token order and inserts spaces
/// between consecutive identifiers to avoid accidental
/// token merging (e.g. `foo bar` vs `foobar`).
pub(crate) fn tokens_to_string(tokens: &[TokenTree]) -> String {
    let mut out = String::new();
    let mut prev_was_ident = false;

    for t in tokens {
        let s = t.to_string();

        let needs_space =
            prev_was_ident && matches!(t, TokenTree::Ident(_) | TokenTree::Literal(_));

        if needs_space {
            out.push(' ');
        }

        out.push_str(&s);
        prev_was_ident = matches!(t, TokenTree::Ident(_));
    }

    out
}

/// Reads the `worker_threads = N` argument of `#[braid::main]` and
/// `#[braid::test]`.
///
/// Other arguments and unparsable values are ignored.
pub(crate) fn worker_threads(attr: &str) -> Option<usize> {
    attr.split(',')
        .map(str::trim)
        .filter_map(|part| part.strip_prefix("worker_threads"))
        .map(|v| v.trim_start_matches(|c: char| c == '=' || c.is_whitespace()))
        .find_map(|v| v.parse::<usize>().ok())
}
