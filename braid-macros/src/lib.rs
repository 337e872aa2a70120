mod utils;

use proc_macro::{TokenStream, TokenTree};

/// Expands the slots and the settled fan-out shared by `until_all!` and
/// `until_all_settled!`. Leaves `__s0..__sN` and `__faults` in scope.
fn fan_out(args: &[Vec<TokenTree>]) -> String {
    let mut output = String::new();

    for (i, expr_tokens) in args.iter().enumerate() {
        let expr = utils::tokens_to_string(expr_tokens);
        output.push_str(&format!(
            "let __s{i} = ::braid::combinator::Slot::new();\n\
             let __c{i} = __s{i}.bind({expr});\n"
        ));
    }

    let children = (0..args.len())
        .map(|i| format!("__c{i}"))
        .collect::<Vec<_>>()
        .join(", ");

    output.push_str(&format!(
        "let (_, __faults) = ::braid::combinator::until_all_settled(\
             ::std::vec![{children}]\
         ).await;\n"
    ));

    output
}

fn parse_or_error(output: String, name: &str) -> TokenStream {
    output.parse().unwrap_or_else(|err| {
        let msg = format!("{name} macro error: {err}");
        format!("compile_error!({msg:?});").parse().unwrap()
    })
}

/// Runs futures of different types concurrently and waits for all of them.
///
/// Evaluates to a tuple of their outputs. If any of them panicked, the panic
/// of the leftmost one is raised after every future finished.
#[proc_macro]
pub fn until_all(input: TokenStream) -> TokenStream {
    let args = utils::split_args(input);

    if args.is_empty() {
        return "()".parse().unwrap();
    }

    let mut output = String::from("{\n");
    output.push_str(&fan_out(&args));
    output.push_str("::braid::combinator::raise_first(__faults);\n");

    let unwrapped = (0..args.len())
        .map(|i| format!("__s{i}.into_value(),"))
        .collect::<String>();

    output.push_str(&format!("({unwrapped})\n"));
    output.push_str("}\n");

    parse_or_error(output, "until_all")
}

/// Runs futures of different types concurrently and waits for all of them,
/// without raising.
///
/// Evaluates to `((Option<A>, Option<B>, ...), Vec<Option<Fault>>)`.
#[proc_macro]
pub fn until_all_settled(input: TokenStream) -> TokenStream {
    let args = utils::split_args(input);

    if args.is_empty() {
        return "((), ::std::vec::Vec::<::core::option::Option<::braid::Fault>>::new())"
            .parse()
            .unwrap();
    }

    let mut output = String::from("{\n");
    output.push_str(&fan_out(&args));

    let values = (0..args.len())
        .map(|i| format!("__s{i}.take(),"))
        .collect::<String>();

    output.push_str(&format!("(({values}), __faults)\n"));
    output.push_str("}\n");

    parse_or_error(output, "until_all_settled")
}

/// Runs an `async fn main` on a freshly built runtime.
///
/// Accepts an optional `worker_threads = N` argument.
#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut tokens: Vec<TokenTree> = item.into_iter().collect();

    let worker_threads = utils::worker_threads(&attr.to_string());

    let Some(pos) = tokens.iter().rposition(
        |t| matches!(t, TokenTree::Group(g) if g.delimiter() == proc_macro::Delimiter::Brace),
    ) else {
        return TokenStream::new();
    };

    let block = match &tokens[pos] {
        TokenTree::Group(g) => g.stream().to_string(),
        _ => unreachable!(),
    };

    let mut builder = String::from("::braid::RuntimeBuilder::new()");

    if let Some(n) = worker_threads {
        builder.push_str(&format!(".worker_threads({n})"));
    }

    builder.push_str(".build()");

    if let Some(async_pos) = tokens
        .iter()
        .position(|t| matches!(t, TokenTree::Ident(id) if id.to_string() == "async"))
    {
        tokens.remove(async_pos);
    }

    let new_block = format!(
        "{{
            let runtime = {builder};
            runtime
                .block_on(async move {{
                    {block}
                }})
        }}"
    );

    tokens[pos] = TokenTree::Group(proc_macro::Group::new(
        proc_macro::Delimiter::Brace,
        new_block.parse().unwrap(),
    ));

    tokens.into_iter().collect()
}

/// Runs an `async` test body on a freshly built runtime.
///
/// Accepts an optional `worker_threads = N` argument.
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut tokens = item.into_iter().collect::<Vec<_>>();

    let worker_threads = utils::worker_threads(&attr.to_string());

    if let Some(pos) = tokens
        .iter()
        .position(|t| matches!(t, TokenTree::Ident(id) if id.to_string() == "async"))
    {
        tokens.remove(pos);
    }

    let block_pos = tokens.iter().rposition(
        |t| matches!(t, TokenTree::Group(g) if g.delimiter() == proc_macro::Delimiter::Brace),
    );

    let Some(pos) = block_pos else {
        return TokenStream::new();
    };

    let block = match &tokens[pos] {
        TokenTree::Group(g) => g.stream().to_string(),
        _ => unreachable!(),
    };

    let mut builder = String::from("::braid::RuntimeBuilder::new().thread_name(\"braid-test\")");

    if let Some(n) = worker_threads {
        builder.push_str(&format!(".worker_threads({n})"));
    }

    let new_block = format!(
        "{{
        let runtime = {builder}.build();
        runtime
            .block_on(async move {{ {block} }})
    }}"
    );

    tokens[pos] = TokenTree::Group(proc_macro::Group::new(
        proc_macro::Delimiter::Brace,
        new_block.parse().unwrap(),
    ));

    let test_attr: TokenStream = "#[::core::prelude::v1::test]".parse().unwrap();
    let mut result: Vec<TokenTree> = test_attr.into_iter().collect();
    result.extend(tokens);

    result.into_iter().collect()
}
