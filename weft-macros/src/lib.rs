mod utils;

use proc_macro::{TokenStream, TokenTree};

/// Runs several futures as sibling tasks and waits for all of them.
///
/// Must be used inside a task. Evaluates to
/// `Result<(T1, T2, ...), weft::KernelError>` with the values in argument
/// order. The first failure observed is returned and the siblings still
/// running are removed.
#[proc_macro]
pub fn await_all(input: TokenStream) -> TokenStream {
    let args = utils::split_args(input);
    let count = args.len();

    if count == 0 {
        return "::core::result::Result::Ok::<(), ::weft::KernelError>(())"
            .parse()
            .unwrap();
    }

    if count == 1 {
        let expr = utils::tokens_to_string(&args[0]);
        return format!("{{ ::weft::task::await_one({expr}).await }}")
            .parse()
            .unwrap();
    }

    let mut output = String::new();
    output.push_str("{\nasync {\n");

    for (i, expr_tokens) in args.iter().enumerate() {
        let idx = i + 1;
        let expr = utils::tokens_to_string(expr_tokens);
        output.push_str(&format!(
            "let __h{idx} = ::weft::task::spawn({expr})?;\n"
        ));
    }

    let handles = (1..=count)
        .map(|i| format!("::core::clone::Clone::clone(__h{i}.task())"))
        .collect::<Vec<_>>()
        .join(", ");

    output.push_str(&format!(
        "let __guard = ::weft::task::AbortGuard::new(::std::vec![{handles}]);\n"
    ));

    for i in 1..=count {
        output.push_str(&format!(
            "let mut __v{i} = ::core::option::Option::None;\n"
        ));
    }

    // Every handle is checked on each turn so that a failure anywhere
    // returns early and the guard removes the rest.
    output.push_str("loop {\n");

    for i in 1..=count {
        output.push_str(&format!(
            "if __v{i}.is_none() {{ __v{i} = __h{i}.try_join().transpose()?; }}\n"
        ));
    }

    let done = (1..=count)
        .map(|i| format!("__v{i}.is_some()"))
        .collect::<Vec<_>>()
        .join(" && ");

    output.push_str(&format!("if {done} {{ break; }}\n"));
    output.push_str("::weft::task::stall()?.await;\n}\n");
    output.push_str("::core::mem::drop(__guard);\n");

    let slots = (1..=count)
        .map(|i| format!("__v{i}"))
        .collect::<Vec<_>>()
        .join(", ");

    let values = (1..=count)
        .map(|i| format!("::core::option::Option::Some(__v{i})"))
        .collect::<Vec<_>>()
        .join(", ");

    output.push_str(&format!(
        "match ({slots},) {{\n\
         ({values},) => ::core::result::Result::Ok::<_, ::weft::KernelError>(({slots},)),\n\
         _ => ::core::result::Result::Err(::weft::KernelError::Deadlock),\n\
         }}\n"
    ));
    output.push_str("}.await\n}\n");

    match output.parse::<TokenStream>() {
        Ok(ts) => ts,
        Err(err) => {
            let msg = format!("await_all macro error: {}", err);
            format!("compile_error!(\"{}\");", msg).parse().unwrap()
        }
    }
}

/// Turns `async fn main` into a synchronous entry point driven by a kernel.
///
/// The body runs as the kernel's first task; `?` may be used on any error
/// convertible into `anyhow::Error`. Accepts `name = "..."` to label the
/// kernel.
#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut tokens: Vec<TokenTree> = item.into_iter().collect();

    let name = utils::string_arg(&attr, "name").unwrap_or_else(|| String::from("main"));

    utils::strip_async(&mut tokens);

    let Some(pos) = utils::body_position(&tokens) else {
        return TokenStream::new();
    };

    let block = match &tokens[pos] {
        TokenTree::Group(g) => g.stream().to_string(),
        _ => unreachable!(),
    };

    let new_block = format!(
        "{{
            let kernel = ::weft::Kernel::builder().name({name:?}).build();
            let result = kernel.block_on(async move {{
                {{ {block} }};
                ::core::result::Result::Ok::<(), ::weft::__private::anyhow::Error>(())
            }});

            if let ::core::result::Result::Err(err) = result {{
                panic!(\"kernel error: {{err}}\");
            }}
        }}"
    );

    tokens[pos] = TokenTree::Group(proc_macro::Group::new(
        proc_macro::Delimiter::Brace,
        new_block.parse().unwrap(),
    ));

    tokens.into_iter().collect()
}

/// Runs an `async` test body as a task on a fresh kernel.
///
/// The test fails if the body returns an error or if any task fails
/// without a handler.
#[proc_macro_attribute]
pub fn test(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut tokens = item.into_iter().collect::<Vec<_>>();

    utils::strip_async(&mut tokens);

    let Some(pos) = utils::body_position(&tokens) else {
        return TokenStream::new();
    };

    let block = match &tokens[pos] {
        TokenTree::Group(g) => g.stream().to_string(),
        _ => unreachable!(),
    };

    let new_block = format!(
        "{{
        let kernel = ::weft::Kernel::builder().name(\"test\").build();
        let result = kernel.block_on(async move {{
            {{ {} }};
            ::core::result::Result::Ok::<(), ::weft::__private::anyhow::Error>(())
        }});

        if let ::core::result::Result::Err(err) = result {{
            panic!(\"kernel error: {{err}}\");
        }}
    }}",
        block
    );

    tokens[pos] = TokenTree::Group(proc_macro::Group::new(
        proc_macro::Delimiter::Brace,
        new_block.parse().unwrap(),
    ));

    let test_attr: TokenStream = "#[test]".parse().unwrap();
    let mut result: Vec<TokenTree> = test_attr.into_iter().collect();
    result.extend(tokens);

    result.into_iter().collect()
}
