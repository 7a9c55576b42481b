use simian::EvaluationContext;

fn main() {
    let program = vec![
        "let spam = fn() { eggs * 3 };",
        "spam()",
        "let eggs = 20;",
        "spam()",
        "let counter = fn() { let n = 0; fn() { n = n + 1; n } };",
        "let next = counter();",
        "next(); next()",
        "const eggs = 1;",
        "eggs = 2;",
    ];

    let mut context = EvaluationContext::new();
    for source in program {
        match context.evaluate_str(source) {
            Ok(Some(value)) => println!("{}: {}", source, value),
            Ok(None) => println!("{}", source),
            Err(err) => println!("{}: {}", source, err),
        }
    }
}
