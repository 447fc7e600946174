#![no_main]

use libfuzzer_sys::fuzz_target;

// Any text must either parse or fail with an error, never panic
fuzz_target!(|source: &str| {
    let context = calc::EvaluationContext::new();
    let _ = context.parse(source);

    let mut stream = calc::TokenStream::new(source);
    while !stream.is_exhausted() {
        let _ = calc::Parser::new(&mut stream, context.functions()).statement();
        stream.skip_statement();
    }
});
