#![no_main]

use libfuzzer_sys::fuzz_target;

// Anything that parses cleanly must render to source that parses back into
// the same tree
fuzz_target!(|source: &str| {
    let (program, errors) = simian::parse(source);
    if !errors.is_empty() {
        return;
    }

    let rendered = program.to_string();
    let (reparsed, errors) = simian::parse(&rendered);
    assert!(errors.is_empty(), "rendering {:?} of {:?} failed to parse: {:?}", rendered, source, errors);
    assert_eq!(program, reparsed, "rendering {:?} of {:?} changed the tree", rendered, source);
});
