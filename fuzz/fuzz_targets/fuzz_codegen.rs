#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(program) = ttcn_dsl::parse(s, "fuzz.ttcn") else {
        return;
    };
    let Ok(mut module) = ttcn_ir::lower(&program) else {
        return;
    };
    let diags = ttcn_ir::check_module(&mut module, &ttcn_ir::CheckOptions::default());
    if diags.has_errors() {
        return;
    }
    // A module that checks clean always generates.
    let options = ttcn_codegen::CodegenOptions::for_source("fuzz.ttcn", s);
    ttcn_codegen::generate(&module, ttcn_codegen::CodegenTarget::Rust, &options)
        .expect("clean module failed to generate");
});
