#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(program) = ttcn_dsl::parse(s, "fuzz.ttcn") {
            if let Ok(mut module) = ttcn_ir::lower(&program) {
                let _ = ttcn_ir::check_module(&mut module, &ttcn_ir::CheckOptions::default());
            }
        }
    }
});
