//! Generates Rust for the sample modules and the dispatch fixtures.
//!
//! Every module is wrapped in `pub mod <name>` and written to
//! `$OUT_DIR/generated.rs`, which `src/lib.rs` includes.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ttcn_codegen::{generate, CodegenOptions, CodegenTarget};
use ttcn_ir::{check_module, lower_with_source, CheckOptions};

const SOURCES: &[(&str, &str)] = &[
    ("alt_basic", "../../samples/alt_basic.ttcn"),
    ("altstep_defaults", "../../samples/altstep_defaults.ttcn"),
    ("call_response", "../../samples/call_response.ttcn"),
    ("interleave", "../../samples/interleave.ttcn"),
    ("loops", "../../samples/loops.ttcn"),
    ("unreachable_else", "../../samples/unreachable_else.ttcn"),
    ("scenarios", "fixtures/scenarios.ttcn"),
];

fn main() {
    let manifest = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR is set by cargo"));
    let mut out = String::new();
    for (module, path) in SOURCES {
        let path = manifest.join(path);
        println!("cargo:rerun-if-changed={}", path.display());
        out.push_str(&generate_module(module, &path));
        out.push('\n');
    }
    let dest = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo")).join("generated.rs");
    fs::write(&dest, out).unwrap_or_else(|e| panic!("write {}: {e}", dest.display()));
}

fn generate_module(module: &str, path: &Path) -> String {
    let source = fs::read_to_string(path).unwrap_or_else(|e| panic!("read {}: {e}", path.display()));
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| module.to_string());
    let program = ttcn_dsl::parse(&source, &name).unwrap_or_else(|e| panic!("parse {name}: {e}"));
    let mut behaviour =
        lower_with_source(&program, &source, &name).unwrap_or_else(|e| panic!("lower {name}: {e}"));
    let diags = check_module(&mut behaviour, &CheckOptions::default());
    assert!(!diags.has_errors(), "{name} has semantic errors: {diags:?}");
    let options = CodegenOptions::for_source(name.clone(), &source).wrapped_in(module);
    generate(&behaviour, CodegenTarget::Rust, &options).unwrap_or_else(|e| panic!("generate {name}: {e}"))
}
