//! Generated behaviour of the sample modules, compiled against
//! `ttcn-runtime` and run on a [`scripted::ScriptedComponent`].
//!
//! `build.rs` regenerates the modules from their `.ttcn` sources on every
//! build, so the tests always exercise the current code generator.

pub mod scripted;

include!(concat!(env!("OUT_DIR"), "/generated.rs"));
