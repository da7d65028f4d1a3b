//! Runtime support for code generated from TTCN-3 alternative statements.
//!
//! Generated behaviour is written against [`TestComponent`]; the
//! [`dispatch`] module holds an executable model of the same dispatch rules.

pub mod component;
pub mod defaults;
pub mod dispatch;
pub mod error;
pub mod prelude;
pub mod status;
pub mod value;

pub use component::{take_snapshot, OpKind, Operation, Subject, TestComponent};
pub use defaults::{try_altsteps, AltstepValue, DefaultChain, DefaultHandle};
pub use error::{DynamicError, SourceLocation};
pub use status::GuardStatus;
pub use value::{Template, Value, Verdict};
