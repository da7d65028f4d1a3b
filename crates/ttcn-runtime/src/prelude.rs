//! Everything generated code refers to unqualified.

pub use crate::component::{take_snapshot, OpKind, Operation, Subject, TestComponent};
pub use crate::defaults::{try_altsteps, AltstepFn, AltstepValue, DefaultChain, DefaultHandle};
pub use crate::error::{DynamicError, SourceLocation};
pub use crate::status::GuardStatus;
pub use crate::value::{arg, FromValue, Redirect, Template, Value, Verdict};
