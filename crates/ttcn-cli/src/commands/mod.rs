pub(crate) mod check;
pub(crate) mod codegen;
pub(crate) mod helpers;
pub(crate) mod parse;
