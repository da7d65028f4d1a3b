use std::fmt;

use crate::error::DynamicError;

/// Test verdict; updates only ever make it worse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Verdict {
    #[default]
    None,
    Pass,
    Inconc,
    Fail,
    Error,
}

impl Verdict {
    /// `setverdict` overwriting rule.
    pub fn update(self, new: Verdict) -> Verdict {
        self.max(new)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::None => "none",
            Verdict::Pass => "pass",
            Verdict::Inconc => "inconc",
            Verdict::Fail => "fail",
            Verdict::Error => "error",
        };
        f.write_str(s)
    }
}

/// Dynamically typed value exchanged with ports and timers.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Omit,
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Charstring(String),
    Verdict(Verdict),
    /// Constructed message or signature: `Name(field, ...)`.
    Message { name: String, fields: Vec<Value> },
}

impl Value {
    pub fn message(name: impl Into<String>, fields: Vec<Value>) -> Self {
        Value::Message {
            name: name.into(),
            fields,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Omit => "omit",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Boolean(_) => "boolean",
            Value::Charstring(_) => "charstring",
            Value::Verdict(_) => "verdicttype",
            Value::Message { .. } => "message",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Omit => f.write_str("omit"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Charstring(s) => write!(f, "\"{s}\""),
            Value::Verdict(v) => write!(f, "{v}"),
            Value::Message { name, fields } => {
                write!(f, "{name}(")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{field}")?;
                }
                f.write_str(")")
            }
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Charstring(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Charstring(v.to_string())
    }
}

impl From<Verdict> for Value {
    fn from(v: Verdict) -> Self {
        Value::Verdict(v)
    }
}

/// Matching template used by receiving operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Template {
    /// `?`: any present value.
    Any,
    /// `*`: any value or omit.
    AnyOrOmit,
    Value(Value),
    Message { name: String, fields: Vec<Template> },
}

impl Template {
    pub fn message(name: impl Into<String>, fields: Vec<Template>) -> Self {
        Template::Message {
            name: name.into(),
            fields,
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Template::AnyOrOmit, _) => true,
            (Template::Any, Value::Omit) => false,
            (Template::Any, _) => true,
            (Template::Value(expected), actual) => expected == actual,
            (
                Template::Message { name, fields },
                Value::Message {
                    name: actual_name,
                    fields: actual_fields,
                },
            ) => {
                name == actual_name
                    && fields.len() == actual_fields.len()
                    && fields.iter().zip(actual_fields).all(|(t, v)| t.matches(v))
            }
            (Template::Message { .. }, _) => false,
        }
    }
}

macro_rules! template_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Template {
                fn from(v: $ty) -> Self {
                    Template::Value(Value::from(v))
                }
            }
        )*
    };
}

template_from!(i64, f64, bool, String, &str, Verdict);

impl From<Value> for Template {
    fn from(v: Value) -> Self {
        Template::Value(v)
    }
}

/// Conversion out of a received [`Value`].
pub trait FromValue: Sized {
    const TYPE_NAME: &'static str;

    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for i64 {
    const TYPE_NAME: &'static str = "integer";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    const TYPE_NAME: &'static str = "float";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }
}

impl FromValue for bool {
    const TYPE_NAME: &'static str = "boolean";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromValue for String {
    const TYPE_NAME: &'static str = "charstring";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Charstring(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromValue for Verdict {
    const TYPE_NAME: &'static str = "verdicttype";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Verdict(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromValue for Value {
    const TYPE_NAME: &'static str = "value";

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

/// Destination of a `-> value` or `-> sender` redirect.
pub trait Redirect {
    fn assign(&mut self, value: &Value) -> Result<(), DynamicError>;
}

impl<T: FromValue> Redirect for T {
    fn assign(&mut self, value: &Value) -> Result<(), DynamicError> {
        *self = T::from_value(value).ok_or_else(|| DynamicError::RedirectType {
            expected: T::TYPE_NAME,
            found: value.type_name().to_string(),
        })?;
        Ok(())
    }
}

/// Positional argument of a `*_dyn` altstep adapter; missing arguments take the type's default.
pub fn arg<T: FromValue + Default>(args: &[Value], index: usize) -> Result<T, DynamicError> {
    match args.get(index) {
        None => Ok(T::default()),
        Some(v) => T::from_value(v).ok_or_else(|| DynamicError::RedirectType {
            expected: T::TYPE_NAME,
            found: v.type_name().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_only_gets_worse() {
        let v = Verdict::Pass.update(Verdict::Fail).update(Verdict::Pass);
        assert_eq!(v, Verdict::Fail);
        assert_eq!(Verdict::None.update(Verdict::Inconc), Verdict::Inconc);
    }

    #[test]
    fn templates_match_structurally() {
        let msg = Value::message("Response", vec![Value::from(1i64), Value::from("ok")]);
        assert!(Template::Any.matches(&msg));
        assert!(!Template::Any.matches(&Value::Omit));
        assert!(Template::AnyOrOmit.matches(&Value::Omit));
        assert!(Template::message("Response", vec![Template::from(1i64), Template::Any]).matches(&msg));
        assert!(!Template::message("Response", vec![Template::from(2i64), Template::Any]).matches(&msg));
        assert!(!Template::message("Response", vec![Template::Any]).matches(&msg));
        assert!(!Template::message("Other", vec![]).matches(&Value::from(3i64)));
    }

    #[test]
    fn redirect_checks_types() {
        let mut n: i64 = 0;
        (&mut n as &mut dyn Redirect).assign(&Value::from(7i64)).unwrap();
        assert_eq!(n, 7);
        let err = (&mut n as &mut dyn Redirect)
            .assign(&Value::from("text"))
            .unwrap_err();
        assert_eq!(err.to_string(), "Cannot assign a charstring value to a variable of type integer");

        let mut any = Value::Omit;
        any.assign(&Value::message("M", vec![])).unwrap();
        assert_eq!(any, Value::message("M", vec![]));
    }

    #[test]
    fn arg_defaults_missing_values() {
        let args = vec![Value::from(4i64)];
        assert_eq!(arg::<i64>(&args, 0).unwrap(), 4);
        assert_eq!(arg::<i64>(&args, 1).unwrap(), 0);
        assert!(arg::<bool>(&args, 0).is_err());
    }

    #[test]
    fn display_values() {
        let msg = Value::message("Req", vec![Value::from(1i64), Value::from(2.5)]);
        assert_eq!(msg.to_string(), "Req(1, 2.5)");
    }
}
