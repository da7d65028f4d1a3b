use crate::defaults::DefaultChain;
use crate::error::DynamicError;
use crate::status::GuardStatus;
use crate::value::{Redirect, Template, Value, Verdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Receive,
    Trigger,
    Check,
    GetCall,
    GetReply,
    Catch,
    CatchTimeout,
    Timeout,
    Done,
    Killed,
}

/// What a receiving operation is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subject {
    Port(&'static str),
    AnyPort,
    Timer(&'static str),
    AnyTimer,
    Component(&'static str),
    AnyComponent,
    AllComponent,
}

/// Descriptor of one receiving operation, as emitted by the code generator.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub kind: OpKind,
    pub subject: Subject,
    pub signature: Option<Template>,
    pub template: Option<Template>,
    pub from: Option<Value>,
}

impl Operation {
    pub fn new(kind: OpKind, subject: Subject) -> Self {
        Self {
            kind,
            subject,
            signature: None,
            template: None,
            from: None,
        }
    }

    pub fn with_signature(mut self, signature: Template) -> Self {
        self.signature = Some(signature);
        self
    }

    pub fn with_template(mut self, template: Template) -> Self {
        self.template = Some(template);
        self
    }

    pub fn with_from(mut self, from: Value) -> Self {
        self.from = Some(from);
        self
    }
}

/// Services a test component offers to generated behaviour.
///
/// Generated functions take `&mut dyn TestComponent`; the trait stays object
/// safe so that altsteps can be stored as plain function pointers.
pub trait TestComponent {
    /// Take a new view of pending events; blocks until something changes when `blocking`.
    fn snapshot(&mut self, blocking: bool) -> Result<(), DynamicError>;

    /// Attempt a receiving operation against the current snapshot.
    ///
    /// On `Yes` the matched value and sender are written to the redirects.
    fn receive(
        &mut self,
        op: &Operation,
        value: Option<&mut dyn Redirect>,
        sender: Option<&mut dyn Redirect>,
    ) -> Result<GuardStatus, DynamicError>;

    fn send(&mut self, port: &str, value: Value, to: Option<Value>) -> Result<(), DynamicError>;

    /// Issue a procedure call; `timeout` is `None` for calls without a timer.
    fn call(&mut self, port: &str, signature: Value, timeout: Option<f64>) -> Result<(), DynamicError>;

    /// Declare a timer with an optional default duration.
    fn declare_timer(&mut self, timer: &str, duration: Option<f64>);

    fn start_timer(&mut self, timer: &str, duration: Option<f64>) -> Result<(), DynamicError>;

    fn stop_timer(&mut self, timer: &str) -> Result<(), DynamicError>;

    fn log(&mut self, message: String);

    fn set_verdict(&mut self, verdict: Verdict);

    fn verdict(&self) -> Verdict;

    fn defaults(&mut self) -> &mut DefaultChain;
}

/// Commit staged default changes, then take a snapshot.
pub fn take_snapshot(rt: &mut dyn TestComponent, blocking: bool) -> Result<(), DynamicError> {
    rt.defaults().commit();
    rt.snapshot(blocking)
}
