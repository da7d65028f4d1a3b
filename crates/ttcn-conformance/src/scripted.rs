//! A test component that replays a fixed script of message arrivals.

use std::collections::VecDeque;

use indexmap::IndexMap;
use ttcn_runtime::prelude::*;

/// Message without fields, as generated for a bare identifier template.
pub fn msg(name: &str) -> Value {
    Value::message(name, vec![])
}

/// Deterministic [`TestComponent`] for running generated behaviour.
///
/// Messages added with [`ScriptedComponent::queue`] are visible from the
/// first snapshot on. Each blocking snapshot delivers the next batch added
/// with [`ScriptedComponent::then_arrive`]; a blocking snapshot with no batch
/// left fails, so a run never hangs. Every interaction is recorded as a line
/// in [`ScriptedComponent::events`].
#[derive(Debug, Default)]
pub struct ScriptedComponent {
    ports: IndexMap<String, VecDeque<Value>>,
    arrivals: VecDeque<Vec<(String, Value)>>,
    answers: IndexMap<(OpKind, String), GuardStatus>,
    events: Vec<String>,
    defaults: DefaultChain,
    verdict: Verdict,
}

impl ScriptedComponent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Message already waiting on `port` when the behaviour starts.
    pub fn queue(mut self, port: &str, message: Value) -> Self {
        self.ports.entry(port.to_string()).or_default().push_back(message);
        self
    }

    /// Messages delivered together by the next blocking snapshot.
    pub fn then_arrive(mut self, batch: Vec<(&str, Value)>) -> Self {
        self.arrivals
            .push_back(batch.into_iter().map(|(port, v)| (port.to_string(), v)).collect());
        self
    }

    /// Fixed answer for every `kind` operation on `subject` (a port or timer
    /// name, or `any port`, `any timer`, ...).
    pub fn answer(mut self, kind: OpKind, subject: &str, status: GuardStatus) -> Self {
        self.answers.insert((kind, subject.to_string()), status);
        self
    }

    pub fn events(&self) -> &[String] {
        &self.events
    }

    /// Messages passed to `log`, in order.
    pub fn logs(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| e.strip_prefix("log "))
            .collect()
    }

    /// `blocking` flag of every snapshot taken.
    pub fn snapshots(&self) -> Vec<bool> {
        self.events
            .iter()
            .filter_map(|e| match e.as_str() {
                "snapshot(false)" => Some(false),
                "snapshot(true)" => Some(true),
                _ => None,
            })
            .collect()
    }

    /// Messages still queued on `port`.
    pub fn pending(&self, port: &str) -> usize {
        self.ports.get(port).map_or(0, VecDeque::len)
    }

    fn attempt(&mut self, op: &Operation, value: Option<&mut dyn Redirect>) -> Result<GuardStatus, DynamicError> {
        if let Some(status) = self.answers.get(&(op.kind, subject_name(&op.subject))) {
            return Ok(*status);
        }
        if !matches!(op.kind, OpKind::Receive | OpKind::Trigger | OpKind::Check) {
            return Ok(GuardStatus::Maybe);
        }
        let port = match op.subject {
            Subject::Port(p) => p.to_string(),
            Subject::AnyPort => match self.ports.iter().find(|(_, q)| !q.is_empty()) {
                Some((p, _)) => p.clone(),
                None => return Ok(GuardStatus::Maybe),
            },
            _ => return Ok(GuardStatus::Maybe),
        };
        let Some(queue) = self.ports.get_mut(&port) else {
            return Ok(GuardStatus::Maybe);
        };
        let matched = match (queue.front(), &op.template) {
            (None, _) => return Ok(GuardStatus::Maybe),
            (Some(_), None) => true,
            (Some(head), Some(template)) => template.matches(head),
        };
        if !matched {
            if op.kind == OpKind::Trigger {
                queue.pop_front();
            }
            return Ok(GuardStatus::Maybe);
        }
        let message = match op.kind {
            OpKind::Check => queue.front().cloned(),
            _ => queue.pop_front(),
        }
        .unwrap_or_default();
        if let Some(target) = value {
            target.assign(&message)?;
        }
        Ok(GuardStatus::Yes)
    }
}

impl TestComponent for ScriptedComponent {
    fn snapshot(&mut self, blocking: bool) -> Result<(), DynamicError> {
        self.events.push(format!("snapshot({blocking})"));
        if blocking {
            let batch = self
                .arrivals
                .pop_front()
                .ok_or_else(|| DynamicError::operation("snapshot", "the script has no further arrivals"))?;
            for (port, message) in batch {
                self.ports.entry(port).or_default().push_back(message);
            }
        }
        Ok(())
    }

    fn receive(
        &mut self,
        op: &Operation,
        value: Option<&mut dyn Redirect>,
        _sender: Option<&mut dyn Redirect>,
    ) -> Result<GuardStatus, DynamicError> {
        let status = self.attempt(op, value)?;
        self.events
            .push(format!("{} {} = {status}", op_name(op.kind), subject_name(&op.subject)));
        Ok(status)
    }

    fn send(&mut self, port: &str, value: Value, _to: Option<Value>) -> Result<(), DynamicError> {
        self.events.push(format!("send {port} {value}"));
        Ok(())
    }

    fn call(&mut self, port: &str, signature: Value, _timeout: Option<f64>) -> Result<(), DynamicError> {
        self.events.push(format!("call {port} {signature}"));
        Ok(())
    }

    fn declare_timer(&mut self, _timer: &str, _duration: Option<f64>) {}

    fn start_timer(&mut self, timer: &str, _duration: Option<f64>) -> Result<(), DynamicError> {
        self.events.push(format!("start {timer}"));
        Ok(())
    }

    fn stop_timer(&mut self, timer: &str) -> Result<(), DynamicError> {
        self.events.push(format!("stop {timer}"));
        Ok(())
    }

    fn log(&mut self, message: String) {
        self.events.push(format!("log {message}"));
    }

    fn set_verdict(&mut self, verdict: Verdict) {
        self.verdict = self.verdict.update(verdict);
    }

    fn verdict(&self) -> Verdict {
        self.verdict
    }

    fn defaults(&mut self) -> &mut DefaultChain {
        &mut self.defaults
    }
}

fn op_name(kind: OpKind) -> &'static str {
    match kind {
        OpKind::Receive => "receive",
        OpKind::Trigger => "trigger",
        OpKind::Check => "check",
        OpKind::GetCall => "getcall",
        OpKind::GetReply => "getreply",
        OpKind::Catch => "catch",
        OpKind::CatchTimeout => "catch(timeout)",
        OpKind::Timeout => "timeout",
        OpKind::Done => "done",
        OpKind::Killed => "killed",
    }
}

fn subject_name(subject: &Subject) -> String {
    match subject {
        Subject::Port(name) | Subject::Timer(name) | Subject::Component(name) => name.to_string(),
        Subject::AnyPort => "any port".into(),
        Subject::AnyTimer => "any timer".into(),
        Subject::AnyComponent => "any component".into(),
        Subject::AllComponent => "all component".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receive(rt: &mut ScriptedComponent, port: &'static str, name: &str) -> GuardStatus {
        let op = Operation::new(OpKind::Receive, Subject::Port(port)).with_template(Template::message(name, vec![]));
        rt.receive(&op, None, None).unwrap()
    }

    #[test]
    fn blocking_snapshots_deliver_batches_in_order() {
        let mut rt = ScriptedComponent::new().then_arrive(vec![("pt", msg("A"))]);
        rt.snapshot(false).unwrap();
        assert_eq!(receive(&mut rt, "pt", "A"), GuardStatus::Maybe);
        rt.snapshot(true).unwrap();
        assert_eq!(receive(&mut rt, "pt", "A"), GuardStatus::Yes);
        assert_eq!(rt.pending("pt"), 0);
        assert!(matches!(rt.snapshot(true), Err(DynamicError::Operation { .. })));
        assert_eq!(rt.snapshots(), vec![false, true, true]);
    }

    #[test]
    fn check_leaves_the_message_queued() {
        let mut rt = ScriptedComponent::new().queue("pt", Value::from(7i64));
        let op = Operation::new(OpKind::Check, Subject::AnyPort);
        let mut seen: i64 = 0;
        let status = rt.receive(&op, Some(&mut seen as &mut dyn Redirect), None).unwrap();
        assert_eq!(status, GuardStatus::Yes);
        assert_eq!(seen, 7);
        assert_eq!(rt.pending("pt"), 1);
        assert_eq!(rt.events(), ["check any port = YES"]);
    }

    #[test]
    fn answers_override_the_queues() {
        let mut rt = ScriptedComponent::new()
            .queue("pt", msg("A"))
            .answer(OpKind::Receive, "pt", GuardStatus::No);
        assert_eq!(receive(&mut rt, "pt", "A"), GuardStatus::No);
        assert_eq!(rt.pending("pt"), 1);
    }
}
