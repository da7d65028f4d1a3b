use std::fmt;

use tracing::{debug, trace};

use crate::component::TestComponent;
use crate::error::DynamicError;
use crate::status::GuardStatus;
use crate::value::Value;

/// Signature of the `*_dyn` adapter generated for every altstep.
pub type AltstepFn = fn(&mut dyn TestComponent, &[Value]) -> Result<GuardStatus, DynamicError>;

/// First-class altstep reference (`var altstep v := refers(as_x)`).
///
/// The default value is `null`; invoking it is a dynamic error.
#[derive(Clone, Copy, Default)]
pub struct AltstepValue {
    target: Option<(&'static str, AltstepFn)>,
}

impl AltstepValue {
    pub fn new(name: &'static str, func: AltstepFn) -> Self {
        Self {
            target: Some((name, func)),
        }
    }

    pub fn null() -> Self {
        Self::default()
    }

    pub fn is_null(&self) -> bool {
        self.target.is_none()
    }

    pub fn name(&self) -> Option<&'static str> {
        self.target.map(|(name, _)| name)
    }

    /// Run one dispatch pass of the referenced altstep.
    pub fn invoke(&self, rt: &mut dyn TestComponent, args: &[Value]) -> Result<GuardStatus, DynamicError> {
        match self.target {
            Some((name, func)) => {
                trace!(altstep = name, "invoking altstep value");
                func(rt, args)
            }
            None => Err(DynamicError::InvalidAltstepValue {
                reason: "the altstep reference is null".to_string(),
            }),
        }
    }
}

impl fmt::Debug for AltstepValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "AltstepValue({name})"),
            None => f.write_str("AltstepValue(null)"),
        }
    }
}

impl PartialEq for AltstepValue {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

/// Handle of an activated default (`var default d := activate(...)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DefaultHandle(u64);

impl DefaultHandle {
    pub const NULL: DefaultHandle = DefaultHandle(0);

    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }
}

#[derive(Debug, Clone)]
struct DefaultEntry {
    handle: DefaultHandle,
    altstep: AltstepValue,
    args: Vec<Value>,
}

#[derive(Debug, Clone)]
enum StagedChange {
    Activate(DefaultEntry),
    Deactivate(DefaultHandle),
    DeactivateAll,
}

/// The activation list of default altsteps of a test component.
///
/// Activations and deactivations are staged and take effect at the next
/// snapshot ([`DefaultChain::commit`]), so a guard body never changes the
/// fallback behaviour of the pass it runs in.
#[derive(Debug, Clone, Default)]
pub struct DefaultChain {
    active: Vec<DefaultEntry>,
    staged: Vec<StagedChange>,
    next_handle: u64,
}

impl DefaultChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activate(&mut self, altstep: AltstepValue, args: Vec<Value>) -> Result<DefaultHandle, DynamicError> {
        if altstep.is_null() {
            return Err(DynamicError::InvalidAltstepValue {
                reason: "cannot activate a null altstep reference".to_string(),
            });
        }
        self.next_handle += 1;
        let handle = DefaultHandle(self.next_handle);
        debug!(altstep = ?altstep.name(), handle = handle.0, "default activation staged");
        self.staged.push(StagedChange::Activate(DefaultEntry {
            handle,
            altstep,
            args,
        }));
        Ok(handle)
    }

    /// Deactivating a null or already inactive handle has no effect.
    pub fn deactivate(&mut self, handle: DefaultHandle) {
        if !handle.is_null() {
            self.staged.push(StagedChange::Deactivate(handle));
        }
    }

    pub fn deactivate_all(&mut self) {
        self.staged.push(StagedChange::DeactivateAll);
    }

    /// Apply staged changes; called when a snapshot is taken.
    pub fn commit(&mut self) {
        for change in self.staged.drain(..) {
            match change {
                StagedChange::Activate(entry) => self.active.push(entry),
                StagedChange::Deactivate(handle) => self.active.retain(|e| e.handle != handle),
                StagedChange::DeactivateAll => self.active.clear(),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn has_staged(&self) -> bool {
        !self.staged.is_empty()
    }

    /// Active defaults, most recently activated first.
    pub fn active_altsteps(&self) -> Vec<(AltstepValue, Vec<Value>)> {
        self.active
            .iter()
            .rev()
            .map(|e| (e.altstep, e.args.clone()))
            .collect()
    }
}

/// Attempt every active default once, most recently activated first.
///
/// Returns the first `Yes`, `Repeat` or `Break`; otherwise `Maybe` if some
/// default is still pending and `No` when all of them (or none exist) are `No`.
pub fn try_altsteps(rt: &mut dyn TestComponent) -> Result<GuardStatus, DynamicError> {
    let defaults = rt.defaults().active_altsteps();
    let mut pending = false;
    for (altstep, args) in defaults {
        let status = altstep.invoke(rt, &args)?;
        trace!(altstep = ?altstep.name(), %status, "default attempted");
        match status {
            GuardStatus::Yes | GuardStatus::Repeat | GuardStatus::Break => return Ok(status),
            GuardStatus::Maybe | GuardStatus::Unchecked => pending = true,
            GuardStatus::No => {}
        }
    }
    Ok(if pending {
        GuardStatus::Maybe
    } else {
        GuardStatus::No
    })
}
