use std::fmt;

/// Evaluation state of one guard, or the result of an altstep or default chain.
///
/// A precondition moves a guard from `Unchecked` to `Maybe` or `No`. The
/// receiving operation is only attempted while the guard is `Maybe`; it
/// reports `Maybe` when nothing matches in the current snapshot and `No` when
/// it cannot succeed during this dispatch at all. Only altsteps and the
/// default chain report `Repeat` or `Break`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuardStatus {
    Unchecked,
    Maybe,
    No,
    Yes,
    Repeat,
    Break,
}

impl GuardStatus {
    /// Initial slot value for a guard.
    pub fn initial(has_precondition: bool) -> Self {
        if has_precondition {
            GuardStatus::Unchecked
        } else {
            GuardStatus::Maybe
        }
    }

    pub fn from_precondition(holds: bool) -> Self {
        if holds {
            GuardStatus::Maybe
        } else {
            GuardStatus::No
        }
    }
}

impl fmt::Display for GuardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GuardStatus::Unchecked => "UNCHECKED",
            GuardStatus::Maybe => "MAYBE",
            GuardStatus::No => "NO",
            GuardStatus::Yes => "YES",
            GuardStatus::Repeat => "REPEAT",
            GuardStatus::Break => "BREAK",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_slots() {
        assert_eq!(GuardStatus::initial(true), GuardStatus::Unchecked);
        assert_eq!(GuardStatus::initial(false), GuardStatus::Maybe);
        assert_eq!(GuardStatus::from_precondition(false), GuardStatus::No);
    }

    #[test]
    fn display_is_upper_case() {
        assert_eq!(GuardStatus::Maybe.to_string(), "MAYBE");
        assert_eq!(GuardStatus::Repeat.to_string(), "REPEAT");
    }
}
