use indexmap::IndexMap;

/// Generator of unique identifiers, one counter per prefix.
///
/// Labels of guard lists and loops are drawn at lowering time. Code
/// generation derives its slot, state and hoisted-local names from them.
#[derive(Debug, Clone, Default)]
pub struct FreshNames {
    counters: IndexMap<String, usize>,
}

impl FreshNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next name for `prefix`: `prefix_0`, `prefix_1`, ...
    pub fn fresh(&mut self, prefix: &str) -> String {
        let counter = self.counters.entry(prefix.to_string()).or_insert(0);
        let name = format!("{prefix}_{counter}");
        *counter += 1;
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_per_prefix() {
        let mut names = FreshNames::new();
        assert_eq!(names.fresh("alt"), "alt_0");
        assert_eq!(names.fresh("alt"), "alt_1");
        assert_eq!(names.fresh("call"), "call_0");
        assert_eq!(names.fresh("while"), "while_0");
    }
}
