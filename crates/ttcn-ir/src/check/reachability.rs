use super::{report, CheckOptions};
use crate::diagnostics::Diagnostics;
use crate::model::*;

pub(super) fn check(
    module: &BehaviorModule,
    id: GuardListId,
    options: &CheckOptions,
    diags: &mut Diagnostics,
) {
    let list = module.guard_list(id);

    if list.is_empty() {
        let message = format!("{} has no alternatives", list.origin.describe());
        match list.mode {
            GuardListMode::AltstepBody => {
                report(diags, options.empty_altstep, "ttcn::check::empty_altstep", message, list.span)
            }
            _ => diags.error("ttcn::check::empty", message, list.span),
        }
        return;
    }

    if let Some(else_at) = list.else_index() {
        for guard in &list.guards()[else_at + 1..] {
            report(
                diags,
                options.unreachable_after_else,
                "ttcn::check::unreachable_after_else",
                "alternative after an [else] branch is never evaluated".to_string(),
                guard.span,
            );
        }
    }

    for guard in list.reachable() {
        if guard.node.precondition().and_then(|p| p.const_bool()) == Some(false) {
            report(
                diags,
                options.constant_false_precondition,
                "ttcn::check::constant_false_guard",
                "precondition is always false; the alternative is never selected".to_string(),
                guard.span,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::check::{check_module, CheckOptions, SeverityLevel};
    use crate::lowering::lower;
    use crate::model::BehaviorModule;

    fn lowered(src: &str) -> BehaviorModule {
        lower(&ttcn_dsl::parse(src, "t.ttcn").expect("parse")).expect("lower")
    }

    #[test]
    fn guard_after_else_is_reported_with_its_span() {
        let src = r#"
module M {
    function f() {
        alt {
            [] p.receive(A) {}
            [else] {}
            [] p.receive(B) {}
        }
    }
}
"#;
        let mut m = lowered(src);
        let diags = check_module(&mut m, &CheckOptions::default());
        let found = diags.with_code("ttcn::check::unreachable_after_else");
        assert_eq!(found.len(), 1);
        assert!(!diags.has_errors());
        let text = &src[found[0].span.start..found[0].span.end];
        assert!(text.starts_with("[] p.receive(B)"), "span covers {text:?}");
    }

    #[test]
    fn after_else_severity_is_configurable() {
        let src = "module M { function f() { alt { [else] {} [else] {} } } }";
        let mut m = lowered(src);
        let options = CheckOptions {
            unreachable_after_else: SeverityLevel::Error,
            ..CheckOptions::default()
        };
        let diags = check_module(&mut m, &options);
        assert_eq!(diags.error_count(), 1);

        let mut m = lowered(src);
        let options = CheckOptions {
            unreachable_after_else: SeverityLevel::Ignore,
            ..CheckOptions::default()
        };
        assert!(check_module(&mut m, &options).is_empty());
    }

    #[test]
    fn empty_alt_is_an_error() {
        let mut m = lowered("module M { function f() { alt {} } }");
        let diags = check_module(&mut m, &CheckOptions::default());
        let found = diags.with_code("ttcn::check::empty");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].message, "alt statement has no alternatives");
    }

    #[test]
    fn empty_altstep_defaults_to_warning() {
        let mut m = lowered("module M { altstep as_nothing() { } }");
        let diags = check_module(&mut m, &CheckOptions::default());
        assert!(!diags.has_errors());
        assert_eq!(diags.with_code("ttcn::check::empty_altstep").len(), 1);
    }

    #[test]
    fn constant_false_precondition_warns() {
        let mut m = lowered(
            "module M { function f() { alt { [false] p.receive {} [not true and x] q.receive {} [true] r.receive {} } } }",
        );
        let diags = check_module(&mut m, &CheckOptions::default());
        assert_eq!(diags.with_code("ttcn::check::constant_false_guard").len(), 2);
    }
}
