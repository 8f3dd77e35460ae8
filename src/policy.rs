//! Regeneration policy engine
//!
//! Decides what happens to a target file given its current state and the
//! template's declared [`UpdateBehavior`]:
//!
//! | file    | behavior  | decision          |
//! |---------|-----------|-------------------|
//! | absent  | any       | write candidate   |
//! | present | skip      | no-op             |
//! | present | overwrite | write candidate   |
//! | present | append    | anchored merge    |
//!
//! Merges are line-oriented. Anchors are located in the file as it was
//! read, so content inserted by one entity never moves the anchor another
//! entity resolves against. A missing anchor fails the artifact and leaves
//! the file untouched.

use crate::error::{PolicyError, Result};
use crate::templates::{
    AppendRule, InsertLocation, Renderer, ScopeData, TemplateSpec, UpdateBehavior,
};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// First Go-style grouped import block, matched through its opening line
static IMPORT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^import\s*\([ \t]*\r?\n").expect("import block pattern is valid")
});

/// Outcome of applying a policy to one target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Write this content (new file, or overwrite)
    Write(String),
    /// Leave the file as it is
    NoOp,
    /// Write the merged content back
    Merge(String),
}

impl Decision {
    pub fn content(&self) -> Option<&str> {
        match self {
            Decision::Write(c) | Decision::Merge(c) => Some(c),
            Decision::NoOp => None,
        }
    }
}

/// Apply `behavior` to a target whose current content is `existing`.
///
/// `entities` is the render data the append rule iterates over; it is
/// ignored by the other behaviors.
pub fn decide(
    behavior: &UpdateBehavior,
    existing: Option<&str>,
    candidate: String,
    renderer: &Renderer,
    template: &TemplateSpec,
    entities: &[ScopeData<'_>],
) -> Result<Decision> {
    let Some(existing) = existing else {
        return Ok(Decision::Write(candidate));
    };
    match behavior {
        UpdateBehavior::Skip => Ok(Decision::NoOp),
        UpdateBehavior::Overwrite => Ok(Decision::Write(candidate)),
        UpdateBehavior::Append(rule) => {
            let merged = merge(existing, rule, template, renderer, entities)?;
            if merged == existing {
                Ok(Decision::NoOp)
            } else {
                Ok(Decision::Merge(merged))
            }
        }
    }
}

/// Pending insertion at a byte offset of the original file
struct Insertion {
    at: usize,
    text: String,
}

/// Merge appended content and imports into `existing`.
///
/// Content already present as a run of whole lines (compared trimmed) is
/// not added again, which keeps a rerun over an already-merged file a no-op.
pub fn merge(
    existing: &str,
    rule: &AppendRule,
    template: &TemplateSpec,
    renderer: &Renderer,
    entities: &[ScopeData<'_>],
) -> Result<String> {
    let mut insertions = Vec::new();
    let mut seen = HashSet::new();

    for data in entities {
        let anchor = renderer.render_str(
            &format!("{} (insert_key)", template.key),
            &template.delimiters,
            &rule.insert_key,
            data,
        )?;
        let at = anchor_line(existing, &anchor, rule.location)?;

        let content = renderer.render_str(
            &format!("{} (append_tpl)", template.key),
            &template.delimiters,
            &rule.append_tpl,
            data,
        )?;
        let trimmed = content.trim();
        if trimmed.is_empty()
            || contains_lines(existing, trimmed)
            || !seen.insert(trimmed.to_string())
        {
            continue;
        }
        insertions.push(Insertion {
            at,
            text: as_lines(&content),
        });
    }

    if !rule.import_tpls.is_empty() {
        insertions.extend(imports(existing, rule, template, renderer, entities)?);
    }

    Ok(splice(existing, insertions))
}

fn imports(
    existing: &str,
    rule: &AppendRule,
    template: &TemplateSpec,
    renderer: &Renderer,
    entities: &[ScopeData<'_>],
) -> Result<Option<Insertion>> {
    let present: HashSet<&str> = existing.lines().map(str::trim).collect();
    let mut lines = Vec::new();

    for data in entities {
        for (i, tpl) in rule.import_tpls.iter().enumerate() {
            let import = renderer.render_str(
                &format!("{} (import_tpl[{}])", template.key, i),
                &template.delimiters,
                tpl,
                data,
            )?;
            let trimmed = import.trim();
            if trimmed.is_empty()
                || present.contains(trimmed)
                || lines.iter().any(|l: &String| l.trim() == trimmed)
            {
                continue;
            }
            lines.push(import.trim_end().to_string());
        }
    }
    let Some(first) = entities.first() else {
        return Ok(None);
    };
    if lines.is_empty() {
        return Ok(None);
    }

    let at = match &rule.import_key {
        Some(key) => {
            let anchor = renderer.render_str(
                &format!("{} (import_key)", template.key),
                &template.delimiters,
                key,
                first,
            )?;
            anchor_line(existing, &anchor, InsertLocation::After)?
        }
        None => IMPORT_BLOCK
            .find(existing)
            .map(|m| m.end())
            .ok_or(PolicyError::ImportBlockNotFound)?,
    };

    // Lines going into a grouped block get Go's indentation
    let indent = rule.import_key.is_none();
    let mut text = String::new();
    for line in lines {
        if indent && !line.starts_with([' ', '\t']) {
            text.push('\t');
        }
        text.push_str(&line);
        text.push('\n');
    }
    Ok(Some(Insertion {
        at,
        text: as_lines(&text),
    }))
}

/// Offset of the line holding the first occurrence of `anchor`: its start
/// for `Before`, just past its line break for `After`
fn anchor_line(existing: &str, anchor: &str, location: InsertLocation) -> Result<usize> {
    let anchor = anchor.trim();
    let found = if anchor.is_empty() {
        None
    } else {
        existing.find(anchor)
    };
    let Some(pos) = found else {
        return Err(PolicyError::AnchorNotFound {
            anchor: anchor.to_string(),
        }
        .into());
    };
    Ok(match location {
        InsertLocation::Before => existing[..pos].rfind('\n').map_or(0, |i| i + 1),
        InsertLocation::After => existing[pos..]
            .find('\n')
            .map_or(existing.len(), |i| pos + i + 1),
    })
}

/// Whether the lines of `content` occur as consecutive lines of
/// `existing`, both sides compared trimmed
fn contains_lines(existing: &str, content: &str) -> bool {
    let needle: Vec<&str> = content.lines().map(str::trim).collect();
    let haystack: Vec<&str> = existing.lines().map(str::trim).collect();
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle.as_slice())
}

/// Normalize inserted text to whole lines
fn as_lines(content: &str) -> String {
    let mut text = content.trim_matches('\n').to_string();
    text.push('\n');
    text
}

/// Apply insertions; ties keep their declaration order
fn splice(existing: &str, mut insertions: Vec<Insertion>) -> String {
    insertions.sort_by_key(|i| i.at);

    let mut out = String::with_capacity(
        existing.len() + 1 + insertions.iter().map(|i| i.text.len()).sum::<usize>(),
    );
    // An unterminated last line is closed once, before the first insertion at EOF
    let mut open_tail = !existing.is_empty() && !existing.ends_with('\n');
    let mut cursor = 0;
    for insertion in insertions {
        out.push_str(&existing[cursor..insertion.at]);
        if open_tail && insertion.at == existing.len() {
            out.push('\n');
            open_tail = false;
        }
        out.push_str(&insertion.text);
        cursor = insertion.at;
    }
    out.push_str(&existing[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::templates::{EntityKind, ProjectView, Scope};
    use crate::{GenerationConfig, GenerationContext, ServiceDefinitionModel};
    use pretty_assertions::assert_eq;

    const ROUTER: &str = "package router\n\nimport (\n\t\"github.com/cloudwego/hertz/pkg/app/server\"\n)\n\nfunc Register(r *server.Hertz) {\n\t// layergen:routes\n}\n";

    fn project() -> ProjectView {
        let sdm = ServiceDefinitionModel::from_yaml(
            r#"
package: github.com/acme/greeter/biz/model
services:
  - name: Greeter
    methods:
      - { name: SayHello, request_type: HelloReq, response_type: HelloResp }
      - { name: SayBye, request_type: ByeReq, response_type: ByeResp }
  - name: Echo
    methods:
      - { name: Ping, request_type: PingReq, response_type: PingResp }
"#,
        )
        .unwrap();
        let ctx = GenerationContext::resolve(&GenerationConfig::default(), &sdm, true).unwrap();
        ProjectView::build(&sdm, &ctx)
    }

    fn rule(location: InsertLocation) -> AppendRule {
        AppendRule {
            entity: EntityKind::Method,
            insert_key: "// layergen:routes".into(),
            append_tpl: "\tr.{{ method.verb }}(\"{{ method.path }}\", handler.{{ method.name }})".into(),
            import_tpls: Vec::new(),
            import_key: None,
            location,
        }
    }

    fn template(rule: AppendRule) -> TemplateSpec {
        TemplateSpec::new("router.go", "unused").with_update(UpdateBehavior::Append(rule))
    }

    fn run(existing: &str, rule: AppendRule, scope: Scope) -> Result<Decision> {
        let view = project();
        let entities = view.entities(scope, rule.entity);
        let spec = template(rule);
        decide(
            &spec.update,
            Some(existing),
            "candidate".into(),
            &Renderer::new(),
            &spec,
            &entities,
        )
    }

    #[test]
    fn test_absent_file_always_written() {
        let spec = TemplateSpec::new("a.go", "x");
        for behavior in [UpdateBehavior::Skip, UpdateBehavior::Overwrite] {
            let decision =
                decide(&behavior, None, "new".into(), &Renderer::new(), &spec, &[]).unwrap();
            assert_eq!(decision, Decision::Write("new".into()));
        }
    }

    #[test]
    fn test_skip_and_overwrite() {
        let spec = TemplateSpec::new("a.go", "x");
        let r = Renderer::new();
        assert_eq!(
            decide(&UpdateBehavior::Skip, Some("old"), "new".into(), &r, &spec, &[]).unwrap(),
            Decision::NoOp
        );
        assert_eq!(
            decide(&UpdateBehavior::Overwrite, Some("old"), "new".into(), &r, &spec, &[]).unwrap(),
            Decision::Write("new".into())
        );
    }

    #[test]
    fn test_append_after_keeps_declaration_order() {
        let decision = run(ROUTER, rule(InsertLocation::After), Scope::Service(0)).unwrap();
        let Decision::Merge(merged) = decision else {
            panic!("expected merge, got {:?}", decision);
        };
        assert!(merged.contains(
            "\t// layergen:routes\n\tr.POST(\"/Greeter/SayHello\", handler.SayHello)\n\tr.POST(\"/Greeter/SayBye\", handler.SayBye)\n}\n"
        ));
        assert!(!merged.contains("Ping"));
    }

    #[test]
    fn test_append_before_anchor() {
        let decision = run(ROUTER, rule(InsertLocation::Before), Scope::Run).unwrap();
        let merged = decision.content().unwrap();
        assert!(merged.contains(
            "{\n\tr.POST(\"/Greeter/SayHello\", handler.SayHello)\n\tr.POST(\"/Greeter/SayBye\", handler.SayBye)\n\tr.POST(\"/Echo/Ping\", handler.Ping)\n\t// layergen:routes\n}"
        ));
    }

    #[test]
    fn test_append_is_idempotent() {
        let merged = run(ROUTER, rule(InsertLocation::After), Scope::Run)
            .unwrap()
            .content()
            .unwrap()
            .to_string();
        assert_eq!(
            run(&merged, rule(InsertLocation::After), Scope::Run).unwrap(),
            Decision::NoOp
        );
    }

    #[test]
    fn test_anchor_miss_is_an_error() {
        let err = run("package router\n", rule(InsertLocation::After), Scope::Run).unwrap_err();
        match err {
            Error::Policy(PolicyError::AnchorNotFound { anchor }) => {
                assert_eq!(anchor, "// layergen:routes")
            }
            other => panic!("expected anchor miss, got {:?}", other),
        }
    }

    #[test]
    fn test_first_anchor_occurrence_wins() {
        let existing = "// layergen:routes\nmid\n// layergen:routes\n";
        let mut r = rule(InsertLocation::After);
        r.append_tpl = "X".into();
        let merged = run(existing, r, Scope::Method(0, 0)).unwrap();
        assert_eq!(
            merged,
            Decision::Merge("// layergen:routes\nX\nmid\n// layergen:routes\n".into())
        );
    }

    #[test]
    fn test_anchor_on_last_line_without_newline() {
        let mut r = rule(InsertLocation::After);
        r.append_tpl = "X".into();
        let merged = run("a\n// layergen:routes", r, Scope::Method(0, 0)).unwrap();
        assert_eq!(merged, Decision::Merge("a\n// layergen:routes\nX\n".into()));
    }

    #[test]
    fn test_entities_appended_at_unterminated_end() {
        let mut r = rule(InsertLocation::After);
        r.insert_key = "# routes".into();
        r.append_tpl = "- {{ method.name }}".into();
        let merged = run("a\n# routes", r, Scope::Service(0)).unwrap();
        assert_eq!(
            merged,
            Decision::Merge("a\n# routes\n- SayHello\n- SayBye\n".into())
        );
    }

    #[test]
    fn test_line_prefix_is_not_presence() {
        let sdm = ServiceDefinitionModel::from_yaml(
            r#"
package: github.com/acme/greeter/biz/model
services:
  - name: Greeter
    methods:
      - { name: SayHello, request_type: HelloReq, response_type: HelloResp }
      - { name: Say, request_type: SayReq, response_type: SayResp }
"#,
        )
        .unwrap();
        let ctx = GenerationContext::resolve(&GenerationConfig::default(), &sdm, true).unwrap();
        let view = ProjectView::build(&sdm, &ctx);
        let mut r = rule(InsertLocation::After);
        r.insert_key = "# routes".into();
        r.append_tpl = "- {{ method.name }}".into();
        let entities = view.entities(Scope::Run, r.entity);
        let spec = template(r);
        let decision = decide(
            &spec.update,
            Some("# routes\n- SayHello\n"),
            "candidate".into(),
            &Renderer::new(),
            &spec,
            &entities,
        )
        .unwrap();
        assert_eq!(decision, Decision::Merge("# routes\n- Say\n- SayHello\n".into()));
    }

    #[test]
    fn test_multi_line_content_matched_as_a_run() {
        assert!(contains_lines("x\n  a\n\tb\ny\n", "a\nb"));
        assert!(!contains_lines("a\nx\nb\n", "a\nb"));
        assert!(!contains_lines("ab\n", "a"));
    }

    #[test]
    fn test_service_entities() {
        let mut r = rule(InsertLocation::After);
        r.entity = EntityKind::Service;
        r.append_tpl = "\t{{ service.name }}Group(r)".into();
        let merged = run(ROUTER, r, Scope::Run).unwrap();
        let merged = merged.content().unwrap();
        assert!(merged.contains("\tGreeterGroup(r)\n\tEchoGroup(r)\n"));
    }

    #[test]
    fn test_imports_into_block() {
        let mut r = rule(InsertLocation::After);
        r.import_tpls = vec![
            "\"{{ model_package }}\"".into(),
            "\"github.com/cloudwego/hertz/pkg/app/server\"".into(),
        ];
        let merged = run(ROUTER, r, Scope::Run).unwrap();
        let merged = merged.content().unwrap();
        assert!(merged.starts_with(
            "package router\n\nimport (\n\t\"github.com/acme/greeter/biz/model\"\n\t\"github.com/cloudwego/hertz/pkg/app/server\"\n)\n"
        ));
        assert_eq!(merged.matches("biz/model\"").count(), 1);
    }

    #[test]
    fn test_import_key_anchor() {
        let existing = "package router\n\n// imports\nimport \"fmt\"\n\n// layergen:routes\n";
        let mut r = rule(InsertLocation::After);
        r.append_tpl = "X".into();
        r.import_tpls = vec!["import \"strings\"".into()];
        r.import_key = Some("// imports".into());
        let merged = run(existing, r, Scope::Method(0, 0)).unwrap();
        assert_eq!(
            merged.content().unwrap(),
            "package router\n\n// imports\nimport \"strings\"\nimport \"fmt\"\n\n// layergen:routes\nX\n"
        );
    }

    #[test]
    fn test_missing_import_block() {
        let existing = "package router\n\n// layergen:routes\n";
        let mut r = rule(InsertLocation::After);
        r.import_tpls = vec!["\"fmt\"".into()];
        let err = run(existing, r, Scope::Run).unwrap_err();
        assert!(matches!(
            err,
            Error::Policy(PolicyError::ImportBlockNotFound)
        ));
    }

    #[test]
    fn test_merge_render_error_names_template() {
        let mut r = rule(InsertLocation::After);
        r.append_tpl = "{{ method.nope }}".into();
        let err = run(ROUTER, r, Scope::Run).unwrap_err();
        assert!(err.to_string().contains("router.go (append_tpl)"));
    }
}
