//! Schema rules: evaluated in declared order against an incoming document
//! to decide which index spec(s) it belongs to and what to do with it
//! (§3 `SchemaRule & MatchAction`).

use serde_json::Value;

/// What kind of match a rule performs.
#[derive(Debug, Clone)]
pub enum RuleKind {
    /// Matches any document key with this prefix.
    Prefix(String),
    /// Matches when `expr` evaluates truthy against the document.
    Expression(String),
    /// Matches when the document has the named field.
    HasField(String),
    /// Matches every document.
    MatchAll,
    /// Matches via a host-supplied predicate (the out-of-scope tokenizer
    /// and phonetic libraries plug in here, per spec §1).
    Custom(String),
}

/// What to do with a document that matched a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchAction {
    /// Send the document through the indexer.
    Index,
    /// Set document attributes (no indexing).
    SetAttrs,
    /// Load attributes from the document store without indexing.
    LoadAttrs,
    /// Jump to a later named rule.
    Goto(String),
    /// Stop evaluating rules for this document.
    Abort,
    /// Host-defined action.
    Custom(String),
}

/// One schema rule: `{kind, action}`, evaluated in declared order.
#[derive(Debug, Clone)]
pub struct SchemaRule {
    pub name: String,
    pub kind: RuleKind,
    pub action: MatchAction,
}

impl SchemaRule {
    pub fn new(name: impl Into<String>, kind: RuleKind, action: MatchAction) -> Self {
        Self {
            name: name.into(),
            kind,
            action,
        }
    }

    /// Whether this rule matches `key`/`doc` (field presence and
    /// MatchAll are checked directly; `Expression`/`Custom` defer to the
    /// host's expression evaluator and tokenizer, which are out of scope
    /// for this crate — they always match here as a conservative stub).
    fn matches(&self, key: &str, doc: &Value) -> bool {
        match &self.kind {
            RuleKind::Prefix(p) => key.starts_with(p.as_str()),
            RuleKind::HasField(f) => doc.get(f).is_some(),
            RuleKind::MatchAll => true,
            RuleKind::Expression(_) | RuleKind::Custom(_) => true,
        }
    }
}

/// The outcome of evaluating a rule set against one document: the actions
/// collected before an `Abort`, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvalOutcome {
    pub actions: Vec<MatchAction>,
    pub aborted: bool,
}

/// Evaluate `rules` against `(key, doc)` in declared order. A `Goto` jumps
/// to the named later rule (no-op, and a warning via the returned
/// outcome's absence of side effects, if the name isn't found); `Abort`
/// stops evaluation immediately.
pub fn evaluate(rules: &[SchemaRule], key: &str, doc: &Value) -> EvalOutcome {
    let mut outcome = EvalOutcome::default();
    let mut i = 0;
    while i < rules.len() {
        let rule = &rules[i];
        if rule.matches(key, doc) {
            match &rule.action {
                MatchAction::Goto(target) => {
                    match rules.iter().position(|r| &r.name == target) {
                        Some(idx) => {
                            i = idx;
                            continue;
                        }
                        None => {
                            i += 1;
                            continue;
                        }
                    }
                }
                MatchAction::Abort => {
                    outcome.aborted = true;
                    return outcome;
                }
                other => outcome.actions.push(other.clone()),
            }
        }
        i += 1;
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_rule_matches_only_matching_keys() {
        let rules = vec![SchemaRule::new(
            "r1",
            RuleKind::Prefix("doc:".into()),
            MatchAction::Index,
        )];
        let out = evaluate(&rules, "doc:1", &Value::Null);
        assert_eq!(out.actions, vec![MatchAction::Index]);
        let out = evaluate(&rules, "other:1", &Value::Null);
        assert!(out.actions.is_empty());
    }

    #[test]
    fn abort_stops_further_evaluation() {
        let rules = vec![
            SchemaRule::new("r1", RuleKind::MatchAll, MatchAction::Abort),
            SchemaRule::new("r2", RuleKind::MatchAll, MatchAction::Index),
        ];
        let out = evaluate(&rules, "k", &Value::Null);
        assert!(out.aborted);
        assert!(out.actions.is_empty());
    }

    #[test]
    fn goto_jumps_to_named_rule() {
        let rules = vec![
            SchemaRule::new("r1", RuleKind::MatchAll, MatchAction::Goto("r3".into())),
            SchemaRule::new("r2", RuleKind::MatchAll, MatchAction::Index),
            SchemaRule::new("r3", RuleKind::MatchAll, MatchAction::SetAttrs),
        ];
        let out = evaluate(&rules, "k", &Value::Null);
        assert_eq!(out.actions, vec![MatchAction::SetAttrs]);
    }

    #[test]
    fn has_field_rule_checks_document_shape() {
        let rules = vec![SchemaRule::new(
            "r1",
            RuleKind::HasField("title".into()),
            MatchAction::Index,
        )];
        let doc = serde_json::json!({"title": "x"});
        assert_eq!(evaluate(&rules, "k", &doc).actions, vec![MatchAction::Index]);
        assert!(evaluate(&rules, "k", &Value::Null).actions.is_empty());
    }
}
