use super::answers::AnswerSet;
use super::predicate::evaluate;
use super::rulebook::{QuestionBlock, Rulebook};
use std::collections::HashSet;
use tracing::debug;

/// Whether the block is asked of the selected entity type.
pub fn applicable(block: &QuestionBlock, entity_type: Option<&str>) -> bool {
    block.applies_to.includes(entity_type)
}

/// Evaluates `showIf` only; applicability is a separate gate.
pub fn visible(block: &QuestionBlock, answers: &AnswerSet, entity_type: Option<&str>) -> bool {
    evaluate(block.show_if.as_ref(), answers, entity_type)
}

/// Picks the question that follows `current`, or `None` when the session is complete.
///
/// Explicit routes win when their predicate holds and their target exists and
/// has not been asked yet. Otherwise the first unasked, applicable and visible
/// block in declaration order is returned. Questions are never asked twice, so
/// a route cycle simply falls through to the declaration-order scan.
pub fn next_question<'a>(
    current: &QuestionBlock,
    answers: &AnswerSet,
    entity_type: Option<&str>,
    asked: &HashSet<String>,
    rulebook: &'a Rulebook,
) -> Option<&'a str> {
    for route in &current.next {
        if !evaluate(route.when.as_ref(), answers, entity_type) {
            continue;
        }
        if asked.contains(&route.target_id) {
            debug!(from = %current.id, target = %route.target_id, "route target already asked");
            continue;
        }
        match rulebook.block(&route.target_id) {
            Some(target) => {
                debug!(from = %current.id, target = %target.id, "following explicit route");
                return Some(target.id.as_str());
            }
            None => {
                debug!(from = %current.id, target = %route.target_id, "route target unknown");
            }
        }
    }

    rulebook
        .blocks()
        .iter()
        .find(|block| {
            !asked.contains(&block.id)
                && applicable(block, entity_type)
                && visible(block, answers, entity_type)
        })
        .map(|block| block.id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::triage::answers::Answer;
    use crate::workflows::triage::rulebook::AppliesTo;

    fn rulebook() -> Rulebook {
        r#"
- id: entityType
  domain: Meta
  question: Type?
  appliesTo: all
  options:
    - {text: Club / Team, points: 0}
    - {text: League Operator, points: 0}
- id: league
  domain: Governance
  question: League only?
  appliesTo: [League Operator]
  options: [{text: Yes, points: 5}]
- id: x
  domain: Governance
  question: Route source
  appliesTo: all
  options: [{text: Yes, points: 0}, {text: No, points: 0}]
  next:
    - when: {equals: {questionId: x, value: Yes}}
      targetId: y
- id: between
  domain: Governance
  question: Declared before y
  appliesTo: all
  options: [{text: Yes, points: 0}]
- id: y
  domain: Governance
  question: Route target
  appliesTo: all
  showIf: {equals: {questionId: x, value: Yes}}
  options: [{text: Yes, points: 0}]
"#
        .parse()
        .expect("rulebook parses")
    }

    fn asked(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn applicability_checks_entity_membership() {
        let rulebook = rulebook();
        let league = rulebook.block("league").expect("block");
        assert!(applicable(league, Some("League Operator")));
        assert!(!applicable(league, Some("Club / Team")));
        assert!(!applicable(league, None));
        assert_eq!(rulebook.block("x").expect("block").applies_to, AppliesTo::All);
    }

    #[test]
    fn fallback_skips_inapplicable_blocks() {
        let rulebook = rulebook();
        let answers: AnswerSet = [("entityType", Answer::text("Club / Team"))]
            .into_iter()
            .collect();
        let current = rulebook.block("entityType").expect("block");

        let next = next_question(
            current,
            &answers,
            Some("Club / Team"),
            &asked(&["entityType"]),
            &rulebook,
        );
        assert_eq!(next, Some("x"));
    }

    #[test]
    fn explicit_route_bypasses_declaration_order() {
        let rulebook = rulebook();
        let answers: AnswerSet = [
            ("entityType", Answer::text("Club / Team")),
            ("x", Answer::text("Yes")),
        ]
        .into_iter()
        .collect();
        let current = rulebook.block("x").expect("block");

        let next = next_question(
            current,
            &answers,
            Some("Club / Team"),
            &asked(&["entityType", "x"]),
            &rulebook,
        );
        assert_eq!(next, Some("y"));
    }

    #[test]
    fn hidden_blocks_are_skipped_and_completion_is_detected() {
        let rulebook = rulebook();
        let answers: AnswerSet = [
            ("entityType", Answer::text("Club / Team")),
            ("x", Answer::text("No")),
        ]
        .into_iter()
        .collect();
        let current = rulebook.block("x").expect("block");
        let mut seen = asked(&["entityType", "x"]);

        let next = next_question(current, &answers, Some("Club / Team"), &seen, &rulebook);
        assert_eq!(next, Some("between"));

        seen.insert("between".to_string());
        let current = rulebook.block("between").expect("block");
        assert_eq!(
            next_question(current, &answers, Some("Club / Team"), &seen, &rulebook),
            None
        );
    }

    #[test]
    fn routes_to_asked_questions_fall_through() {
        let rulebook = rulebook();
        let answers: AnswerSet = [
            ("entityType", Answer::text("Club / Team")),
            ("x", Answer::text("Yes")),
        ]
        .into_iter()
        .collect();
        let current = rulebook.block("x").expect("block");

        let next = next_question(
            current,
            &answers,
            Some("Club / Team"),
            &asked(&["entityType", "x", "y"]),
            &rulebook,
        );
        assert_eq!(next, Some("between"));
    }
}
