use super::common::*;
use chrono::NaiveDate;
use serde_json::Value;

use crate::workflows::triage::answers::Answer;
use crate::workflows::triage::risk::{risk_bucket, RiskLevel};
use crate::workflows::triage::rulebook::ENTITY_TYPE_ID;
use crate::workflows::triage::scoring::AnswerError;
use crate::workflows::triage::session::{Session, SessionError, Transition};

fn generated_at() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 1)
        .and_then(|date| date.and_hms_opt(9, 30, 0))
        .expect("valid timestamp")
}

fn assert_domain_ledgers_balance(session: &Session) {
    let scores = session.scores();
    for domain in scores.domains() {
        let item_total: i64 = scores.items_for(&domain.name).map(|item| item.points).sum();
        assert_eq!(domain.score, item_total, "domain {} out of balance", domain.name);
    }
    let domain_total: i64 = scores.domains().iter().map(|domain| domain.score).sum();
    assert_eq!(scores.total(), domain_total);
}

#[test]
fn session_opens_on_entity_type_selector() {
    let session = session();

    assert_eq!(session.rulebook().blocks()[0].id, ENTITY_TYPE_ID);
    let current = session.current_question().expect("first question");
    assert_eq!(current.id, ENTITY_TYPE_ID);
    assert_eq!(current.options.len(), 18);
    assert!(!session.is_complete());
    assert_eq!(session.progress(), 0.0);
}

#[test]
fn club_is_never_asked_league_only_questions() {
    let mut session = session();

    let transition = walk(&mut session, &club_medium_steps());

    assert_eq!(transition, Transition::Complete);
    assert!(session.is_complete());
    assert!(!session.asked().contains("leagueOnly"));
    assert_eq!(session.entity_type(), Some(CLUB));
    assert_eq!(session.progress(), 5.0 / 6.0);
}

#[test]
fn league_operator_reaches_league_only_question() {
    let mut session = session();

    let transition = walk(
        &mut session,
        &[
            ("entityType", Answer::text(LEAGUE)),
            ("x", Answer::text("No")),
        ],
    );

    assert_eq!(transition, Transition::Next("leagueOnly".to_string()));
}

#[test]
fn matching_route_bypasses_declaration_order() {
    let mut session = session();

    let transition = walk(
        &mut session,
        &[
            ("entityType", Answer::text(CLUB)),
            ("x", Answer::text("Yes")),
        ],
    );

    assert_eq!(transition, Transition::Next("y".to_string()));

    // channels was skipped by the route but is still picked up afterwards.
    let transition = walk(&mut session, &[("y", Answer::text("No"))]);
    assert_eq!(transition, Transition::Next("channels".to_string()));
}

#[test]
fn multi_select_points_accumulate_per_option() {
    let rulebook = rulebook_from(
        r#"
- id: pricing
  domain: Pricing
  question: Which practices apply?
  kind: multiSelect
  appliesTo: all
  options:
    - {text: A, points: 10}
    - {text: B, points: 30}
"#,
    );
    let mut session = Session::new(rulebook, metadata());

    walk(
        &mut session,
        &[
            ("entityType", Answer::text(CLUB)),
            ("pricing", Answer::choices(["A", "B"])),
        ],
    );

    assert!(session.is_complete());
    assert_eq!(session.scores().domain_score("Pricing"), Some(40));
    let risk = session.domain_risk("Pricing").expect("domain scored");
    assert_eq!(risk.level, RiskLevel::Medium);
    assert!(risk.override_reason.is_none());

    let items: Vec<(&str, i64)> = session
        .scores()
        .items_for("Pricing")
        .map(|item| (item.answer.as_str(), item.points))
        .collect();
    assert_eq!(items, vec![("A", 10), ("B", 30)]);
}

#[test]
fn repeated_multi_select_choices_are_scored_once() {
    let mut session = session();

    walk(
        &mut session,
        &[
            ("entityType", Answer::text(CLUB)),
            ("x", Answer::text("No")),
            ("channels", Answer::choices(["B", "B", "A"])),
        ],
    );

    assert_eq!(session.scores().domain_score("Commercial"), Some(40));
    assert_eq!(
        session.answers().get("channels"),
        Some(&Answer::choices(["B", "A"]))
    );
}

#[test]
fn domain_scores_equal_item_totals_after_every_answer() {
    let mut session = session();

    for (expected, answer) in club_medium_steps() {
        walk(&mut session, &[(expected, answer)]);
        assert_domain_ledgers_balance(&session);
    }
}

#[test]
fn overall_risk_uses_total_of_domain_scores() {
    let mut session = session();
    walk(&mut session, &club_medium_steps());

    assert_eq!(session.scores().total(), 40);
    let overall = session.overall_risk();
    assert_eq!(overall.level, risk_bucket(40));
    assert_eq!(overall.level, RiskLevel::Medium);
    assert!(overall.override_reason.is_none());
}

#[test]
fn hardcore_flag_forces_high_risk_on_low_score() {
    let rulebook = rulebook_from(
        r#"
- id: resale
  domain: Ticketing
  question: Do you fix resale prices with other clubs?
  appliesTo: all
  options:
    - {text: "Yes", points: 10, hardcore: true}
    - {text: "No", points: 0}
"#,
    );
    let mut session = Session::new(rulebook, metadata());

    walk(
        &mut session,
        &[
            ("entityType", Answer::text(CLUB)),
            ("resale", Answer::text("Yes")),
        ],
    );

    assert_eq!(session.scores().domain_score("Ticketing"), Some(10));
    let risk = session.domain_risk("Ticketing").expect("domain scored");
    assert_eq!(risk.level, RiskLevel::High);
    assert!(risk
        .override_reason
        .as_deref()
        .is_some_and(|reason| !reason.is_empty()));
}

#[test]
fn price_fixing_tag_escalates_overall_risk() {
    let mut session = session();

    walk(
        &mut session,
        &[
            ("entityType", Answer::text(CLUB)),
            ("x", Answer::text("Yes")),
            ("y", Answer::text("No")),
            ("channels", Answer::choices(["A"])),
            ("notes", Answer::text("")),
        ],
    );

    assert_eq!(session.scores().total(), 30);
    let overall = session.overall_risk();
    assert_eq!(overall.level, RiskLevel::High);
    assert!(overall
        .override_reason
        .as_deref()
        .is_some_and(|reason| reason.contains("price_fixing")));
}

#[test]
fn route_cycles_never_repeat_a_question() {
    let rulebook = rulebook_from(
        r#"
- id: a
  domain: Governance
  question: First?
  appliesTo: all
  options: [{text: "Yes", points: 1}]
  next: [{targetId: b}]
- id: b
  domain: Governance
  question: Second?
  appliesTo: all
  options: [{text: "Yes", points: 1}]
  next: [{targetId: a}]
"#,
    );
    let mut session = Session::new(rulebook, metadata());
    let mut visited = Vec::new();

    while let Some(block) = session.current_question() {
        let id = block.id.clone();
        let answer = Answer::text(block.options[0].text.clone());
        assert!(!visited.contains(&id), "{id} asked twice");
        visited.push(id);
        session.submit(answer).expect("answer accepted");
    }

    assert_eq!(visited, vec!["entityType", "a", "b"]);
}

#[test]
fn rejected_answer_leaves_session_untouched() {
    let mut session = session();
    walk(&mut session, &[("entityType", Answer::text(CLUB))]);

    let result = session.submit(Answer::text("Maybe"));

    assert_eq!(
        result,
        Err(SessionError::Answer(AnswerError::UnknownOption {
            question_id: "x".to_string(),
            option: "Maybe".to_string(),
        }))
    );
    assert_eq!(session.current_question().map(|block| block.id.as_str()), Some("x"));
    assert_eq!(session.answers().len(), 1);
    assert_domain_ledgers_balance(&session);
}

#[test]
fn completed_session_rejects_further_answers() {
    let mut session = session();
    walk(&mut session, &club_medium_steps());

    assert_eq!(
        session.submit(Answer::text("No")),
        Err(SessionError::AlreadyComplete)
    );
}

#[test]
fn report_is_unavailable_until_complete() {
    let mut session = session();
    walk(&mut session, &[("entityType", Answer::text(CLUB))]);

    let result = session.report("fixture.yaml", generated_at());

    assert!(matches!(result, Err(SessionError::Incomplete)));
}

#[test]
fn report_payload_carries_renderer_fields() {
    let mut session = session();
    walk(&mut session, &club_medium_steps());

    let report = session
        .report("fixture.yaml", generated_at())
        .expect("report available");
    let payload = serde_json::to_value(&report).expect("serializable");

    let mut keys: Vec<&str> = payload
        .as_object()
        .expect("object payload")
        .keys()
        .map(String::as_str)
        .collect();
    keys.sort_unstable();
    assert_eq!(
        keys,
        vec![
            "answers",
            "completed_by",
            "domains",
            "entity_type",
            "executive_summary",
            "generated_at",
            "organisation",
            "overall_risk",
            "recommendations",
            "rulebook_version",
            "top_items",
            "total_score",
        ]
    );

    assert_eq!(payload["generated_at"], "2025-03-01 09:30");
    assert_eq!(payload["organisation"], "Northern Rovers FC");
    assert_eq!(payload["entity_type"], CLUB);
    assert_eq!(payload["overall_risk"], "MEDIUM");
    assert_eq!(payload["total_score"], 40);

    let domains: Vec<&str> = report.domains.iter().map(|domain| domain.name.as_str()).collect();
    assert_eq!(domains, vec!["Meta", "Pricing", "Commercial", "General"]);
    assert_eq!(payload["domains"][0]["risk_override"], Value::Null);

    let top: Vec<i64> = report.top_items.iter().map(|item| item.points).collect();
    assert_eq!(top, vec![30, 10]);

    assert_eq!(
        payload["answers"]["Which channels do you sell through?"],
        serde_json::json!(["A", "B"])
    );
    assert_eq!(
        payload["answers"]["Which best describes your organisation?"],
        CLUB
    );
}

#[test]
fn reset_discards_answers_and_keeps_metadata() {
    let mut session = session();
    walk(&mut session, &club_medium_steps());

    session.reset();

    assert_eq!(
        session.current_question().map(|block| block.id.as_str()),
        Some(ENTITY_TYPE_ID)
    );
    assert!(session.answers().is_empty());
    assert!(session.asked().is_empty());
    assert_eq!(session.scores().total(), 0);
    assert_eq!(session.entity_type(), None);
    assert_eq!(session.metadata(), &metadata());
}
