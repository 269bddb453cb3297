use super::super::answers::AnswerSet;
use super::super::predicate::Predicate;
use serde_json::Value;

/// Answer combinations that deserve a human look even when the score is low.
/// Questions the respondent never reached count as unanswered.
fn rules() -> Vec<(&'static str, Predicate)> {
    vec![
        (
            "Participation rules without published criteria",
            Predicate::All(vec![
                Predicate::equals("setsParticipationRules", "Yes"),
                missing_or("publishesCriteria", &["No"]),
            ]),
        ),
        (
            "Joint selling without formal approval",
            Predicate::All(vec![
                Predicate::equals("jointCommercialDecisions", "Yes"),
                Predicate::Any(vec![
                    missing_or("leagueApprovalForJointSales", &["No"]),
                    missing_or("fedApprovalForJointSales", &["No"]),
                ]),
            ]),
        ),
        (
            "Exclusive agreements without clear limits",
            Predicate::All(vec![
                Predicate::equals("exclusiveAgreements", "Yes"),
                missing_or("exclusivityDetails", &["No, not usually"]),
            ]),
        ),
        (
            "Limited venue data access without route for others",
            Predicate::All(vec![
                Predicate::equals("leagueDataCollection", "Yes"),
                missing_or("leagueAltDataAccess", &["No"]),
            ]),
        ),
        (
            "Exclusive data supply without access pathway",
            Predicate::All(vec![
                Predicate::equals("dataExclusivity", "Yes"),
                missing_or("dataNonExclusivePathways", &["No"]),
            ]),
        ),
        (
            "Exclusive ticketing with no external resale",
            Predicate::All(vec![
                Predicate::equals("ticketingExclusivePartner", "Yes"),
                Predicate::equals("ticketingResalePolicy", "No"),
            ]),
        ),
        (
            "Club-to-club coordination on players",
            Predicate::equals("clubCoordinationOnPlayers", "Yes"),
        ),
    ]
}

fn missing_or(question_id: &str, labels: &[&str]) -> Predicate {
    let values = std::iter::once(Value::Null).chain(labels.iter().map(|label| Value::from(*label)));
    Predicate::one_of(question_id, values)
}

pub fn attention_points(answers: &AnswerSet, entity_type: Option<&str>) -> Vec<&'static str> {
    rules()
        .into_iter()
        .filter(|(_, when)| when.evaluate(answers, entity_type))
        .map(|(label, _)| label)
        .collect()
}
