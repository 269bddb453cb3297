use super::{AppliesTo, QuestionBlock, QuestionKind, QuestionOption};

pub const ENTITY_TYPE_ID: &str = "entityType";

/// Organisation categories offered when the rulebook does not define its own selector.
pub const ENTITY_TYPES: [&str; 18] = [
    "International Federation",
    "National Federation",
    "League Operator",
    "Club / Team",
    "Event Owner / Promoter",
    "Players' Union",
    "Athlete / Agent",
    "Refereeing Body",
    "Academy / Training Centre",
    "Venue / Stadium Operator",
    "Data / Analytics Provider",
    "Ticketing / Hospitality",
    "Betting / Integrity Partner",
    "Broadcast / Media / OTT",
    "Sponsorship / Marketing Agency",
    "Merchandising / Licensing",
    "Technology Platform",
    "Esports Organisation",
];

pub fn entity_type_block() -> QuestionBlock {
    QuestionBlock {
        id: ENTITY_TYPE_ID.to_string(),
        domain: "Meta".to_string(),
        question: "Which best describes your organisation?".to_string(),
        kind: QuestionKind::SingleSelect,
        options: ENTITY_TYPES
            .iter()
            .map(|label| QuestionOption::new(*label, 0))
            .collect(),
        applies_to: AppliesTo::All,
        show_if: None,
        next: Vec::new(),
    }
}
