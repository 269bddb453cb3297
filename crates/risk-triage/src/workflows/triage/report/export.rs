use super::super::scoring::Item;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct ItemRow<'a> {
    #[serde(rename = "Domain")]
    domain: &'a str,
    #[serde(rename = "Question ID")]
    id: &'a str,
    #[serde(rename = "Question")]
    question: &'a str,
    #[serde(rename = "Answer")]
    answer: &'a str,
    #[serde(rename = "Points")]
    points: i64,
    #[serde(rename = "Priority")]
    action_priority: &'a str,
    #[serde(rename = "Tag")]
    tag: &'a str,
    #[serde(rename = "Hardcore")]
    hardcore: bool,
    #[serde(rename = "Next Step")]
    next_step: &'a str,
    #[serde(rename = "Risk Comment")]
    risk_comment: &'a str,
    #[serde(rename = "Legal Basis")]
    legal_basis: &'a str,
}

impl<'a> From<&'a Item> for ItemRow<'a> {
    fn from(item: &'a Item) -> Self {
        Self {
            domain: &item.domain,
            id: &item.id,
            question: &item.question,
            answer: &item.answer,
            points: item.points,
            action_priority: item.action_priority.map(|p| p.label()).unwrap_or_default(),
            tag: item.tag.as_deref().unwrap_or_default(),
            hardcore: item.hardcore.unwrap_or(false),
            next_step: item.next_step.as_deref().unwrap_or_default(),
            risk_comment: item.risk_comment.as_deref().unwrap_or_default(),
            legal_basis: item.legal_basis.as_deref().unwrap_or_default(),
        }
    }
}

/// Writes one CSV row per item for spreadsheet review.
pub fn write_items_csv<'a, W, I>(writer: W, items: I) -> Result<(), csv::Error>
where
    W: Write,
    I: IntoIterator<Item = &'a Item>,
{
    let mut csv_writer = csv::Writer::from_writer(writer);
    for item in items {
        csv_writer.serialize(ItemRow::from(item))?;
    }
    csv_writer.flush()?;
    Ok(())
}
