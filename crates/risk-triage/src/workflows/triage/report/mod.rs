mod export;
mod flags;
mod payload;

pub use export::write_items_csv;
pub use flags::attention_points;
pub use payload::{AnswerAppendix, DomainSummary, ReportPayload};
