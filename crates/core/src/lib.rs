pub mod denylist;
pub mod dialogue;
pub mod models;
pub mod validate;

pub use denylist::Denylist;
pub use dialogue::{
    booking_url, combined_extraction_input, completion_reply, extraction_failure_prompt,
    merge_extracted, missing_fields_prompt, qa_context, schema_failure_prompt, wants_booking,
    BOOKING_KEYWORDS, QA_CONTEXT_TURNS,
};
pub use models::*;
pub use validate::{validate_date, validate_email, validate_time};
