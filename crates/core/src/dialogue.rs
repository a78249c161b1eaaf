//! The booking dialogue engine: mode detection, slot merging, follow-up
//! prompts and booking-link completion. Everything here is synchronous and
//! pure; the async extractor/generator boundaries live in other crates.

use url::form_urlencoded;

use crate::denylist::Denylist;
use crate::models::{BookingField, BookingInfo, BookingSlots, ChatTurn};
use crate::validate::{validate_date, validate_email, validate_time};

/// Case-insensitive substring triggers for entering the booking flow.
pub const BOOKING_KEYWORDS: [&str; 7] = [
    "book",
    "appointment",
    "schedule",
    "reserve",
    "meeting",
    "session",
    "therapy",
];

/// Number of trailing history turns rendered into the Q&A context.
pub const QA_CONTEXT_TURNS: usize = 6;

pub fn wants_booking(message: &str) -> bool {
    let lower = message.to_lowercase();
    BOOKING_KEYWORDS.iter().any(|word| lower.contains(word))
}

/// Concatenates already-known slots as natural-language statements followed
/// by the raw new message, in canonical field order. This is the single text
/// blob handed to the slot extractor each turn.
pub fn combined_extraction_input(slots: &BookingSlots, message: &str) -> String {
    let mut parts = Vec::new();
    for field in BookingField::ALL {
        if let Some(value) = slots.get(field) {
            if !value.is_empty() {
                parts.push(format!("My {} is {}.", field.as_str(), value));
            }
        }
    }
    parts.push(message.to_string());
    parts.join(" ")
}

/// One merge step of the COLLECTING loop.
///
/// Every non-placeholder value overwrites the stored slot (trimmed, original
/// case) even when it fails syntactic validation; latest non-placeholder
/// wins. Validation runs only on values that cleared the denylist. Returns
/// the missing fields in canonical order; empty means the flow completes.
pub fn merge_extracted(
    slots: &mut BookingSlots,
    info: &BookingInfo,
    denylist: &Denylist,
) -> Vec<BookingField> {
    let mut missing = Vec::new();

    for field in BookingField::ALL {
        let value = info.get(field).trim();
        let placeholder = denylist.is_placeholder(value);

        if !placeholder {
            slots.set(field, value);
        }

        let bad = placeholder
            || match field {
                BookingField::Date => !validate_date(value),
                BookingField::Time => !validate_time(value),
                BookingField::Email => !validate_email(value),
                BookingField::Name | BookingField::Service => false,
            };

        if bad {
            missing.push(field);
        }
    }

    missing
}

pub fn missing_fields_prompt(missing: &[BookingField]) -> String {
    format!(
        "Sure! To proceed, please provide your {}.",
        join_fields(missing)
    )
}

pub fn schema_failure_prompt(fields: &[BookingField]) -> String {
    format!(
        "Missing or invalid: {}. Please provide them.",
        join_fields(fields)
    )
}

pub fn extraction_failure_prompt() -> String {
    "Sorry, I couldn't understand all the booking details. Could you please provide your name, \
     email, preferred date, and time?"
        .to_string()
}

/// `{base}/book?name=..&email=..&service=..&date=..&time=..` with standard
/// query percent-encoding, parameters in canonical field order.
pub fn booking_url(base: &str, slots: &BookingSlots) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    for field in BookingField::ALL {
        query.append_pair(field.as_str(), slots.get(field).unwrap_or(""));
    }

    format!("{}/book?{}", base.trim_end_matches('/'), query.finish())
}

pub fn completion_reply(booking_url: &str) -> String {
    format!(
        "You can complete your booking here: <a href='{url}' target='_blank'>{url}</a>",
        url = booking_url
    )
}

/// Renders the trailing history window as `role: content` lines and appends
/// the new message, forming the retrieval/generation query for Q&A turns.
pub fn qa_context(history: &[ChatTurn], message: &str) -> String {
    let start = history.len().saturating_sub(QA_CONTEXT_TURNS);
    let mut lines = history[start..]
        .iter()
        .map(|turn| format!("{}: {}", turn.role.as_str(), turn.content))
        .collect::<Vec<_>>();
    lines.push(format!("user: {}", message));
    lines.join("\n")
}

fn join_fields(fields: &[BookingField]) -> String {
    fields
        .iter()
        .map(|field| field.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn info(name: &str, email: &str, service: &str, date: &str, time: &str) -> BookingInfo {
        BookingInfo {
            name: name.to_string(),
            email: email.to_string(),
            service: service.to_string(),
            date: date.to_string(),
            time: time.to_string(),
        }
    }

    #[test]
    fn keyword_triggers_are_case_insensitive_substrings() {
        assert!(wants_booking("I want to BOOK a slot"));
        assert!(wants_booking("any therapy options?"));
        assert!(wants_booking("let's schedule something"));
        assert!(!wants_booking("what services do you offer?"));
    }

    #[test]
    fn combined_input_orders_known_slots_before_message() {
        let mut slots = BookingSlots::default();
        slots.set(BookingField::Service, "Therapy");
        slots.set(BookingField::Name, "Alice");

        let blob = combined_extraction_input(&slots, "my email is alice@mail.com");
        assert_eq!(
            blob,
            "My name is Alice. My service is Therapy. my email is alice@mail.com"
        );
    }

    #[test]
    fn all_placeholders_report_all_fields_missing() {
        let mut slots = BookingSlots::default();
        let missing = merge_extracted(
            &mut slots,
            &info("John Doe", "user@example.com", "unknown", "", "unknown"),
            &Denylist::default(),
        );

        assert_eq!(missing, BookingField::ALL.to_vec());
        assert!(slots.name.is_none());
        assert!(slots.email.is_none());
    }

    #[test]
    fn missing_fields_follow_canonical_order() {
        let mut slots = BookingSlots::default();
        // time invalid, email placeholder: prompt must still list email first
        let missing = merge_extracted(
            &mut slots,
            &info("Alice", "unknown", "Therapy", "2025-03-10", "25:99"),
            &Denylist::default(),
        );

        assert_eq!(missing, vec![BookingField::Email, BookingField::Time]);
        assert_eq!(
            missing_fields_prompt(&missing),
            "Sure! To proceed, please provide your email, time."
        );
    }

    #[test]
    fn invalid_but_non_placeholder_value_still_overwrites() {
        let mut slots = BookingSlots::default();
        slots.set(BookingField::Email, "alice@mail.com");

        let missing = merge_extracted(
            &mut slots,
            &info("Alice", "bad@bad", "Therapy", "2025-03-10", "14:30"),
            &Denylist::default(),
        );

        // Latest non-placeholder wins, so the bad email replaces good data
        // and the field is reported missing.
        assert_eq!(missing, vec![BookingField::Email]);
        assert_eq!(slots.email.as_deref(), Some("bad@bad"));
    }

    #[test]
    fn merge_is_idempotent_on_complete_valid_slots() {
        let complete = info("Alice", "alice@mail.com", "Therapy", "2025-03-10", "14:30");
        let mut slots = BookingSlots::default();

        let first = merge_extracted(&mut slots, &complete, &Denylist::default());
        assert!(first.is_empty());
        let url_before = booking_url("http://localhost:8080", &slots);

        let second = merge_extracted(&mut slots, &complete, &Denylist::default());
        assert!(second.is_empty());
        assert_eq!(booking_url("http://localhost:8080", &slots), url_before);
    }

    #[test]
    fn booking_url_percent_encodes_values() {
        let mut slots = BookingSlots::default();
        slots.set(BookingField::Name, "Alice Smith");
        slots.set(BookingField::Email, "alice@mail.com");
        slots.set(BookingField::Service, "Deep Tissue");
        slots.set(BookingField::Date, "2025-03-10");
        slots.set(BookingField::Time, "14:30");

        let url = booking_url("http://localhost:8080/", &slots);
        assert_eq!(
            url,
            "http://localhost:8080/book?name=Alice+Smith&email=alice%40mail.com\
             &service=Deep+Tissue&date=2025-03-10&time=14%3A30"
        );
    }

    #[test]
    fn qa_context_windows_to_last_six_turns() {
        let history = (0..10)
            .map(|i| ChatTurn {
                role: if i % 2 == 0 { Role::User } else { Role::Assistant },
                content: format!("turn {}", i),
            })
            .collect::<Vec<_>>();

        let context = qa_context(&history, "latest question");
        assert!(!context.contains("turn 3"));
        assert!(context.contains("user: turn 4"));
        assert!(context.contains("assistant: turn 9"));
        assert!(context.ends_with("user: latest question"));
    }
}
