use anyhow::Result;
use bookline_core::{BookingField, BookingInfo, ExtractError};
use bookline_retrieval::RetrievedChunk;
use once_cell::sync::Lazy;
use regex::Regex;

/// Value the scripted extractor emits when a field cannot be found in the
/// input. Member of the default denylist, so the dialogue engine treats it
/// as missing.
const ABSENT: &str = "unknown";

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)+").expect("valid email regex")
});
static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{4}-\d{2}-\d{2}\b").expect("valid date regex"));
static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:[01]?\d|2[0-3]):[0-5]\d\b").expect("valid time regex"));
static NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bname is ([A-Za-z][A-Za-z'-]*(?: [A-Za-z][A-Za-z'-]*){0,2})")
        .expect("valid name regex")
});
static SERVICE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bservice is ([A-Za-z][A-Za-z &-]*)").expect("valid service regex")
});

const SERVICE_KEYWORDS: [&str; 6] = [
    "therapy",
    "massage",
    "consultation",
    "counseling",
    "coaching",
    "physiotherapy",
];

// Words that signal the name capture ran past the actual name in free text.
const NAME_STOPWORDS: [&str; 5] = ["and", "my", "the", "is", "for"];

/// Deterministic pattern-based extractor. Primarily for offline deployments
/// and tests; also a reference for what the LLM extractor is asked to do.
/// Because the combined input restates known slots as "My {field} is {value}."
/// statements, stored values re-extract cleanly on every turn.
#[derive(Debug, Clone, Default)]
pub struct ScriptedExtractor;

impl ScriptedExtractor {
    pub async fn extract(&self, input: &str) -> Result<BookingInfo, ExtractError> {
        let mut info = BookingInfo::default();
        for field in BookingField::ALL {
            info.set(field, ABSENT);
        }

        if let Some(found) = EMAIL_RE.find(input) {
            info.email = found.as_str().to_string();
        }
        if let Some(found) = DATE_RE.find(input) {
            info.date = found.as_str().to_string();
        }
        if let Some(found) = TIME_RE.find(input) {
            info.time = found.as_str().to_string();
        }
        if let Some(captures) = NAME_RE.captures(input) {
            info.name = clean_name(&captures[1]);
        }
        if let Some(captures) = SERVICE_RE.captures(input) {
            info.service = captures[1].trim().to_string();
        } else {
            let lower = input.to_lowercase();
            if let Some(keyword) = SERVICE_KEYWORDS.iter().find(|word| lower.contains(*word)) {
                info.service = keyword.to_string();
            }
        }

        Ok(info)
    }
}

fn clean_name(raw: &str) -> String {
    let mut words = Vec::new();
    for word in raw.split_whitespace() {
        if NAME_STOPWORDS.contains(&word.to_lowercase().as_str()) {
            break;
        }
        words.push(word);
    }

    if words.is_empty() {
        ABSENT.to_string()
    } else {
        words.join(" ")
    }
}

/// Offline answer generator: composes a reply directly from the retrieved
/// snippets instead of calling a model.
#[derive(Debug, Clone, Default)]
pub struct ExtractiveGenerator;

impl ExtractiveGenerator {
    pub async fn answer(&self, _query: &str, context: &[RetrievedChunk]) -> Result<String> {
        if context.is_empty() {
            return Ok(
                "I'm sorry, I couldn't find anything about that in our knowledge base.".to_string(),
            );
        }

        let snippets = context
            .iter()
            .map(|chunk| chunk.snippet.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        Ok(format!("Based on our knowledge base: {}", snippets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn extract(input: &str) -> BookingInfo {
        ScriptedExtractor.extract(input).await.unwrap()
    }

    #[tokio::test]
    async fn finds_fields_in_free_text() {
        let info = extract(
            "My name is Alice. my email is alice@mail.com, date 2025-03-10, time 14:30",
        )
        .await;

        assert_eq!(info.name, "Alice");
        assert_eq!(info.email, "alice@mail.com");
        assert_eq!(info.date, "2025-03-10");
        assert_eq!(info.time, "14:30");
    }

    #[tokio::test]
    async fn restated_slot_statements_round_trip() {
        let info = extract(
            "My name is Jane Smith. My email is jane@site.org. My service is Deep Tissue. hello",
        )
        .await;

        assert_eq!(info.name, "Jane Smith");
        assert_eq!(info.email, "jane@site.org");
        assert_eq!(info.service, "Deep Tissue");
    }

    #[tokio::test]
    async fn absent_fields_fall_back_to_placeholder() {
        let info = extract("I want to book a therapy session").await;

        assert_eq!(info.name, ABSENT);
        assert_eq!(info.email, ABSENT);
        assert_eq!(info.date, ABSENT);
        assert_eq!(info.time, ABSENT);
        assert_eq!(info.service, "therapy");
    }

    #[tokio::test]
    async fn email_without_tld_is_not_matched() {
        let info = extract("My email is bad@bad. anything else").await;
        assert_eq!(info.email, ABSENT);
    }

    #[tokio::test]
    async fn name_capture_stops_at_conjunctions() {
        let info = extract("my name is Bob and my email is bob@site.com").await;
        assert_eq!(info.name, "Bob");
    }

    #[tokio::test]
    async fn extractive_generator_composes_from_snippets() {
        let chunks = vec![RetrievedChunk {
            doc_id: "faq".to_string(),
            title: "FAQ".to_string(),
            snippet: "We offer therapy and massage.".to_string(),
            score: 1.0,
        }];

        let answer = ExtractiveGenerator.answer("what do you offer", &chunks).await.unwrap();
        assert!(answer.contains("therapy and massage"));

        let empty = ExtractiveGenerator.answer("anything", &[]).await.unwrap();
        assert!(empty.contains("couldn't find"));
    }
}
