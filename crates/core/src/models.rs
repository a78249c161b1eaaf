use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The five required booking slots, in the canonical order used for
/// follow-up prompts and booking URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingField {
    Name,
    Email,
    Service,
    Date,
    Time,
}

impl BookingField {
    pub const ALL: [BookingField; 5] = [
        Self::Name,
        Self::Email,
        Self::Service,
        Self::Date,
        Self::Time,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Service => "service",
            Self::Date => "date",
            Self::Time => "time",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "name" => Some(Self::Name),
            "email" => Some(Self::Email),
            "service" => Some(Self::Service),
            "date" => Some(Self::Date),
            "time" => Some(Self::Time),
            _ => None,
        }
    }
}

/// One turn's structured extraction result. Transient: only values that
/// survive placeholder filtering flow into [`BookingSlots`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingInfo {
    pub name: String,
    pub email: String,
    pub service: String,
    pub date: String,
    pub time: String,
}

impl BookingInfo {
    pub fn get(&self, field: BookingField) -> &str {
        match field {
            BookingField::Name => &self.name,
            BookingField::Email => &self.email,
            BookingField::Service => &self.service,
            BookingField::Date => &self.date,
            BookingField::Time => &self.time,
        }
    }

    pub fn set(&mut self, field: BookingField, value: impl Into<String>) {
        let value = value.into();
        match field {
            BookingField::Name => self.name = value,
            BookingField::Email => self.email = value,
            BookingField::Service => self.service = value,
            BookingField::Date => self.date = value,
            BookingField::Time => self.time = value,
        }
    }
}

/// Accumulated slot values for one session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingSlots {
    pub name: Option<String>,
    pub email: Option<String>,
    pub service: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
}

impl BookingSlots {
    pub fn get(&self, field: BookingField) -> Option<&str> {
        match field {
            BookingField::Name => self.name.as_deref(),
            BookingField::Email => self.email.as_deref(),
            BookingField::Service => self.service.as_deref(),
            BookingField::Date => self.date.as_deref(),
            BookingField::Time => self.time.as_deref(),
        }
    }

    pub fn set(&mut self, field: BookingField, value: impl Into<String>) {
        let value = Some(value.into());
        match field {
            BookingField::Name => self.name = value,
            BookingField::Email => self.email = value,
            BookingField::Service => self.service = value,
            BookingField::Date => self.date = value,
            BookingField::Time => self.time = value,
        }
    }
}

/// Everything stored per session: full history, mode flag, slots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionState {
    pub conversation_history: Vec<ChatTurn>,
    pub booking_in_progress: bool,
    pub slots: BookingSlots,
}

/// Failure modes of the slot extractor boundary. Both variants are recovered
/// locally by the dialogue engine; neither surfaces raw error text to users.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("extractor output failed schema validation: {0:?}")]
    SchemaInvalid(Vec<BookingField>),
    #[error("extraction call failed: {0}")]
    Transport(String),
}
