use std::env;
use std::path::PathBuf;

use anyhow::{bail, Result};
use bookline_extract::LlmConfig;

pub const DEFAULT_SESSION_SECRET: &str = "bookline-dev-secret-change-me";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorMode {
    Llm,
    Scripted,
}

/// Runtime configuration, read once at startup. An unusable combination
/// (llm mode without an API key) fails here rather than on the first turn.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub kb_root: PathBuf,
    pub database_url: Option<String>,
    pub extractor_mode: ExtractorMode,
    pub llm: Option<LlmConfig>,
    pub denylist_path: Option<PathBuf>,
    pub session_secret: String,
    pub cookie_name: String,
    pub bind: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let kb_root = PathBuf::from(env::var("BOOKLINE_KB_ROOT").unwrap_or_else(|_| "kb".to_string()));
        let database_url = env::var("BOOKLINE_DATABASE_URL").ok();
        let denylist_path = env::var("BOOKLINE_DENYLIST").ok().map(PathBuf::from);
        let bind = env::var("BOOKLINE_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let cookie_name = env::var("BOOKLINE_SESSION_COOKIE_NAME")
            .unwrap_or_else(|_| "bookline_session".to_string());

        let session_secret = match env::var("BOOKLINE_SESSION_SECRET") {
            Ok(value) if !value.trim().is_empty() => value,
            _ => {
                tracing::warn!(
                    "BOOKLINE_SESSION_SECRET not set, using an insecure development secret"
                );
                DEFAULT_SESSION_SECRET.to_string()
            }
        };

        let extractor_mode = match env::var("BOOKLINE_EXTRACTOR")
            .unwrap_or_else(|_| "llm".to_string())
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "llm" => ExtractorMode::Llm,
            "scripted" => ExtractorMode::Scripted,
            other => bail!("invalid BOOKLINE_EXTRACTOR value: {other} (expected llm or scripted)"),
        };

        let llm = match extractor_mode {
            ExtractorMode::Llm => {
                let api_key = match env::var("BOOKLINE_LLM_API_KEY") {
                    Ok(value) if !value.trim().is_empty() => value,
                    _ => bail!("BOOKLINE_LLM_API_KEY is required when BOOKLINE_EXTRACTOR=llm"),
                };
                Some(LlmConfig {
                    base_url: env::var("BOOKLINE_LLM_BASE_URL")
                        .unwrap_or_else(|_| LlmConfig::DEFAULT_BASE_URL.to_string()),
                    api_key,
                    model: env::var("BOOKLINE_LLM_MODEL")
                        .unwrap_or_else(|_| LlmConfig::DEFAULT_MODEL.to_string()),
                })
            }
            ExtractorMode::Scripted => None,
        };

        Ok(Self {
            kb_root,
            database_url,
            extractor_mode,
            llm,
            denylist_path,
            session_secret,
            cookie_name,
            bind,
        })
    }

    /// A config wired for in-process use without any environment or network:
    /// scripted extraction, in-memory sessions.
    pub fn scripted(kb_root: impl Into<PathBuf>) -> Self {
        Self {
            kb_root: kb_root.into(),
            database_url: None,
            extractor_mode: ExtractorMode::Scripted,
            llm: None,
            denylist_path: None,
            session_secret: DEFAULT_SESSION_SECRET.to_string(),
            cookie_name: "bookline_session".to_string(),
            bind: "127.0.0.1:0".to_string(),
        }
    }
}
