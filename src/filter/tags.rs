use serde::{Deserialize, Serialize};

/// Теги в запросе фильтра: готовый список, JSON-строка (`'["Art","Free"]'`)
/// или строка через запятую (`"Art,Free"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagsInput {
    List(Vec<String>),
    Text(String),
}

impl TagsInput {
    /// Приводит любую форму к одному списку: trim, без пустых и без повторов,
    /// порядок первого появления сохраняется.
    pub fn normalize(&self) -> Vec<String> {
        match self {
            TagsInput::List(items) => clean(items.iter().map(String::as_str)),
            TagsInput::Text(text) => {
                let text = text.trim();
                if text.starts_with('[') {
                    if let Ok(items) = serde_json::from_str::<Vec<String>>(text) {
                        return clean(items.iter().map(String::as_str));
                    }
                }
                clean(text.split(','))
            }
        }
    }
}

fn clean<'a>(items: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in items.map(str::trim).filter(|t| !t.is_empty()) {
        if !out.iter().any(|seen| seen == tag) {
            out.push(tag.to_string());
        }
    }
    out
}
