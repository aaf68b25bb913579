//! Parsing of the bilingual content object returned for a batch job.

use serde::Deserialize;
use tkpro_core::GeneratedContent;

use crate::error::GenerationError;
use crate::extract::extract_json_object;

#[derive(Debug, Deserialize)]
struct BilingualPayload {
    title_en: String,
    title_zh: String,
    description_en: String,
    description_zh: String,
    script_en: String,
    script_zh: String,
}

/// English and Chinese copy for one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BilingualContent {
    pub en: GeneratedContent,
    pub zh: GeneratedContent,
}

/// Extracts and parses the content object from raw model output.
///
/// All six keys are required and must be strings; extra keys are ignored.
///
/// # Errors
///
/// Returns [`GenerationError::NoJsonObject`] when the text holds no `{...}`
/// span and [`GenerationError::Deserialize`] when the object is malformed or
/// misses a key.
pub fn parse_bilingual(raw: &str) -> Result<BilingualContent, GenerationError> {
    let json = extract_json_object(raw).ok_or(GenerationError::NoJsonObject)?;
    let payload: BilingualPayload =
        serde_json::from_str(&json).map_err(|source| GenerationError::Deserialize {
            context: "bilingual content".to_owned(),
            source,
        })?;

    Ok(BilingualContent {
        en: GeneratedContent {
            title: payload.title_en,
            description: payload.description_en,
            script: payload.script_en,
        },
        zh: GeneratedContent {
            title: payload.title_zh,
            description: payload.description_zh,
            script: payload.script_zh,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"{
        "title_en": "Galaxy Lamp ✨",
        "title_zh": "星空灯",
        "description_en": "desc en",
        "description_zh": "desc zh",
        "script_en": "script en",
        "script_zh": "script zh",
        "extra": 1
    }"#;

    #[test]
    fn splits_languages() {
        let content = parse_bilingual(FULL).unwrap();
        assert_eq!(content.en.title, "Galaxy Lamp ✨");
        assert_eq!(content.zh.title, "星空灯");
        assert_eq!(content.en.script, "script en");
        assert_eq!(content.zh.description, "desc zh");
    }

    #[test]
    fn tolerates_fences_and_prose() {
        let wrapped = format!("Here you go!\n```json\n{FULL}\n```");
        assert!(parse_bilingual(&wrapped).is_ok());
    }

    #[test]
    fn missing_key_is_an_error() {
        let err = parse_bilingual(r#"{"title_en": "a", "title_zh": "b"}"#).unwrap_err();
        assert!(matches!(err, GenerationError::Deserialize { .. }));
    }

    #[test]
    fn non_string_value_is_an_error() {
        let json = FULL.replace("\"script zh\"", "null");
        assert!(parse_bilingual(&json).is_err());
    }

    #[test]
    fn prose_without_object_is_an_error() {
        let err = parse_bilingual("Sorry, I can't help with that.").unwrap_err();
        assert!(matches!(err, GenerationError::NoJsonObject));
    }
}
