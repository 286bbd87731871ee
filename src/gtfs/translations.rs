//! Translations Resolver (C6): normalizes the two shapes `translations.txt`
//! can take into `stop_id -> { lang -> value }`, and resolves a requested
//! language against a provider's declared fallback chain.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// `(trans_id, translation, lang)` — joined to stops by matching the default
/// stop name against `trans_id`.
#[derive(Debug, Clone, Deserialize)]
pub struct SimpleTranslation {
    pub trans_id: String,
    pub translation: String,
    pub lang: String,
}

/// `(table_name, field_name, language, translation, record_id[, field_value])`
/// — the GTFS-reference table-based shape.
#[derive(Debug, Clone, Deserialize)]
pub struct TableTranslation {
    pub table_name: String,
    pub field_name: String,
    pub language: String,
    pub translation: String,
    pub record_id: Option<String>,
    pub field_value: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranslationIndex {
    /// stop_id -> (language -> translated name)
    by_stop_id: HashMap<String, HashMap<String, String>>,
}

impl TranslationIndex {
    pub fn build_from_simple(
        entries: Vec<SimpleTranslation>,
        stop_name_to_id: &HashMap<String, String>,
    ) -> Self {
        let mut by_stop_id: HashMap<String, HashMap<String, String>> = HashMap::new();
        for entry in entries {
            if let Some(stop_id) = stop_name_to_id.get(&entry.trans_id) {
                by_stop_id
                    .entry(stop_id.clone())
                    .or_default()
                    .insert(entry.lang, entry.translation);
            }
        }
        Self { by_stop_id }
    }

    pub fn build_from_table(entries: Vec<TableTranslation>) -> Self {
        let mut by_stop_id: HashMap<String, HashMap<String, String>> = HashMap::new();
        for entry in entries {
            if entry.table_name != "stops" || entry.field_name != "stop_name" {
                continue;
            }
            let Some(record_id) = entry.record_id else {
                continue;
            };
            by_stop_id
                .entry(record_id)
                .or_default()
                .insert(entry.language, entry.translation);
        }
        Self { by_stop_id }
    }

    pub fn for_stop(&self, stop_id: &str) -> Option<&HashMap<String, String>> {
        self.by_stop_id.get(stop_id)
    }

    pub fn merge(&mut self, other: TranslationIndex) {
        for (stop_id, langs) in other.by_stop_id {
            self.by_stop_id.entry(stop_id).or_default().extend(langs);
        }
    }
}

/// Outcome of resolving a requested language for one field.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub value: String,
    pub selected_language: Option<String>,
    pub requested_language: String,
    pub fallback_chain: Vec<String>,
    pub warning: Option<String>,
}

/// Resolves `requested` against the stop's translations, falling back
/// through `provider_preference` in order, and finally to `default_value`
/// with a warning naming the chain that was tried.
pub fn resolve_language(
    translations: Option<&HashMap<String, String>>,
    requested: &str,
    provider_preference: &[String],
    default_value: &str,
) -> Resolved {
    let mut fallback_chain = vec![requested.to_string()];

    if let Some(map) = translations {
        if let Some(value) = map.get(requested) {
            return Resolved {
                value: value.clone(),
                selected_language: Some(requested.to_string()),
                requested_language: requested.to_string(),
                fallback_chain,
                warning: None,
            };
        }

        for lang in provider_preference {
            fallback_chain.push(lang.clone());
            if let Some(value) = map.get(lang) {
                return Resolved {
                    value: value.clone(),
                    selected_language: Some(lang.clone()),
                    requested_language: requested.to_string(),
                    fallback_chain,
                    warning: Some(format!(
                        "language {requested:?} unavailable, fell back to {lang:?}"
                    )),
                };
            }
        }
    }

    Resolved {
        value: default_value.to_string(),
        selected_language: None,
        requested_language: requested.to_string(),
        fallback_chain,
        warning: Some(format!(
            "language {requested:?} unavailable, using default value"
        )),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn exact_match_has_no_warning() {
        let mut map = HashMap::new();
        map.insert("fr".to_string(), "Bruxelles-Central".to_string());
        let resolved = resolve_language(Some(&map), "fr", &[], "Brussels-Central");
        assert_eq!(resolved.value, "Bruxelles-Central");
        assert!(resolved.warning.is_none());
    }

    #[test]
    fn missing_language_falls_back_to_default_with_warning() {
        let resolved = resolve_language(None, "nl", &["fr".to_string()], "Default Name");
        assert_eq!(resolved.value, "Default Name");
        assert!(resolved.warning.is_some());
    }

    #[test]
    fn falls_back_through_provider_preference() {
        let mut map = HashMap::new();
        map.insert("fr".to_string(), "Bruxelles-Central".to_string());
        let resolved = resolve_language(Some(&map), "de", &["fr".to_string()], "Default");
        assert_eq!(resolved.value, "Bruxelles-Central");
        assert!(resolved.warning.is_some());
    }
}
