use serde::Serialize;

use crate::error::ParseErrorKind;
use crate::plural::PluralBucket;

/// Translation state as declared by the `type` attribute of `<translation>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    #[default]
    Finished,
    Unfinished,
    Obsolete,
    Vanished,
}

impl MessageStatus {
    pub fn from_type_attr(value: Option<&str>) -> Result<Self, ParseErrorKind> {
        match value {
            None | Some("") => Ok(Self::Finished),
            Some("unfinished") => Ok(Self::Unfinished),
            Some("obsolete") => Ok(Self::Obsolete),
            Some("vanished") => Ok(Self::Vanished),
            Some(other) => Err(ParseErrorKind::InvalidStatus(other.to_string())),
        }
    }

    pub fn type_attr(self) -> Option<&'static str> {
        match self {
            Self::Finished => None,
            Self::Unfinished => Some("unfinished"),
            Self::Obsolete => Some("obsolete"),
            Self::Vanished => Some("vanished"),
        }
    }

    /// Obsolete and vanished messages are both hidden from default lookups.
    pub fn is_obsolete(self) -> bool {
        matches!(self, Self::Obsolete | Self::Vanished)
    }
}

/// One translated text, optionally with shorter length variants.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Form {
    text: String,
    length_variants: Vec<String>,
}

impl Form {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            length_variants: Vec::new(),
        }
    }

    /// Builds a form from `<lengthvariant>` entries, longest first.
    pub fn with_variants(variants: Vec<String>) -> Self {
        Self {
            text: variants.first().cloned().unwrap_or_default(),
            length_variants: variants,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn length_variants(&self) -> &[String] {
        &self.length_variants
    }

    pub fn has_variants(&self) -> bool {
        !self.length_variants.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Plural forms of a numerus message, addressed by bucket.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PluralForms {
    forms: Vec<Form>,
}

impl PluralForms {
    pub fn new(forms: Vec<Form>) -> Self {
        Self { forms }
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }

    pub fn get(&self, bucket: PluralBucket) -> Option<&Form> {
        self.forms.get(bucket.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Form> {
        self.forms.iter()
    }

    /// Text for `bucket`, walking down to the nearest non-empty form.
    pub fn resolve(&self, bucket: PluralBucket) -> Option<&str> {
        let mut current = Some(bucket);
        while let Some(candidate) = current {
            if let Some(form) = self.get(candidate) {
                if !form.is_empty() {
                    return Some(form.text());
                }
            }
            current = candidate.lower();
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    Single(Form),
    Plural(PluralForms),
}

impl Translation {
    pub fn is_numerus(&self) -> bool {
        matches!(self, Translation::Plural(_))
    }
}

/// A `<location>` entry; `line` is kept verbatim since it may be relative (`+3`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    pub filename: Option<String>,
    pub line: Option<String>,
}

/// An `<extra-NAME>` element, stored without the `extra-` prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraField {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageKey<'a> {
    pub source: &'a str,
    pub disambiguation: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Option<String>,
    pub source: String,
    pub disambiguation: Option<String>,
    pub old_source: Option<String>,
    pub old_disambiguation: Option<String>,
    pub extra_comment: Option<String>,
    pub translator_comment: Option<String>,
    pub locations: Vec<Location>,
    pub extras: Vec<ExtraField>,
    pub status: MessageStatus,
    pub translation: Translation,
}

impl Message {
    pub fn new(source: impl Into<String>, translation: Translation) -> Self {
        Self {
            id: None,
            source: source.into(),
            disambiguation: None,
            old_source: None,
            old_disambiguation: None,
            extra_comment: None,
            translator_comment: None,
            locations: Vec::new(),
            extras: Vec::new(),
            status: MessageStatus::Finished,
            translation,
        }
    }

    pub fn key(&self) -> MessageKey<'_> {
        MessageKey {
            source: &self.source,
            disambiguation: self.disambiguation.as_deref(),
        }
    }

    pub fn is_numerus(&self) -> bool {
        self.translation.is_numerus()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    pub name: String,
    pub comment: Option<String>,
    pub messages: Vec<Message>,
}

impl Context {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            comment: None,
            messages: Vec::new(),
        }
    }
}

/// Ordered contents of one TS document (or several merged ones).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsDocument {
    pub version: Option<String>,
    pub language: String,
    pub source_language: Option<String>,
    pub dependencies: Vec<String>,
    pub contexts: Vec<Context>,
}

impl TsDocument {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            version: None,
            language: language.into(),
            source_language: None,
            dependencies: Vec::new(),
            contexts: Vec::new(),
        }
    }

    /// Copy of the root attributes and dependencies, without contexts.
    pub(crate) fn header(&self) -> TsDocument {
        TsDocument {
            version: self.version.clone(),
            language: self.language.clone(),
            source_language: self.source_language.clone(),
            dependencies: self.dependencies.clone(),
            contexts: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forms(texts: &[&str]) -> PluralForms {
        PluralForms::new(texts.iter().map(|text| Form::new(*text)).collect())
    }

    #[test]
    fn resolve_walks_down_to_non_empty_form() {
        let plural = forms(&["%n soubor", "", ""]);
        assert_eq!(plural.resolve(PluralBucket::new(2)), Some("%n soubor"));
        assert_eq!(plural.resolve(PluralBucket::new(0)), Some("%n soubor"));
    }

    #[test]
    fn resolve_never_looks_upward() {
        let plural = forms(&["", "%n souborů"]);
        assert_eq!(plural.resolve(PluralBucket::new(0)), None);
        assert_eq!(plural.resolve(PluralBucket::new(1)), Some("%n souborů"));
    }

    #[test]
    fn out_of_range_bucket_resolves_from_last_form() {
        let plural = forms(&["a", "b"]);
        assert_eq!(plural.resolve(PluralBucket::new(5)), Some("b"));
    }

    #[test]
    fn status_attribute_parsing() {
        assert_eq!(
            MessageStatus::from_type_attr(None).unwrap(),
            MessageStatus::Finished
        );
        assert_eq!(
            MessageStatus::from_type_attr(Some("vanished")).unwrap(),
            MessageStatus::Vanished
        );
        assert!(MessageStatus::Vanished.is_obsolete());
        assert!(!MessageStatus::Unfinished.is_obsolete());
        assert!(matches!(
            MessageStatus::from_type_attr(Some("fuzzy")),
            Err(ParseErrorKind::InvalidStatus(value)) if value == "fuzzy"
        ));
    }

    #[test]
    fn variants_expose_longest_as_text() {
        let form = Form::with_variants(vec!["Preferences".into(), "Prefs".into()]);
        assert_eq!(form.text(), "Preferences");
        assert!(form.has_variants());
    }
}
