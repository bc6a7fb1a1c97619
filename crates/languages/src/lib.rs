//! Static catalog of the languages RunPad can submit to the execution service.
//! （RunPad 可送往執行服務的語言目錄。）

use std::borrow::{Borrow, Cow};
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const PYTHON_TEMPLATE: &str = "# Online Python interpreter to run Python programs: simply write, execute, and see results instantly.
print('Hello World')";

const JS_TEMPLATE: &str = "// Online JavaScript interpreter to run JS programs: simply write, execute, and see results instantly.
console.log('Hello World');";

/// Identifier for a catalog entry.
/// （目錄項目的識別子。）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageId(Cow<'static, str>);

impl LanguageId {
    pub fn new(id: impl Into<Cow<'static, str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LanguageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for LanguageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for LanguageId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for LanguageId {
    fn from(value: &'static str) -> Self {
        Self(Cow::Borrowed(value))
    }
}

impl From<String> for LanguageId {
    fn from(value: String) -> Self {
        Self(Cow::Owned(value))
    }
}

impl PartialEq<str> for LanguageId {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for LanguageId {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("unknown language `{0}`")]
    UnknownLanguage(String),
    #[error("language `{0}` is declared more than once")]
    DuplicateLanguage(String),
    #[error("language catalog must contain at least one entry")]
    Empty,
}

/// Everything the session needs to know about one supported language.
/// （工作階段所需的單一語言資訊。）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageProfile {
    pub id: LanguageId,
    pub display_label: String,
    pub file_extension: String,
    pub default_source: String,
    /// Identifier sent as `language` in the run request body.
    pub service_identifier: String,
}

impl LanguageProfile {
    pub fn new(
        id: impl Into<LanguageId>,
        display_label: impl Into<String>,
        file_extension: impl Into<String>,
        default_source: impl Into<String>,
        service_identifier: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_label: display_label.into(),
            file_extension: file_extension.into(),
            default_source: default_source.into(),
            service_identifier: service_identifier.into().to_lowercase(),
        }
    }

    /// Returns `true` when `text` is exactly this language's template.
    pub fn is_default_source(&self, text: &str) -> bool {
        self.default_source == text
    }

    /// Editor tab label, e.g. `main.py`.
    pub fn file_name(&self) -> String {
        format!("main.{}", self.file_extension)
    }

    pub fn compiler_title(&self) -> String {
        format!("{} COMPILER", self.id.as_str().to_uppercase())
    }

    pub fn runtime_session_label(&self) -> String {
        format!("{}_Runtime_01", self.id)
    }

    pub fn engine_label(&self) -> String {
        format!("{} 3.x Engine", self.id)
    }
}

/// Immutable, ordered mapping from [`LanguageId`] to [`LanguageProfile`].
/// （依宣告順序排列、不可變的語言對照表。）
#[derive(Debug, Clone)]
pub struct LanguageCatalog {
    profiles: Vec<LanguageProfile>,
    index: HashMap<LanguageId, usize>,
}

impl LanguageCatalog {
    /// Builds a catalog, keeping declaration order for [`ids`](Self::ids).
    pub fn new(profiles: Vec<LanguageProfile>) -> Result<Self, CatalogError> {
        if profiles.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut index = HashMap::with_capacity(profiles.len());
        for (position, profile) in profiles.iter().enumerate() {
            if index.insert(profile.id.clone(), position).is_some() {
                return Err(CatalogError::DuplicateLanguage(profile.id.to_string()));
            }
        }
        Ok(Self { profiles, index })
    }

    /// The languages shipped with RunPad: Python first, then JavaScript.
    /// （內建語言：先 Python，後 JavaScript。）
    pub fn builtin() -> Self {
        Self::new(builtin_profiles()).expect("built-in language ids are unique")
    }

    pub fn resolve(&self, id: &str) -> Result<&LanguageProfile, CatalogError> {
        self.index
            .get(id)
            .map(|&position| &self.profiles[position])
            .ok_or_else(|| CatalogError::UnknownLanguage(id.to_string()))
    }

    /// Case-insensitive lookup by id, service identifier or file extension.
    pub fn resolve_loose(&self, query: &str) -> Result<&LanguageProfile, CatalogError> {
        let needle = query.trim().trim_start_matches('.');
        self.profiles
            .iter()
            .find(|profile| {
                profile.id.as_str().eq_ignore_ascii_case(needle)
                    || profile.service_identifier.eq_ignore_ascii_case(needle)
                    || profile.file_extension.eq_ignore_ascii_case(needle)
                    || profile.display_label.eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| CatalogError::UnknownLanguage(query.to_string()))
    }

    /// Ids in declaration order.
    pub fn ids(&self) -> impl Iterator<Item = &LanguageId> + '_ {
        self.profiles.iter().map(|profile| &profile.id)
    }

    pub fn profiles(&self) -> &[LanguageProfile] {
        &self.profiles
    }

    pub fn first(&self) -> &LanguageProfile {
        &self.profiles[0]
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

fn builtin_profiles() -> Vec<LanguageProfile> {
    vec![
        LanguageProfile::new("Python", "Python", "py", PYTHON_TEMPLATE, "python"),
        LanguageProfile::new("JS", "JavaScript", "js", JS_TEMPLATE, "javascript"),
    ]
}

impl Default for LanguageCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
