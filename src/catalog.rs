//! Bilingual catalog of pre-authored statements
//!
//! The catalog is fixed at startup: either the built-in list or a TOML file
//! that replaces it wholesale.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Display language for statement titles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Es,
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Self::En),
            "es" | "spanish" | "español" | "espanol" => Ok(Self::Es),
            other => Err(Error::Config(format!("unsupported language: {other}"))),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::En => f.write_str("en"),
            Self::Es => f.write_str("es"),
        }
    }
}

/// Text in both supported languages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedText {
    pub en: String,
    pub es: String,
}

impl LocalizedText {
    /// Text for the given language
    #[must_use]
    pub fn get(&self, lang: Language) -> &str {
        match lang {
            Language::En => &self.en,
            Language::Es => &self.es,
        }
    }
}

/// A statement the app can speak aloud
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    /// Stable identifier (kebab-case)
    pub id: String,
    /// Display title
    pub title: LocalizedText,
    /// Literal text sent for synthesis
    pub text: String,
}

/// Ordered, immutable list of statements
///
/// Deserializing goes through [`Catalog::new`], so ids and text are
/// validated however a catalog is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CatalogFile")]
pub struct Catalog {
    statements: Vec<Statement>,
}

/// On-disk shape of a catalog (`[[statements]]` tables)
#[derive(Deserialize)]
struct CatalogFile {
    statements: Vec<Statement>,
}

impl TryFrom<CatalogFile> for Catalog {
    type Error = Error;

    fn try_from(file: CatalogFile) -> Result<Self> {
        Self::new(file.statements)
    }
}

/// (id, english title, spanish title, text)
const BUILTIN: &[(&str, &str, &str, &str)] = &[
    (
        "free-to-go",
        "Free to Go",
        "Libre para irme",
        "Am I free to go? Yes or no.",
    ),
    (
        "remain-silent",
        "Right to Remain Silent",
        "Derecho a guardar silencio",
        "I am exercising my right to remain silent.",
    ),
    (
        "no-search",
        "No Consent to Search",
        "No consiento registros",
        "I do not consent to any search of my person, my belongings, or my vehicle.",
    ),
    (
        "lawyer",
        "Request a Lawyer",
        "Pedir un abogado",
        "I want to speak with a lawyer before answering any questions.",
    ),
    (
        "warrant",
        "Warrant Required",
        "Se requiere orden judicial",
        "I do not consent to your entry. Please slide the warrant under the door.",
    ),
    (
        "no-signature",
        "Will Not Sign",
        "No firmaré",
        "I will not sign anything without first speaking to a lawyer.",
    ),
    (
        "recording",
        "Recording",
        "Grabando",
        "I am recording this interaction for my safety.",
    ),
    ("goodbye", "Goodbye", "Adiós", "Thank you. Goodbye."),
];

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Catalog {
    /// The catalog compiled into the binary
    #[must_use]
    pub fn builtin() -> Self {
        let statements = BUILTIN
            .iter()
            .map(|(id, en, es, text)| Statement {
                id: (*id).to_string(),
                title: LocalizedText {
                    en: (*en).to_string(),
                    es: (*es).to_string(),
                },
                text: (*text).to_string(),
            })
            .collect();
        Self { statements }
    }

    /// Build a catalog from statements, validating ids and text
    ///
    /// # Errors
    ///
    /// Returns error on duplicate ids or empty text
    pub fn new(statements: Vec<Statement>) -> Result<Self> {
        let mut seen = HashSet::new();
        for statement in &statements {
            if statement.id.trim().is_empty() {
                return Err(Error::Config("statement id must not be empty".to_string()));
            }
            if !seen.insert(statement.id.as_str()) {
                return Err(Error::Config(format!(
                    "duplicate statement id: {}",
                    statement.id
                )));
            }
            if statement.text.trim().is_empty() {
                return Err(Error::Config(format!(
                    "statement {} has empty text",
                    statement.id
                )));
            }
        }
        Ok(Self { statements })
    }

    /// Parse a catalog from TOML (`[[statements]]` tables)
    ///
    /// # Errors
    ///
    /// Returns error if the TOML is malformed or fails validation
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content)?;
        Self::new(file.statements)
    }

    /// Load a catalog file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_toml_str(&content)?;
        tracing::info!(
            path = %path.display(),
            statements = catalog.len(),
            "loaded statement catalog"
        );
        Ok(catalog)
    }

    /// Statements in catalog order
    pub fn iter(&self) -> std::slice::Iter<'_, Statement> {
        self.statements.iter()
    }

    /// Look up a statement by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Statement> {
        self.statements.iter().find(|s| s.id == id)
    }

    /// Number of statements
    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Whether the catalog is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a Statement;
    type IntoIter = std::slice::Iter<'a, Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_is_valid() {
        let builtin = Catalog::builtin();
        let validated = Catalog::new(builtin.statements.clone()).unwrap();
        assert_eq!(builtin, validated);
        assert!(builtin.len() >= 2);
    }

    #[test]
    fn builtin_contains_free_to_go() {
        let catalog = Catalog::builtin();
        let statement = catalog.get("free-to-go").unwrap();
        assert_eq!(statement.text, "Am I free to go? Yes or no.");
        assert_eq!(statement.title.get(Language::Es), "Libre para irme");
    }

    #[test]
    fn parses_toml_catalog_in_order() {
        let toml = r#"
            [[statements]]
            id = "free-to-go"
            text = "Free to Go"
            title = { en = "Free to Go", es = "Libre para irme" }

            [[statements]]
            id = "goodbye"
            text = "Goodbye"
            title = { en = "Goodbye", es = "Adiós" }
        "#;

        let catalog = Catalog::from_toml_str(toml).unwrap();
        let texts: Vec<&str> = catalog.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["Free to Go", "Goodbye"]);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let statement = Catalog::builtin().statements[0].clone();
        let err = Catalog::new(vec![statement.clone(), statement]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn rejects_empty_text() {
        let mut statement = Catalog::builtin().statements[0].clone();
        statement.text = "   ".to_string();
        assert!(Catalog::new(vec![statement]).is_err());
    }

    #[test]
    fn deserialize_validates_statements() {
        let duplicate = r#"{"statements": [
            {"id": "a", "text": "Goodbye", "title": {"en": "Bye", "es": "Adiós"}},
            {"id": "a", "text": "Hello", "title": {"en": "Hi", "es": "Hola"}}
        ]}"#;
        let err = serde_json::from_str::<Catalog>(duplicate).unwrap_err();
        assert!(err.to_string().contains("duplicate statement id"));

        let blank = r#"{"statements": [{"id": "a", "text": " ", "title": {"en": "A", "es": "A"}}]}"#;
        assert!(serde_json::from_str::<Catalog>(blank).is_err());

        let json = serde_json::to_string(&Catalog::builtin()).unwrap();
        assert_eq!(serde_json::from_str::<Catalog>(&json).unwrap(), Catalog::builtin());
    }

    #[test]
    fn language_parsing() {
        assert_eq!("EN".parse::<Language>().unwrap(), Language::En);
        assert_eq!("español".parse::<Language>().unwrap(), Language::Es);
        assert!("fr".parse::<Language>().is_err());
        assert_eq!(Language::Es.to_string(), "es");
    }
}
