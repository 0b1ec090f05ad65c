//! Language selectors understood by the content origin.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScripturekitError};

/// Language codes the origin publishes scripture in.
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "afr", "alb", "amh", "apw", "ara", "ase", "aym", "ben", "bik", "bis", "bul", "cag", "cak",
    "cat", "ceb", "ces", "chk", "cuk", "dan", "deu", "efi", "ell", "eng", "ept", "est", "eus",
    "fat", "fij", "fin", "fra", "gil", "grn", "guz", "hat", "hif", "hil", "hin", "hmn", "hmo",
    "hrv", "hun", "hye", "ibo", "ilo", "ind", "isl", "ita", "jpn", "kam", "kat", "kaz", "kek",
    "khm", "kin", "kor", "kos", "lao", "lav", "lin", "lit", "mah", "mam", "mkd", "mlg", "mlt",
    "msa", "nav", "nep", "nld", "nor", "pag", "pam", "pau", "pes", "pol", "pon", "por", "quc",
    "quh", "quz", "qvi", "rar", "ron", "rus", "sin", "slk", "smo", "sna", "sot", "spa", "srp",
    "swa", "swe", "tah", "tam", "tel", "tgl", "tha", "ton", "tpi", "tsn", "tur", "twi", "tzo",
    "ukr", "urd", "vie", "war", "xho", "yap", "yor", "zho", "zhs", "zul",
];

/// A three-letter language code, e.g. `eng`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Language(String);

impl Language {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the origin is known to publish in this language.
    pub fn is_supported(&self) -> bool {
        SUPPORTED_LANGUAGES.contains(&self.0.as_str())
    }

    /// Every supported language, in code order.
    pub fn all() -> Vec<Language> {
        SUPPORTED_LANGUAGES
            .iter()
            .map(|code| Language((*code).to_string()))
            .collect()
    }
}

impl std::str::FromStr for Language {
    type Err = ScripturekitError;

    fn from_str(s: &str) -> Result<Self> {
        let code = s.trim().to_ascii_lowercase();
        if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_lowercase()) {
            return Err(ScripturekitError::config(format!(
                "invalid language code '{s}': expected three letters such as 'eng'"
            )));
        }
        Ok(Self(code))
    }
}

impl TryFrom<String> for Language {
    type Error = ScripturekitError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Language> for String {
    fn from(value: Language) -> Self {
        value.0
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_case() {
        let lang: Language = " ENG ".parse().unwrap();
        assert_eq!(lang.as_str(), "eng");
        assert!(lang.is_supported());
    }

    #[test]
    fn parse_rejects_malformed_codes() {
        assert!("en".parse::<Language>().is_err());
        assert!("en1".parse::<Language>().is_err());
        assert!("english".parse::<Language>().is_err());
    }

    #[test]
    fn unknown_but_well_formed_code_is_unsupported() {
        let lang: Language = "xyz".parse().unwrap();
        assert!(!lang.is_supported());
    }

    #[test]
    fn all_languages_are_sorted_and_unique() {
        let all = Language::all();
        assert_eq!(all.len(), SUPPORTED_LANGUAGES.len());
        assert!(all.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn serde_validates() {
        let lang: Language = serde_json::from_str("\"spa\"").unwrap();
        assert_eq!(lang.to_string(), "spa");
        assert!(serde_json::from_str::<Language>("\"spanish\"").is_err());
    }
}
