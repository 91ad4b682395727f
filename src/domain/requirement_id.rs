use std::{fmt, ops::Deref, str::FromStr};

use non_empty_string::NonEmptyString;
use serde::{Deserialize, Serialize};

/// The identifier of a requirement.
///
/// Format: `{IDENT}-{INTEGER}`, where:
/// - `IDENT` is one or more segments of ASCII letters, digits and underscores,
///   joined by single hyphens (e.g. `REQ`, `REQ-CORE`, `net_io`)
/// - `INTEGER` is an unsigned decimal number (e.g. `1`, `042`)
///
/// Identifiers are case-sensitive and compared byte-wise: `REQ-1` and `req-1`
/// are distinct, as are `REQ-1` and `REQ-01`. Ordering is lexicographic over
/// the raw bytes.
///
/// Examples: `REQ-1`, `REQ-CORE-6`, `UI_2-0042`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RequirementId(NonEmptyString);

impl RequirementId {
    /// Parses a requirement identifier.
    ///
    /// Surrounding whitespace is not accepted; callers that read identifiers
    /// from free text trim first.
    ///
    /// # Errors
    ///
    /// Returns an [`InvalidIdError`] if the string does not follow the
    /// `{IDENT}-{INTEGER}` grammar.
    pub fn new(s: String) -> Result<Self, InvalidIdError> {
        validate(&s)?;
        let inner = NonEmptyString::new(s).map_err(|_| InvalidIdError::Syntax(String::new()))?;
        Ok(Self(inner))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

fn validate(s: &str) -> Result<(), InvalidIdError> {
    let Some((ident, number)) = s.rsplit_once('-') else {
        return Err(InvalidIdError::Syntax(s.to_string()));
    };

    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return Err(InvalidIdError::Number(s.to_string(), number.to_string()));
    }

    if ident.is_empty() || ident.split('-').any(str::is_empty) {
        return Err(InvalidIdError::Syntax(s.to_string()));
    }

    if !ident
        .bytes()
        .all(|b| b == b'-' || b == b'_' || b.is_ascii_alphanumeric())
    {
        return Err(InvalidIdError::Ident(s.to_string()));
    }

    Ok(())
}

/// Errors that can occur when parsing a [`RequirementId`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InvalidIdError {
    /// The identifier is not made of hyphen-separated, non-empty segments.
    #[error("invalid requirement id '{0}': expected <IDENT>-<INTEGER>")]
    Syntax(String),

    /// The final segment is not an unsigned decimal number.
    #[error("invalid requirement id '{0}': expected an unsigned integer, got '{1}'")]
    Number(String, String),

    /// The identifier contains characters other than ASCII letters, digits,
    /// underscores and hyphens.
    #[error("invalid requirement id '{0}': only ASCII letters, digits, '_' and '-' are allowed")]
    Ident(String),
}

impl FromStr for RequirementId {
    type Err = InvalidIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for RequirementId {
    type Error = InvalidIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for RequirementId {
    type Error = InvalidIdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value.to_string())
    }
}

impl From<RequirementId> for String {
    fn from(id: RequirementId) -> Self {
        id.0.into_inner()
    }
}

impl AsRef<str> for RequirementId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Deref for RequirementId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl fmt::Display for RequirementId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("REQ-1"; "simple")]
    #[test_case("REQ-0"; "zero")]
    #[test_case("REQ-001"; "leading zeros")]
    #[test_case("req-1"; "lowercase")]
    #[test_case("REQ-CORE-6"; "hyphenated ident")]
    #[test_case("net_io-12"; "underscore")]
    #[test_case("1-2"; "numeric ident")]
    #[test_case("A-B-C-99999999999999999999999"; "huge number")]
    fn valid_ids(input: &str) {
        let id = RequirementId::try_from(input).unwrap();
        assert_eq!(id.as_str(), input);
    }

    #[test_case(""; "empty")]
    #[test_case("REQ"; "no hyphen")]
    #[test_case("-1"; "empty ident")]
    #[test_case("REQ--1"; "empty segment")]
    #[test_case("REQ-"; "empty number")]
    #[test_case("REQ-+1"; "signed number")]
    #[test_case("REQ-1a"; "alphanumeric number")]
    #[test_case("REQ-A"; "letter number")]
    #[test_case("REQ 1-1"; "space")]
    #[test_case(" REQ-1"; "leading whitespace")]
    #[test_case("RÉQ-1"; "non ascii")]
    #[test_case("REQ.X-1"; "punctuation")]
    fn invalid_ids(input: &str) {
        assert!(RequirementId::try_from(input).is_err());
    }

    #[test]
    fn error_kinds() {
        assert!(matches!(
            RequirementId::try_from("REQ"),
            Err(InvalidIdError::Syntax(_))
        ));
        assert!(matches!(
            RequirementId::try_from("REQ-x"),
            Err(InvalidIdError::Number(_, _))
        ));
        assert!(matches!(
            RequirementId::try_from("R!Q-1"),
            Err(InvalidIdError::Ident(_))
        ));
    }

    #[test]
    fn case_sensitive_identity() {
        let upper = RequirementId::try_from("REQ-1").unwrap();
        let lower = RequirementId::try_from("req-1").unwrap();
        assert_ne!(upper, lower);
    }

    #[test]
    fn ordering_is_bytewise() {
        let mut ids: Vec<RequirementId> = ["REQ-9", "REQ-10", "req-1", "REQ-1"]
            .into_iter()
            .map(|s| s.parse().unwrap())
            .collect();
        ids.sort();
        let sorted: Vec<&str> = ids.iter().map(RequirementId::as_str).collect();
        assert_eq!(sorted, ["REQ-1", "REQ-10", "REQ-9", "req-1"]);
    }

    #[test]
    fn multi_segment_id_keeps_leading_zeros() {
        let id = RequirementId::try_from("REQ-CORE-007").unwrap();
        assert_eq!(id.as_str(), "REQ-CORE-007");
        assert_ne!(id, RequirementId::try_from("REQ-CORE-7").unwrap());
    }

    #[test]
    fn serde_as_string() {
        let id = RequirementId::try_from("REQ-1").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"REQ-1\"");
        let back: RequirementId = serde_json::from_str("\"REQ-1\"").unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<RequirementId>("\"REQ\"").is_err());
    }

    #[test]
    fn error_display() {
        let error = InvalidIdError::Number("REQ-x".to_string(), "x".to_string());
        assert_eq!(
            error.to_string(),
            "invalid requirement id 'REQ-x': expected an unsigned integer, got 'x'"
        );
    }
}
