//! Diagnostic request types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Output frequency class of a request (`mon`, `day`, `6hrPt`, ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FrequencyClass(String);

impl FrequencyClass {
    pub fn new(frequency: impl Into<String>) -> Self {
        Self(frequency.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FrequencyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FrequencyClass {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Unordered set of dimension tokens, e.g. `longitude latitude alevel time`.
///
/// Two descriptors are equal when they hold the same tokens, whatever the
/// order they were written in.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DomainDescriptor {
    tokens: BTreeSet<String>,
}

impl DomainDescriptor {
    pub fn parse(text: &str) -> Self {
        Self {
            tokens: text.split_whitespace().map(str::to_string).collect(),
        }
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> + '_ {
        self.tokens.iter().map(String::as_str)
    }

    /// Copy of this descriptor with one more token.
    pub fn with_token(&self, token: &str) -> Self {
        let mut tokens = self.tokens.clone();
        tokens.insert(token.to_string());
        Self { tokens }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl fmt::Display for DomainDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self.tokens.iter().map(String::as_str).collect::<Vec<_>>();
        f.write_str(&joined.join(" "))
    }
}

impl From<&str> for DomainDescriptor {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

/// One row of the request list: a CF variable wanted at a frequency over a domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticRequest {
    pub variable: String,
    pub frequency: FrequencyClass,
    pub domain: DomainDescriptor,
    /// Realm column of the source table; informational only.
    #[serde(default)]
    pub realm: String,
}

impl DiagnosticRequest {
    pub fn new(
        variable: impl Into<String>,
        frequency: impl Into<FrequencyClass>,
        domain: impl Into<DomainDescriptor>,
    ) -> Self {
        Self {
            variable: variable.into().trim().to_string(),
            frequency: frequency.into(),
            domain: domain.into(),
            realm: String::new(),
        }
    }

    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = realm.into();
        self
    }

    /// Synthetic request for a sub-diagnostic reached while expanding this one.
    pub fn for_variable(&self, variable: &str) -> Self {
        Self {
            variable: variable.to_string(),
            ..self.clone()
        }
    }
}

impl fmt::Display for DiagnosticRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} [{}]", self.variable, self.frequency, self.domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_is_order_insensitive() {
        let a = DomainDescriptor::parse("longitude latitude alevel time");
        let b = DomainDescriptor::parse("time alevel  latitude longitude");
        assert_eq!(a, b);
        assert!(a.contains("alevel"));
        assert!(!a.contains("plev19"));
    }

    #[test]
    fn test_descriptor_with_token() {
        let base = DomainDescriptor::parse("longitude latitude time");
        let soil = base.with_token("sdepth");
        assert!(soil.contains("sdepth"));
        assert!(!base.contains("sdepth"));
    }

    #[test]
    fn test_request_for_variable_keeps_domain() {
        let request = DiagnosticRequest::new("evs", "mon", "longitude latitude time");
        let sub = request.for_variable("ficeberg");
        assert_eq!(sub.variable, "ficeberg");
        assert_eq!(sub.frequency.as_str(), "mon");
        assert_eq!(sub.domain, request.domain);
    }

    #[test]
    fn test_request_serde_round_trip() {
        let request = DiagnosticRequest::new("tas", "day", "longitude latitude height2m time")
            .with_realm("atmos");
        let json = serde_json::to_string(&request).unwrap();
        let back: DiagnosticRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, request);
    }
}
