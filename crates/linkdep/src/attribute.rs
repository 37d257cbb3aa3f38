//! Module attributes
//!
//! Attributes qualify a module reference. They change how a module is
//! resolved and linked, never which module a reference points at.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single attribute token
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Attribute {
    /// Interfaces are included as system headers
    System,

    /// Not registered here; silences the unregistered-module warning
    External,

    /// Contributes interfaces only and is never linked
    HeaderOnly,

    /// Same effect as `HeaderOnly`
    NoLink,

    /// Linked whenever the depending module is, even if already satisfied
    AlwaysLink,

    /// Set on references that were substituted by an override
    Overridden,

    /// Unrecognized token, carried along but otherwise inert
    Unknown(String),
}

impl Attribute {
    /// Parse an attribute token
    ///
    /// Unrecognized tokens are kept as [`Attribute::Unknown`] rather than rejected.
    pub fn parse(token: &str) -> Self {
        match token {
            "system" => Attribute::System,
            "external" => Attribute::External,
            "header_only" => Attribute::HeaderOnly,
            "no_link" => Attribute::NoLink,
            "always_link" => Attribute::AlwaysLink,
            "overridden" => Attribute::Overridden,
            other => Attribute::Unknown(other.to_string()),
        }
    }

    /// The token as written in manifests
    pub fn as_str(&self) -> &str {
        match self {
            Attribute::System => "system",
            Attribute::External => "external",
            Attribute::HeaderOnly => "header_only",
            Attribute::NoLink => "no_link",
            Attribute::AlwaysLink => "always_link",
            Attribute::Overridden => "overridden",
            Attribute::Unknown(token) => token,
        }
    }

    /// Check if this is one of the recognized tokens
    pub fn is_known(&self) -> bool {
        !matches!(self, Attribute::Unknown(_))
    }
}

impl From<&str> for Attribute {
    fn from(token: &str) -> Self {
        Attribute::parse(token)
    }
}

impl From<String> for Attribute {
    fn from(token: String) -> Self {
        Attribute::parse(&token)
    }
}

impl From<Attribute> for String {
    fn from(attribute: Attribute) -> Self {
        attribute.as_str().to_string()
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An unordered set of attributes
///
/// Iteration follows insertion order so that diagnostics are stable, but
/// equality ignores order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(IndexSet<Attribute>);

impl Attributes {
    /// Create an empty attribute set
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a list of tokens
    pub fn parse<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        tokens
            .into_iter()
            .map(|token| Attribute::parse(token.as_ref()))
            .collect()
    }

    /// Add an attribute, returning `true` if it was not present yet
    pub fn insert(&mut self, attribute: Attribute) -> bool {
        self.0.insert(attribute)
    }

    /// Add every attribute of `other`
    pub fn merge(&mut self, other: &Attributes) {
        self.0.extend(other.0.iter().cloned());
    }

    pub fn contains(&self, attribute: &Attribute) -> bool {
        self.0.contains(attribute)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.0.iter()
    }

    /// Tokens that are not part of the recognized vocabulary
    pub fn unknown(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter(|attribute| !attribute.is_known())
            .map(Attribute::as_str)
            .collect()
    }

    /// Whether a module carrying these attributes ends up on the link line
    pub fn is_linked(&self) -> bool {
        !self.contains(&Attribute::HeaderOnly) && !self.contains(&Attribute::NoLink)
    }
}

impl FromIterator<Attribute> for Attributes {
    fn from_iter<I: IntoIterator<Item = Attribute>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = &'a Attribute;
    type IntoIter = indexmap::set::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, attribute) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            f.write_str(attribute.as_str())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_tokens() {
        assert_eq!(Attribute::parse("system"), Attribute::System);
        assert_eq!(Attribute::parse("header_only"), Attribute::HeaderOnly);
        assert_eq!(Attribute::parse("always_link"), Attribute::AlwaysLink);
        assert_eq!(Attribute::HeaderOnly.as_str(), "header_only");
    }

    #[test]
    fn test_unknown_attributes() {
        let attributes = Attributes::parse(["link_always", "always_link", "bob"]);

        assert_eq!(attributes.unknown(), vec!["link_always", "bob"]);
        assert!(attributes.contains(&Attribute::AlwaysLink));
        assert!(!Attribute::parse("bob").is_known());
    }

    #[test]
    fn test_equality_ignores_order() {
        let a = Attributes::parse(["system", "no_link"]);
        let b = Attributes::parse(["no_link", "system"]);

        assert_eq!(a, b);
        assert_eq!(a.to_string(), "system, no_link");
    }

    #[test]
    fn test_is_linked() {
        assert!(Attributes::new().is_linked());
        assert!(Attributes::parse(["system"]).is_linked());
        assert!(!Attributes::parse(["header_only"]).is_linked());
        assert!(!Attributes::parse(["no_link"]).is_linked());
    }

    #[test]
    fn test_serde_tokens() {
        #[derive(Deserialize)]
        struct Wrapper {
            attributes: Attributes,
        }

        let wrapper: Wrapper = toml::from_str(r#"attributes = ["system", "shiny"]"#).unwrap();

        assert!(wrapper.attributes.contains(&Attribute::System));
        assert!(wrapper
            .attributes
            .contains(&Attribute::Unknown("shiny".to_string())));
        assert_eq!(wrapper.attributes.unknown(), vec!["shiny"]);
    }
}
