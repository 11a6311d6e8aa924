use std::fmt;

use serde::{
    Serialize,
    ser::{SerializeMap, Serializer},
};

use crate::model::InlineElement;

pub const RESERVED_NAMED_ATTRIBUTE_STYLE: &str = "style";
pub const RESERVED_NAMED_ATTRIBUTE_ID: &str = "id";
pub const RESERVED_NAMED_ATTRIBUTE_ROLES: &str = "roles";
pub const RESERVED_NAMED_ATTRIBUTE_OPTIONS: &str = "options";
pub const RESERVED_NAMED_ATTRIBUTE_TITLE: &str = "title";
pub const RESERVED_NAMED_ATTRIBUTE_SUBS: &str = "subs";
pub const RESERVED_NAMED_ATTRIBUTE_IMAGESDIR: &str = "imagesdir";
pub const RESERVED_NAMED_ATTRIBUTE_QUOTE_AUTHOR: &str = "quote_author";
pub const RESERVED_NAMED_ATTRIBUTE_QUOTE_TITLE: &str = "quote_title";
pub const RESERVED_NAMED_ATTRIBUTE_IMAGE_ALT: &str = "image_alt";
pub const RESERVED_NAMED_ATTRIBUTE_INLINE_LINK_TEXT: &str = "inline_link_text";
pub const RESERVED_NAMED_ATTRIBUTE_LANGUAGE: &str = "language";
pub const RESERVED_NAMED_ATTRIBUTE_REFTEXT: &str = "reftext";

/// An `AttributeValue` is the value bound to a name in an [`Attributes`] map.
///
/// Scalars come from attribute declarations and block attribute lines, lists
/// carry `roles` and `options`, and inline sequences hold values that went
/// through inline substitution (titles, quote attributions, link text).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    Integer(i64),
    Bool(bool),
    List(Vec<String>),
    Inlines(Vec<InlineElement>),
}

impl AttributeValue {
    /// The value as plain text, the way an attribute reference would see it.
    ///
    /// A `true` flag reads as the empty string; `false` has no text.
    #[must_use]
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::String(value) => Some(value.clone()),
            Self::Integer(value) => Some(value.to_string()),
            Self::Bool(true) => Some(String::new()),
            Self::Bool(false) => None,
            Self::List(values) => Some(values.join(",")),
            Self::Inlines(elements) => Some(crate::model::plain_text(elements)),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(text) => write!(f, "{text}"),
            None => Ok(()),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

/// An ordered mapping from attribute name to [`AttributeValue`].
///
/// Insertion order is kept: re-inserting an existing name replaces the value
/// in place.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Attributes(Vec<(String, AttributeValue)>);

impl Serialize for Attributes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            state.serialize_entry(key, value)?;
        }
        state.end()
    }
}

impl Attributes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.0
            .iter()
            .find_map(|(key, value)| (key == name).then_some(value))
    }

    #[must_use]
    pub fn get_mut(&mut self, name: &str) -> Option<&mut AttributeValue> {
        self.0
            .iter_mut()
            .find_map(|(key, value)| (key == name).then_some(value))
    }

    /// Returns the value for `name` when it is a plain string.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        if let Some(AttributeValue::String(value)) = self.get(name) {
            Some(value.as_str())
        } else {
            None
        }
    }

    #[must_use]
    pub fn contains_key(&self, name: &str) -> bool {
        self.0.iter().any(|(key, _)| key == name)
    }

    /// Inserts a value, returning the one it replaced.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Option<AttributeValue> {
        let name = name.into();
        let value = value.into();
        if let Some(existing) = self.get_mut(&name) {
            return Some(std::mem::replace(existing, value));
        }
        self.0.push((name, value));
        None
    }

    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        let index = self.0.iter().position(|(key, _)| key == name)?;
        Some(self.0.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttributeValue)> {
        self.0.iter().map(|(key, value)| (key, value))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut AttributeValue)> {
        self.0.iter_mut().map(|(key, value)| (&*key, value))
    }

    /// Merge `other` into `self`.
    ///
    /// Scalars from `other` override, `roles` and `options` lists are
    /// appended so they never collapse into a scalar.
    pub fn merge(&mut self, other: Attributes) {
        for (key, value) in other.0 {
            if let Some(existing) = self.get_mut(&key) {
                match (existing, value) {
                    (AttributeValue::List(existing), AttributeValue::List(values)) => {
                        existing.extend(values);
                    }
                    (existing, value) => *existing = value,
                }
            } else {
                self.0.push((key, value));
            }
        }
    }

    #[must_use]
    pub fn style(&self) -> Option<&str> {
        self.get_str(RESERVED_NAMED_ATTRIBUTE_STYLE)
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.get_str(RESERVED_NAMED_ATTRIBUTE_ID)
    }

    #[must_use]
    pub fn roles(&self) -> &[String] {
        self.list(RESERVED_NAMED_ATTRIBUTE_ROLES)
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        self.list(RESERVED_NAMED_ATTRIBUTE_OPTIONS)
    }

    #[must_use]
    pub fn has_option(&self, option: &str) -> bool {
        self.options().iter().any(|o| o == option)
    }

    pub fn push_role(&mut self, role: impl Into<String>) {
        self.push_to_list(RESERVED_NAMED_ATTRIBUTE_ROLES, role.into());
    }

    pub fn push_option(&mut self, option: impl Into<String>) {
        self.push_to_list(RESERVED_NAMED_ATTRIBUTE_OPTIONS, option.into());
    }

    fn list(&self, name: &str) -> &[String] {
        if let Some(AttributeValue::List(values)) = self.get(name) {
            values
        } else {
            &[]
        }
    }

    fn push_to_list(&mut self, name: &str, value: String) {
        match self.get_mut(name) {
            Some(AttributeValue::List(values)) => values.push(value),
            Some(other) => {
                let mut values = other.as_text().into_iter().collect::<Vec<_>>();
                values.push(value);
                *other = AttributeValue::List(values);
            }
            None => self.0.push((name.to_string(), AttributeValue::List(vec![value]))),
        }
    }
}

impl FromIterator<(String, AttributeValue)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (String, AttributeValue)>>(iter: T) -> Self {
        let mut attributes = Self::new();
        for (key, value) in iter {
            attributes.insert(key, value);
        }
        attributes
    }
}

impl IntoIterator for Attributes {
    type Item = (String, AttributeValue);
    type IntoIter = std::vec::IntoIter<(String, AttributeValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn insert_keeps_order_and_replaces_in_place() {
        let mut attributes = Attributes::new();
        attributes.insert("b", "1");
        attributes.insert("a", "2");
        attributes.insert("b", "3");
        let keys = attributes.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(attributes.get_str("b"), Some("3"));
    }

    #[test]
    fn merge_appends_lists_and_overrides_scalars() {
        let mut first = Attributes::new();
        first.insert("style", "quote");
        first.push_role("lead");
        let mut second = Attributes::new();
        second.insert("style", "verse");
        second.push_role("fancy");
        first.merge(second);
        assert_eq!(first.style(), Some("verse"));
        assert_eq!(first.roles(), &["lead".to_string(), "fancy".to_string()]);
    }

    #[test]
    fn roles_never_collapse_into_scalars() {
        let mut attributes = Attributes::new();
        attributes.insert(RESERVED_NAMED_ATTRIBUTE_ROLES, "one");
        attributes.push_role("two");
        assert_eq!(
            attributes.get(RESERVED_NAMED_ATTRIBUTE_ROLES),
            Some(&AttributeValue::List(vec!["one".into(), "two".into()]))
        );
    }

    #[test]
    fn serializes_as_ordered_map() -> Result<(), serde_json::Error> {
        let mut attributes = Attributes::new();
        attributes.insert("z", true);
        attributes.insert("a", 3_i64);
        assert_eq!(serde_json::to_string(&attributes)?, r#"{"z":true,"a":3}"#);
        Ok(())
    }

    #[test]
    fn flag_reads_as_empty_text() {
        assert_eq!(AttributeValue::Bool(true).as_text(), Some(String::new()));
        assert_eq!(AttributeValue::Bool(false).as_text(), None);
    }
}
