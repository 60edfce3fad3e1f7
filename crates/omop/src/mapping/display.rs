//! Display-name composition from sparse name parts.
//!
//! Rule: a family name anchors the display and is joined to the given names
//! with `", "`, given names are joined with a single space. Without a family
//! name only the leading given name is shown. Null or empty parts are skipped
//! and a name with no parts at all is absent rather than an empty string.
//!
//! ```
//! use helios_omop::mapping::NameBuilder;
//!
//! let name = NameBuilder::new()
//!     .family(Some("Smith"))
//!     .given(Some("Jane"))
//!     .given(Some(""))
//!     .build();
//! assert_eq!(name.as_deref(), Some("Smith, Jane"));
//!
//! let name = NameBuilder::new().family(Some("")).given(Some("Jane")).given(Some("Q")).build();
//! assert_eq!(name.as_deref(), Some("Jane"));
//!
//! assert_eq!(NameBuilder::new().family(None).given(Some("")).build(), None);
//! ```

use crate::types::FPerson;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Family,
    Given,
}

/// Builds a display name from an ordered list of optional parts.
#[derive(Debug, Clone, Default)]
pub struct NameBuilder<'a> {
    parts: Vec<(Role, &'a str)>,
}

impl<'a> NameBuilder<'a> {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a family-name part.
    pub fn family(self, part: Option<&'a str>) -> Self {
        self.push(Role::Family, part)
    }

    /// Adds a given-name part; given parts keep their order.
    pub fn given(self, part: Option<&'a str>) -> Self {
        self.push(Role::Given, part)
    }

    fn push(mut self, role: Role, part: Option<&'a str>) -> Self {
        if let Some(part) = part.filter(|p| !p.is_empty()) {
            self.parts.push((role, part));
        }
        self
    }

    /// Composes the display string, or `None` if every part was absent.
    pub fn build(&self) -> Option<String> {
        let family = self
            .parts
            .iter()
            .find(|(role, _)| *role == Role::Family)
            .map(|(_, part)| *part);
        let mut given = self
            .parts
            .iter()
            .filter(|(role, _)| *role == Role::Given)
            .map(|(_, part)| *part);

        match family {
            Some(family) => {
                let given: Vec<&str> = given.collect();
                if given.is_empty() {
                    Some(family.to_string())
                } else {
                    Some(format!("{}, {}", family, given.join(" ")))
                }
            }
            None => given.next().map(str::to_string),
        }
    }
}

/// The display name of a person row.
pub fn person_display(person: &FPerson) -> Option<String> {
    NameBuilder::new()
        .family(person.family_name.as_deref())
        .given(person.given_name1.as_deref())
        .given(person.given_name2.as_deref())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InternalId;

    fn name(family: &str, given1: &str, given2: &str) -> Option<String> {
        NameBuilder::new()
            .family(Some(family))
            .given(Some(given1))
            .given(Some(given2))
            .build()
    }

    #[test]
    fn test_family_and_first_given() {
        assert_eq!(name("Smith", "Jane", "").as_deref(), Some("Smith, Jane"));
    }

    #[test]
    fn test_family_and_both_given() {
        assert_eq!(name("Smith", "Jane", "Q").as_deref(), Some("Smith, Jane Q"));
    }

    #[test]
    fn test_family_and_second_given_only() {
        assert_eq!(name("Smith", "", "Q").as_deref(), Some("Smith, Q"));
    }

    #[test]
    fn test_without_family_only_leading_given() {
        assert_eq!(name("", "Jane", "Q").as_deref(), Some("Jane"));
        assert_eq!(name("", "", "Q").as_deref(), Some("Q"));
    }

    #[test]
    fn test_family_only() {
        assert_eq!(name("Smith", "", "").as_deref(), Some("Smith"));
    }

    #[test]
    fn test_all_empty_is_absent() {
        assert_eq!(name("", "", ""), None);
        assert_eq!(NameBuilder::new().build(), None);
    }

    #[test]
    fn test_person_display() {
        let person = FPerson {
            family_name: Some("Doe".to_string()),
            given_name1: Some("John".to_string()),
            given_name2: None,
            ..FPerson::with_id(InternalId::new(1))
        };
        assert_eq!(person_display(&person).as_deref(), Some("Doe, John"));
        assert_eq!(person_display(&FPerson::with_id(InternalId::new(2))), None);
    }
}
