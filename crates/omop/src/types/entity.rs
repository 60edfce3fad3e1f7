//! Relational entity records.
//!
//! Entities mirror rows of the OMOP tables with their foreign keys resolved
//! into nested records. Everything except the surrogate key of a referenced
//! row is nullable. The engine reads and writes whole snapshots; it never
//! issues partial-field updates.
//!
//! Each entity exposes its columns through [`FieldSource`] using the same
//! dotted paths the predicate builder emits, e.g. `drugConcept.conceptCode`.

// Entity fields are named after their OMOP columns
#![allow(missing_docs)]

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::ids::InternalId;
use crate::types::predicate::Literal;

/// Concept id meaning "no matching concept".
pub const NO_MATCHING_CONCEPT: i64 = 0;

/// The value of one column.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// The column is null.
    Null,
    /// The column holds a value.
    Value(Literal),
}

impl FieldValue {
    fn text(value: &Option<String>) -> Self {
        match value {
            Some(v) => FieldValue::Value(Literal::Text(v.clone())),
            None => FieldValue::Null,
        }
    }

    fn date(value: Option<NaiveDate>) -> Self {
        match value {
            Some(v) => FieldValue::Value(Literal::Date(v)),
            None => FieldValue::Null,
        }
    }

    fn id(value: Option<InternalId>) -> Self {
        match value {
            Some(v) => FieldValue::Value(Literal::Integer(v.value())),
            None => FieldValue::Null,
        }
    }
}

/// Column access by dotted path.
pub trait FieldSource {
    /// Returns the column value, or `None` if `path` is not a column of this
    /// record.
    fn field_value(&self, path: &str) -> Option<FieldValue>;
}

/// A row type owned by the persistence collaborator.
pub trait Entity: FieldSource + Clone + Send + Sync + 'static {
    /// Table name, for logging and errors.
    const TABLE: &'static str;

    /// The surrogate key, absent before the first insert.
    fn id(&self) -> Option<InternalId>;

    /// Sets the surrogate key.
    fn set_id(&mut self, id: InternalId);
}

/// A row of the `concept` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    pub id: i64,
    pub concept_name: Option<String>,
    pub vocabulary_id: Option<String>,
    pub concept_code: Option<String>,
}

impl Concept {
    /// Creates a concept.
    pub fn new(
        id: i64,
        vocabulary_id: impl Into<String>,
        concept_code: impl Into<String>,
        concept_name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            concept_name: Some(concept_name.into()),
            vocabulary_id: Some(vocabulary_id.into()),
            concept_code: Some(concept_code.into()),
        }
    }

    /// Returns true for the "no matching concept" row.
    pub fn is_no_matching(&self) -> bool {
        self.id == NO_MATCHING_CONCEPT
    }

    fn field(&self, column: &str) -> Option<FieldValue> {
        match column {
            "id" => Some(FieldValue::Value(Literal::Integer(self.id))),
            "conceptName" => Some(FieldValue::text(&self.concept_name)),
            "vocabularyId" => Some(FieldValue::text(&self.vocabulary_id)),
            "conceptCode" => Some(FieldValue::text(&self.concept_code)),
            _ => None,
        }
    }
}

/// A row of the `f_person` view: a person with name parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FPerson {
    pub id: InternalId,
    pub family_name: Option<String>,
    pub given_name1: Option<String>,
    pub given_name2: Option<String>,
    pub prefix_name: Option<String>,
    pub suffix_name: Option<String>,
    pub person_source_value: Option<String>,
}

impl FPerson {
    /// A person with only a key.
    pub fn with_id(id: InternalId) -> Self {
        Self {
            id,
            family_name: None,
            given_name1: None,
            given_name2: None,
            prefix_name: None,
            suffix_name: None,
            person_source_value: None,
        }
    }

    fn field(&self, column: &str) -> Option<FieldValue> {
        match column {
            "id" => Some(FieldValue::id(Some(self.id))),
            "familyName" => Some(FieldValue::text(&self.family_name)),
            "givenName1" => Some(FieldValue::text(&self.given_name1)),
            "givenName2" => Some(FieldValue::text(&self.given_name2)),
            "prefixName" => Some(FieldValue::text(&self.prefix_name)),
            "suffixName" => Some(FieldValue::text(&self.suffix_name)),
            "personSourceValue" => Some(FieldValue::text(&self.person_source_value)),
            _ => None,
        }
    }
}

/// A row of the `visit_occurrence` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitOccurrence {
    pub id: InternalId,
}

/// A row of the `provider` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub id: InternalId,
    pub provider_name: Option<String>,
}

/// A row of the `drug_exposure` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrugExposure {
    pub id: Option<InternalId>,
    pub f_person: Option<FPerson>,
    pub visit_occurrence: Option<VisitOccurrence>,
    pub drug_concept: Option<Concept>,
    pub drug_exposure_start_date: Option<NaiveDate>,
    pub drug_exposure_end_date: Option<NaiveDate>,
    pub quantity: Option<f64>,
    pub dose_unit_source_value: Option<String>,
    pub route_concept: Option<Concept>,
    pub sig: Option<String>,
    pub stop_reason: Option<String>,
    pub provider: Option<Provider>,
}

/// Looks up `column` on an optional joined row; a missing row reads as null.
fn joined<T>(
    row: Option<&T>,
    column: &str,
    field: impl Fn(&T, &str) -> Option<FieldValue>,
    known: &[&str],
) -> Option<FieldValue> {
    match row {
        Some(row) => field(row, column),
        None if known.contains(&column) => Some(FieldValue::Null),
        None => None,
    }
}

const CONCEPT_COLUMNS: &[&str] = &["id", "conceptName", "vocabularyId", "conceptCode"];
const PERSON_COLUMNS: &[&str] = &[
    "id",
    "familyName",
    "givenName1",
    "givenName2",
    "prefixName",
    "suffixName",
    "personSourceValue",
];

impl FieldSource for DrugExposure {
    fn field_value(&self, path: &str) -> Option<FieldValue> {
        if let Some((table, column)) = path.split_once('.') {
            return match table {
                "fPerson" => joined(self.f_person.as_ref(), column, FPerson::field, PERSON_COLUMNS),
                "visitOccurrence" => joined(
                    self.visit_occurrence.as_ref(),
                    column,
                    |v, c| (c == "id").then(|| FieldValue::id(Some(v.id))),
                    &["id"],
                ),
                "drugConcept" => joined(
                    self.drug_concept.as_ref(),
                    column,
                    Concept::field,
                    CONCEPT_COLUMNS,
                ),
                "routeConcept" => joined(
                    self.route_concept.as_ref(),
                    column,
                    Concept::field,
                    CONCEPT_COLUMNS,
                ),
                "provider" => joined(
                    self.provider.as_ref(),
                    column,
                    |p, c| match c {
                        "id" => Some(FieldValue::id(Some(p.id))),
                        "providerName" => Some(FieldValue::text(&p.provider_name)),
                        _ => None,
                    },
                    &["id", "providerName"],
                ),
                _ => None,
            };
        }

        match path {
            "id" => Some(FieldValue::id(self.id)),
            "drugExposureStartDate" => Some(FieldValue::date(self.drug_exposure_start_date)),
            "drugExposureEndDate" => Some(FieldValue::date(self.drug_exposure_end_date)),
            "doseUnitSourceValue" => Some(FieldValue::text(&self.dose_unit_source_value)),
            "sig" => Some(FieldValue::text(&self.sig)),
            "stopReason" => Some(FieldValue::text(&self.stop_reason)),
            _ => None,
        }
    }
}

impl Entity for DrugExposure {
    const TABLE: &'static str = "drug_exposure";

    fn id(&self) -> Option<InternalId> {
        self.id
    }

    fn set_id(&mut self, id: InternalId) {
        self.id = Some(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exposure() -> DrugExposure {
        DrugExposure {
            id: Some(InternalId::new(3)),
            f_person: Some(FPerson {
                family_name: Some("Smith".to_string()),
                ..FPerson::with_id(InternalId::new(10))
            }),
            drug_concept: Some(Concept::new(19019073, "RxNorm", "197806", "Ibuprofen 600 MG")),
            drug_exposure_start_date: NaiveDate::from_ymd_opt(2020, 1, 15),
            ..Default::default()
        }
    }

    #[test]
    fn test_top_level_columns() {
        let e = exposure();
        assert_eq!(
            e.field_value("id"),
            Some(FieldValue::Value(Literal::Integer(3)))
        );
        assert_eq!(
            e.field_value("drugExposureStartDate"),
            Some(FieldValue::Value(Literal::Date(
                NaiveDate::from_ymd_opt(2020, 1, 15).unwrap()
            )))
        );
        assert_eq!(e.field_value("sig"), Some(FieldValue::Null));
        assert_eq!(e.field_value("noSuchColumn"), None);
    }

    #[test]
    fn test_joined_columns() {
        let e = exposure();
        assert_eq!(
            e.field_value("drugConcept.conceptCode"),
            Some(FieldValue::Value(Literal::text("197806")))
        );
        assert_eq!(
            e.field_value("fPerson.familyName"),
            Some(FieldValue::Value(Literal::text("Smith")))
        );
        assert_eq!(e.field_value("fPerson.givenName1"), Some(FieldValue::Null));
        assert_eq!(e.field_value("fPerson.nickname"), None);
    }

    #[test]
    fn test_missing_joined_row_reads_as_null() {
        let e = exposure();
        assert_eq!(e.field_value("visitOccurrence.id"), Some(FieldValue::Null));
        assert_eq!(e.field_value("routeConcept.vocabularyId"), Some(FieldValue::Null));
        assert_eq!(e.field_value("provider.providerName"), Some(FieldValue::Null));
        assert_eq!(e.field_value("provider.npi"), None);
        assert_eq!(e.field_value("careSite.id"), None);
    }

    #[test]
    fn test_no_matching_concept() {
        assert!(Concept::default().is_no_matching());
        assert!(!Concept::new(1, "RxNorm", "1", "x").is_no_matching());
    }
}
