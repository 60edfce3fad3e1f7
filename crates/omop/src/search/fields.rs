//! How a search parameter maps onto entity columns.

use crate::types::ResourceKind;

/// The column mapping of one search parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSpec {
    /// The surrogate key of the searched kind, `_id`.
    Id,
    /// A coded column pair, searched by token or value set.
    Coded {
        /// Column holding the vocabulary id.
        vocabulary_path: &'static str,
        /// Column holding the concept code.
        code_path: &'static str,
    },
    /// A date column compared with a search prefix.
    Date {
        /// The date column.
        path: &'static str,
    },
    /// A foreign key to a row of another kind.
    Reference {
        /// The foreign-key column.
        path: &'static str,
        /// Kind of the referenced row.
        target: ResourceKind,
    },
    /// A column of the referenced patient.
    PatientChain(PatientChain),
}

/// Searchable parameters of a chained `Patient`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatientChain {
    /// `Patient:_id`
    Id,
    /// `Patient:name`
    Name,
    /// `Patient:identifier`
    Identifier,
}

impl PatientChain {
    /// Parses the chained parameter name, e.g. `name` in `subject.name`.
    pub fn parse(chain: &str) -> Option<Self> {
        match chain {
            "_id" => Some(PatientChain::Id),
            "name" => Some(PatientChain::Name),
            "identifier" => Some(PatientChain::Identifier),
            _ => None,
        }
    }

    /// The parameter name the builder accepts, e.g. `Patient:name`.
    pub fn parameter_name(&self) -> &'static str {
        match self {
            PatientChain::Id => "Patient:_id",
            PatientChain::Name => "Patient:name",
            PatientChain::Identifier => "Patient:identifier",
        }
    }
}

/// Resolves the `Patient:*` parameter names shared by every patient-linked kind.
pub fn patient_chain_field(name: &str) -> Option<FieldSpec> {
    let chain = name.strip_prefix("Patient:")?;
    PatientChain::parse(chain).map(FieldSpec::PatientChain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patient_chain_names() {
        for chain in [PatientChain::Id, PatientChain::Name, PatientChain::Identifier] {
            assert_eq!(
                patient_chain_field(chain.parameter_name()),
                Some(FieldSpec::PatientChain(chain))
            );
        }
        assert_eq!(patient_chain_field("Patient:birthdate"), None);
        assert_eq!(patient_chain_field("name"), None);
    }
}
