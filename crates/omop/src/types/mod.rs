//! Core types for the translation engine.
//!
//! - [`PredicateNode`], [`PredicateList`] - the backend-agnostic query algebra
//! - [`SearchRequest`], [`SearchValue`] - typed search input
//! - [`Window`], [`OrderSpec`] - windowed retrieval
//! - [`MedicationAdministration`], [`MedicationDispense`] - canonical records
//! - [`DrugExposure`] and its joined rows - relational entities
//! - [`ExternalId`], [`InternalId`], [`ResourceKind`] - identifier spaces
//!
//! # Building a Predicate
//!
//! ```
//! use helios_omop::types::{Literal, Operator, PredicateList, PredicateNode, ValueType};
//!
//! let node = PredicateNode::single(
//!     ValueType::String,
//!     "drugConcept.vocabularyId",
//!     Operator::Eq,
//!     Literal::text("RxNorm"),
//! )
//! .with_condition("drugConcept.conceptCode", Operator::Like, Literal::text("197806"));
//!
//! let list = PredicateList::from_nodes(vec![node]);
//! assert_eq!(list.len(), 1);
//! ```

mod entity;
mod ids;
mod pagination;
mod predicate;
mod resource;
mod search_params;

pub use entity::{
    Concept, DrugExposure, Entity, FPerson, FieldSource, FieldValue, NO_MATCHING_CONCEPT,
    Provider, VisitOccurrence,
};
pub use ids::{ExternalId, InternalId, ResourceKind};
pub use pagination::{ID_FIELD, OrderKey, OrderSpec, Window};
pub use predicate::{
    Clause, Condition, Literal, Operator, PredicateList, PredicateNode, Relationship, ValueType,
    escape_like,
};
pub use resource::{
    AdministrationDosage, Annotation, CanonicalResource, CodeableConcept, Coding, DispensePerformer,
    Dosage, MedicationAdministration, MedicationDispense, MedicationStatus, Period, Quantity,
    Reference,
};
pub use search_params::{
    DateParam, ReferenceParam, SearchModifier, SearchParameter, SearchPrefix, SearchRequest,
    SearchValue, SortDirection, SortDirective, TokenParam,
};
