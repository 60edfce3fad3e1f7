//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;

use helios_omop::EngineConfig;
use helios_omop::backends::{ConceptTable, MemoryStore};
use helios_omop::context::EngineContext;
use helios_omop::core::{ConceptSet, EntityStorage, TerminologyClient, ValueSetCompose};
use helios_omop::error::{OmopResult, TerminologyError, TerminologyResult};
use helios_omop::types::{
    CodeableConcept, Coding, Concept, DrugExposure, FPerson, InternalId, MedicationAdministration,
    OrderSpec, PredicateList, Provider, Reference, VisitOccurrence, Window,
};

pub const RXNORM: &str = "http://www.nlm.nih.gov/research/umls/rxnorm";
pub const SNOMED: &str = "http://snomed.info/sct";
pub const NDC: &str = "http://hl7.org/fhir/sid/ndc";

pub const ANALGESICS: &str = "http://example.org/fhir/ValueSet/analgesics";
pub const EMPTY_SET: &str = "http://example.org/fhir/ValueSet/empty";

/// Terminology service answering from a fixed table.
#[derive(Debug, Default)]
pub struct StubTerminology {
    value_sets: HashMap<String, ValueSetCompose>,
    calls: AtomicUsize,
}

impl StubTerminology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value_set(mut self, url: &str, compose: ValueSetCompose) -> Self {
        self.value_sets.insert(url.to_string(), compose);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TerminologyClient for StubTerminology {
    async fn expand_value_set(&self, url: &str) -> TerminologyResult<ValueSetCompose> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.value_sets
            .get(url)
            .cloned()
            .ok_or_else(|| TerminologyError::ValueSetNotFound {
                url: url.to_string(),
            })
    }
}

/// Terminology service that is always down.
#[derive(Debug, Default)]
pub struct DownTerminology;

#[async_trait]
impl TerminologyClient for DownTerminology {
    async fn expand_value_set(&self, _url: &str) -> TerminologyResult<ValueSetCompose> {
        Err(TerminologyError::Unavailable {
            message: "connection refused".to_string(),
        })
    }
}

/// Storage wrapper counting `count` calls.
#[derive(Debug, Default)]
pub struct CountingStore {
    inner: MemoryStore<DrugExposure>,
    counts: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: MemoryStore<DrugExposure>) -> Self {
        Self {
            inner,
            counts: AtomicUsize::new(0),
        }
    }

    pub fn count_calls(&self) -> usize {
        self.counts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntityStorage<DrugExposure> for CountingStore {
    fn backend_name(&self) -> &'static str {
        "counting"
    }

    async fn create(&self, entity: DrugExposure) -> OmopResult<DrugExposure> {
        self.inner.create(entity).await
    }

    async fn update(&self, entity: DrugExposure) -> OmopResult<DrugExposure> {
        self.inner.update(entity).await
    }

    async fn read(&self, id: InternalId) -> OmopResult<Option<DrugExposure>> {
        self.inner.read(id).await
    }

    async fn count(&self, filter: &PredicateList) -> OmopResult<u64> {
        self.counts.fetch_add(1, Ordering::SeqCst);
        self.inner.count(filter).await
    }

    async fn find(
        &self,
        filter: &PredicateList,
        window: Window,
        order: &OrderSpec,
    ) -> OmopResult<Vec<DrugExposure>> {
        self.inner.find(filter, window, order).await
    }

    async fn delete_by_id(&self, id: InternalId) -> OmopResult<u64> {
        self.inner.delete_by_id(id).await
    }
}

pub fn ibuprofen() -> Concept {
    Concept::new(1127433, "RxNorm", "197806", "ibuprofen 600 MG Oral Tablet")
}

pub fn acetaminophen() -> Concept {
    Concept::new(1125315, "RxNorm", "313782", "acetaminophen 325 MG Oral Tablet")
}

pub fn amoxicillin() -> Concept {
    Concept::new(1713332, "RxNorm", "308182", "amoxicillin 250 MG Oral Capsule")
}

pub fn oral_route() -> Concept {
    Concept::new(4132161, "SNOMED", "26643006", "Oral route")
}

pub fn concepts() -> ConceptTable {
    ConceptTable::from_concepts(vec![
        ibuprofen(),
        acetaminophen(),
        amoxicillin(),
        oral_route(),
        Concept::new(8576, "UCUM", "mg", "milligram"),
    ])
}

pub fn analgesics() -> ValueSetCompose {
    ValueSetCompose {
        include: vec![
            ConceptSet::new(RXNORM, ["197806", "313782"]),
            ConceptSet::new(NDC, ["0000-0000"]),
        ],
        exclude: vec![ConceptSet::new(RXNORM, ["313782"])],
    }
}

pub fn terminology() -> StubTerminology {
    StubTerminology::new()
        .with_value_set(ANALGESICS, analgesics())
        .with_value_set(EMPTY_SET, ValueSetCompose::default())
}

pub fn context() -> EngineContext {
    EngineContext::from_config(EngineConfig::for_testing(), Arc::new(concepts()))
        .expect("test configuration is valid")
        .with_terminology(Arc::new(terminology()))
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn person(id: i64, family: &str, given: &str, mrn: &str) -> FPerson {
    FPerson {
        family_name: Some(family.to_string()),
        given_name1: Some(given.to_string()),
        person_source_value: Some(mrn.to_string()),
        ..FPerson::with_id(InternalId::new(id))
    }
}

pub fn exposure(person: FPerson, drug: Concept, start: NaiveDate) -> DrugExposure {
    DrugExposure {
        f_person: Some(person),
        drug_concept: Some(drug),
        drug_exposure_start_date: Some(start),
        quantity: Some(600.0),
        dose_unit_source_value: Some("mg".to_string()),
        route_concept: Some(oral_route()),
        sig: Some("1 tablet every 8 hours".to_string()),
        ..Default::default()
    }
}

/// Six exposures for two patients, keys 1 to 6.
///
/// | key | patient | drug | start | visit | provider | stop reason |
/// |-----|---------|------|-------|-------|----------|-------------|
/// | 1 | Smith | ibuprofen | 2024-01-10 | 100 | 21 | |
/// | 2 | Smith | acetaminophen | 2024-02-10 | | | |
/// | 3 | Doe | ibuprofen | 2024-03-10 | 101 | | adverse reaction |
/// | 4 | Doe | amoxicillin | 2024-01-20 | | 21 | |
/// | 5 | Smith | amoxicillin | 2024-02-20 | | | |
/// | 6 | Doe | none | none | | | |
pub fn seeded_store() -> MemoryStore<DrugExposure> {
    let smith = person(1, "Smith", "Jane", "MRN-001");
    let doe = person(2, "Doe", "John", "MRN-002");
    let store = MemoryStore::new();

    store.insert(DrugExposure {
        visit_occurrence: Some(VisitOccurrence {
            id: InternalId::new(100),
        }),
        provider: Some(Provider {
            id: InternalId::new(21),
            provider_name: Some("Dr. House".to_string()),
        }),
        ..exposure(smith.clone(), ibuprofen(), date(2024, 1, 10))
    });
    store.insert(exposure(smith.clone(), acetaminophen(), date(2024, 2, 10)));
    store.insert(DrugExposure {
        visit_occurrence: Some(VisitOccurrence {
            id: InternalId::new(101),
        }),
        stop_reason: Some("adverse reaction".to_string()),
        ..exposure(doe.clone(), ibuprofen(), date(2024, 3, 10))
    });
    store.insert(DrugExposure {
        provider: Some(Provider {
            id: InternalId::new(21),
            provider_name: Some("Dr. House".to_string()),
        }),
        ..exposure(doe.clone(), amoxicillin(), date(2024, 1, 20))
    });
    store.insert(exposure(smith, amoxicillin(), date(2024, 2, 20)));
    store.insert(DrugExposure {
        f_person: Some(doe),
        ..Default::default()
    });
    store
}

/// A valid administration for patient 1.
pub fn administration() -> MedicationAdministration {
    MedicationAdministration {
        subject: Some(Reference {
            reference: Some("Patient/1".to_string()),
            display: None,
        }),
        medication_codeable_concept: Some(CodeableConcept {
            coding: vec![Coding {
                system: Some(RXNORM.to_string()),
                code: Some("197806".to_string()),
                display: None,
            }],
            text: None,
        }),
        ..Default::default()
    }
}

/// External ids of resources, in order.
pub fn ids<'a, I, R>(resources: I) -> Vec<i64>
where
    I: IntoIterator<Item = &'a R>,
    R: helios_omop::types::CanonicalResource + 'a,
{
    resources
        .into_iter()
        .map(|r| r.id().and_then(|id| id.parse().ok()).unwrap_or(-1))
        .collect()
}
