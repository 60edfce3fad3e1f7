//! CRUD and search over one mapped resource kind.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::context::EngineContext;
use crate::core::EntityStorage;
use crate::error::{BackendError, OmopResult, ResourceError, SearchError, ValidationError};
use crate::mapping::ResourceMapping;
use crate::search::{FieldSpec, PatientChain, PredicateBuilder};
use crate::types::{
    CanonicalResource, Entity, ExternalId, InternalId, OrderKey, OrderSpec, PredicateList,
    ReferenceParam, ResourceKind, SearchModifier, SearchParameter, SearchRequest, SearchValue,
    SortDirection, SortDirective, TokenParam,
};

use super::SearchResults;

/// The outcome class of a write, as a transport would report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// A new resource was stored.
    Created,
    /// An existing resource was replaced.
    Ok,
    /// The resource was removed.
    NoContent,
}

impl OutcomeStatus {
    /// The status code equivalent.
    pub fn http_status(&self) -> u16 {
        match self {
            OutcomeStatus::Created => 201,
            OutcomeStatus::Ok => 200,
            OutcomeStatus::NoContent => 204,
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeStatus::Created => write!(f, "created"),
            OutcomeStatus::Ok => write!(f, "ok"),
            OutcomeStatus::NoContent => write!(f, "no-content"),
        }
    }
}

/// The result of a create, update or delete.
#[derive(Debug, Clone)]
pub struct MethodOutcome<R> {
    /// What happened.
    pub status: OutcomeStatus,
    /// External id of the affected resource.
    pub id: ExternalId,
    /// The stored resource as it now reads; `None` after a delete.
    pub resource: Option<R>,
}

/// Create, read, update, delete and search for one resource kind.
///
/// The provider validates incoming resources, runs the record mapper in
/// either direction, keeps the identifier translator in step with storage
/// and turns search requests into predicate lists.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use helios_omop::backends::MemoryStore;
/// use helios_omop::mapping::MedicationAdministrationMapping;
/// use helios_omop::provider::ResourceProvider;
///
/// let provider = ResourceProvider::new(
///     Arc::new(context),
///     MedicationAdministrationMapping,
///     Arc::new(MemoryStore::new()),
/// );
/// let outcome = provider.create(&administration).await?;
/// assert_eq!(outcome.status.http_status(), 201);
/// ```
pub struct ResourceProvider<M, S> {
    context: Arc<EngineContext>,
    mapping: Arc<M>,
    storage: Arc<S>,
}

impl<M, S> ResourceProvider<M, S>
where
    M: ResourceMapping,
    S: EntityStorage<M::Entity>,
{
    /// Creates a provider.
    pub fn new(context: Arc<EngineContext>, mapping: M, storage: Arc<S>) -> Self {
        Self {
            context,
            mapping: Arc::new(mapping),
            storage,
        }
    }

    /// The engine context.
    pub fn context(&self) -> &EngineContext {
        &self.context
    }

    /// The record mapper.
    pub fn mapping(&self) -> &M {
        &self.mapping
    }

    /// The storage collaborator.
    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    fn kind(&self) -> ResourceKind {
        self.mapping.kind()
    }

    fn not_found(&self, id: ExternalId) -> ResourceError {
        ResourceError::NotFound {
            resource_type: self.kind().to_string(),
            id: id.to_string(),
        }
    }

    /// Checks the fields every stored resource must carry.
    ///
    /// # Errors
    ///
    /// * `ValidationError::MissingRequiredField` - If the coded medication or
    ///   the subject is absent
    /// * `ValidationError::InvalidReference` - If the subject is not a
    ///   `Patient` reference or names an unknown patient
    pub fn validate(&self, resource: &M::Resource) -> OmopResult<()> {
        if !resource.medication().is_some_and(|m| m.has_code()) {
            return Err(ValidationError::MissingRequiredField {
                field: "medicationCodeableConcept".to_string(),
            }
            .into());
        }

        let subject = resource
            .subject()
            .ok_or_else(|| ValidationError::MissingRequiredField {
                field: "subject".to_string(),
            })?;
        let reference = subject.reference.clone().unwrap_or_default();
        if subject.target_type() != Some(ResourceKind::Patient.as_str()) {
            return Err(ValidationError::InvalidReference {
                reference,
                message: "subject must reference a Patient".to_string(),
            }
            .into());
        }
        let resolved = subject
            .target_id()
            .and_then(|id| self.context.ids().internal_from_external(id, ResourceKind::Patient));
        if resolved.is_none() {
            return Err(ValidationError::InvalidReference {
                reference,
                message: "subject does not resolve to a known Patient".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Stores a new resource.
    ///
    /// Any id on the incoming resource is ignored; storage assigns the
    /// surrogate key and the identifier translator the external id.
    ///
    /// # Errors
    ///
    /// * `OmopError::Validation` - If the resource fails [`Self::validate`]
    pub async fn create(&self, resource: &M::Resource) -> OmopResult<MethodOutcome<M::Resource>> {
        self.validate(resource)?;

        let entity = self.mapping.to_entity(&self.context, None, resource);
        let stored = self.storage.create(entity).await?;
        let internal = self.stored_id(&stored)?;
        let external = self.context.ids().assign(internal, self.kind());

        debug!(
            resource_type = %self.kind(),
            internal_id = %internal,
            id = %external,
            "Resource created"
        );

        Ok(MethodOutcome {
            status: OutcomeStatus::Created,
            id: external,
            resource: Some(self.mapping.to_canonical(&self.context, internal, &stored)?),
        })
    }

    /// Reads a resource by external id.
    ///
    /// # Errors
    ///
    /// * `ResourceError::NotFound` - If the id is unknown or its row is gone
    pub async fn read(&self, id: ExternalId) -> OmopResult<M::Resource> {
        let internal = self.resolve(id)?;
        let entity = self
            .storage
            .read(internal)
            .await?
            .ok_or_else(|| self.not_found(id))?;
        self.mapping.to_canonical(&self.context, internal, &entity)
    }

    /// Replaces a resource, keeping its ids.
    ///
    /// Columns the mapping does not model keep their stored values.
    ///
    /// # Errors
    ///
    /// * `ResourceError::NotFound` - If the id is unknown
    /// * `OmopError::Validation` - If the resource fails [`Self::validate`]
    pub async fn update(
        &self,
        id: ExternalId,
        resource: &M::Resource,
    ) -> OmopResult<MethodOutcome<M::Resource>> {
        let internal = self.resolve(id)?;
        self.validate(resource)?;

        let existing = self
            .storage
            .read(internal)
            .await?
            .ok_or_else(|| self.not_found(id))?;
        let mut entity = self
            .mapping
            .to_entity(&self.context, Some(internal), resource);
        self.mapping.carry_unmodelled(&existing, &mut entity);
        let stored = self.storage.update(entity).await?;

        debug!(resource_type = %self.kind(), id = %id, "Resource updated");

        Ok(MethodOutcome {
            status: OutcomeStatus::Ok,
            id,
            resource: Some(self.mapping.to_canonical(&self.context, internal, &stored)?),
        })
    }

    /// Deletes a resource.
    ///
    /// # Errors
    ///
    /// * `ResourceError::NotFound` - If the id is unknown or nothing was
    ///   removed
    pub async fn delete(&self, id: ExternalId) -> OmopResult<MethodOutcome<M::Resource>> {
        let internal = self.resolve(id)?;
        let removed = self.storage.delete_by_id(internal).await?;
        if removed == 0 {
            return Err(self.not_found(id).into());
        }

        debug!(resource_type = %self.kind(), id = %id, "Resource deleted");

        Ok(MethodOutcome {
            status: OutcomeStatus::NoContent,
            id,
            resource: None,
        })
    }

    /// Runs a search.
    ///
    /// Translation happens eagerly, so request errors surface here; rows are
    /// read lazily through the returned [`SearchResults`].
    ///
    /// # Errors
    ///
    /// * `SearchError::UnsupportedParameter` / `UnsupportedSort` - If the
    ///   request names something this kind cannot search or sort on
    /// * `OmopError::Validation` - If a value is malformed
    /// * `SearchError::UnmappedSystem` / `Terminology` - From coded parameters
    pub async fn search(&self, request: &SearchRequest) -> OmopResult<SearchResults<M, S>> {
        let filter = self.filter(request).await?;
        let order = self.order(&request.sort)?;

        debug!(
            resource_type = %self.kind(),
            parameters = request.parameters.len(),
            nodes = filter.len(),
            filter = %filter,
            "Translated search request"
        );

        Ok(SearchResults::new(
            self.context.clone(),
            self.mapping.clone(),
            self.storage.clone(),
            filter,
            order,
        ))
    }

    /// Translates the request parameters into a predicate list.
    ///
    /// Each parameter becomes one AND-combined clause. Every value of a
    /// parameter builds its own node sequence and the sequences are
    /// OR-combined, so the exclusions of one value set never veto the
    /// matches of another.
    pub async fn filter(&self, request: &SearchRequest) -> OmopResult<PredicateList> {
        let builder = PredicateBuilder::new(self.kind(), &self.context);
        let mut filter = PredicateList::new();

        for parameter in &request.parameters {
            let is_or = parameter.values.len() > 1;
            let mut alternatives = Vec::with_capacity(parameter.values.len());
            for value in &parameter.values {
                let (name, spec, value) = self.normalize(parameter, value)?;
                alternatives.push(builder.build_value(&name, &spec, &value, is_or).await?);
            }
            filter.or_group(alternatives);
        }
        Ok(filter)
    }

    /// Translates sort directives into an order on relational columns.
    ///
    /// # Errors
    ///
    /// * `SearchError::UnsupportedSort` - If a directive names an unknown key
    pub fn order(&self, sort: &[SortDirective]) -> OmopResult<OrderSpec> {
        sort.iter().try_fold(OrderSpec::new(), |order, directive| {
            let path = self.mapping.sort_path(&directive.parameter).ok_or_else(|| {
                SearchError::UnsupportedSort {
                    parameter: directive.parameter.clone(),
                    resource_type: self.kind().to_string(),
                }
            })?;
            let key = match directive.direction {
                SortDirection::Ascending => OrderKey::asc(path),
                SortDirection::Descending => OrderKey::desc(path),
            };
            Ok(order.then(key))
        })
    }

    fn resolve(&self, id: ExternalId) -> OmopResult<InternalId> {
        self.context
            .ids()
            .internal_from_external(id, self.kind())
            .ok_or_else(|| self.not_found(id).into())
    }

    fn stored_id(&self, stored: &M::Entity) -> OmopResult<InternalId> {
        stored.id().ok_or_else(|| {
            warn!(backend = self.storage.backend_name(), "Created row has no key");
            BackendError::Internal {
                backend_name: self.storage.backend_name().to_string(),
                message: "created row has no surrogate key".to_string(),
                source: None,
            }
            .into()
        })
    }

    /// Resolves a request parameter value to the name, column mapping and
    /// value the builder understands.
    fn normalize(
        &self,
        parameter: &SearchParameter,
        value: &SearchValue,
    ) -> OmopResult<(String, FieldSpec, SearchValue)> {
        let name = parameter.name.as_str();
        if let Some(spec) = self.mapping.search_field(name) {
            check_value_set(name, value)?;
            return Ok((name.to_string(), spec, value.clone()));
        }

        let (base, chain) = match name.split_once('.') {
            Some((base, chain)) => (base, Some(chain)),
            None => (name, None),
        };
        let (base, modifier) = match base.split_once(':') {
            Some((base, modifier)) => (base, Some(modifier)),
            None => (base, None),
        };

        if base == "subject" || base == "patient" {
            let (chain, value) = self.patient_value(name, modifier, chain, value)?;
            return Ok((
                chain.parameter_name().to_string(),
                FieldSpec::PatientChain(chain),
                value,
            ));
        }

        let value_set = modifier.and_then(SearchModifier::parse) == Some(SearchModifier::In);
        if chain.is_none() && value_set {
            if let Some(spec @ FieldSpec::Coded { .. }) = self.mapping.search_field(base) {
                let token = value_set_token(name, value)?;
                check_value_set(name, &token)?;
                return Ok((base.to_string(), spec, token));
            }
        }

        Err(self.unsupported(name).into())
    }

    /// Resolves a `subject`/`patient` value to a chained patient parameter.
    fn patient_value(
        &self,
        name: &str,
        type_modifier: Option<&str>,
        chain: Option<&str>,
        value: &SearchValue,
    ) -> OmopResult<(PatientChain, SearchValue)> {
        let reference = match value {
            SearchValue::Reference(reference) => reference.clone(),
            SearchValue::String(s) => match chain {
                Some(chain) => ReferenceParam::chained(None, chain, s.clone()),
                None => ReferenceParam::parse(s),
            },
            SearchValue::Token(token) if token.system.is_none() && token.code.is_some() => {
                let code = token.code.clone().unwrap_or_default();
                match chain {
                    Some(chain) => ReferenceParam::chained(None, chain, code),
                    None => ReferenceParam::parse(&code),
                }
            }
            _ => {
                return Err(ValidationError::InvalidSearchParameter {
                    parameter: name.to_string(),
                    message: "expected a Patient reference".to_string(),
                }
                .into());
            }
        };

        let resource_type = reference.resource_type.as_deref().or(type_modifier);
        if let Some(resource_type) = resource_type {
            if resource_type != ResourceKind::Patient.as_str() {
                return Err(ValidationError::InvalidReference {
                    reference: format!("{}/{}", resource_type, reference.value),
                    message: format!("{} must reference a Patient", name),
                }
                .into());
            }
        }

        let chain = match reference.chain.as_deref().or(chain) {
            None => PatientChain::Id,
            Some(chain) => PatientChain::parse(chain).ok_or_else(|| self.unsupported(name))?,
        };
        Ok((chain, SearchValue::String(reference.value)))
    }

    fn unsupported(&self, name: &str) -> SearchError {
        SearchError::UnsupportedParameter {
            parameter: name.to_string(),
            resource_type: self.kind().to_string(),
        }
    }
}

impl<M, S> fmt::Debug for ResourceProvider<M, S>
where
    M: ResourceMapping,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceProvider")
            .field("kind", &self.mapping.kind())
            .finish_non_exhaustive()
    }
}

fn value_set_token(name: &str, value: &SearchValue) -> OmopResult<SearchValue> {
    let token = match value {
        SearchValue::String(url) => TokenParam::value_set(url.clone()),
        SearchValue::Token(token) => token.clone().with_modifier(SearchModifier::In),
        _ => {
            return Err(ValidationError::InvalidSearchParameter {
                parameter: name.to_string(),
                message: "expected a value-set URL".to_string(),
            }
            .into());
        }
    };
    Ok(SearchValue::Token(token))
}

/// Value-set references are canonical URLs; a query string is not resolvable.
fn check_value_set(name: &str, value: &SearchValue) -> OmopResult<()> {
    if let SearchValue::Token(token) = value {
        if token.is_value_set() && token.code.as_deref().is_some_and(|url| url.contains('?')) {
            return Err(ValidationError::InvalidSearchParameter {
                parameter: name.to_string(),
                message: "value-set reference must not carry a query string".to_string(),
            }
            .into());
        }
    }
    Ok(())
}
