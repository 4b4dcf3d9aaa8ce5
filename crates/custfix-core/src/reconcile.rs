//! Placeholder customer-name reconciliation.
//!
//! A pass queries the source collection for documents whose `customer_name`
//! is the placeholder, resolves a real name for each one, and writes it back.
//! Every candidate is handled independently: a store failure on one record
//! lands in the error bucket and the pass moves on. Only the initial
//! candidate query can fail the whole pass.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::clock::{Clock, SystemClock};
use crate::config::{ReconcileConfig, Strategy};
use crate::document::{Document, Fields};
use crate::error::Result;
use crate::store::DocumentStore;

/// Field that marks a candidate and receives the resolved name.
pub const CUSTOMER_NAME_FIELD: &str = "customer_name";

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub strategy: Strategy,
    pub placeholder: String,
    /// Candidate fields tried in order when resolving a name.
    pub name_fields: Vec<String>,
    /// Holds the customer id on candidates; also the fallback query field on
    /// the lookup collection.
    pub id_field: String,
    pub updated_by: String,
    pub dry_run: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self::from(&ReconcileConfig::default())
    }
}

impl From<&ReconcileConfig> for ReconcileOptions {
    fn from(cfg: &ReconcileConfig) -> Self {
        Self {
            strategy: cfg.strategy,
            placeholder: cfg.placeholder.clone(),
            name_fields: cfg.name_fields.clone(),
            id_field: cfg.id_field.clone(),
            updated_by: cfg.updated_by.clone(),
            dry_run: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    Fixed { name: String },
    NotFound,
    NoValidName,
    Error { message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateOutcome {
    pub id: String,
    pub customer_id: String,
    pub resolution: Resolution,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub fixed: usize,
    /// Lookup misses plus lookups with no usable name.
    pub not_found: usize,
    /// The no-usable-name share of `not_found`.
    pub invalid_name: usize,
    pub errors: usize,
    pub dry_run: bool,
}

impl Summary {
    fn record(&mut self, resolution: &Resolution) {
        match resolution {
            Resolution::Fixed { .. } => self.fixed += 1,
            Resolution::NotFound => self.not_found += 1,
            Resolution::NoValidName => {
                self.not_found += 1;
                self.invalid_name += 1;
            }
            Resolution::Error { .. } => self.errors += 1,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub summary: Summary,
    pub outcomes: Vec<CandidateOutcome>,
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

pub struct Reconciler<C: Clock = SystemClock> {
    options: ReconcileOptions,
    clock: C,
}

impl Reconciler<SystemClock> {
    pub fn new(options: ReconcileOptions) -> Self {
        Self::with_clock(options, SystemClock)
    }
}

impl<C: Clock> Reconciler<C> {
    pub fn with_clock(options: ReconcileOptions, clock: C) -> Self {
        Self { options, clock }
    }

    /// Run one pass. `lookup` is ignored under [`Strategy::SameRecord`].
    pub fn run(&self, source: &dyn DocumentStore, lookup: &dyn DocumentStore) -> Result<Report> {
        self.run_with(source, lookup, |_| {})
    }

    /// Like [`Reconciler::run`], calling `on_outcome` as each candidate
    /// settles, before the next one is looked at.
    pub fn run_with<F>(
        &self,
        source: &dyn DocumentStore,
        lookup: &dyn DocumentStore,
        mut on_outcome: F,
    ) -> Result<Report>
    where
        F: FnMut(&CandidateOutcome),
    {
        let opts = &self.options;
        tracing::info!(
            source = source.name(),
            lookup = lookup.name(),
            strategy = %opts.strategy,
            dry_run = opts.dry_run,
            "reconcile pass starting"
        );

        let placeholder = Value::String(opts.placeholder.clone());
        let candidates = source.find_eq(CUSTOMER_NAME_FIELD, &placeholder, None)?;

        let mut report = Report {
            summary: Summary {
                dry_run: opts.dry_run,
                ..Summary::default()
            },
            outcomes: Vec::with_capacity(candidates.len()),
        };
        if candidates.is_empty() {
            tracing::info!(source = source.name(), "no placeholder candidates");
            return Ok(report);
        }
        report.summary.total = candidates.len();

        for candidate in &candidates {
            let customer_id = derive_customer_id(candidate, &opts.id_field);
            let resolution = match self.process(candidate, &customer_id, source, lookup) {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(id = %candidate.id, error = %e, "candidate failed");
                    Resolution::Error {
                        message: e.to_string(),
                    }
                }
            };
            tracing::debug!(id = %candidate.id, customer_id = %customer_id, ?resolution);
            report.summary.record(&resolution);
            let outcome = CandidateOutcome {
                id: candidate.id.clone(),
                customer_id,
                resolution,
            };
            on_outcome(&outcome);
            report.outcomes.push(outcome);
        }

        let s = &report.summary;
        tracing::info!(
            total = s.total,
            fixed = s.fixed,
            not_found = s.not_found,
            errors = s.errors,
            "reconcile pass finished"
        );
        Ok(report)
    }

    fn process(
        &self,
        candidate: &Document,
        customer_id: &str,
        source: &dyn DocumentStore,
        lookup: &dyn DocumentStore,
    ) -> Result<Resolution> {
        let name = match self.options.strategy {
            Strategy::CrossCollection => {
                let Some(found) = self.find_lookup(lookup, customer_id)? else {
                    return Ok(Resolution::NotFound);
                };
                first_name(&found, &self.options.name_fields)
            }
            Strategy::SameRecord => {
                let fields: Vec<String> = self
                    .options
                    .name_fields
                    .iter()
                    .filter(|f| *f != CUSTOMER_NAME_FIELD)
                    .cloned()
                    .collect();
                first_name(candidate, &fields)
            }
        };

        if name.is_empty() || name == self.options.placeholder {
            return Ok(Resolution::NoValidName);
        }

        if !self.options.dry_run {
            source.update(&candidate.id, &self.patch(&name))?;
        }
        Ok(Resolution::Fixed { name })
    }

    /// Direct id hit first, then the first document whose id field matches.
    fn find_lookup(&self, lookup: &dyn DocumentStore, customer_id: &str) -> Result<Option<Document>> {
        if let Some(doc) = lookup.get(customer_id)? {
            return Ok(Some(doc));
        }
        let by_field = lookup.find_eq(
            &self.options.id_field,
            &Value::String(customer_id.to_string()),
            Some(1),
        )?;
        Ok(by_field.into_iter().next())
    }

    fn patch(&self, name: &str) -> Fields {
        let mut patch = Map::new();
        patch.insert(CUSTOMER_NAME_FIELD.to_string(), Value::from(name));
        patch.insert("name".to_string(), Value::from(name));
        patch.insert(
            "updated_at".to_string(),
            Value::from(self.clock.now().to_rfc3339()),
        );
        patch.insert(
            "updated_by".to_string(),
            Value::from(self.options.updated_by.as_str()),
        );
        patch
    }
}

/// One pass with default options and the system clock.
pub fn reconcile(source: &dyn DocumentStore, lookup: &dyn DocumentStore) -> Result<Report> {
    Reconciler::new(ReconcileOptions::default()).run(source, lookup)
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

/// The candidate's own customer id when set, otherwise its document id.
/// Empty strings and zero count as unset.
pub fn derive_customer_id(candidate: &Document, id_field: &str) -> String {
    match candidate.get(id_field) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) if n.as_f64() != Some(0.0) => n.to_string(),
        _ => candidate.id.clone(),
    }
}

/// First non-empty string among `fields`, or the empty string.
pub fn first_name(doc: &Document, fields: &[String]) -> String {
    fields
        .iter()
        .find_map(|f| doc.non_empty_str(f))
        .unwrap_or_default()
        .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
