//! Named record predicates and the pipeline that applies them.
//!
//! Each filter is an independent toggle. Enabled filters are ANDed; adding
//! a new one is a `register` call and leaves the others untouched.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use catalog_model::Record;
use serde::{Deserialize, Serialize};

/// Identifier of a registered filter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterName(String);

impl FilterName {
    pub const HAS_OUTBOUND_LINK: &'static str = "has_outbound_link";
    pub const NOT_CONTACTED: &'static str = "not_contacted";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn has_outbound_link() -> Self {
        Self::new(Self::HAS_OUTBOUND_LINK)
    }

    pub fn not_contacted() -> Self {
        Self::new(Self::NOT_CONTACTED)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FilterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FilterName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

pub type Predicate = Arc<dyn Fn(&Record) -> bool + Send + Sync>;

/// A named predicate with the label shown on its toggle.
#[derive(Clone)]
pub struct FilterDef {
    pub name: FilterName,
    pub label: String,
    predicate: Predicate,
}

impl FilterDef {
    pub fn new(
        name: impl Into<FilterName>,
        label: impl Into<String>,
        predicate: impl Fn(&Record) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// True when the record passes this filter.
    pub fn matches(&self, record: &Record) -> bool {
        (self.predicate)(record)
    }
}

impl fmt::Debug for FilterDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterDef")
            .field("name", &self.name)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Available filters, kept in registration order.
#[derive(Debug, Clone, Default)]
pub struct FilterRegistry {
    filters: Vec<FilterDef>,
}

impl FilterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Registry with the product table's standard toggles.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(FilterDef::new(
            FilterName::HAS_OUTBOUND_LINK,
            "Hide products without a seller link",
            Record::has_outbound_link,
        ));
        registry.register(FilterDef::new(
            FilterName::NOT_CONTACTED,
            "Hide contacted products",
            |record: &Record| !record.contacted.is_contacted(),
        ));
        registry
    }

    /// Add a filter. A filter with the same name is replaced in place.
    pub fn register(&mut self, filter: FilterDef) {
        match self.filters.iter_mut().find(|f| f.name == filter.name) {
            Some(existing) => *existing = filter,
            None => self.filters.push(filter),
        }
    }

    pub fn get(&self, name: &FilterName) -> Option<&FilterDef> {
        self.filters.iter().find(|f| &f.name == name)
    }

    pub fn contains(&self, name: &FilterName) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilterDef> {
        self.filters.iter()
    }
}

/// Which filters are switched on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSpec {
    enabled: BTreeSet<FilterName>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self, name: &FilterName) -> bool {
        self.enabled.contains(name)
    }

    /// Flip one toggle and return its new state.
    pub fn toggle(&mut self, name: &FilterName) -> bool {
        if self.enabled.remove(name) {
            false
        } else {
            self.enabled.insert(name.clone());
            true
        }
    }

    pub fn enable(&mut self, name: FilterName) {
        self.enabled.insert(name);
    }

    pub fn disable(&mut self, name: &FilterName) {
        self.enabled.remove(name);
    }

    pub fn enabled(&self) -> impl Iterator<Item = &FilterName> {
        self.enabled.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.enabled.is_empty()
    }
}

/// Keep the records that pass every enabled filter, in input order.
///
/// Enabled names without a registered filter are ignored.
pub fn apply_filters<'a, I>(records: I, registry: &FilterRegistry, spec: &FilterSpec) -> Vec<Arc<Record>>
where
    I: IntoIterator<Item = &'a Arc<Record>>,
{
    let active: Vec<&FilterDef> = registry
        .iter()
        .filter(|filter| spec.is_enabled(&filter.name))
        .collect();

    records
        .into_iter()
        .filter(|record| active.iter().all(|filter| filter.matches(record)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use catalog_model::{ContactStatus, RecordId};

    use super::*;

    fn record(id: &str) -> Arc<Record> {
        Arc::new(Record::new(RecordId::new(id).unwrap()))
    }

    fn sample() -> Vec<Arc<Record>> {
        vec![
            Arc::new(
                Record::new(RecordId::new("linked").unwrap())
                    .with_secondary_link(Some("https://seller.example.com")),
            ),
            Arc::new(
                Record::new(RecordId::new("sentinel").unwrap()).with_secondary_link(Some("none")),
            ),
            Arc::new(
                Record::new(RecordId::new("contacted").unwrap())
                    .with_secondary_link(Some("https://other.example.com"))
                    .with_contacted(ContactStatus::Yes),
            ),
            Arc::new(Record::new(RecordId::new("declined").unwrap()).with_contacted(ContactStatus::No)),
            record("bare"),
        ]
    }

    fn ids(records: &[Arc<Record>]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn no_enabled_filters_keeps_everything() {
        let records = sample();
        let out = apply_filters(&records, &FilterRegistry::builtin(), &FilterSpec::new());
        assert_eq!(out.len(), records.len());
    }

    #[test]
    fn outbound_link_filter_drops_sentinel_and_missing() {
        let mut spec = FilterSpec::new();
        spec.enable(FilterName::has_outbound_link());
        let records = sample();
        let out = apply_filters(&records, &FilterRegistry::builtin(), &spec);
        assert_eq!(ids(&out), vec!["linked", "contacted"]);
    }

    #[test]
    fn not_contacted_passes_unset_and_no() {
        let mut spec = FilterSpec::new();
        spec.enable(FilterName::not_contacted());
        let records = sample();
        let out = apply_filters(&records, &FilterRegistry::builtin(), &spec);
        assert_eq!(ids(&out), vec!["linked", "sentinel", "declined", "bare"]);
    }

    #[test]
    fn enabled_filters_are_anded() {
        let mut spec = FilterSpec::new();
        spec.enable(FilterName::not_contacted());
        spec.enable(FilterName::has_outbound_link());
        let records = sample();
        let out = apply_filters(&records, &FilterRegistry::builtin(), &spec);
        assert_eq!(ids(&out), vec!["linked"]);
    }

    #[test]
    fn custom_filter_extends_registry() {
        let mut registry = FilterRegistry::builtin();
        registry.register(FilterDef::new("has_category", "Hide uncategorized", |r: &Record| {
            r.category.is_some()
        }));
        assert_eq!(registry.len(), 3);

        let mut spec = FilterSpec::new();
        spec.enable(FilterName::new("has_category"));
        let records = vec![
            Arc::new(Record::new(RecordId::new("a").unwrap()).with_category(Some("Toys"))),
            record("b"),
        ];
        assert_eq!(ids(&apply_filters(&records, &registry, &spec)), vec!["a"]);
    }

    #[test]
    fn register_replaces_same_name() {
        let mut registry = FilterRegistry::builtin();
        registry.register(FilterDef::new(FilterName::NOT_CONTACTED, "Everything", |_: &Record| true));
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.get(&FilterName::not_contacted()).unwrap().label,
            "Everything"
        );
        assert_eq!(registry.iter().nth(1).unwrap().name, FilterName::not_contacted());
    }

    #[test]
    fn toggle_flips_state() {
        let mut spec = FilterSpec::new();
        let name = FilterName::not_contacted();
        assert!(spec.toggle(&name));
        assert!(spec.is_enabled(&name));
        assert!(!spec.toggle(&name));
        assert!(spec.is_empty());
    }
}
