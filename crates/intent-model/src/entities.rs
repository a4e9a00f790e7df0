//! Entity filtering over text slot lists
//!
//! An [`EntitySlotList`] derives a restricted [`TextSlotList`] from another text
//! list whose values carry entity metadata (`domain`, `device_class`) in their
//! context. The target list is looked up each time the list is applied, so the
//! result always reflects the slot lists passed in by the caller.

use crate::slot_lists::{SlotList, TextSlotList, TextSlotValue};
use crate::{IntentsError, Result};
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::HashMap;

/// Filtering criteria for entities
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntitySlotFilter {
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub device_class: Option<String>,
}

impl EntitySlotFilter {
    pub fn new(domain: Option<&str>, device_class: Option<&str>) -> Self {
        Self {
            domain: domain.map(str::to_string),
            device_class: device_class.map(str::to_string),
        }
    }

    /// Return true if the value matches this filter.
    ///
    /// Values without context never match. A filter with no criteria matches
    /// any value that has context.
    pub fn matches(&self, value: &TextSlotValue) -> bool {
        let context = match value.context.as_ref() {
            Some(context) if value.has_context() => context,
            _ => return false,
        };

        criterion_matches(context, "domain", self.domain.as_deref())
            && criterion_matches(context, "device_class", self.device_class.as_deref())
    }
}

fn criterion_matches(context: &HashMap<String, Value>, key: &str, expected: Option<&str>) -> bool {
    match expected.filter(|e| !e.is_empty()) {
        None => true,
        Some(expected) => context.get(key).and_then(Value::as_str) == Some(expected),
    }
}

/// Text list filtered from another list by entity metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySlotList {
    pub filters: Vec<EntitySlotFilter>,
    /// Name of the text list the filters run against
    pub target_name: String,
}

impl EntitySlotList {
    pub fn new(filters: Vec<EntitySlotFilter>, target_name: impl Into<String>) -> Self {
        Self {
            filters,
            target_name: target_name.into(),
        }
    }

    /// Resolve the target list in `slot_lists` and filter it.
    pub fn apply(&self, slot_lists: &HashMap<String, SlotList>) -> Result<TextSlotList> {
        let list = slot_lists
            .get(&self.target_name)
            .ok_or_else(|| IntentsError::MissingList(self.target_name.clone()))?;
        let target = list
            .as_text()
            .ok_or_else(|| IntentsError::TargetNotText(self.target_name.clone()))?;
        Ok(apply_filters(&self.filters, target))
    }
}

/// Keep the values of `target` matched by at least one filter.
///
/// An empty filter sequence keeps nothing.
pub fn apply_filters(filters: &[EntitySlotFilter], target: &TextSlotList) -> TextSlotList {
    let values = target
        .values
        .iter()
        .filter(|value| filters.iter().any(|filter| filter.matches(value)))
        .cloned()
        .collect::<Vec<_>>();

    tracing::trace!(
        kept = values.len(),
        total = target.values.len(),
        "applied entity filters"
    );
    TextSlotList::new(values)
}
