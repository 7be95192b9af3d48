//! Mapper policy: composing the pipeline per resource type.

use std::collections::HashMap;
use std::sync::Arc;

use lithoscope_common::{HarvestError, Result};

use crate::mapper::Mapper;
use crate::resource_types::ResourceType;

/// Base mapper set plus per-resource-type additions, replacements and
/// removals. `build_for` is deterministic: remove -> replace -> add, so an
/// addition always wins over removal/replacement ordering ambiguity.
#[derive(Default)]
pub struct MapperPolicy {
    pub base: Vec<Arc<dyn Mapper>>,
    pub add: HashMap<ResourceType, Vec<Arc<dyn Mapper>>>,
    pub replace: HashMap<(ResourceType, &'static str), Arc<dyn Mapper>>,
    pub remove: HashMap<ResourceType, Vec<&'static str>>,
}

impl MapperPolicy {
    pub fn build_for(&self, rt: Option<ResourceType>) -> Vec<Arc<dyn Mapper>> {
        let mut mappers: Vec<Arc<dyn Mapper>> = self.base.clone();

        let Some(rt) = rt else {
            return mappers;
        };

        if let Some(remove_ids) = self.remove.get(&rt) {
            mappers.retain(|m| !remove_ids.contains(&m.id()));
        }

        mappers = mappers
            .into_iter()
            .map(|m| self.replace.get(&(rt, m.id())).cloned().unwrap_or(m))
            .collect();

        if let Some(extra) = self.add.get(&rt) {
            mappers.extend(extra.iter().cloned());
        }

        mappers
    }
}

/// Duplicate mapper ids are a programming error in the policy tables;
/// building such a pipeline fails before any record is touched.
pub fn assert_unique_ids(mappers: &[Arc<dyn Mapper>]) -> Result<()> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for m in mappers {
        *counts.entry(m.id()).or_default() += 1;
    }
    let mut dupes: Vec<&str> = counts
        .into_iter()
        .filter(|(_, c)| *c > 1)
        .map(|(id, _)| id)
        .collect();
    dupes.sort_unstable();
    if !dupes.is_empty() {
        return Err(HarvestError::Transform(format!(
            "Duplicate mapper ids in pipeline: {dupes:?}"
        )));
    }
    Ok(())
}
