use std::collections::HashSet;

use crate::engine::EngineError;
use crate::limits::*;
use crate::model::ResourceId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub id: ResourceId,
    pub label: String,
}

/// The fixed pool of bookable resources, ordered by id.
#[derive(Debug, Clone)]
pub struct Registry {
    resources: Vec<Resource>,
}

impl Registry {
    pub fn new(mut resources: Vec<Resource>) -> Result<Self, EngineError> {
        if resources.is_empty() {
            return Err(EngineError::Validation("resource pool is empty".into()));
        }
        if resources.len() > MAX_RESOURCES {
            return Err(EngineError::LimitExceeded("too many resources"));
        }
        let mut seen = HashSet::with_capacity(resources.len());
        for r in &resources {
            if r.label.trim().is_empty() {
                return Err(EngineError::Validation(format!("resource {} has a blank label", r.id)));
            }
            if r.label.len() > MAX_LABEL_LEN {
                return Err(EngineError::LimitExceeded("resource label too long"));
            }
            if !seen.insert(r.id) {
                return Err(EngineError::Validation(format!("duplicate resource id {}", r.id)));
            }
        }
        resources.sort_by_key(|r| r.id);
        Ok(Self { resources })
    }

    /// Resources `1..=count` labelled `{prefix}{id}`.
    pub fn numbered(count: u32, prefix: &str) -> Result<Self, EngineError> {
        Self::new(
            (1..=count)
                .map(|id| Resource {
                    id,
                    label: format!("{prefix}{id}"),
                })
                .collect(),
        )
    }

    pub fn list(&self) -> &[Resource] {
        &self.resources
    }

    pub fn get(&self, id: ResourceId) -> Option<&Resource> {
        self.resources
            .binary_search_by_key(&id, |r| r.id)
            .ok()
            .map(|pos| &self.resources[pos])
    }

    pub fn exists(&self, id: ResourceId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
