//! Domain registry: flat parameter name -> ordered list of legal values.

use std::collections::{BTreeMap, HashMap};

use nwise_ir::Value;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),
}

/// Read-only registry built once from validated domains.
///
/// Besides the ordered domains it keeps a value -> position index per
/// parameter so a slot can be addressed inside its bucket without a scan.
#[derive(Debug, Clone, Default)]
pub struct DomainRegistry {
    domains: BTreeMap<String, Vec<Value>>,
    positions: HashMap<String, HashMap<Value, usize>>,
}

impl DomainRegistry {
    /// Domains must be non-empty and free of duplicate values
    /// (see `validate::validate_domains`).
    pub fn new(domains: BTreeMap<String, Vec<Value>>) -> Self {
        let positions = domains
            .iter()
            .map(|(name, values)| {
                let index = values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (v.clone(), i))
                    .collect();
                (name.clone(), index)
            })
            .collect();
        Self { domains, positions }
    }

    pub fn domain(&self, param: &str) -> Result<&[Value], DomainError> {
        self.domains
            .get(param)
            .map(Vec::as_slice)
            .ok_or_else(|| DomainError::UnknownParameter(param.to_string()))
    }

    pub fn contains(&self, param: &str) -> bool {
        self.domains.contains_key(param)
    }

    /// Parameter names in sorted order.
    pub fn parameters(&self) -> impl Iterator<Item = &str> {
        self.domains.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Position of `value` inside the domain of `param`.
    pub fn index_of(&self, param: &str, value: &Value) -> Option<usize> {
        self.positions.get(param)?.get(value).copied()
    }

    pub fn domains(&self) -> &BTreeMap<String, Vec<Value>> {
        &self.domains
    }
}
