//! Scheme compiler: nested valency groups -> flat slot schemes.
//!
//! Each group expands into every k-combination of its children; a chosen
//! child that itself expands into several tuples contributes the Cartesian
//! product of those tuples. Candidate tuples are then normalized to sorted
//! sets, deduplicated, and every tuple contained in another is dropped,
//! since covering the larger scheme covers the smaller one.

use serde::Serialize;
use tracing::debug;

use nwise_ir::SchemeNode;

use crate::constraint::ParamLookup;
use crate::domain::DomainRegistry;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemeError {
    #[error("scheme references unknown parameter '{0}'")]
    UnknownParameter(String),

    #[error("invalid scheme node: valency {valency} with {children} children")]
    InvalidSchemeNode { valency: usize, children: usize },
}

/// A sorted, duplicate-free set of parameters that must be jointly covered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SlotScheme {
    params: Vec<String>,
}

impl SlotScheme {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut params: Vec<String> = names.into_iter().map(Into::into).collect();
        params.sort();
        params.dedup();
        Self { params }
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn contains(&self, param: &str) -> bool {
        self.position(param).is_some()
    }

    pub fn position(&self, param: &str) -> Option<usize> {
        self.params
            .binary_search_by(|p| p.as_str().cmp(param))
            .ok()
    }

    pub fn is_subset_of(&self, other: &SlotScheme) -> bool {
        self.params.iter().all(|p| other.contains(p))
    }

    /// True when every parameter of the scheme is assigned in `lookup`.
    pub fn is_assigned_in<L: ParamLookup + ?Sized>(&self, lookup: &L) -> bool {
        self.params.iter().all(|p| lookup.lookup(p).is_some())
    }
}

/// Smaller schemes first, then by name sequence.
impl Ord for SlotScheme {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.len()
            .cmp(&other.len())
            .then_with(|| self.params.cmp(&other.params))
    }
}

impl PartialOrd for SlotScheme {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for SlotScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{}}}", self.params.join(","))
    }
}

/// Compile a scheme tree into its reduced list of slot schemes.
pub fn compile_scheme(
    node: &SchemeNode,
    registry: &DomainRegistry,
) -> Result<Vec<SlotScheme>, SchemeError> {
    let tuples = expand(node, registry)?;
    debug!(candidates = tuples.len(), "expanded coverage scheme");
    let schemes = reduce_schemes(tuples);
    for scheme in &schemes {
        debug!(%scheme, "slot scheme");
    }
    Ok(schemes)
}

/// Normalize, order by (size, lexicographic), deduplicate and drop subsets.
///
/// Idempotent: reducing an already reduced list returns it unchanged.
pub fn reduce_schemes<I, T>(tuples: I) -> Vec<SlotScheme>
where
    I: IntoIterator<Item = T>,
    T: IntoIterator,
    T::Item: Into<String>,
{
    let mut schemes: Vec<SlotScheme> = tuples.into_iter().map(SlotScheme::new).collect();
    schemes.sort();
    schemes.dedup();

    let mut result = Vec::with_capacity(schemes.len());
    for (i, scheme) in schemes.iter().enumerate() {
        // Only later (not smaller) entries can contain this one.
        let redundant = schemes[i + 1..].iter().any(|s| scheme.is_subset_of(s));
        if !redundant {
            result.push(scheme.clone());
        }
    }
    result
}

fn expand(node: &SchemeNode, registry: &DomainRegistry) -> Result<Vec<Vec<String>>, SchemeError> {
    match node {
        SchemeNode::Leaf(name) => {
            if !registry.contains(name) {
                return Err(SchemeError::UnknownParameter(name.clone()));
            }
            Ok(vec![vec![name.clone()]])
        }
        SchemeNode::Group { valency, children } => {
            if *valency == 0 || *valency > children.len() {
                return Err(SchemeError::InvalidSchemeNode {
                    valency: *valency,
                    children: children.len(),
                });
            }
            let expanded = children
                .iter()
                .map(|child| expand(child, registry))
                .collect::<Result<Vec<_>, _>>()?;

            let mut out = Vec::new();
            for combo in combinations(expanded.len(), *valency) {
                let chosen: Vec<&[Vec<String>]> =
                    combo.iter().map(|&i| expanded[i].as_slice()).collect();
                concat_product(&chosen, &mut out);
            }
            Ok(out)
        }
    }
}

/// All k-subsets of `0..n` in lexicographic order.
pub(crate) fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    if k == 0 || k > n {
        return out;
    }
    let mut idx: Vec<usize> = (0..k).collect();
    loop {
        out.push(idx.clone());
        // Rightmost position that can still move forward.
        let mut i = k;
        while i > 0 && idx[i - 1] == n - k + (i - 1) {
            i -= 1;
        }
        if i == 0 {
            return out;
        }
        idx[i - 1] += 1;
        for j in i..k {
            idx[j] = idx[j - 1] + 1;
        }
    }
}

/// Append one concatenated tuple per element of the Cartesian product of `lists`.
fn concat_product(lists: &[&[Vec<String>]], out: &mut Vec<Vec<String>>) {
    if lists.iter().any(|l| l.is_empty()) {
        return;
    }
    let mut cursor = vec![0usize; lists.len()];
    loop {
        let tuple: Vec<String> = cursor
            .iter()
            .zip(lists)
            .flat_map(|(&i, list)| list[i].iter().cloned())
            .collect();
        out.push(tuple);

        // Odometer step, last list fastest.
        let mut pos = lists.len();
        loop {
            if pos == 0 {
                return;
            }
            pos -= 1;
            cursor[pos] += 1;
            if cursor[pos] < lists[pos].len() {
                break;
            }
            cursor[pos] = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nwise_ir::Value;
    use std::collections::BTreeMap;

    fn registry(names: &[&str]) -> DomainRegistry {
        let domains: BTreeMap<String, Vec<Value>> = names
            .iter()
            .map(|n| (n.to_string(), vec![Value::Int(0), Value::Int(1)]))
            .collect();
        DomainRegistry::new(domains)
    }

    fn names(schemes: &[SlotScheme]) -> Vec<Vec<&str>> {
        schemes
            .iter()
            .map(|s| s.params().iter().map(String::as_str).collect())
            .collect()
    }

    #[test]
    fn test_combinations() {
        assert_eq!(
            combinations(4, 2),
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![0, 3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3]
            ]
        );
        assert_eq!(combinations(3, 3), vec![vec![0, 1, 2]]);
        assert!(combinations(2, 3).is_empty());
    }

    #[test]
    fn test_pairwise_flat() {
        let reg = registry(&["a", "b", "c"]);
        let schemes = compile_scheme(&SchemeNode::over(2, &["c", "a", "b"]), &reg).unwrap();
        assert_eq!(
            names(&schemes),
            vec![vec!["a", "b"], vec!["a", "c"], vec!["b", "c"]]
        );
    }

    #[test]
    fn test_nested_group_takes_product_of_child_expansions() {
        // 2-wise over [a, 1-wise(b, c)] -> {a,b}, {a,c}
        let reg = registry(&["a", "b", "c"]);
        let node = SchemeNode::group(
            2,
            vec![SchemeNode::leaf("a"), SchemeNode::over(1, &["b", "c"])],
        );
        let schemes = compile_scheme(&node, &reg).unwrap();
        assert_eq!(names(&schemes), vec![vec!["a", "b"], vec!["a", "c"]]);
    }

    #[test]
    fn test_subsets_removed() {
        // 1-wise over [a, 2-wise(a, b)] -> {a} is inside {a,b}
        let reg = registry(&["a", "b"]);
        let node = SchemeNode::group(
            1,
            vec![SchemeNode::leaf("a"), SchemeNode::over(2, &["a", "b"])],
        );
        let schemes = compile_scheme(&node, &reg).unwrap();
        assert_eq!(names(&schemes), vec![vec!["a", "b"]]);
    }

    #[test]
    fn test_repeated_parameter_collapses() {
        let reg = registry(&["a", "b"]);
        let node = SchemeNode::group(
            2,
            vec![SchemeNode::leaf("a"), SchemeNode::over(1, &["a", "b"])],
        );
        let schemes = compile_scheme(&node, &reg).unwrap();
        // (a,a) -> {a}, (a,b) -> {a,b}; {a} is dropped.
        assert_eq!(names(&schemes), vec![vec!["a", "b"]]);
    }

    #[test]
    fn test_invalid_valency() {
        let reg = registry(&["a", "b"]);
        let err = compile_scheme(&SchemeNode::over(3, &["a", "b"]), &reg).unwrap_err();
        assert_eq!(
            err,
            SchemeError::InvalidSchemeNode {
                valency: 3,
                children: 2
            }
        );
        let err = compile_scheme(&SchemeNode::over(0, &["a"]), &reg).unwrap_err();
        assert!(matches!(err, SchemeError::InvalidSchemeNode { valency: 0, .. }));
    }

    #[test]
    fn test_unknown_leaf() {
        let reg = registry(&["a"]);
        let err = compile_scheme(&SchemeNode::over(1, &["a", "ghost"]), &reg).unwrap_err();
        assert_eq!(err, SchemeError::UnknownParameter("ghost".to_string()));
    }

    #[test]
    fn test_bare_leaf_root() {
        let reg = registry(&["a"]);
        let schemes = compile_scheme(&SchemeNode::leaf("a"), &reg).unwrap();
        assert_eq!(names(&schemes), vec![vec!["a"]]);
    }

    #[test]
    fn test_reduce_idempotent() {
        let reg = registry(&["a", "b", "c", "d"]);
        let node = SchemeNode::group(
            2,
            vec![
                SchemeNode::over(2, &["a", "b", "c"]),
                SchemeNode::leaf("d"),
                SchemeNode::leaf("a"),
            ],
        );
        let once = compile_scheme(&node, &reg).unwrap();
        let twice = reduce_schemes(once.iter().map(|s| s.params().to_vec()));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_slot_scheme_ordering_and_display() {
        let s = SlotScheme::new(["b", "a", "b"]);
        assert_eq!(s.params(), &["a".to_string(), "b".to_string()]);
        assert_eq!(s.position("b"), Some(1));
        assert_eq!(s.to_string(), "{a,b}");

        // Size before names: {z} < {a,b} < {a,c}.
        assert!(SlotScheme::new(["z"]) < s);
        assert!(s < SlotScheme::new(["a", "c"]));
        assert_eq!(s.cmp(&SlotScheme::new(["a", "b"])), std::cmp::Ordering::Equal);
    }
}
