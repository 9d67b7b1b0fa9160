//! Hierarchical rollup for nested-proportion charts.
//!
//! Leaf rows (country under region) are kept as-is. Region aggregates sum
//! their leaves once, and the root sums the regions once. Countries without a
//! region hang directly off the root. Every node's value therefore equals the
//! sum of its children's values, for every metric.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::domain::{MetricValues, Observation};
use crate::schema::{Metric, Region};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeLevel {
    Root,
    Region,
    Leaf,
}

/// One node of the rollup tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollupNode {
    /// Unique path id, e.g. `World/Europe/France`.
    pub id: String,
    pub label: String,
    /// Parent id; `None` for the root.
    pub parent: Option<String>,
    pub level: NodeLevel,
    pub values: MetricValues,
}

/// Flat root + region + leaf node list.
#[derive(Debug, Clone)]
pub struct Rollup {
    pub root_label: String,
    /// Root first, then regions, then leaves.
    pub nodes: Vec<RollupNode>,
}

/// `(ids, labels, parents, values)` columns for one metric.
///
/// The root's parent is the empty string. Missing values are rendered as `0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollupTriple {
    pub metric: Metric,
    pub ids: Vec<String>,
    pub labels: Vec<String>,
    pub parents: Vec<String>,
    pub values: Vec<f64>,
}

impl Rollup {
    pub fn root(&self) -> &RollupNode {
        &self.nodes[0]
    }

    pub fn node(&self, id: &str) -> Option<&RollupNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn children<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a RollupNode> + 'a {
        self.nodes
            .iter()
            .filter(move |n| n.parent.as_deref() == Some(id))
    }

    pub fn leaves(&self) -> impl Iterator<Item = &RollupNode> {
        self.nodes.iter().filter(|n| n.level == NodeLevel::Leaf)
    }

    /// Extract the renderer triple for one metric.
    pub fn triple(&self, metric: Metric) -> RollupTriple {
        let n = self.nodes.len();
        let mut triple = RollupTriple {
            metric,
            ids: Vec::with_capacity(n),
            labels: Vec::with_capacity(n),
            parents: Vec::with_capacity(n),
            values: Vec::with_capacity(n),
        };
        for node in &self.nodes {
            triple.ids.push(node.id.clone());
            triple.labels.push(node.label.clone());
            triple.parents.push(node.parent.clone().unwrap_or_default());
            triple.values.push(node.values.get(metric).unwrap_or(0.0));
        }
        triple
    }
}

/// Build the three-level rollup over `leaves`.
///
/// The leaf rows themselves are only read; their values are copied into leaf
/// nodes unchanged.
pub fn build_rollup(leaves: &[Observation], root_label: &str) -> Rollup {
    let root_id = root_label.to_string();

    let mut by_region: BTreeMap<Option<Region>, Vec<&Observation>> = BTreeMap::new();
    for leaf in leaves {
        by_region.entry(leaf.entity.region).or_default().push(leaf);
    }

    let mut region_nodes = Vec::new();
    let mut leaf_nodes = Vec::with_capacity(leaves.len());
    let mut root_children = Vec::new();

    for (region, rows) in &by_region {
        let parent_id = match region {
            Some(region) => {
                let region_values = sum_values(rows.iter().map(|r| &r.metrics));
                let id = format!("{root_id}/{}", region.display_name());
                debug!(region = region.display_name(), leaves = rows.len(), "region aggregate");
                region_nodes.push(RollupNode {
                    id: id.clone(),
                    label: region.display_name().to_string(),
                    parent: Some(root_id.clone()),
                    level: NodeLevel::Region,
                    values: region_values,
                });
                root_children.push(region_values);
                id
            }
            None => {
                root_children.extend(rows.iter().map(|r| r.metrics));
                root_id.clone()
            }
        };

        for row in rows {
            leaf_nodes.push(RollupNode {
                id: format!("{parent_id}/{}", row.country()),
                label: row.country().to_string(),
                parent: Some(parent_id.clone()),
                level: NodeLevel::Leaf,
                values: row.metrics,
            });
        }
    }

    let root = RollupNode {
        id: root_id,
        label: root_label.to_string(),
        parent: None,
        level: NodeLevel::Root,
        values: sum_values(root_children.iter()),
    };

    let mut nodes = Vec::with_capacity(1 + region_nodes.len() + leaf_nodes.len());
    nodes.push(root);
    nodes.extend(region_nodes);
    nodes.extend(leaf_nodes);

    Rollup {
        root_label: root_label.to_string(),
        nodes,
    }
}

/// Element-wise sum; a metric stays `None` only when every input lacks it.
fn sum_values<'a>(values: impl Iterator<Item = &'a MetricValues>) -> MetricValues {
    let mut out = MetricValues::default();
    for v in values {
        for m in Metric::ALL {
            if let Some(x) = v.get(m) {
                out.set(m, Some(out.get(m).unwrap_or(0.0) + x));
            }
        }
    }
    out
}
