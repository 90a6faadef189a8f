//! Location hierarchy views.
//!
//! Storage keeps locations as flat rows with an optional `parent_id`. For
//! display they are assembled into a forest by [`build_location_tree`]. The
//! database does not prevent parent cycles, so the builder has to tolerate
//! them: every location on a cycle becomes a root and the locations hanging
//! off a cycle stay attached to it.

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;

use crate::errors::ServiceError;
use crate::repositories::{DeviceSummary, LocationReader, LocationRecord};

/// A location with its nested sub-locations
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LocationNode {
    pub id: i64,
    #[schema(example = "Building A")]
    pub name: String,
    pub parent_id: Option<i64>,
    pub description: Option<String>,
    pub created_by: i64,
    pub devices: Vec<DeviceSummary>,
    #[schema(no_recursion)]
    pub children: Vec<LocationNode>,
}

impl From<LocationRecord> for LocationNode {
    fn from(record: LocationRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            parent_id: record.parent_id,
            description: record.description,
            created_by: record.created_by,
            devices: record.devices,
            children: Vec::new(),
        }
    }
}

impl LocationNode {
    /// Ids of this node and all descendants, pre-order
    pub fn flatten_ids(&self) -> Vec<i64> {
        let mut ids = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            ids.push(node.id);
            stack.extend(node.children.iter().rev());
        }
        ids
    }
}

/// Builds the location forest from flat records.
///
/// * A repeated id replaces the earlier record but keeps its position.
/// * A record is attached under its parent when the parent is present and the
///   record is not part of a parent cycle; otherwise it is a root.
/// * Roots and siblings keep their input order.
///
/// Runs without recursion, so arbitrarily deep chains are fine.
pub fn build_location_tree<I>(records: I) -> Vec<LocationNode>
where
    I: IntoIterator<Item = LocationRecord>,
{
    let mut slots: Vec<LocationRecord> = Vec::new();
    let mut index: HashMap<i64, usize> = HashMap::new();
    for record in records {
        match index.get(&record.id) {
            Some(&pos) => slots[pos] = record,
            None => {
                index.insert(record.id, slots.len());
                slots.push(record);
            }
        }
    }

    let parents: Vec<Option<usize>> = slots
        .iter()
        .map(|r| r.parent_id.and_then(|p| index.get(&p).copied()))
        .collect();

    let on_cycle = cycle_members(&parents);
    let attach: Vec<Option<usize>> = parents
        .iter()
        .zip(&on_cycle)
        .map(|(parent, &cyclic)| if cyclic { None } else { *parent })
        .collect();

    let depths = depths(&attach);

    // Deepest first, so every node is complete before it moves into its
    // parent. Ties go by input position to keep sibling order.
    let mut order: Vec<usize> = (0..slots.len()).collect();
    order.sort_by_key(|&i| (Reverse(depths[i]), i));

    let mut nodes: Vec<Option<LocationNode>> =
        slots.into_iter().map(|r| Some(LocationNode::from(r))).collect();

    for i in order {
        let Some(parent) = attach[i] else { continue };
        if let Some(node) = nodes[i].take() {
            if let Some(parent_node) = nodes[parent].as_mut() {
                parent_node.children.push(node);
            }
        }
    }

    nodes.into_iter().flatten().collect()
}

/// Marks the slots that lie on a parent cycle (self-references included).
/// Every slot has at most one parent, so each walk ends at a root or at a
/// slot already seen.
fn cycle_members(parents: &[Option<usize>]) -> Vec<bool> {
    const UNSEEN: u8 = 0;
    const ON_PATH: u8 = 1;
    const DONE: u8 = 2;

    let mut state = vec![UNSEEN; parents.len()];
    let mut on_cycle = vec![false; parents.len()];
    let mut path = Vec::new();

    for start in 0..parents.len() {
        if state[start] != UNSEEN {
            continue;
        }

        let mut current = Some(start);
        while let Some(i) = current {
            match state[i] {
                UNSEEN => {
                    state[i] = ON_PATH;
                    path.push(i);
                    current = parents[i];
                }
                ON_PATH => {
                    if let Some(pos) = path.iter().position(|&p| p == i) {
                        for &member in &path[pos..] {
                            on_cycle[member] = true;
                        }
                    }
                    break;
                }
                _ => break,
            }
        }

        for i in path.drain(..) {
            state[i] = DONE;
        }
    }

    on_cycle
}

/// Depth of every slot in an acyclic parent forest (roots are 0)
fn depths(attach: &[Option<usize>]) -> Vec<usize> {
    let mut depth: Vec<Option<usize>> = vec![None; attach.len()];
    let mut path = Vec::new();

    for start in 0..attach.len() {
        let mut current = start;
        let base = loop {
            if let Some(d) = depth[current] {
                break d;
            }
            match attach[current] {
                Some(parent) => {
                    path.push(current);
                    current = parent;
                }
                None => {
                    depth[current] = Some(0);
                    break 0;
                }
            }
        };

        for (offset, i) in path.drain(..).rev().enumerate() {
            depth[i] = Some(base + offset + 1);
        }
    }

    depth.into_iter().map(|d| d.unwrap_or(0)).collect()
}

/// Read-side service for the location hierarchy
#[derive(Clone)]
pub struct LocationService {
    reader: Arc<dyn LocationReader>,
}

impl LocationService {
    pub fn new(reader: Arc<dyn LocationReader>) -> Self {
        Self { reader }
    }

    /// Whole hierarchy as a forest
    #[instrument(skip(self))]
    pub async fn location_tree(&self) -> Result<Vec<LocationNode>, ServiceError> {
        let records = self.reader.fetch_all().await?;
        let count = records.len();
        let tree = build_location_tree(records);
        debug!(locations = count, roots = tree.len(), "Built location tree");
        Ok(tree)
    }

    /// One location with its direct children. Children are not expanded further.
    #[instrument(skip(self))]
    pub async fn get_location(&self, id: i64) -> Result<LocationNode, ServiceError> {
        let (record, children) = self
            .reader
            .fetch_one(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Location {} not found", id)))?;

        let mut node = LocationNode::from(record);
        node.children = children
            .into_iter()
            .filter(|child| child.id != id)
            .map(LocationNode::from)
            .collect();
        Ok(node)
    }
}
