//! Parent/child hierarchy over one cycle's process records.

use std::collections::{HashMap, HashSet};

use serde::{Serialize, Serializer};
use tracing::debug;

use crate::model::ProcessRecord;

/// Process forest built from a flat list of records.
///
/// A record whose parent pid is present is linked under that parent; every
/// other record (pid 0/1 style bootstrap processes, orphans whose parent
/// exited mid-enumeration, self-parented entries) is a root. A recycled pid can
/// link a process under the wrong parent for one cycle; that is accepted.
#[derive(Debug, Clone, Default)]
pub struct ProcessTree {
    records: Vec<ProcessRecord>,
    index: HashMap<u32, usize>,
    parent: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
}

impl ProcessTree {
    /// Builds the tree in linear time. Input order is kept for siblings.
    pub fn build(records: Vec<ProcessRecord>) -> Self {
        let mut index = HashMap::with_capacity(records.len());
        let mut unique = Vec::with_capacity(records.len());
        for record in records {
            if index.contains_key(&record.pid) {
                debug!(pid = record.pid, "duplicate pid in snapshot, keeping first");
                continue;
            }
            index.insert(record.pid, unique.len());
            unique.push(record);
        }

        let mut parent = vec![None; unique.len()];
        let mut children = vec![Vec::new(); unique.len()];
        let mut roots = Vec::new();

        for (idx, record) in unique.iter().enumerate() {
            match index.get(&record.parent_pid) {
                Some(&p) if p != idx => {
                    parent[idx] = Some(p);
                    children[p].push(idx);
                }
                _ => roots.push(idx),
            }
        }

        Self {
            records: unique,
            index,
            parent,
            children,
            roots,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, pid: u32) -> Option<&ProcessRecord> {
        self.index.get(&pid).map(|&idx| &self.records[idx])
    }

    /// Parent record, if the parent is part of this snapshot.
    pub fn parent(&self, pid: u32) -> Option<&ProcessRecord> {
        let idx = *self.index.get(&pid)?;
        self.parent[idx].map(|p| &self.records[p])
    }

    /// Direct children; empty for unknown pids.
    pub fn children(&self, pid: u32) -> impl Iterator<Item = &ProcessRecord> {
        self.index
            .get(&pid)
            .map(|&idx| self.children[idx].as_slice())
            .unwrap_or_default()
            .iter()
            .map(|&c| &self.records[c])
    }

    pub fn child_pids(&self, pid: u32) -> Vec<u32> {
        self.children(pid).map(|r| r.pid).collect()
    }

    pub fn roots(&self) -> impl Iterator<Item = &ProcessRecord> {
        self.roots.iter().map(|&idx| &self.records[idx])
    }

    /// All records, in build order.
    pub fn iter(&self) -> impl Iterator<Item = &ProcessRecord> {
        self.records.iter()
    }

    /// Every process below `pid`, depth first, excluding `pid` itself.
    pub fn descendants(&self, pid: u32) -> Vec<&ProcessRecord> {
        let Some(&start) = self.index.get(&pid) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        let mut visited = HashSet::from([start]);
        let mut stack: Vec<usize> = self.children[start].iter().rev().copied().collect();
        while let Some(idx) = stack.pop() {
            if !visited.insert(idx) {
                continue;
            }
            out.push(&self.records[idx]);
            stack.extend(self.children[idx].iter().rev());
        }
        out
    }

    /// Number of ancestors present in the snapshot; 0 for roots.
    pub fn depth(&self, pid: u32) -> Option<usize> {
        let mut idx = *self.index.get(&pid)?;
        let mut depth = 0;
        while let Some(p) = self.parent[idx] {
            depth += 1;
            if depth > self.records.len() {
                // Parent chain loops through recycled pids.
                break;
            }
            idx = p;
        }
        Some(depth)
    }

    pub fn zombies(&self) -> impl Iterator<Item = &ProcessRecord> {
        self.records.iter().filter(|r| r.is_zombie)
    }

    pub fn into_records(self) -> Vec<ProcessRecord> {
        self.records
    }
}

/// Serialized as the flat record list; `parent_pid` carries the hierarchy.
impl Serialize for ProcessTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.records.iter())
    }
}
