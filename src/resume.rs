//! Reconstructs a strategy's working state from persisted batches (spec
//! §4.6/§4.7 "Resume", §9 "Rehydration"). Grounded in
//! `original_source/models.py`'s `get_unreturned_results`/`has_results`
//! and the resume paragraphs of `crawler.py`'s two strategies.

use std::collections::{HashMap, HashSet};

use crate::page::PageNode;
use crate::store::BatchEntry;

/// Either the job is already finished (a terminal sentinel was already
/// written) or here is the set of page nodes to resume from.
pub enum Unfinished {
    Done,
    Nodes(Vec<PageNode>),
}

fn stored_nodes(entries: Vec<BatchEntry>) -> Unfinished {
    if entries.last().map(|e| e.is_terminal()).unwrap_or(false) {
        return Unfinished::Done;
    }

    let mut nodes: Vec<PageNode> = entries
        .into_iter()
        .filter_map(|e| match e {
            BatchEntry::Node(n) => Some(n),
            BatchEntry::Terminal => None,
        })
        .collect();
    nodes.sort_by_key(|n| n.id);
    Unfinished::Nodes(nodes)
}

pub fn max_id(nodes: &[PageNode]) -> u64 {
    nodes.iter().map(|n| n.id).max().unwrap_or(0)
}

/// DFS resume (spec §4.6): all stored nodes become the partial path,
/// indexed by id; the node with the highest id is where the crawl was
/// when it stopped.
pub fn unfinished_dfs(entries: Vec<BatchEntry>) -> Unfinished {
    stored_nodes(entries)
}

/// BFS resume (spec §4.7): a node that appears as somebody's parent, or
/// that already sits at `max_depth`, is considered expanded and dropped;
/// survivors are the unexpanded frontier, sorted by `(depth, parent, id)`.
///
/// A leaf whose children all failed to fetch is indistinguishable from a
/// leaf that was never expanded — this implementation treats "has
/// children in the stored set" as the sole signal of "expanded" (see
/// DESIGN.md), accepting possible re-expansion of such leaves.
pub fn unfinished_bfs(entries: Vec<BatchEntry>, max_depth: u32) -> Unfinished {
    match stored_nodes(entries) {
        Unfinished::Done => Unfinished::Done,
        Unfinished::Nodes(nodes) => {
            let expanded: HashSet<u64> = nodes.iter().filter_map(|n| n.parent).collect();

            let mut frontier: Vec<PageNode> = nodes
                .into_iter()
                .filter(|n| !expanded.contains(&n.id) && n.depth < max_depth)
                .collect();

            frontier.sort_by_key(|n| (n.depth, n.parent.unwrap_or(0), n.id));
            Unfinished::Nodes(frontier)
        }
    }
}

/// Builds an id-indexed lookup table for DFS's backtrack chain.
pub fn index_by_id(nodes: &[PageNode]) -> HashMap<u64, PageNode> {
    nodes.iter().map(|n| (n.id, n.clone())).collect()
}
