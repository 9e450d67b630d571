//! Status registry and transition graph
//!
//! The registry owns the set of known statuses, keyed by symbol, and
//! answers "what comes next" for toggling and recurrence. It is an
//! ordinary value: callers construct it, pass it by reference, and
//! rebuild it (reset-then-add) whenever the configuration changes.
//!
//! The `next` links form a directed graph that normally contains cycles
//! (`[ ] -> [x] -> [ ]`). [`TransitionGraph`] exposes it through petgraph
//! for reporting.

use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::status::{Status, StatusType};

/// Registered statuses plus the EMPTY sentinel
#[derive(Debug, Clone, PartialEq)]
pub struct StatusRegistry {
    statuses: Vec<Status>,
    empty: Status,
}

impl Default for StatusRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusRegistry {
    /// Creates a registry holding the built-in statuses
    pub fn new() -> Self {
        let mut registry = Self::without_statuses();
        registry.reset_to_default_statuses();
        registry
    }

    /// Creates a registry with nothing registered
    pub fn without_statuses() -> Self {
        Self {
            statuses: Vec::new(),
            empty: Status::empty(),
        }
    }

    /// Creates a registry from the built-ins followed by `statuses`
    pub fn with_custom_statuses(statuses: impl IntoIterator<Item = Status>) -> Self {
        let mut registry = Self::new();
        for status in statuses {
            registry.add(status);
        }
        registry
    }

    /// Registers a status unless its symbol is already taken.
    ///
    /// The first registration for a symbol wins and empty symbols are
    /// never registered. Returns true if added.
    pub fn add(&mut self, status: Status) -> bool {
        if status.symbol.is_empty() {
            debug!(name = %status.name, "Ignoring status with empty symbol");
            return false;
        }
        if self.has_symbol(&status.symbol) {
            debug!(symbol = %status.symbol, name = %status.name, "Ignoring duplicate status symbol");
            return false;
        }
        self.statuses.push(status);
        true
    }

    /// Replaces every registered status
    pub fn set(&mut self, statuses: impl IntoIterator<Item = Status>) {
        self.statuses.clear();
        for status in statuses {
            self.add(status);
        }
    }

    /// Drops custom statuses, leaving only the built-ins
    pub fn clear(&mut self) {
        self.reset_to_default_statuses();
    }

    /// Restores the built-in TODO, IN_PROGRESS, DONE and CANCELLED statuses
    pub fn reset_to_default_statuses(&mut self) {
        self.set(Status::defaults());
    }

    /// Registered statuses in registration order
    pub fn statuses(&self) -> &[Status] {
        &self.statuses
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Status> {
        self.statuses.iter()
    }

    /// The EMPTY sentinel
    pub fn empty_status(&self) -> &Status {
        &self.empty
    }

    pub fn has_symbol(&self, symbol: &str) -> bool {
        self.statuses.iter().any(|s| s.symbol == symbol)
    }

    /// Looks up a status by symbol.
    ///
    /// The empty symbol resolves to the EMPTY sentinel; any other
    /// unregistered symbol is `None`.
    pub fn by_symbol(&self, symbol: &str) -> Option<&Status> {
        if symbol.is_empty() {
            return Some(&self.empty);
        }
        self.statuses.iter().find(|s| s.symbol == symbol)
    }

    /// Looks up a status by symbol, inventing an `Unknown` status if needed
    pub fn by_symbol_or_create(&self, symbol: &str) -> Status {
        self.by_symbol(symbol)
            .cloned()
            .unwrap_or_else(|| Status::unknown(symbol))
    }

    pub fn by_name(&self, name: &str) -> Option<&Status> {
        self.statuses.iter().find(|s| s.name == name)
    }

    /// The status reached by toggling `status`, if its target is registered
    pub fn next_status(&self, status: &Status) -> Option<&Status> {
        self.by_symbol(&status.next_symbol)
    }

    /// The status reached by toggling `status`, inventing one for a dangling edge
    pub fn next_status_or_create(&self, status: &Status) -> Status {
        self.by_symbol_or_create(&status.next_symbol)
    }

    /// The status for the new occurrence created when a recurring task
    /// moves to `new_status`.
    ///
    /// Follows the transition graph from the status after `new_status`,
    /// first looking for a TODO status, then an IN_PROGRESS one. Falls
    /// back to the `' '` status so the new task matches `not done`.
    pub fn next_recurrence_status_or_create(&self, new_status: &Status) -> Status {
        let next = self.next_status_or_create(new_status);
        self.find_along_transitions(&next, StatusType::Todo)
            .or_else(|| self.find_along_transitions(&next, StatusType::InProgress))
            .unwrap_or_else(|| self.by_symbol_or_create(" "))
    }

    fn find_along_transitions(&self, start: &Status, wanted: StatusType) -> Option<Status> {
        if start.status_type == wanted {
            return Some(start.clone());
        }
        let mut current = start.clone();
        for _ in 0..self.statuses.len().saturating_sub(1) {
            current = self.next_status_or_create(&current);
            if current.status_type == wanted {
                return Some(current);
            }
        }
        None
    }

    /// Follows `next` links from `start` until a status repeats or a
    /// link leads nowhere. The result always starts with `start`.
    pub fn toggle_sequence<'a>(&'a self, start: &'a Status) -> Vec<&'a Status> {
        let mut seen = HashSet::new();
        let mut sequence = Vec::new();
        let mut current = Some(start);
        while let Some(status) = current {
            if !seen.insert(status.symbol.as_str()) {
                break;
            }
            sequence.push(status);
            if status.status_type == StatusType::Empty {
                break;
            }
            current = self.next_status(status);
        }
        sequence
    }

    /// Statuses seen in tasks whose symbols are not registered.
    ///
    /// Each is renamed `Unknown (s)`, duplicates are dropped, and the
    /// result is sorted by symbol.
    pub fn find_unknown_statuses<'a>(&self, seen: impl IntoIterator<Item = &'a Status>) -> Vec<Status> {
        let mut found: Vec<Status> = Vec::new();
        for status in seen {
            if self.has_symbol(&status.symbol) || found.iter().any(|s| s.symbol == status.symbol) {
                continue;
            }
            found.push(Status {
                name: format!("Unknown ({})", status.symbol),
                available_as_command: false,
                ..status.clone()
            });
        }
        found.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        found
    }

    /// Builds the transition graph over registered statuses
    pub fn transition_graph(&self) -> TransitionGraph {
        TransitionGraph::build(self)
    }

    /// Renders the transition graph as a Mermaid flowchart.
    ///
    /// With `detailed`, each node shows its name, symbols and type.
    pub fn mermaid_diagram(&self, detailed: bool) -> String {
        let graph = self.transition_graph();

        let nodes: Vec<String> = self
            .statuses
            .iter()
            .enumerate()
            .map(|(i, status)| format!("{}{}", i + 1, mermaid_node_label(status, detailed)))
            .collect();

        let edges: Vec<String> = graph
            .edges()
            .map(|(from, to, kind)| match kind {
                TransitionKind::Toggle => format!("{} --> {}", from + 1, to + 1),
                TransitionKind::RecurrenceOverride => format!("{}-. \"🔁\" .-> {}", from + 1, to + 1),
            })
            .collect();

        format!(
            "```mermaid\n\
             flowchart LR\n\
             \n\
             classDef TODO        stroke:#f33,stroke-width:3px;\n\
             classDef DONE        stroke:#0c0,stroke-width:3px;\n\
             classDef IN_PROGRESS stroke:#fa0,stroke-width:3px;\n\
             classDef CANCELLED   stroke:#ddd,stroke-width:3px;\n\
             classDef NON_TASK    stroke:#99e,stroke-width:3px;\n\
             \n\
             {}\n\
             {}\n\
             \n\
             linkStyle default stroke:gray\n\
             ```\n",
            nodes.join("\n"),
            edges.join("\n")
        )
    }
}

/// Escapes only the characters that break a quoted Mermaid label: `& < > "`
fn html_encode(text: &str) -> String {
    let mut encoded = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => encoded.push_str("&amp;"),
            '<' => encoded.push_str("&lt;"),
            '>' => encoded.push_str("&gt;"),
            '"' => encoded.push_str("&quot;"),
            _ => encoded.push(c),
        }
    }
    encoded
}

fn mermaid_node_label(status: &Status, detailed: bool) -> String {
    let name = html_encode(&status.name);
    let status_type = status.status_type;
    if detailed {
        format!(
            "[\"'{}'<br>[{}] -> [{}]<br>({})\"]:::{}",
            name,
            html_encode(&status.symbol),
            html_encode(&status.next_symbol),
            status_type,
            status_type
        )
    } else {
        format!("[\"{}\"]:::{}", name, status_type)
    }
}

/// Kind of edge in the transition graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    /// The ordinary `next` link followed on toggle
    Toggle,
    /// Where recurrence sends a new occurrence instead of the `next` link
    RecurrenceOverride,
}

/// Directed graph of status transitions, indexed by registration order
#[derive(Debug)]
pub struct TransitionGraph {
    graph: DiGraph<usize, TransitionKind>,
    node_map: HashMap<String, NodeIndex>,
}

impl TransitionGraph {
    fn build(registry: &StatusRegistry) -> Self {
        let mut graph = DiGraph::new();
        let mut node_map = HashMap::new();

        for (i, status) in registry.statuses().iter().enumerate() {
            let idx = graph.add_node(i);
            node_map.insert(status.symbol.clone(), idx);
        }

        // Edges to unregistered or EMPTY statuses are left out
        for status in registry.statuses() {
            let from = node_map[&status.symbol];
            let next = registry.next_status(status);
            if let Some(to) = next.and_then(|n| Self::target(&node_map, n)) {
                graph.add_edge(from, to, TransitionKind::Toggle);
            }

            if status.status_type == StatusType::Done {
                let recurrence = registry.next_recurrence_status_or_create(status);
                let differs = next.map(|n| n.symbol != recurrence.symbol).unwrap_or(true);
                if differs {
                    if let Some(to) = Self::target(&node_map, &recurrence) {
                        graph.add_edge(from, to, TransitionKind::RecurrenceOverride);
                    }
                }
            }
        }

        Self { graph, node_map }
    }

    fn target(node_map: &HashMap<String, NodeIndex>, status: &Status) -> Option<NodeIndex> {
        if status.status_type == StatusType::Empty {
            return None;
        }
        node_map.get(&status.symbol).copied()
    }

    /// Edges as (from, to, kind), using registration indices, in insertion order
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, TransitionKind)> + '_ {
        self.graph.edge_indices().filter_map(move |e| {
            let (a, b) = self.graph.edge_endpoints(e)?;
            Some((self.graph[a], self.graph[b], self.graph[e]))
        })
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns true if some status can be reached again by toggling
    pub fn has_cycle(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    /// Registration indices of the statuses `symbol` can toggle into
    pub fn successors(&self, symbol: &str) -> Vec<usize> {
        match self.node_map.get(symbol) {
            Some(idx) => self.graph.neighbors(*idx).map(|n| self.graph[n]).collect(),
            None => Vec::new(),
        }
    }
}
