//! Dependency tracking for formula calculation

use ahash::{AHashMap, AHashSet};
use lazy_regex::regex;
use sheetcalc_core::{parse_address, CellAddress, CellRange, NamedRangeCollection};
use std::collections::BTreeSet;
use std::fmt;

use crate::evaluator::DEFAULT_MAX_RANGE_CELLS;
use crate::resolve::substitute_names;

/// Unique key for a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub row: u32,
    pub col: u16,
}

impl CellKey {
    /// Create a new cell key
    pub fn new(row: u32, col: u16) -> Self {
        Self { row, col }
    }

    /// Create from a cell address
    pub fn from_address(addr: &CellAddress) -> Self {
        Self::new(addr.row, addr.col)
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.row, self.col)
    }
}

/// How references are extracted from formula text
#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions {
    /// Add every cell inside `A1:B5`, not only the two corners
    pub expand_ranges: bool,
    /// Ranges above this size contribute only their corners
    pub max_range_cells: u64,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            expand_ranges: true,
            max_range_cells: DEFAULT_MAX_RANGE_CELLS,
        }
    }
}

/// Extract the cells a formula refers to, in order of first appearance.
///
/// Every `[$]LETTERS[$]DIGITS` occurrence outside quoted text counts, except
/// when directly followed by `(` (function names such as `LOG10`). Defined
/// names are replaced by their reference first.
pub fn extract_references(
    formula: &str,
    names: Option<&NamedRangeCollection>,
    options: ExtractOptions,
) -> Vec<CellKey> {
    let text = blank_quoted_text(&substitute_names(formula, names));

    let mut seen = AHashSet::new();
    let mut refs = Vec::new();
    let mut add = |key: CellKey| {
        if seen.insert(key) {
            refs.push(key);
        }
    };

    let pattern = regex!(r"(\$?[A-Z]+\$?[0-9]+)(?::(\$?[A-Z]+\$?[0-9]+))?");
    for caps in pattern.captures_iter(&text) {
        let Some(whole) = caps.get(0) else { continue };
        if text[whole.end()..].starts_with('(') {
            continue;
        }

        let start = caps.get(1).and_then(|m| parse_address(m.as_str()));
        let end = caps.get(2).and_then(|m| parse_address(m.as_str()));

        match (start, end) {
            (Some(start), Some(end)) => {
                let range = CellRange::new(start, end);
                if options.expand_ranges && range.cell_count() <= options.max_range_cells {
                    for addr in range.cells() {
                        add(CellKey::from_address(&addr));
                    }
                } else {
                    add(CellKey::from_address(&start));
                    add(CellKey::from_address(&end));
                }
            }
            (Some(single), None) | (None, Some(single)) => add(CellKey::from_address(&single)),
            (None, None) => {}
        }
    }

    refs
}

/// Replace the contents of double-quoted text with spaces, keeping byte offsets
fn blank_quoted_text(text: &str) -> String {
    let mut in_quotes = false;
    text.chars()
        .map(|c| {
            if c == '"' {
                in_quotes = !in_quotes;
                c
            } else if in_quotes {
                ' '
            } else {
                c
            }
        })
        .collect()
}

/// Dependency graph for formula cells
///
/// Tracks which cells depend on which other cells,
/// enabling efficient recalculation.
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    /// Cell → Cells that depend on it (dependents)
    dependents: AHashMap<CellKey, BTreeSet<CellKey>>,
    /// Cell → Cells it depends on (precedents)
    precedents: AHashMap<CellKey, BTreeSet<CellKey>>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from `(cell, formula text)` pairs
    pub fn build<'f, I>(
        formulas: I,
        names: Option<&NamedRangeCollection>,
        options: ExtractOptions,
    ) -> Self
    where
        I: IntoIterator<Item = (CellKey, &'f str)>,
    {
        let mut graph = Self::new();
        for (cell, formula) in formulas {
            for precedent in extract_references(formula, names, options) {
                graph.add_dependency(precedent, cell);
            }
        }
        graph
    }

    /// Add a dependency: dependent depends on precedent
    pub fn add_dependency(&mut self, precedent: CellKey, dependent: CellKey) {
        self.dependents
            .entry(precedent)
            .or_default()
            .insert(dependent);
        self.precedents
            .entry(dependent)
            .or_default()
            .insert(precedent);
    }

    /// Remove all dependencies for a cell
    pub fn clear_dependencies(&mut self, cell: CellKey) {
        // Remove from all precedents' dependents list
        if let Some(precedents) = self.precedents.remove(&cell) {
            for precedent in precedents {
                if let Some(deps) = self.dependents.get_mut(&precedent) {
                    deps.remove(&cell);
                }
            }
        }

        // Remove as a precedent for others
        if let Some(dependents) = self.dependents.remove(&cell) {
            for dependent in dependents {
                if let Some(precs) = self.precedents.get_mut(&dependent) {
                    precs.remove(&cell);
                }
            }
        }
    }

    /// Get cells that depend on the given cell
    pub fn get_dependents(&self, cell: CellKey) -> impl Iterator<Item = CellKey> + '_ {
        self.dependents
            .get(&cell)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Get cells that the given cell depends on
    pub fn get_precedents(&self, cell: CellKey) -> impl Iterator<Item = CellKey> + '_ {
        self.precedents
            .get(&cell)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Get the changed cells and everything depending on them, transitively, in an
    /// order where every cell comes after the cells it depends on.
    ///
    /// Edges closing a cycle are ignored.
    pub fn get_recalc_order(&self, changed: &[CellKey]) -> Vec<CellKey> {
        let mut result = Vec::new();
        let mut visited = AHashSet::new();
        let mut in_stack = AHashSet::new();

        for &cell in changed {
            self.topological_sort(cell, &mut result, &mut visited, &mut in_stack);
        }

        result.reverse();
        result
    }

    /// Topological sort helper (DFS, post-order over dependents)
    fn topological_sort(
        &self,
        cell: CellKey,
        result: &mut Vec<CellKey>,
        visited: &mut AHashSet<CellKey>,
        in_stack: &mut AHashSet<CellKey>,
    ) {
        if visited.contains(&cell) {
            return;
        }

        if in_stack.contains(&cell) {
            // Circular reference - skip (reported by the scheduler)
            return;
        }

        in_stack.insert(cell);

        // Visit all dependents first
        if let Some(dependents) = self.dependents.get(&cell) {
            for &dependent in dependents {
                self.topological_sort(dependent, result, visited, in_stack);
            }
        }

        in_stack.remove(&cell);
        visited.insert(cell);
        result.push(cell);
    }

    /// Detect circular references involving a cell
    pub fn has_circular_reference(&self, cell: CellKey) -> bool {
        let mut visited = AHashSet::new();
        let mut in_stack = AHashSet::new();
        self.detect_cycle(cell, &mut visited, &mut in_stack)
    }

    fn detect_cycle(
        &self,
        cell: CellKey,
        visited: &mut AHashSet<CellKey>,
        in_stack: &mut AHashSet<CellKey>,
    ) -> bool {
        if in_stack.contains(&cell) {
            return true;
        }
        if visited.contains(&cell) {
            return false;
        }

        visited.insert(cell);
        in_stack.insert(cell);

        if let Some(precedents) = self.precedents.get(&cell) {
            for &precedent in precedents {
                if self.detect_cycle(precedent, visited, in_stack) {
                    return true;
                }
            }
        }

        in_stack.remove(&cell);
        false
    }

    /// Every cell that lies on a reference cycle.
    ///
    /// These are the members of strongly connected components with more than
    /// one cell, plus cells that reference themselves. Unlike a single
    /// depth-first walk this does not depend on which cell is visited first.
    pub fn circular_cells(&self) -> AHashSet<CellKey> {
        let mut components = Components {
            graph: self,
            index: AHashMap::new(),
            lowlink: AHashMap::new(),
            stack: Vec::new(),
            on_stack: AHashSet::new(),
            circular: AHashSet::new(),
        };
        for &cell in self.precedents.keys() {
            if !components.index.contains_key(&cell) {
                components.visit(cell);
            }
        }
        components.circular
    }

    /// Number of cells with at least one dependent
    pub fn precedent_count(&self) -> usize {
        self.dependents.len()
    }

    /// Check if the graph has no edges
    pub fn is_empty(&self) -> bool {
        self.dependents.is_empty()
    }

    /// Clear the entire graph
    pub fn clear(&mut self) {
        self.dependents.clear();
        self.precedents.clear();
    }
}

/// Tarjan's strongly connected components over precedent edges
struct Components<'g> {
    graph: &'g DependencyGraph,
    index: AHashMap<CellKey, usize>,
    lowlink: AHashMap<CellKey, usize>,
    stack: Vec<CellKey>,
    on_stack: AHashSet<CellKey>,
    circular: AHashSet<CellKey>,
}

impl Components<'_> {
    fn open(&mut self, cell: CellKey) -> (CellKey, Vec<CellKey>, usize) {
        let index = self.index.len();
        self.index.insert(cell, index);
        self.lowlink.insert(cell, index);
        self.stack.push(cell);
        self.on_stack.insert(cell);
        (cell, self.graph.get_precedents(cell).collect(), 0)
    }

    fn visit(&mut self, root: CellKey) {
        let mut frames = vec![self.open(root)];

        while let Some((cell, precedents, next)) = frames.last_mut() {
            let cell = *cell;
            if let Some(&precedent) = precedents.get(*next) {
                *next += 1;
                if !self.index.contains_key(&precedent) {
                    let frame = self.open(precedent);
                    frames.push(frame);
                } else if self.on_stack.contains(&precedent) {
                    let low = self.lowlink[&cell].min(self.index[&precedent]);
                    self.lowlink.insert(cell, low);
                }
                continue;
            }

            frames.pop();
            let low = self.lowlink[&cell];
            if let Some((parent, _, _)) = frames.last() {
                let parent_low = self.lowlink[parent].min(low);
                self.lowlink.insert(*parent, parent_low);
            }
            if low != self.index[&cell] {
                continue;
            }

            // `cell` roots a component: everything above it on the stack
            let mut component = Vec::new();
            while let Some(member) = self.stack.pop() {
                self.on_stack.remove(&member);
                component.push(member);
                if member == cell {
                    break;
                }
            }
            let self_reference = self
                .graph
                .precedents
                .get(&cell)
                .map_or(false, |precedents| precedents.contains(&cell));
            if component.len() > 1 || self_reference {
                self.circular.extend(component);
            }
        }
    }
}
