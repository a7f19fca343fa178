//! The bound automaton.
//!
//! A [`Syntax`] owns two index arenas: one of [`State`]s and one of rules.
//! Transitions are plain indices into those arenas, which makes the (always
//! cyclic) state graph trivially representable without any ownership games.
//! One rule is typically shared by many of a state's 256 byte slots; the
//! sharing is per declaration line, exactly as written in the definition
//! file.
//!
//! Everything here is immutable after binding. A `&Syntax` can be driven by
//! any number of independent cursors, from any number of threads.

use crate::attr::Attr;
use crate::table::SortedTable;

/// Index of a state in the syntax arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateId(pub(crate) u32);

/// Index of a rule in the syntax arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuleId(pub(crate) u32);

/// A named automaton node: a default attribute and one rule per byte value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct State {
    pub(crate) name: Box<[u8]>,
    pub(crate) attr: Attr,
    pub(crate) slots: [RuleId; 256],
}

impl State {
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    pub fn attr(&self) -> Attr {
        self.attr
    }
}

/// A transition rule. See the definition-file format for the field meanings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Rule {
    pub target: StateId,
    pub recolor: u32,
    pub noeat: bool,
    pub buffer: bool,
    pub mark: bool,
    pub markend: bool,
    pub recolormark: bool,
    pub words: Option<WordTable>,
}

/// A keyword table attached to a rule: buffered token -> override state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct WordTable {
    pub ignore_case: bool,
    pub table: SortedTable<StateId>,
}

/// A compiled, bound syntax definition.
#[derive(Debug)]
pub struct Syntax {
    pub(crate) states: Vec<State>,
    pub(crate) rules: Vec<Rule>,
}

impl Syntax {
    /// The first-declared state; where every run begins.
    pub fn start(&self) -> StateId {
        StateId(0)
    }

    pub fn state(&self, id: StateId) -> &State {
        &self.states[id.0 as usize]
    }

    pub(crate) fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.0 as usize]
    }

    /// Number of states, including the appended error state.
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Looks up a state by its declared name.
    pub fn state_id(&self, name: &str) -> Option<StateId> {
        self.states
            .iter()
            .position(|s| &*s.name == name.as_bytes())
            .map(|i| StateId(i as u32))
    }
}
