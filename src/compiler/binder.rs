//! Name resolution and automaton finishing.
//!
//! Binding runs in two passes over the parsed grammar:
//!
//! 1. **Resolution.** State names in rules and keyword tables become arena
//!    indices. Unresolvable names and unpopulated byte slots are reported
//!    and redirected to an appended error state, so the automaton is total
//!    no matter how broken the definition was.
//! 2. **Compression.** Chains of zero-width transitions (`noeat` without
//!    side effects) are short-circuited so the runtime never spins on a
//!    byte. A chain longer than the rule count is a cycle; its slot is
//!    redirected to the error state.

use crate::attr::Attr;
use crate::compiler::frontend::Grammar;
use crate::compiler::{lossy, DiagnosticKind, Diagnostics};
use crate::syntax::{Rule, RuleId, State, StateId, Syntax, WordTable};
use crate::table::SortedTable;

pub(crate) fn bind(grammar: Grammar, diags: &mut Diagnostics) -> Syntax {
    let Grammar { states: proto_states, rules: proto_rules } = grammar;

    // The error state and its self-looping rule live one past the declared
    // arenas. They exist even for an empty definition.
    let error_state = StateId(proto_states.len() as u32);
    let error_rule = RuleId(proto_rules.len() as u32);

    let mut names = SortedTable::new();
    for (i, s) in proto_states.iter().enumerate() {
        names.push(&s.name, StateId(i as u32));
    }
    names.sort();

    // Rules are shared across slots, so an unresolvable target is reported
    // once per declaration line rather than once per byte.
    let mut rules = Vec::with_capacity(proto_rules.len() + 1);
    for pr in proto_rules {
        let target = match names.find(&pr.target) {
            Some(&id) => id,
            None => {
                diags.report(None, DiagnosticKind::UnknownState(lossy(&pr.target)));
                error_state
            }
        };

        let words = pr.words.map(|pw| {
            let table = pw.table.map(|word, target_name| match names.find(&target_name) {
                Some(&id) => id,
                None => {
                    diags.report(
                        None,
                        DiagnosticKind::UnknownWordState {
                            state: lossy(&target_name),
                            word: lossy(word),
                        },
                    );
                    error_state
                }
            });
            WordTable { ignore_case: pw.ignore_case, table }
        });

        rules.push(Rule {
            target,
            recolor: pr.recolor,
            noeat: pr.noeat,
            buffer: pr.buffer,
            mark: pr.mark,
            markend: pr.markend,
            recolormark: pr.recolormark,
            words,
        });
    }
    rules.push(Rule {
        target: error_state,
        recolor: 0,
        noeat: false,
        buffer: false,
        mark: false,
        markend: false,
        recolormark: false,
        words: None,
    });

    let mut states = Vec::with_capacity(proto_states.len() + 1);
    for ps in proto_states {
        let mut slots = [error_rule; 256];
        for (byte, slot) in ps.slots.iter().enumerate() {
            match slot {
                Some(id) => slots[byte] = *id,
                None => diags.report(
                    None,
                    DiagnosticKind::UnpopulatedSlot { state: lossy(&ps.name), byte: byte as u8 },
                ),
            }
        }
        states.push(State { name: ps.name, attr: ps.attr, slots });
    }
    states.push(State {
        name: Box::from(&b"(error)"[..]),
        attr: Attr::ERROR,
        slots: [error_rule; 256],
    });

    compress(&mut states, &mut rules, error_rule, diags);

    Syntax { states, rules }
}

/// Is following this rule a no-op as far as the byte cursor is concerned?
/// Such a rule can be skipped over at compile time.
fn zero_width(r: &Rule) -> bool {
    r.noeat
        && r.recolor <= 1
        && !r.buffer
        && !r.mark
        && !r.markend
        && !r.recolormark
        && r.words.is_none()
}

/// Short-circuits zero-width transition chains slot by slot.
///
/// When a hop is skipped and either the chain repainted the byte or the
/// intermediate state carried a different attribute, the surviving rule must
/// still repaint at least the current byte, so its recolor count is raised
/// to 1. Running the pass again is a no-op.
pub(crate) fn compress(
    states: &mut [State],
    rules: &mut [Rule],
    error_rule: RuleId,
    diags: &mut Diagnostics,
) {
    for si in 0..states.len() {
        let orig_attr = states[si].attr;

        for byte in 0..256usize {
            // More hops than rules means the chain revisited one.
            let mut hops = rules.len();
            let mut repainted = false;

            loop {
                let slot = states[si].slots[byte];
                let rule = &rules[slot.0 as usize];
                if !zero_width(rule) {
                    break;
                }
                if hops == 0 {
                    diags.report(
                        None,
                        DiagnosticKind::NoeatCycle {
                            state: lossy(&states[si].name),
                            byte: byte as u8,
                        },
                    );
                    states[si].slots[byte] = error_rule;
                    break;
                }
                hops -= 1;
                repainted |= rule.recolor >= 1;

                let target = rule.target.0 as usize;
                let replacement = states[target].slots[byte];
                if rules[replacement.0 as usize].recolor < 1
                    && (repainted || states[target].attr != orig_attr)
                {
                    rules[replacement.0 as usize].recolor = 1;
                }
                states[si].slots[byte] = replacement;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{compile, Diagnostic};

    fn ids(syntax: &Syntax, name: &str) -> StateId {
        syntax.state_id(name).unwrap()
    }

    fn slot<'a>(syntax: &'a Syntax, state: &str, byte: u8) -> &'a Rule {
        let id = ids(syntax, state);
        syntax.rule(syntax.state(id).slots[byte as usize])
    }

    #[test]
    fn resolves_targets_across_declaration_order() {
        let (syntax, diags) = compile("=c 07\n:a c\n * b\n:b c\n * a\n");
        assert!(diags.is_empty());
        assert_eq!(slot(&syntax, "a", b'x').target, ids(&syntax, "b"));
        assert_eq!(slot(&syntax, "b", b'x').target, ids(&syntax, "a"));
    }

    #[test]
    fn error_state_is_appended() {
        let (syntax, _) = compile("=c 07\n:s c\n * s\n");
        assert_eq!(syntax.state_count(), 2);
        let error = syntax.state(StateId(1));
        assert_eq!(error.name(), b"(error)");
        assert_eq!(error.attr(), Attr::ERROR);
        // The error state eats one byte per step and loops on itself.
        let r = syntax.rule(error.slots[0]);
        assert_eq!(r.target, StateId(1));
        assert!(!r.noeat);
        assert_eq!(r.recolor, 0);
    }

    #[test]
    fn unknown_target_reported_once_per_rule() {
        let (syntax, diags) = compile("=c 07\n:s c\n * nowhere\n");
        let unknown: Vec<&Diagnostic> = diags
            .iter()
            .filter(|d| matches!(d.kind, DiagnosticKind::UnknownState(_)))
            .collect();
        // One diagnostic even though the rule fills all 256 slots.
        assert_eq!(unknown.len(), 1);
        assert_eq!(slot(&syntax, "s", b'x').target, StateId(1));
    }

    #[test]
    fn unpopulated_slots_fall_through_to_error() {
        let (syntax, diags) = compile("=c 07\n:s c\n \"a\" s\n");
        let missing = diags
            .iter()
            .filter(|d| matches!(d.kind, DiagnosticKind::UnpopulatedSlot { .. }))
            .count();
        assert_eq!(missing, 255);
        assert_eq!(slot(&syntax, "s", b'a').target, ids(&syntax, "s"));
        assert_eq!(slot(&syntax, "s", b'b').target, StateId(1));
    }

    #[test]
    fn unknown_word_target() {
        let src = "=c 07\n:s c\n * s strings\n\t\"if\" nowhere\ndone\n";
        let (syntax, diags) = compile(src);
        assert!(diags
            .iter()
            .any(|d| matches!(&d.kind, DiagnosticKind::UnknownWordState { word, .. } if word == "if")));
        let words = slot(&syntax, "s", b'x').words.as_ref().unwrap();
        assert_eq!(words.table.find(b"if"), Some(&StateId(1)));
    }

    #[test]
    fn noeat_chain_is_collapsed() {
        let src = "=a 01\n=b 02\n:start a\n * mid noeat\n:mid a\n * fin noeat\n:fin b\n * fin\n";
        let (syntax, diags) = compile(src);
        assert!(diags.is_empty());
        let r = slot(&syntax, "start", b'x');
        assert_eq!(r.target, ids(&syntax, "fin"));
        assert!(!r.noeat);
        // The surviving rule repaints the byte because the attribute
        // changed along the skipped chain.
        assert_eq!(r.recolor, 1);
        assert_eq!(slot(&syntax, "mid", b'x').target, ids(&syntax, "fin"));
    }

    #[test]
    fn noeat_without_attr_change_keeps_recolor_zero() {
        let src = "=a 01\n:start a\n * fin noeat\n:fin a\n * fin\n";
        let (syntax, diags) = compile(src);
        assert!(diags.is_empty());
        let r = slot(&syntax, "start", b'x');
        assert_eq!(r.target, ids(&syntax, "fin"));
        assert_eq!(r.recolor, 0);
    }

    #[test]
    fn noeat_cycle_is_cut() {
        let src = "=a 01\n:s1 a\n * s2 noeat\n:s2 a\n * s1 noeat\n";
        let (syntax, diags) = compile(src);
        assert!(diags
            .iter()
            .any(|d| matches!(d.kind, DiagnosticKind::NoeatCycle { .. })));
        assert_eq!(slot(&syntax, "s1", b'x').target, StateId(2));
    }

    #[test]
    fn compression_is_idempotent() {
        let src = "=a 01\n=b 02\n:start a\n * mid noeat\n:mid b\n * fin noeat recolor=1\n:fin b\n * start\n";
        let (syntax, _) = compile(src);
        let mut states = syntax.states.clone();
        let mut rules = syntax.rules.clone();
        let error_rule = RuleId(rules.len() as u32 - 1);

        let mut diags = Diagnostics::default();
        compress(&mut states, &mut rules, error_rule, &mut diags);

        assert!(diags.into_vec().is_empty());
        assert_eq!(states, syntax.states);
        assert_eq!(rules, syntax.rules);
    }
}
