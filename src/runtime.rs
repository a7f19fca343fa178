//! The highlight engine.
//!
//! [`apply`] drives a compiled [`Syntax`] over a byte stream and reports
//! attribute runs through a [`RecolorSink`]. Runs are reported *backward*:
//! `recolor(distance, len, attr)` paints `len` bytes ending `distance`
//! bytes before the cursor (distance 0 ends at the byte just consumed).
//! Painting backward is what lets a single forward pass highlight tokens
//! whose class is only known at their last byte, keywords in particular.
//!
//! The cursor state lives in [`ApplyState`], separate from the syntax, so
//! one `&Syntax` can drive any number of concurrent streams. Callers that
//! re-highlight from a known point keep one `ApplyState` per checkpoint.

use crate::attr::Attr;
use crate::syntax::{StateId, Syntax};

/// Pull source of bytes for [`apply`]. Blanket-implemented for byte
/// iterators, so `slice.iter().copied()` works directly.
pub trait ByteSource {
    fn next_byte(&mut self) -> Option<u8>;
}

impl<I: Iterator<Item = u8>> ByteSource for I {
    fn next_byte(&mut self) -> Option<u8> {
        self.next()
    }
}

/// Receives attribute runs from [`apply`]. See the module docs for the
/// backward-painting convention.
pub trait RecolorSink {
    fn recolor(&mut self, distance: u32, len: u32, attr: Attr);
}

/// Cursor state of one highlighting run.
///
/// Cheap to clone; the only heap allocation is the keyword buffer.
#[derive(Clone, Debug)]
pub struct ApplyState {
    state: StateId,
    buffer: Vec<u8>,
    buffering: bool,
    recolor: u32,
    markbegin: u32,
    markend: u32,
    recolormark: bool,
    noeat: bool,
    c: u8,
}

impl ApplyState {
    pub fn new(syntax: &Syntax) -> Self {
        Self {
            state: syntax.start(),
            buffer: Vec::new(),
            buffering: false,
            recolor: 0,
            markbegin: 0,
            markend: 0,
            recolormark: false,
            noeat: false,
            c: b'?',
        }
    }

    /// Rewinds to the start state, keeping the buffer allocation.
    pub fn reset(&mut self, syntax: &Syntax) {
        self.state = syntax.start();
        self.buffer.clear();
        self.buffering = false;
        self.recolor = 0;
        self.markbegin = 0;
        self.markend = 0;
        self.recolormark = false;
        self.noeat = false;
        self.c = b'?';
    }

    /// The state the cursor currently sits in.
    pub fn state(&self) -> StateId {
        self.state
    }
}

/// Runs the automaton over `source` until it is exhausted, reporting runs
/// to `sink`.
///
/// The loop works one byte per step. A zero-width transition does not pull
/// a byte; it re-dispatches the previous one (binding guarantees such
/// chains were compressed away, so a step here never loops). Pending
/// recolor state survives across calls, which is what makes incremental
/// re-highlighting from a stored `ApplyState` seamless.
pub fn apply(
    syntax: &Syntax,
    cur: &mut ApplyState,
    source: &mut impl ByteSource,
    sink: &mut impl RecolorSink,
) {
    loop {
        if cur.noeat {
            cur.noeat = false;
            // The byte stays put, but it must still get its new color.
            if cur.recolor == 0 {
                cur.recolor = 1;
            }
        } else {
            match source.next_byte() {
                Some(b) => cur.c = b,
                None => break,
            }
            cur.recolor = cur.recolor.saturating_add(1);
            cur.markbegin = cur.markbegin.saturating_add(1);
            cur.markend = cur.markend.saturating_add(1);
        }

        let attr = syntax.state(cur.state).attr();
        if cur.recolor > 0 {
            sink.recolor(0, cur.recolor, attr);
        }
        if cur.recolormark {
            let len = cur.markbegin.saturating_sub(cur.markend);
            if len > 0 {
                sink.recolor(cur.markend.saturating_add(1), len, attr);
            }
        }

        let rule = syntax.rule(syntax.state(cur.state).slots[cur.c as usize]);
        cur.recolor = rule.recolor;
        cur.recolormark = rule.recolormark;
        cur.noeat = rule.noeat;
        cur.state = rule.target;

        if let Some(words) = &rule.words {
            let hit = if words.ignore_case {
                words.table.find_ignore_case(&cur.buffer)
            } else {
                words.table.find(&cur.buffer)
            };
            if let Some(&target) = hit {
                cur.state = target;
                // The classified word plus the byte that ended it.
                cur.recolor = cur.buffer.len() as u32 + 1;
            }
            // Hit or miss, the token is spent.
            cur.buffer.clear();
            cur.buffering = false;
        } else if cur.buffering && !rule.noeat {
            cur.buffer.push(cur.c);
        }

        if rule.buffer {
            cur.buffering = true;
            cur.buffer.clear();
            cur.buffer.push(cur.c);
        }
        if rule.mark {
            cur.markbegin = 0;
        }
        if rule.markend {
            cur.markend = 0;
        }
    }
}
