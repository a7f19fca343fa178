//! Line parser: transforms definition source into the unbound grammar.
//!
//! The format is line-oriented. After comment and trailing-whitespace
//! stripping, the first byte dispatches:
//!
//! - `=` declares a color: `=name spec...`
//! - `:` declares a state: `:name colorname`
//! - space or tab starts a transition line for the most recent state:
//!   `  [selector] target [modifiers...]`
//!
//! A `strings`/`istrings` modifier makes the line consume the following
//! lines (`"key" target` pairs) up to a line reading `done`.
//!
//! ## Gotchas
//!
//! - Targets are stored as names here; resolution happens in the binder.
//!   Rules are interned per line, so a `*` selector makes 256 slots share
//!   one rule.
//! - The color table is sorted lazily: a `=` line marks it dirty, the next
//!   `:` line sorts it before the first lookup.

use crate::attr::Attr;
use crate::compiler::{color, lossy, DiagnosticKind, Diagnostics};
use crate::syntax::RuleId;
use crate::table::SortedTable;

pub(crate) struct Grammar {
    pub states: Vec<ProtoState>,
    pub rules: Vec<ProtoRule>,
}

pub(crate) struct ProtoState {
    pub name: Box<[u8]>,
    pub attr: Attr,
    pub slots: [Option<RuleId>; 256],
}

pub(crate) struct ProtoRule {
    pub target: Box<[u8]>,
    pub recolor: u32,
    pub noeat: bool,
    pub buffer: bool,
    pub mark: bool,
    pub markend: bool,
    pub recolormark: bool,
    pub words: Option<ProtoWords>,
}

pub(crate) struct ProtoWords {
    pub ignore_case: bool,
    pub table: SortedTable<Box<[u8]>>,
}

pub(crate) fn parse(src: &[u8], diags: &mut Diagnostics) -> Grammar {
    let parser = Parser {
        lines: src.split(|&b| b == b'\n').collect(),
        pos: 0,
        colors: SortedTable::new(),
        states: Vec::new(),
        rules: Vec::new(),
        diags,
    };
    parser.run()
}

struct Parser<'s, 'd> {
    lines: Vec<&'s [u8]>,
    pos: usize,
    colors: SortedTable<Attr>,
    states: Vec<ProtoState>,
    rules: Vec<ProtoRule>,
    diags: &'d mut Diagnostics,
}

impl<'s, 'd> Parser<'s, 'd> {
    fn run(mut self) -> Grammar {
        while self.pos < self.lines.len() {
            let line = cleanup(self.lines[self.pos]);
            self.pos += 1;

            match line.first().copied() {
                Some(b'=') => self.color_declaration(&line[1..]),
                Some(b':') => self.state_declaration(&line[1..]),
                Some(b' ' | b'\t') => self.rule_line(line),
                // Blank lines and anything unrecognized are skipped.
                _ => {}
            }
        }

        Grammar { states: self.states, rules: self.rules }
    }

    // 1-based number of the line just pulled.
    fn line_no(&self) -> Option<u32> {
        Some(self.pos as u32)
    }

    fn color_declaration(&mut self, line: &[u8]) {
        let mut i = 0;
        skip_space(line, &mut i);
        let name = token(line, &mut i);
        skip_space(line, &mut i);
        self.colors.push(name, color::evaluate(&line[i..]));
    }

    fn state_declaration(&mut self, line: &[u8]) {
        // Sort the color table when a state needs its first lookup.
        self.colors.sort();

        let mut i = 0;
        skip_space(line, &mut i);
        let name = token(line, &mut i);
        skip_space(line, &mut i);

        let colorname = token(line, &mut i);
        let attr = match self.colors.find(colorname) {
            Some(&attr) => attr,
            None => {
                self.diags.report(self.line_no(), DiagnosticKind::UnknownColor(lossy(colorname)));
                Attr::ERROR
            }
        };

        self.states.push(ProtoState { name: name.into(), attr, slots: [None; 256] });
    }

    fn rule_line(&mut self, line: &[u8]) {
        if self.states.is_empty() {
            self.diags.report(self.line_no(), DiagnosticKind::OrphanRule);
            return;
        }

        let rule_id = RuleId(self.rules.len() as u32);
        let mut rule = ProtoRule {
            target: Box::default(),
            recolor: 0,
            noeat: false,
            buffer: false,
            mark: false,
            markend: false,
            recolormark: false,
            words: None,
        };

        let mut i = 0;
        skip_space(line, &mut i);
        self.selector(line, &mut i, rule_id);

        skip_space(line, &mut i);
        rule.target = token(line, &mut i).into();

        loop {
            skip_space(line, &mut i);
            let word = token(line, &mut i);
            if word.is_empty() {
                break;
            }
            self.modifier(word, &mut rule);
        }

        if let Some(words) = &mut rule.words {
            Self::word_block(&self.lines, &mut self.pos, words);
        }

        self.rules.push(rule);
    }

    /// Parses the optional character-class selector and fills the matching
    /// slots of the current state with `rule_id`.
    fn selector(&mut self, line: &[u8], i: &mut usize, rule_id: RuleId) {
        let Some(state) = self.states.last_mut() else {
            return;
        };

        match line.get(*i).copied() {
            Some(b'*') => {
                *i += 1;
                state.slots = [Some(rule_id); 256];
            }
            Some(b'"') => {
                *i += 1;
                let mut closed = false;

                while *i < line.len() {
                    if line[*i] == b'"' {
                        *i += 1;
                        closed = true;
                        break;
                    }

                    let first = escape(line, i);

                    // A `-` introduces a range unless the closing quote
                    // follows it directly; `"a-"` is the two bytes `a`, `-`.
                    if line.get(*i) == Some(&b'-') && line.get(*i + 1) != Some(&b'"') {
                        *i += 1;
                        let last = if *i < line.len() { escape(line, i) } else { 0 };

                        // Ranges wrap: "z-a" covers z..=255 and 0..=a.
                        let mut b = first;
                        loop {
                            state.slots[b as usize] = Some(rule_id);
                            if b == last {
                                break;
                            }
                            b = b.wrapping_add(1);
                        }
                    } else {
                        state.slots[first as usize] = Some(rule_id);
                    }
                }

                if !closed {
                    self.diags.report(self.line_no(), DiagnosticKind::UnterminatedClass);
                }
            }
            // No selector: no slots are filled directly. Useful for rules
            // that are only ever reached through a keyword table.
            _ => {}
        }
    }

    fn modifier(&mut self, word: &[u8], rule: &mut ProtoRule) {
        // Bucket order is fixed by the hash; see `modifier_bucket`.
        const MODIFIERS: [&str; 8] =
            ["recolormark", "noeat", "recolor=", "mark", "strings", "markend", "istrings", "buffer"];

        let keyword = MODIFIERS[modifier_bucket(word)];
        match keyword {
            "recolor=" if word.starts_with(b"recolor=") => {
                match parse_recolor(&word[8..]) {
                    Some(n) => rule.recolor = n,
                    None => {
                        self.diags.report(self.line_no(), DiagnosticKind::BadRecolor(lossy(word)));
                    }
                }
            }
            _ if word == keyword.as_bytes() => match keyword {
                "recolormark" => rule.recolormark = true,
                "noeat" => rule.noeat = true,
                "mark" => rule.mark = true,
                "markend" => rule.markend = true,
                "buffer" => rule.buffer = true,
                "strings" => {
                    rule.words = Some(ProtoWords { ignore_case: false, table: SortedTable::new() })
                }
                "istrings" => {
                    rule.words = Some(ProtoWords { ignore_case: true, table: SortedTable::new() })
                }
                _ => unreachable!(),
            },
            _ => {
                self.diags.report(self.line_no(), DiagnosticKind::UnknownModifier(lossy(word)));
            }
        }
    }

    /// Consumes `"key" target` lines up to `done` (or end of input) and
    /// sorts the finished table.
    fn word_block(lines: &[&'s [u8]], pos: &mut usize, words: &mut ProtoWords) {
        while *pos < lines.len() {
            let line = cleanup(lines[*pos]);
            *pos += 1;

            let mut i = 0;
            skip_space(line, &mut i);
            if &line[i..] == b"done" {
                break;
            }

            if line.get(i) == Some(&b'"') {
                i += 1;
            }
            let key_start = i;
            while i < line.len() && line[i] != b'"' {
                i += 1;
            }
            let key = &line[key_start..i];
            if i < line.len() {
                i += 1;
            }
            skip_space(line, &mut i);
            let target = &line[i..];

            if !key.is_empty() && !target.is_empty() {
                if words.ignore_case {
                    // Stored lowercased so the case-folding binary search
                    // agrees with the byte-order sort.
                    words.table.push(&key.to_ascii_lowercase(), target.into());
                } else {
                    words.table.push(key, target.into());
                }
            }
        }

        words.table.sort();
    }
}

/// Strips an unquoted `#` comment and trailing whitespace. Backslash escapes
/// the following byte during the scan, so `\#` and `\"` stay literal.
fn cleanup(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    let mut quote = false;
    let mut i = 0;

    while i < line.len() {
        match line[i] {
            b'#' if !quote => {
                end = i;
                break;
            }
            b'"' => quote = !quote,
            b'\\' => i += 1,
            _ => {}
        }
        i += 1;
    }

    while end > 0 && matches!(line[end - 1], b'\r' | b'\n' | b' ' | b'\t') {
        end -= 1;
    }

    &line[..end]
}

fn skip_space(line: &[u8], i: &mut usize) {
    while *i < line.len() && (line[*i] == b' ' || line[*i] == b'\t') {
        *i += 1;
    }
}

fn token<'a>(line: &'a [u8], i: &mut usize) -> &'a [u8] {
    let start = *i;
    while *i < line.len() && line[*i] != b' ' && line[*i] != b'\t' {
        *i += 1;
    }
    &line[start..*i]
}

/// Reads one byte of a character class, resolving `\t \n \v \b` escapes.
/// Any other escaped byte stands for itself (`\\`, `\"`, `\-`).
fn escape(line: &[u8], i: &mut usize) -> u8 {
    let mut b = line[*i];
    if b == b'\\' && *i + 1 < line.len() {
        *i += 1;
        b = match line[*i] {
            b't' => b'\t',
            b'n' => b'\n',
            b'v' => 0x0b,
            b'b' => 0x08,
            other => other,
        };
    }
    *i += 1;
    b
}

fn parse_recolor(digits: &[u8]) -> Option<u32> {
    // Negative counts are accepted and folded to their absolute value.
    let digits = digits.strip_prefix(b"-").unwrap_or(digits);
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }

    let mut n = 0u32;
    for &d in digits {
        n = n.saturating_mul(10).saturating_add((d - b'0') as u32);
    }
    Some(n)
}

/// Rolling hash for modifier keywords; includes the terminating `=` or end
/// of token, and folds into 8 buckets. Verified against the keyword by the
/// caller, so colliding unknown words are rejected rather than misparsed.
fn modifier_bucket(word: &[u8]) -> usize {
    let mut n = 2u8;
    let mut v = 0u8;
    let mut bytes = word.iter();

    loop {
        let c = bytes.next().copied().unwrap_or(0);
        n = n.wrapping_add((c ^ v).wrapping_add(6));
        v = v.wrapping_add(2);
        if c == b'=' || c == 0 {
            break;
        }
    }

    ((n >> 3) & 7) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> Grammar {
        let mut diags = Diagnostics::default();
        let g = parse(src.as_bytes(), &mut diags);
        let diags = diags.into_vec();
        assert!(diags.is_empty(), "unexpected diagnostics: {diags:?}");
        g
    }

    fn parse_with_diags(src: &str) -> (Grammar, Vec<crate::compiler::Diagnostic>) {
        let mut diags = Diagnostics::default();
        let g = parse(src.as_bytes(), &mut diags);
        (g, diags.into_vec())
    }

    #[test]
    fn cleanup_strips_comments_and_trailing_space() {
        assert_eq!(cleanup(b"hello # comment"), b"hello");
        assert_eq!(cleanup(b"hello   \t\r"), b"hello");
        assert_eq!(cleanup(b"\"quoted # not a comment\" x"), b"\"quoted # not a comment\" x");
        assert_eq!(cleanup(b"escaped \\# kept # gone"), b"escaped \\# kept");
        assert_eq!(cleanup(b"   "), b"");
    }

    #[test]
    fn modifier_buckets_verify() {
        const MODIFIERS: [&str; 8] =
            ["recolormark", "noeat", "recolor=", "mark", "strings", "markend", "istrings", "buffer"];
        for (bucket, word) in MODIFIERS.iter().enumerate() {
            assert_eq!(modifier_bucket(word.as_bytes()), bucket, "word '{word}'");
        }
    }

    #[test]
    fn states_in_declaration_order() {
        let g = parse_ok("=c 07\n:first c\n * first\n:second c\n * second\n");
        assert_eq!(g.states.len(), 2);
        assert_eq!(&*g.states[0].name, b"first");
        assert_eq!(&*g.states[1].name, b"second");
    }

    #[test]
    fn star_selector_interns_one_rule() {
        let g = parse_ok("=c 07\n:s c\n * s\n");
        assert_eq!(g.rules.len(), 1);
        assert!(g.states[0].slots.iter().all(|&slot| slot == Some(RuleId(0))));
    }

    #[test]
    fn class_selector_ranges_and_escapes() {
        // A `*` line fills every slot, later class lines override a subset.
        let g = parse_ok("=c 07\n:s c\n * s\n \"a-z0-9_\\t\" s\n");
        let slots = &g.states[0].slots;
        for b in 0u16..256 {
            let b = b as u8;
            let in_class =
                b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'\t';
            let expect = if in_class { Some(RuleId(1)) } else { Some(RuleId(0)) };
            assert_eq!(slots[b as usize], expect, "byte {b}");
        }
    }

    #[test]
    fn trailing_dash_is_literal() {
        let g = parse_ok("=c 07\n:s c\n \"a-\" s\n");
        assert_eq!(g.states[0].slots[b'a' as usize], Some(RuleId(0)));
        assert_eq!(g.states[0].slots[b'-' as usize], Some(RuleId(0)));
        assert_eq!(g.states[0].slots[b'b' as usize], None);
    }

    #[test]
    fn wrapping_range() {
        let g = parse_ok("=c 07\n:s c\n \"\\xx-b\" s\n");
        // 'x'..wrap..'b': covers x..=255 and 0..=b'b'.
        let slots = &g.states[0].slots;
        assert_eq!(slots[b'x' as usize], Some(RuleId(0)));
        assert_eq!(slots[255], Some(RuleId(0)));
        assert_eq!(slots[0], Some(RuleId(0)));
        assert_eq!(slots[b'b' as usize], Some(RuleId(0)));
        assert_eq!(slots[b'c' as usize], None);
    }

    #[test]
    fn modifiers_set_flags() {
        let g = parse_ok("=c 07\n:s c\n * s noeat buffer mark markend recolormark recolor=4\n");
        let r = &g.rules[0];
        assert!(r.noeat && r.buffer && r.mark && r.markend && r.recolormark);
        assert_eq!(r.recolor, 4);
    }

    #[test]
    fn negative_recolor_folds_to_absolute() {
        let g = parse_ok("=c 07\n:s c\n * s recolor=-3\n");
        assert_eq!(g.rules[0].recolor, 3);
    }

    #[test]
    fn unknown_modifier_is_reported_and_ignored() {
        let (g, diags) = parse_with_diags("=c 07\n:s c\n * s noeatt\n");
        assert_eq!(diags.len(), 1);
        assert!(matches!(diags[0].kind, DiagnosticKind::UnknownModifier(_)));
        assert!(!g.rules[0].noeat);
    }

    #[test]
    fn strings_block() {
        let src = "=c 07\n:s c\n * s strings\n\t\"if\" kw\n\t\"for\" kw\ndone\n * s\n";
        let g = parse_ok(src);
        let words = g.rules[0].words.as_ref().unwrap();
        assert!(!words.ignore_case);
        assert_eq!(words.table.len(), 2);
        assert_eq!(words.table.find(b"if").map(|t| &**t), Some(&b"kw"[..]));
        // The line after `done` became a second rule.
        assert_eq!(g.rules.len(), 2);
    }

    #[test]
    fn istrings_block() {
        let g = parse_ok("=c 07\n:s c\n * s istrings\n\t\"IF\" kw\ndone\n");
        let words = g.rules[0].words.as_ref().unwrap();
        assert!(words.ignore_case);
        assert!(words.table.find(b"if").is_some());
    }

    #[test]
    fn strings_entries_with_empty_parts_are_skipped() {
        let g = parse_ok("=c 07\n:s c\n * s strings\n\t\"\" kw\n\t\"if\"\n\t\"for\" kw\ndone\n");
        assert_eq!(g.rules[0].words.as_ref().unwrap().table.len(), 1);
    }

    #[test]
    fn unknown_color_reports_and_substitutes() {
        let (g, diags) = parse_with_diags("=c 07\n:s nosuch\n * s\n");
        assert_eq!(diags.len(), 1);
        assert!(matches!(diags[0].kind, DiagnosticKind::UnknownColor(_)));
        assert_eq!(g.states[0].attr, Attr::ERROR);
    }

    #[test]
    fn color_redeclared_after_states() {
        // A later color declaration re-sorts the table lazily.
        let g = parse_ok("=a 01\n:s1 a\n * s1\n=b 02\n:s2 b\n * s2\n");
        assert_eq!(g.states[1].attr, color::evaluate(b"02"));
    }

    #[test]
    fn orphan_rule_line() {
        let (g, diags) = parse_with_diags(" * nowhere\n");
        assert!(g.states.is_empty());
        assert_eq!(diags.len(), 1);
        assert!(matches!(diags[0].kind, DiagnosticKind::OrphanRule));
    }

    #[test]
    fn unterminated_class_is_reported() {
        let (_, diags) = parse_with_diags("=c 07\n:s c\n \"abc s\n");
        assert!(diags.iter().any(|d| d.kind == DiagnosticKind::UnterminatedClass));
    }

    #[test]
    fn diagnostics_carry_line_numbers() {
        let (_, diags) = parse_with_diags("=c 07\n:s nosuch\n");
        assert_eq!(diags[0].line, Some(2));
    }
}
