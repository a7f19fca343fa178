//! The color expression mini-parser.
//!
//! A color specification is a whitespace-separated token sequence on one
//! line, e.g. `=Comment green bg_black italic` or `=Odd 17 underline`.
//! Three token shapes exist:
//!
//! - a hex byte: low nibble is the foreground index, high nibble the
//!   background index;
//! - `fg_NNN` / `bg_NNN`: a 256-color palette index, using the 6x6x6 cube
//!   numbering (offset 16, digits read radix-6) when the third digit is
//!   0..=5, and the grayscale ramp (offset 232, decimal) otherwise;
//! - a bare word from the known vocabulary.
//!
//! Words are classified by a rolling hash into a fixed 46-bucket table and
//! then verified against the bucket's keyword, so unknown words (including
//! ones that collide into an occupied bucket) change nothing. Later fg/bg
//! tokens override earlier ones; style flags accumulate.

use crate::attr::{Attr, Styles};

#[derive(Clone, Copy)]
enum Word {
    Fg(u8),
    Bg(u8),
    Style(Styles),
}

/// The word classifier. Bucket positions are fixed by [`color_bucket`]; the
/// `table_positions` test below recomputes every one of them.
#[rustfmt::skip]
static WORDS: [Option<(&str, Word)>; 46] = [
    None,
    None,
    Some(("green", Word::Fg(2))),
    Some(("blue", Word::Fg(4))),
    None,
    Some(("bg_cyan", Word::Bg(6))),
    None,
    Some(("bg_white", Word::Bg(7))),
    None,
    Some(("inverse", Word::Style(Styles::INVERSE))),
    None,
    None,
    Some(("white", Word::Fg(7))),
    Some(("cyan", Word::Fg(6))),
    None,
    None,
    Some(("bg_red", Word::Bg(1))),
    None,
    None,
    None,
    Some(("bg_black", Word::Bg(0))),
    None,
    None,
    None,
    Some(("bold", Word::Style(Styles::BOLD))),
    Some(("black", Word::Fg(0))),
    None,
    Some(("bg_yellow", Word::Bg(3))),
    None,
    Some(("yellow", Word::Fg(3))),
    None,
    Some(("bg_blue", Word::Bg(4))),
    Some(("bg_magenta", Word::Bg(5))),
    Some(("dim", Word::Style(Styles::DIM))),
    Some(("underline", Word::Style(Styles::UNDERLINE))),
    Some(("italic", Word::Style(Styles::ITALIC))),
    Some(("red", Word::Fg(1))),
    None,
    None,
    None,
    Some(("magenta", Word::Fg(5))),
    None,
    None,
    None,
    Some(("bg_green", Word::Bg(2))),
    Some(("blink", Word::Style(Styles::BLINK))),
];

/// Evaluates a whole color specification into a packed attribute.
pub fn evaluate(spec: &[u8]) -> Attr {
    let mut fg = 0u8;
    let mut bg = 0u8;
    let mut styles = Styles::empty();

    for token in spec.split(|&b| b == b' ' || b == b'\t').filter(|t| !t.is_empty()) {
        if let Some(v) = parse_hex(token) {
            fg = v & 0xf;
            bg = v >> 4;
        } else if let Some((background, v)) = parse_palette(token) {
            if background {
                bg = v;
            } else {
                fg = v;
            }
        } else {
            match classify_word(token) {
                Some(Word::Fg(v)) => fg = v,
                Some(Word::Bg(v)) => bg = v,
                Some(Word::Style(s)) => styles |= s,
                // Unknown words are tolerated silently.
                None => {}
            }
        }
    }

    Attr::pack(fg, bg, styles)
}

/// A token made entirely of at least two hex digits; only the low byte of
/// the value matters.
fn parse_hex(token: &[u8]) -> Option<u8> {
    if token.len() < 2 {
        return None;
    }

    let mut val = 0u32;
    for &b in token {
        let d = (b as char).to_digit(16)?;
        val = val.wrapping_shl(4) | d;
    }
    Some(val as u8)
}

/// `fg_NNN` / `bg_NNN` (case-insensitive). Returns (is_background, index).
fn parse_palette(token: &[u8]) -> Option<(bool, u8)> {
    if token.len() < 4
        || token[1].to_ascii_lowercase() != b'g'
        || token[2] != b'_'
        || !token[3].is_ascii_digit()
    {
        return None;
    }

    let background = match token[0].to_ascii_lowercase() {
        b'b' => true,
        b'f' => false,
        _ => return None,
    };

    // Third digit position decides: 0..=5 is the 6-level cube numbering
    // (each digit is one cube axis), anything else the grayscale ramp.
    let (offset, radix) = match token.get(5) {
        Some(b'0'..=b'5') => (16u32, 6u8),
        _ => (232u32, 10u8),
    };

    let mut val = 0u32;
    for &b in &token[3..] {
        let d = b.wrapping_sub(b'0');
        if d >= radix {
            break;
        }
        val = val.wrapping_mul(radix as u32).wrapping_add(d as u32);
    }

    Some((background, offset.wrapping_add(val) as u8))
}

fn classify_word(token: &[u8]) -> Option<Word> {
    match WORDS[color_bucket(token)] {
        Some((word, action)) if token.eq_ignore_ascii_case(word.as_bytes()) => Some(action),
        _ => None,
    }
}

/// Rolling hash folding a word into one of 46 buckets. The constants only
/// need to keep the known vocabulary collision-free; what they do to other
/// words is irrelevant (the bucket entry is verified before use).
fn color_bucket(token: &[u8]) -> usize {
    let mut c = 0u16;
    let mut i = 0u16;
    for &b in token {
        c = c.wrapping_add(90u16.wrapping_mul(b.to_ascii_lowercase() as u16)).wrapping_add(i);
        i = i.wrapping_add(28);
    }
    (c.wrapping_add(22) / 26 % 46) as usize
}
