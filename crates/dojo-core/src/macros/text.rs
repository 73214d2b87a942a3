//! Textual macro serialization.
//!
//! A slot exports to a whitespace-separated token stream, one token per
//! tick: a numpad direction digit (5 = neutral), optional button letters
//! A-D, an optional brace group spelling out the tick's raw buffer writes
//! (`{2: 6 6A}`), and an optional `xN` run repeat. The brace group is
//! omitted when the tick's single raw write equals its mask, which is the
//! common case; the parser synthesizes it back, so round trips reproduce
//! the flat streams byte for byte.
//!
//! Parsing is tolerant about whitespace between a base token and its
//! brace group or repeat suffix, and rejects malformed input with a
//! descriptive error, leaving the target slot untouched.

use crate::error::{Error, Result};
use crate::input::InputMask;
use crate::macros::MacroSlot;

/// Parsed flat streams, pre-commit.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParsedMacro {
    pub mask_stream: Vec<u8>,
    pub buf_counts: Vec<u16>,
    pub buf_stream: Vec<u8>,
}

/// Serialize a slot to the textual form.
pub fn export_slot(slot: &MacroSlot) -> String {
    let mut out = String::new();
    let mut i = 0;
    while i < slot.tick_count() {
        let mask = slot.mask_stream[i];
        let writes = slot.buf_writes(i);

        // Extend the run while mask and writes are identical.
        let mut run = 1usize;
        while i + run < slot.tick_count()
            && slot.mask_stream[i + run] == mask
            && slot.buf_writes(i + run) == writes
        {
            run += 1;
        }

        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&encode_mask(mask));
        if writes != [mask] {
            out.push('{');
            out.push_str(&writes.len().to_string());
            out.push(':');
            for w in writes {
                out.push(' ');
                out.push_str(&encode_mask(*w));
            }
            out.push('}');
        }
        if run > 1 {
            out.push('x');
            out.push_str(&run.to_string());
        }

        i += run;
    }
    out
}

/// Parse the textual form into flat streams.
pub fn parse_macro(text: &str) -> Result<ParsedMacro> {
    let mut parsed = ParsedMacro::default();
    let mut chars = text.chars().peekable();

    loop {
        skip_ws(&mut chars);
        let Some(&c) = chars.peek() else {
            break;
        };
        if !c.is_ascii_digit() {
            return Err(Error::MacroParse(format!(
                "unexpected character '{c}', expected a direction digit"
            )));
        }

        let mask = parse_mask_token(&mut chars)?;

        skip_ws(&mut chars);
        let writes = if chars.peek() == Some(&'{') {
            parse_buf_group(&mut chars)?
        } else {
            vec![mask]
        };

        skip_ws(&mut chars);
        let repeat = if chars.peek() == Some(&'x') {
            chars.next();
            parse_count(&mut chars, "repeat count")?
        } else {
            1
        };
        if repeat == 0 {
            return Err(Error::MacroParse("repeat count must be positive".into()));
        }

        for _ in 0..repeat {
            parsed.mask_stream.push(mask);
            parsed.buf_counts.push(writes.len() as u16);
            parsed.buf_stream.extend_from_slice(&writes);
        }
    }

    Ok(parsed)
}

/// Import text into a slot. An empty token stream clears the slot; a
/// parse error leaves it untouched.
pub fn import_slot(slot: &mut MacroSlot, text: &str) -> Result<()> {
    let parsed = parse_macro(text)?;

    slot.clear();
    slot.facing_stream = vec![true; parsed.mask_stream.len()];
    slot.mask_stream = parsed.mask_stream;
    slot.buf_counts = parsed.buf_counts;
    slot.buf_stream = parsed.buf_stream;
    slot.rebuild_spans();
    Ok(())
}

fn encode_mask(mask: u8) -> String {
    let m = InputMask::new(mask);
    format!("{}{}", m.direction_digit(), m.button_letters())
}

fn skip_ws(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
    }
}

fn parse_mask_token(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Result<u8> {
    let digit = chars
        .next()
        .and_then(|c| c.to_digit(10))
        .ok_or_else(|| Error::MacroParse("expected a direction digit".into()))?;
    let Some(mask) = InputMask::from_direction_digit(digit as u8) else {
        return Err(Error::MacroParse(format!(
            "direction digit {digit} out of range 1-9"
        )));
    };

    let mut buttons = 0u8;
    while let Some(&c) = chars.peek() {
        let bit = match c {
            'A' => InputMask::A,
            'B' => InputMask::B,
            'C' => InputMask::C,
            'D' => InputMask::D,
            _ => break,
        };
        buttons |= bit;
        chars.next();
    }
    Ok(mask.with_buttons(buttons).bits())
}

fn parse_count(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    what: &str,
) -> Result<usize> {
    let mut digits = String::new();
    while chars.peek().is_some_and(|c| c.is_ascii_digit()) {
        digits.push(chars.next().unwrap());
    }
    digits
        .parse()
        .map_err(|_| Error::MacroParse(format!("missing or invalid {what}")))
}

fn parse_buf_group(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Result<Vec<u8>> {
    chars.next(); // consume '{'
    skip_ws(chars);
    let declared = parse_count(chars, "buffer write count")?;
    skip_ws(chars);
    if chars.next() != Some(':') {
        return Err(Error::MacroParse(
            "expected ':' after buffer write count".into(),
        ));
    }

    let mut writes = Vec::with_capacity(declared);
    loop {
        skip_ws(chars);
        match chars.peek() {
            Some('}') => {
                chars.next();
                break;
            }
            Some(c) if c.is_ascii_digit() => writes.push(parse_mask_token(chars)?),
            Some(c) => {
                return Err(Error::MacroParse(format!(
                    "unexpected character '{c}' in buffer group"
                )));
            }
            None => {
                return Err(Error::MacroParse("unterminated buffer group".into()));
            }
        }
    }

    if writes.len() != declared {
        return Err(Error::MacroParse(format!(
            "buffer group declares {declared} writes but contains {}",
            writes.len()
        )));
    }
    if writes.is_empty() {
        return Err(Error::MacroParse("buffer group cannot be empty".into()));
    }
    Ok(writes)
}
