//! Hand-rolled line/token scanner for the DBC subset this crate understands (`BO_`/`SG_` only).
//!
//! No `regex` dependency: the DBC text this crate accepts is a handful of fixed-shape lines, and a
//! small cursor over whitespace-split tokens reads more plainly than a regex would for that case.

use super::signal::{DbcSignal, Sign, SignalEndianness};

pub(super) struct ParsedMessage {
    pub id: u32,
    pub name: String,
    pub dlc: u8,
    #[allow(dead_code)]
    pub node: String,
}

/// Parses a `BO_ <id> <name>[:| :] <dlc> <node>` line. Returns `None` if the line doesn't match.
pub(super) fn parse_message_line(line: &str) -> Option<ParsedMessage> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.first() != Some(&"BO_") {
        return None;
    }

    let id: u32 = tokens.get(1)?.parse().ok()?;

    let mut idx = 2;
    let mut name = (*tokens.get(idx)?).to_string();
    idx += 1;
    if name.ends_with(':') {
        name.pop();
    } else if tokens.get(idx) == Some(&":") {
        idx += 1;
    }

    let dlc: u8 = tokens.get(idx)?.parse().ok()?;
    idx += 1;
    let node = (*tokens.get(idx)?).to_string();

    Some(ParsedMessage { id, name, dlc, node })
}

/// Parses a `SG_ <name>[:| :] <start>|<len>@<endian><sign> (<factor>,<offset>) ...` line.
/// Trailing `[min|max]`, unit, and receiver tokens are accepted and discarded.
pub(super) fn parse_signal_line(line: &str) -> Option<DbcSignal> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.first() != Some(&"SG_") {
        return None;
    }

    let mut idx = 1;
    let mut name = (*tokens.get(idx)?).to_string();
    idx += 1;
    if name.ends_with(':') {
        name.pop();
    } else if tokens.get(idx) == Some(&":") {
        idx += 1;
    }

    let bitspec = tokens.get(idx)?;
    idx += 1;
    let (bits, rest) = bitspec.split_once('@')?;
    let (start_str, len_str) = bits.split_once('|')?;
    let start_bit: u16 = start_str.parse().ok()?;
    let length: u8 = len_str.parse().ok()?;

    let mut rest_chars = rest.chars();
    let endianness = match rest_chars.next()? {
        '1' => SignalEndianness::Little,
        '0' => SignalEndianness::Big,
        _ => return None,
    };
    let sign = match rest_chars.next()? {
        '+' => Sign::Unsigned,
        '-' => Sign::Signed,
        _ => return None,
    };

    let factor_offset = tokens.get(idx)?;
    let trimmed = factor_offset.trim_start_matches('(').trim_end_matches(')');
    let (factor_str, offset_str) = trimmed.split_once(',')?;
    let factor: f64 = factor_str.parse().ok()?;
    let offset: f64 = offset_str.parse().ok()?;

    Some(DbcSignal {
        name,
        start_bit,
        length,
        endianness,
        sign,
        factor,
        offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_line_no_space_before_colon() {
        let m = parse_message_line("BO_ 256 Example: 8 X").unwrap();
        assert_eq!(m.id, 256);
        assert_eq!(m.name, "Example");
        assert_eq!(m.dlc, 8);
        assert_eq!(m.node, "X");
    }

    #[test]
    fn message_line_space_before_colon() {
        let m = parse_message_line("BO_ 0 A : 1 B").unwrap();
        assert_eq!(m.id, 0);
        assert_eq!(m.name, "A");
        assert_eq!(m.dlc, 1);
        assert_eq!(m.node, "B");
    }

    #[test]
    fn signal_line_shorthand() {
        let sig = parse_signal_line("SG_ Speed: 0|8@1+ (1,0)").unwrap();
        assert_eq!(sig.name, "Speed");
        assert_eq!(sig.start_bit, 0);
        assert_eq!(sig.length, 8);
        assert_eq!(sig.endianness, SignalEndianness::Little);
        assert_eq!(sig.sign, Sign::Unsigned);
        assert_eq!(sig.factor, 1.0);
        assert_eq!(sig.offset, 0.0);
    }

    #[test]
    fn signal_line_full_shape() {
        let sig =
            parse_signal_line(r#"SG_ RPM : 0|16@1+ (0.25,0) [0|8000] "rpm" *"#).unwrap();
        assert_eq!(sig.name, "RPM");
        assert_eq!(sig.length, 16);
        assert_eq!(sig.factor, 0.25);
    }

    #[test]
    fn signal_line_big_endian_signed() {
        let sig = parse_signal_line("SG_ Val: 0|8@0- (1,0)").unwrap();
        assert_eq!(sig.endianness, SignalEndianness::Big);
        assert_eq!(sig.sign, Sign::Signed);
    }

    #[test]
    fn unrecognized_lines_skipped() {
        assert!(parse_message_line("VERSION \"1.0\"").is_none());
        assert!(parse_signal_line("BU_: ECM").is_none());
    }
}
