//! DBC (CAN database) text parsing and the signal/message catalog it builds.
//!
//! Only `BO_` (message) and `SG_` (signal) lines with linear scaling are understood, per the
//! scope this crate targets — comments, attributes, value tables, and multiplexed signals are not
//! part of the accepted subset.

mod parser;
pub mod signal;

use std::collections::HashMap;
use std::path::Path;

pub use signal::{DbcSignal, Sign, SignalEndianness};

use crate::error::Error;

#[derive(Debug, Clone)]
pub struct DbcMessage {
    pub id: u32,
    pub name: String,
    pub dlc: u8,
    pub signals: Vec<DbcSignal>,
}

/// A parsed DBC catalog: message name → message (primary), with lookup by id supported via
/// linear scan, which is acceptable at the catalog sizes (hundreds of messages) DBC files reach.
#[derive(Debug, Clone, Default)]
pub struct Dbc {
    messages: HashMap<String, DbcMessage>,
}

impl Dbc {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_str(&text))
    }

    /// Parses DBC text. Lines that match no recognized shape are skipped silently; this never
    /// fails — a DBC with zero recognizable lines simply yields an empty catalog.
    pub fn from_str(text: &str) -> Self {
        let mut messages: HashMap<String, DbcMessage> = HashMap::new();
        let mut current: Option<String> = None;

        for raw_line in text.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with("BO_TX_BU_") {
                continue;
            }

            if let Some(parsed) = parser::parse_message_line(line) {
                if messages.contains_key(&parsed.name) {
                    log::warn!("duplicate DBC message name {:?}, overwriting", parsed.name);
                }
                messages.insert(
                    parsed.name.clone(),
                    DbcMessage {
                        id: parsed.id,
                        name: parsed.name.clone(),
                        dlc: parsed.dlc,
                        signals: Vec::new(),
                    },
                );
                current = Some(parsed.name);
                continue;
            }

            if let Some(signal) = parser::parse_signal_line(line) {
                if let Some(name) = &current {
                    if let Some(message) = messages.get_mut(name) {
                        message.signals.push(signal);
                    }
                }
                continue;
            }
            // unrecognized line shape: skipped silently
        }

        Dbc { messages }
    }

    pub fn message(&self, name: &str) -> Option<&DbcMessage> {
        self.messages.get(name)
    }

    pub fn message_by_id(&self, id: u32) -> Option<&DbcMessage> {
        self.messages.values().find(|m| m.id == id)
    }

    /// Encodes `values` (signal name → engineering value) into the wire payload for `name`.
    pub fn encode_can(
        &self,
        name: &str,
        values: &HashMap<String, f64>,
    ) -> Result<(u32, Vec<u8>), Error> {
        let message = self
            .message(name)
            .ok_or_else(|| Error::UnknownMessage(name.to_string()))?;

        let mut payload = vec![0u8; message.dlc as usize];
        for signal in &message.signals {
            if let Some(&value) = values.get(&signal.name) {
                signal.encode(value, &mut payload)?;
            }
        }
        Ok((message.id, payload))
    }

    /// Decodes the payload for the message matching `id`, if any. Returns `Ok(None)` if no
    /// message in the catalog has that id; propagates `BitPositionOutOfBounds` if `data` is too
    /// short for a signal the message declares.
    pub fn decode_can(
        &self,
        id: u32,
        data: &[u8],
    ) -> Result<Option<(String, HashMap<String, f64>)>, Error> {
        let message = match self.message_by_id(id) {
            Some(m) => m,
            None => return Ok(None),
        };

        let mut signals = HashMap::with_capacity(message.signals.len());
        for signal in &message.signals {
            signals.insert(signal.name.clone(), signal.decode(data)?);
        }
        Ok(Some((message.name.clone(), signals)))
    }
}

/// Parsing DBC text never fails (unrecognized lines are skipped), so `Err` is uninhabited.
impl std::str::FromStr for Dbc {
    type Err = std::convert::Infallible;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Ok(Dbc::from_str(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DBC_TEXT: &str = "BO_ 256 Example: 8 X\nSG_ Speed: 0|8@1+ (1,0)\nSG_ Temp: 8|8@1+ (0.5,0)\n";

    #[test]
    fn s5_dbc_roundtrip() {
        let dbc = Dbc::from_str(DBC_TEXT);
        let mut values = HashMap::new();
        values.insert("Speed".to_string(), 10.0);
        values.insert("Temp".to_string(), 20.0);

        let (id, data) = dbc.encode_can("Example", &values).unwrap();
        assert_eq!(id, 256);
        assert_eq!(data, vec![10, 40, 0, 0, 0, 0, 0, 0]);

        let (name, decoded) = dbc.decode_can(id, &data).unwrap().unwrap();
        assert_eq!(name, "Example");
        assert_eq!(decoded["Speed"], 10.0);
        assert_eq!(decoded["Temp"], 20.0);
    }

    #[test]
    fn unknown_message_rejected() {
        let dbc = Dbc::from_str(DBC_TEXT);
        let err = dbc.encode_can("Nope", &HashMap::new()).unwrap_err();
        assert!(matches!(err, Error::UnknownMessage(_)));
    }

    #[test]
    fn decode_can_absent_id_returns_none() {
        let dbc = Dbc::from_str(DBC_TEXT);
        assert!(dbc.decode_can(0xDEAD, &[0u8; 8]).unwrap().is_none());
    }

    #[test]
    fn duplicate_message_name_last_wins() {
        let text = "BO_ 1 M: 2 X\nSG_ A: 0|8@1+ (1,0)\nBO_ 2 M: 2 X\nSG_ B: 0|8@1+ (1,0)\n";
        let dbc = Dbc::from_str(text);
        let message = dbc.message("M").unwrap();
        assert_eq!(message.id, 2);
        assert_eq!(message.signals.len(), 1);
        assert_eq!(message.signals[0].name, "B");
    }

    #[test]
    fn ignored_prefix_and_blank_lines() {
        let text = "\nBO_TX_BU_ 1 : X;\nBO_ 1 M: 1 X\n\nSG_ A: 0|8@1+ (1,0)\n";
        let dbc = Dbc::from_str(text);
        assert!(dbc.message("M").is_some());
    }

    #[test]
    fn unknown_input_keys_ignored() {
        let dbc = Dbc::from_str(DBC_TEXT);
        let mut values = HashMap::new();
        values.insert("Speed".to_string(), 5.0);
        values.insert("NotASignal".to_string(), 1.0);
        let (_, data) = dbc.encode_can("Example", &values).unwrap();
        assert_eq!(data[0], 5);
    }

    #[test]
    fn reachable_via_std_from_str_trait() {
        let dbc: Dbc = DBC_TEXT.parse().unwrap();
        assert!(dbc.message("Example").is_some());
    }
}
