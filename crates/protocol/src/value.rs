//! Typisierte Parameterwerte des TeamTalk-Textprotokolls
//!
//! Jeder Wert wird genau einmal beim Parsen typisiert (Ganzzahl, Text oder
//! Liste) und danach nie wieder aus dem Text abgeleitet.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parameter einer Nachricht in Einfuegereihenfolge
pub type Params = IndexMap<String, Value>;

/// Ein einzelner Parameterwert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Reine Ziffernfolge
    Integer(u64),
    /// Beliebiger Text
    Text(String),
    /// `[a,b,c]` – Elemente einzeln typisiert
    List(Vec<ListItem>),
}

/// Ein Element einer Listen-Wertes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListItem {
    Integer(u64),
    Text(String),
}

/// Prueft ob ein String ausschliesslich aus ASCII-Ziffern besteht
pub fn ist_ziffernfolge(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

impl Value {
    /// Typisiert einen Skalar: Ziffernfolgen werden zu `Integer`, alles andere bleibt Text.
    ///
    /// Ziffernfolgen die nicht in `u64` passen bleiben Text.
    pub fn skalar(roh: &str) -> Self {
        match ListItem::typisieren(roh) {
            ListItem::Integer(n) => Value::Integer(n),
            ListItem::Text(t) => Value::Text(t),
        }
    }

    pub fn as_int(&self) -> Option<u64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ListItem]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }
}

impl ListItem {
    pub(crate) fn typisieren(roh: &str) -> Self {
        if ist_ziffernfolge(roh) {
            if let Ok(n) = roh.parse::<u64>() {
                return ListItem::Integer(n);
            }
        }
        ListItem::Text(roh.to_string())
    }

    pub fn as_int(&self) -> Option<u64> {
        match self {
            ListItem::Integer(n) => Some(*n),
            ListItem::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ListItem::Text(s) => Some(s),
            ListItem::Integer(_) => None,
        }
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Integer(n)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Integer(u64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<ListItem>> for Value {
    fn from(l: Vec<ListItem>) -> Self {
        Value::List(l)
    }
}

impl From<u64> for ListItem {
    fn from(n: u64) -> Self {
        ListItem::Integer(n)
    }
}

impl From<&str> for ListItem {
    fn from(s: &str) -> Self {
        ListItem::Text(s.to_string())
    }
}

impl fmt::Display for ListItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListItem::Integer(n) => write!(f, "{n}"),
            ListItem::Text(s) => f.write_str(s),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{n}"),
            Value::Text(s) => f.write_str(s),
            Value::List(l) => {
                f.write_str("[")?;
                for (i, element) in l.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{element}")?;
                }
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ziffernfolge_erkennung() {
        assert!(ist_ziffernfolge("0"));
        assert!(ist_ziffernfolge("10333"));
        assert!(!ist_ziffernfolge(""));
        assert!(!ist_ziffernfolge("-5"));
        assert!(!ist_ziffernfolge("4.0"));
        assert!(!ist_ziffernfolge("42a"));
    }

    #[test]
    fn ueberlauf_bleibt_text() {
        let riesig = "99999999999999999999999";
        assert_eq!(Value::skalar(riesig), Value::Text(riesig.into()));
    }

    #[test]
    fn display_liste() {
        let wert = Value::List(vec![ListItem::Integer(1), ListItem::from("zwei")]);
        assert_eq!(wert.to_string(), "[1,zwei]");
    }

    #[test]
    fn serde_untagged() {
        let json = serde_json::to_string(&Value::List(vec![1u64.into(), "a".into()])).unwrap();
        assert_eq!(json, r#"[1,"a"]"#);
    }
}
