//! Nachrichten-Codec fuer das TeamTalk-Textprotokoll
//!
//! Parst und baut Zeilen im Format:
//!   eventname key1=123 key2="Wert mit Leerzeichen" key3=[1,2,drei]
//!
//! Die Zerlegung in Tokens folgt den Shell-Regeln (POSIX): Leerzeichen
//! trennen, `"..."` und `'...'` gruppieren, `\` escaped ausserhalb von
//! Anfuehrungszeichen jedes Zeichen, innerhalb von `"..."` nur `"` und `\`.
//! Zusaetzlich stehen `\r` und `\n` in `"..."` fuer CR und LF.

use crate::error::{ProtokollFehler, ProtokollResult};
use crate::value::{ist_ziffernfolge, ListItem, Params, Value};

/// Eine geparste Protokollnachricht
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProtocolMessage {
    /// Eventname wie empfangen (Vergleiche erfolgen in Kleinschreibung)
    pub event: String,
    /// Key-Value-Parameter in Empfangsreihenfolge
    pub params: Params,
}

impl ProtocolMessage {
    /// Erstellt eine Nachricht ohne Parameter
    pub fn neu(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            params: Params::new(),
        }
    }

    /// Haengt einen Parameter an (Builder-Stil)
    pub fn mit(mut self, key: impl Into<String>, wert: impl Into<Value>) -> Self {
        self.params.insert(key.into(), wert.into());
        self
    }

    /// Eventname in Kleinschreibung
    pub fn event_normalisiert(&self) -> String {
        self.event.to_lowercase()
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// Serialisiert die Nachricht als Zeile (ohne CRLF)
    pub fn build(&self) -> String {
        build(&self.event, &self.params)
    }
}

/// Parst eine Zeile in Event und typisierte Parameter
pub fn parse(line: &str) -> ProtokollResult<ProtocolMessage> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ProtokollFehler::LeereZeile);
    }

    let tokens = tokenize(line)?;
    let mut tokens = tokens.into_iter();
    let event = tokens.next().ok_or(ProtokollFehler::LeereZeile)?;

    let mut params = Params::new();
    for token in tokens {
        let (key, roh) = token
            .split_once('=')
            .ok_or_else(|| ProtokollFehler::FehlendesGleichheitszeichen(token.clone()))?;
        params.insert(key.to_string(), typisieren(roh));
    }

    Ok(ProtocolMessage { event, params })
}

/// Baut eine Zeile aus Event und Parametern (Umkehrung von [`parse`])
pub fn build(event: &str, params: &Params) -> String {
    let mut zeile = String::from(event);
    for (key, wert) in params {
        zeile.push(' ');
        zeile.push_str(key);
        zeile.push('=');
        match wert {
            Value::Integer(n) => zeile.push_str(&n.to_string()),
            Value::Text(s) => skalar_schreiben(&mut zeile, s),
            Value::List(elemente) => {
                zeile.push('[');
                for (i, element) in elemente.iter().enumerate() {
                    if i > 0 {
                        zeile.push(',');
                    }
                    match element {
                        ListItem::Integer(n) => zeile.push_str(&n.to_string()),
                        ListItem::Text(s) => skalar_schreiben(&mut zeile, s),
                    }
                }
                zeile.push(']');
            }
        }
    }
    zeile
}

fn typisieren(roh: &str) -> Value {
    if let Some(innen) = roh.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
        if innen.is_empty() {
            return Value::List(Vec::new());
        }
        return Value::List(innen.split(',').map(ListItem::typisieren).collect());
    }
    Value::skalar(roh)
}

/// Ziffernfolgen unquotiert, alles andere in `"..."` mit escaptem `\`, `"`,
/// CR und LF (ein Wert darf nie eine neue Protokollzeile beginnen)
fn skalar_schreiben(ziel: &mut String, s: &str) {
    if ist_ziffernfolge(s) {
        ziel.push_str(s);
        return;
    }
    ziel.push('"');
    for c in s.chars() {
        match c {
            '"' | '\\' => {
                ziel.push('\\');
                ziel.push(c);
            }
            '\r' => ziel.push_str("\\r"),
            '\n' => ziel.push_str("\\n"),
            _ => ziel.push(c),
        }
    }
    ziel.push('"');
}

/// Zerlegt eine Zeile nach Shell-Regeln in Tokens
fn tokenize(input: &str) -> ProtokollResult<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    // Auch `""` erzeugt ein (leeres) Token
    let mut token_offen = false;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                token_offen = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(next @ ('"' | '\\')) => current.push(next),
                            Some('r') => current.push('\r'),
                            Some('n') => current.push('\n'),
                            Some(other) => {
                                current.push('\\');
                                current.push(other);
                            }
                            None => return Err(ProtokollFehler::OffenesAnfuehrungszeichen),
                        },
                        Some(other) => current.push(other),
                        None => return Err(ProtokollFehler::OffenesAnfuehrungszeichen),
                    }
                }
            }
            '\'' => {
                token_offen = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(other) => current.push(other),
                        None => return Err(ProtokollFehler::OffenesAnfuehrungszeichen),
                    }
                }
            }
            '\\' => {
                let next = chars.next().ok_or(ProtokollFehler::UnvollstaendigesEscape)?;
                current.push(next);
                token_offen = true;
            }
            c if c.is_whitespace() => {
                if token_offen {
                    tokens.push(std::mem::take(&mut current));
                    token_offen = false;
                }
            }
            _ => {
                current.push(c);
                token_offen = true;
            }
        }
    }

    if token_offen {
        tokens.push(current);
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_nur_event() {
        let msg = parse("ping").unwrap();
        assert_eq!(msg.event, "ping");
        assert!(msg.params.is_empty());
    }

    #[test]
    fn parse_ganzzahl() {
        let msg = parse("ev k=42").unwrap();
        assert_eq!(msg.param("k"), Some(&Value::Integer(42)));
    }

    #[test]
    fn parse_quotierte_ziffern_mit_buchstaben_bleiben_text() {
        let msg = parse(r#"ev k="42a""#).unwrap();
        assert_eq!(msg.param("k"), Some(&Value::Text("42a".into())));
    }

    #[test]
    fn parse_gemischte_liste() {
        let msg = parse("ev k=[1,two,3]").unwrap();
        assert_eq!(
            msg.param("k"),
            Some(&Value::List(vec![
                ListItem::Integer(1),
                ListItem::Text("two".into()),
                ListItem::Integer(3),
            ]))
        );
    }

    #[test]
    fn parse_leere_liste() {
        let msg = parse("ev k=[]").unwrap();
        assert_eq!(msg.param("k"), Some(&Value::List(vec![])));
    }

    #[test]
    fn parse_quotierter_wert_mit_leerzeichen() {
        let msg = parse(r#"addchannel chanid=2 channel="Meine Lobby" topic='a b'"#).unwrap();
        assert_eq!(msg.param("channel"), Some(&Value::Text("Meine Lobby".into())));
        assert_eq!(msg.param("topic"), Some(&Value::Text("a b".into())));
    }

    #[test]
    fn parse_escapes_in_anfuehrungszeichen() {
        let msg = parse(r#"ev k="sagt \"hallo\" \\ ende""#).unwrap();
        assert_eq!(msg.param("k"), Some(&Value::Text(r#"sagt "hallo" \ ende"#.into())));
    }

    #[test]
    fn parse_leerer_quotierter_wert() {
        let msg = parse(r#"login password="""#).unwrap();
        assert_eq!(msg.param("password"), Some(&Value::Text(String::new())));
    }

    #[test]
    fn parse_teilt_am_ersten_gleichheitszeichen() {
        let msg = parse(r#"ev url="a=b=c""#).unwrap();
        assert_eq!(msg.param("url"), Some(&Value::Text("a=b=c".into())));
    }

    #[test]
    fn parse_behaelt_schreibweise_des_events() {
        let msg = parse("LoggedIn userid=3").unwrap();
        assert_eq!(msg.event, "LoggedIn");
        assert_eq!(msg.event_normalisiert(), "loggedin");
    }

    #[test]
    fn parse_fehler() {
        assert_eq!(parse(""), Err(ProtokollFehler::LeereZeile));
        assert_eq!(parse("  \r\n"), Err(ProtokollFehler::LeereZeile));
        assert_eq!(
            parse("ev kaputt"),
            Err(ProtokollFehler::FehlendesGleichheitszeichen("kaputt".into()))
        );
        assert_eq!(parse(r#"ev k="offen"#), Err(ProtokollFehler::OffenesAnfuehrungszeichen));
        assert_eq!(parse("ev k=a\\"), Err(ProtokollFehler::UnvollstaendigesEscape));
    }

    #[test]
    fn build_quoting_regeln() {
        let msg = ProtocolMessage::neu("login")
            .mit("nickname", "Bot Eins")
            .mit("protocol", "5.6")
            .mit("userid", "17")
            .mit("id", 1u64)
            .mit("list", vec![ListItem::Integer(1), ListItem::from("a b"), ListItem::from("9")]);
        assert_eq!(
            msg.build(),
            r#"login nickname="Bot Eins" protocol="5.6" userid=17 id=1 list=[1,"a b",9]"#
        );
    }

    #[test]
    fn build_ohne_params() {
        assert_eq!(build("ping", &Params::new()), "ping");
        let leer = ProtocolMessage::neu("x").mit("l", Vec::<ListItem>::new());
        assert_eq!(build("ev", &leer.params), "ev l=[]");
    }

    #[test]
    fn build_zeilenumbrueche_bleiben_eine_zeile() {
        let msg = ProtocolMessage::neu("message")
            .mit("type", 1u64)
            .mit("content", "hallo\r\nkick userid=9");
        let zeile = msg.build();
        assert_eq!(zeile, r#"message type=1 content="hallo\r\nkick userid=9""#);
        assert!(!zeile.contains('\n') && !zeile.contains('\r'));

        let zurueck = parse(&zeile).unwrap();
        assert_eq!(
            zurueck.param("content"),
            Some(&Value::Text("hallo\r\nkick userid=9".into()))
        );
    }

    #[test]
    fn parse_escapte_zeilenumbrueche() {
        let msg = parse(r#"messagedeliver content="eins\nzwei" pfad="C:\\neu""#).unwrap();
        assert_eq!(msg.param("content"), Some(&Value::Text("eins\nzwei".into())));
        assert_eq!(msg.param("pfad"), Some(&Value::Text("C:\\neu".into())));
    }

    #[test]
    fn round_trip_typerhaltend() {
        let zeilen = [
            r#"serverupdate name="Mein Server" usertimeout=60 motd="" maxusers=1000"#,
            r#"loggedin userid=5 nickname="Anna" channels=[1,lobby,3] status=[]"#,
            r#"messagedeliver type=1 srcuserid=3 content="sag \"hi\" \\ tschuess""#,
            "begin id=1",
        ];
        for zeile in zeilen {
            let erste = parse(zeile).unwrap();
            let zweite = parse(&erste.build()).unwrap();
            assert_eq!(erste, zweite, "Round-Trip fuer {zeile}");
        }
    }
}
