//! Message format registry
//!
//! The closed vocabulary of protocol v1.6: every message name with its
//! layout template and direction. Built once at startup and shared read-only.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use thiserror::Error;

use super::template::{Template, TemplateError, IDENTIFIER_LEN};

/// Message names as they appear in parsed messages
pub mod names {
    pub const HELLO: &str = "Hello";
    pub const HELLO_BACK: &str = "HelloBack";
    pub const C_NOOP: &str = "CNoop";
    pub const C_CLOSE: &str = "CClose";
    pub const C_ENTER: &str = "CEnter";
    pub const C_LEAVE: &str = "CLeave";
    pub const C_CLIPBOARD: &str = "CClipboard";
    pub const C_SCREEN_SAVER: &str = "CScreenSaver";
    pub const C_RESET_OPTIONS: &str = "CResetOptions";
    pub const C_INFO_ACK: &str = "CInfoAck";
    pub const C_KEEP_ALIVE: &str = "CKeepAlive";
    pub const D_KEY_DOWN_LANG: &str = "DKeyDownLang";
    pub const D_KEY_DOWN: &str = "DKeyDown";
    pub const D_KEY_DOWN_1_0: &str = "DKeyDown1_0";
    pub const D_KEY_REPEAT: &str = "DKeyRepeat";
    pub const D_KEY_REPEAT_LANG: &str = "DKeyRepeatLang";
    pub const D_KEY_REPEAT_1_0: &str = "DKeyRepeat1_0";
    pub const D_KEY_UP: &str = "DKeyUp";
    pub const D_KEY_UP_1_0: &str = "DKeyUp1_0";
    pub const D_MOUSE_DOWN: &str = "DMouseDown";
    pub const D_MOUSE_UP: &str = "DMouseUp";
    pub const D_MOUSE_MOVE: &str = "DMouseMove";
    pub const D_MOUSE_REL_MOVE: &str = "DMouseRelMove";
    pub const D_MOUSE_WHEEL: &str = "DMouseWheel";
    pub const D_MOUSE_WHEEL_1_0: &str = "DMouseWheel1_0";
    pub const D_CLIPBOARD: &str = "DClipboard";
    pub const D_INFO: &str = "DInfo";
    pub const D_SET_OPTIONS: &str = "DSetOptions";
    pub const D_FILE_TRANSFER: &str = "DFileTransfer";
    pub const D_DRAG_INFO: &str = "DDragInfo";
    pub const D_SECURE_INPUT_NOTIFICATION: &str = "DSecureInputNotification";
    pub const D_LANGUAGE_SYNCHRONISATION: &str = "DLanguageSynchronisation";
    pub const Q_INFO: &str = "QInfo";
    pub const E_INCOMPATIBLE: &str = "EIncompatible";
    pub const E_BUSY: &str = "EBusy";
    pub const E_UNKNOWN: &str = "EUnknown";
    pub const E_BAD: &str = "EBad";
}

/// Which side of the connection sends a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Primary (server) to secondary (this client)
    Inbound,
    /// Secondary to primary
    Outbound,
    Both,
}

impl Direction {
    pub fn receives(self) -> bool {
        matches!(self, Direction::Inbound | Direction::Both)
    }

    pub fn sends(self) -> bool {
        matches!(self, Direction::Outbound | Direction::Both)
    }
}

/// Which protocol revision a layout belongs to.
///
/// Only `Current` layouts are selected when decoding; the others share an
/// identifier with a current layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Revision {
    Current,
    /// Superseded 1.0 layout
    Legacy,
    /// Longer layout sent only by newer primaries
    Extended,
}

use self::Direction::{Both, Inbound, Outbound};
use self::Revision::{Current, Extended, Legacy};

const VOCABULARY: &[(&str, &str, Direction, Revision)] = &[
    (names::HELLO, "Synergy%2i%2i", Inbound, Current),
    (names::HELLO_BACK, "Synergy%2i%2i%s", Outbound, Current),
    (names::C_NOOP, "CNOP", Outbound, Current),
    (names::C_CLOSE, "CBYE", Inbound, Current),
    (names::C_ENTER, "CINN%2i%2i%4i%2i", Inbound, Current),
    (names::C_LEAVE, "COUT", Inbound, Current),
    (names::C_CLIPBOARD, "CCLP%1i%4i", Both, Current),
    (names::C_SCREEN_SAVER, "CSEC%1i", Inbound, Current),
    (names::C_RESET_OPTIONS, "CROP", Inbound, Current),
    (names::C_INFO_ACK, "CIAK", Inbound, Current),
    (names::C_KEEP_ALIVE, "CALV", Both, Current),
    (names::D_KEY_DOWN_LANG, "DKDL%2i%2i%2i%s", Inbound, Current),
    (names::D_KEY_DOWN, "DKDN%2i%2i%2i", Inbound, Current),
    (names::D_KEY_DOWN_1_0, "DKDN%2i%2i", Inbound, Legacy),
    (names::D_KEY_REPEAT, "DKRP%2i%2i%2i%2i", Inbound, Current),
    (names::D_KEY_REPEAT_LANG, "DKRP%2i%2i%2i%2i%s", Inbound, Extended),
    (names::D_KEY_REPEAT_1_0, "DKRP%2i%2i%2i", Inbound, Legacy),
    (names::D_KEY_UP, "DKUP%2i%2i%2i", Inbound, Current),
    (names::D_KEY_UP_1_0, "DKUP%2i%2i", Inbound, Legacy),
    (names::D_MOUSE_DOWN, "DMDN%1i", Inbound, Current),
    (names::D_MOUSE_UP, "DMUP%1i", Inbound, Current),
    (names::D_MOUSE_MOVE, "DMMV%2i%2i", Inbound, Current),
    (names::D_MOUSE_REL_MOVE, "DMRM%2i%2i", Inbound, Current),
    (names::D_MOUSE_WHEEL, "DMWM%2i%2i", Inbound, Current),
    (names::D_MOUSE_WHEEL_1_0, "DMWM%2i", Inbound, Legacy),
    (names::D_CLIPBOARD, "DCLP%1i%4i%1i%s", Both, Current),
    (names::D_INFO, "DINF%2i%2i%2i%2i%2i%2i%2i", Outbound, Current),
    (names::D_SET_OPTIONS, "DSOP%4I", Inbound, Current),
    (names::D_FILE_TRANSFER, "DFTR%1i%s", Both, Current),
    (names::D_DRAG_INFO, "DDRG%2i%s", Both, Current),
    (names::D_SECURE_INPUT_NOTIFICATION, "SECN%s", Inbound, Current),
    (names::D_LANGUAGE_SYNCHRONISATION, "LSYN%s", Inbound, Current),
    (names::Q_INFO, "QINF", Inbound, Current),
    (names::E_INCOMPATIBLE, "EICV%2i%2i", Inbound, Current),
    (names::E_BUSY, "EBSY", Inbound, Current),
    (names::E_UNKNOWN, "EUNK", Inbound, Current),
    (names::E_BAD, "EBAD", Inbound, Current),
];

/// Registry construction errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Invalid template for {name}: {source}")]
    Template {
        name: &'static str,
        #[source]
        source: TemplateError,
    },

    #[error("Duplicate message name: {0}")]
    DuplicateName(&'static str),

    #[error("{first} and {second} share identifier {identifier:?}")]
    DuplicateIdentifier {
        first: &'static str,
        second: &'static str,
        identifier: String,
    },
}

/// A named message layout
#[derive(Debug, Clone)]
pub struct MessageDef {
    pub name: &'static str,
    pub template: Template,
    pub direction: Direction,
    pub revision: Revision,
}

impl MessageDef {
    /// The 4-byte identifier at the start of every frame of this message
    pub fn identifier(&self) -> [u8; IDENTIFIER_LEN] {
        // Compiled templates always carry an identifier.
        self.template.identifier().unwrap_or_default()
    }

    /// Whether frames may be decoded as this message
    pub fn parseable(&self) -> bool {
        self.revision == Revision::Current
    }

    /// Whether a v1.6 primary sends this message, so it needs a handler
    pub fn inbound(&self) -> bool {
        self.direction.receives() && self.parseable()
    }

    pub fn encodable(&self) -> bool {
        self.direction.sends()
    }
}

/// Immutable set of message definitions
#[derive(Debug, Clone)]
pub struct Registry {
    defs: Vec<MessageDef>,
    by_name: HashMap<&'static str, usize>,
    by_identifier: HashMap<[u8; IDENTIFIER_LEN], usize>,
}

impl Registry {
    /// The full protocol vocabulary
    pub fn standard() -> Result<Self, RegistryError> {
        Self::from_table(VOCABULARY)
    }

    /// Build and validate a registry from `(name, template, direction, revision)` rows.
    ///
    /// Identifiers must be unique among encodable definitions. Among current
    /// definitions an inbound layout takes a shared identifier over an
    /// outbound-only one (`Hello` over `HelloBack`); any other clash is an
    /// error.
    pub fn from_table(
        table: &[(&'static str, &'static str, Direction, Revision)],
    ) -> Result<Self, RegistryError> {
        let mut defs = Vec::with_capacity(table.len());
        let mut by_name = HashMap::with_capacity(table.len());

        for &(name, text, direction, revision) in table {
            let template =
                Template::compile(text).map_err(|source| RegistryError::Template { name, source })?;
            if by_name.insert(name, defs.len()).is_some() {
                return Err(RegistryError::DuplicateName(name));
            }
            defs.push(MessageDef {
                name,
                template,
                direction,
                revision,
            });
        }

        let by_identifier = index_identifiers(&defs)?;
        let registry = Self {
            defs,
            by_name,
            by_identifier,
        };
        registry.check_unique(MessageDef::encodable)?;
        Ok(registry)
    }

    fn check_unique(&self, include: fn(&MessageDef) -> bool) -> Result<(), RegistryError> {
        let mut seen: HashMap<[u8; IDENTIFIER_LEN], &MessageDef> = HashMap::new();
        for def in self.defs.iter().filter(|d| include(d)) {
            if let Some(first) = seen.insert(def.identifier(), def) {
                return Err(duplicate(first, def));
            }
        }
        Ok(())
    }

    /// Look up a definition by name
    pub fn get(&self, name: &str) -> Option<&MessageDef> {
        self.by_name.get(name).map(|&i| &self.defs[i])
    }

    /// All definitions in vocabulary order
    pub fn iter(&self) -> impl Iterator<Item = &MessageDef> {
        self.defs.iter()
    }

    /// Definition a frame starting with `identifier` decodes as
    pub fn identify(&self, identifier: &[u8; IDENTIFIER_LEN]) -> Option<&MessageDef> {
        self.by_identifier.get(identifier).map(|&i| &self.defs[i])
    }

    /// Definitions a v1.6 primary sends
    pub fn inbound(&self) -> impl Iterator<Item = &MessageDef> {
        self.defs.iter().filter(|d| d.inbound())
    }

    /// Current definitions that lost their identifier to an inbound one
    pub fn shadowed(&self) -> impl Iterator<Item = &MessageDef> {
        self.defs.iter().filter(|d| {
            d.parseable() && self.identify(&d.identifier()).map(|w| w.name) != Some(d.name)
        })
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

fn duplicate(first: &MessageDef, second: &MessageDef) -> RegistryError {
    RegistryError::DuplicateIdentifier {
        first: first.name,
        second: second.name,
        identifier: String::from_utf8_lossy(&second.identifier()).into_owned(),
    }
}

/// Map identifiers of current definitions to the one frames decode as
fn index_identifiers(
    defs: &[MessageDef],
) -> Result<HashMap<[u8; IDENTIFIER_LEN], usize>, RegistryError> {
    let mut index: HashMap<[u8; IDENTIFIER_LEN], usize> = HashMap::new();
    for (i, def) in defs.iter().enumerate().filter(|(_, d)| d.parseable()) {
        match index.entry(def.identifier()) {
            Entry::Vacant(slot) => {
                slot.insert(i);
            }
            Entry::Occupied(mut slot) => {
                let first = &defs[*slot.get()];
                match (first.direction.receives(), def.direction.receives()) {
                    (true, false) => {}
                    (false, true) => {
                        slot.insert(i);
                    }
                    _ => return Err(duplicate(first, def)),
                }
            }
        }
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry_builds() {
        let registry = Registry::standard().unwrap();
        assert_eq!(registry.len(), VOCABULARY.len());
        assert_eq!(registry.get(names::HELLO).unwrap().identifier(), *b"Syne");
        assert_eq!(registry.get(names::D_SET_OPTIONS).unwrap().identifier(), *b"DSOP");
        assert!(registry.get("Nope").is_none());
    }

    #[test]
    fn test_inbound_identifiers_unique() {
        let registry = Registry::standard().unwrap();
        let defs: Vec<_> = registry.inbound().collect();
        for (i, a) in defs.iter().enumerate() {
            for b in &defs[i + 1..] {
                assert_ne!(a.identifier(), b.identifier(), "{} vs {}", a.name, b.name);
            }
        }
    }

    #[test]
    fn test_hello_takes_shared_prefix() {
        let registry = Registry::standard().unwrap();
        let hello = registry.get(names::HELLO).unwrap();
        let hello_back = registry.get(names::HELLO_BACK).unwrap();
        assert_eq!(hello.identifier(), hello_back.identifier());
        assert!(hello.inbound() && !hello.encodable());
        assert!(hello_back.encodable() && !hello_back.inbound());
        assert_eq!(registry.identify(b"Syne").unwrap().name, names::HELLO);

        let shadowed: Vec<_> = registry.shadowed().map(|d| d.name).collect();
        assert_eq!(shadowed, vec![names::HELLO_BACK]);
    }

    #[test]
    fn test_outbound_messages_identified() {
        let registry = Registry::standard().unwrap();
        assert_eq!(registry.identify(b"DINF").unwrap().name, names::D_INFO);
        assert_eq!(registry.identify(b"CNOP").unwrap().name, names::C_NOOP);
        assert!(registry.identify(b"ZZZZ").is_none());
    }

    #[test]
    fn test_other_revisions_never_identified() {
        let registry = Registry::standard().unwrap();
        assert_eq!(registry.identify(b"DKRP").unwrap().name, names::D_KEY_REPEAT);
        assert_eq!(registry.identify(b"DKDN").unwrap().name, names::D_KEY_DOWN);
        assert_eq!(registry.identify(b"DMWM").unwrap().name, names::D_MOUSE_WHEEL);
        for name in [names::D_KEY_REPEAT_LANG, names::D_KEY_DOWN_1_0, names::D_KEY_UP_1_0] {
            assert!(!registry.get(name).unwrap().parseable(), "{}", name);
        }
    }

    #[test]
    fn test_inbound_wins_regardless_of_order() {
        let table = [
            ("Pong", "PING%4i", Direction::Outbound, Revision::Current),
            ("Ping", "PING%2i", Direction::Inbound, Revision::Current),
        ];
        let registry = Registry::from_table(&table).unwrap();
        assert_eq!(registry.identify(b"PING").unwrap().name, "Ping");
    }

    #[test]
    fn test_outbound_clash_rejected() {
        let table = [
            ("Pong", "PONG%4i", Direction::Outbound, Revision::Current),
            ("PongToo", "PONG", Direction::Outbound, Revision::Current),
        ];
        assert!(matches!(
            Registry::from_table(&table),
            Err(RegistryError::DuplicateIdentifier { first: "Pong", .. })
        ));
    }

    #[test]
    fn test_duplicate_identifier_rejected() {
        let table = [
            ("Ping", "PING%2i", Direction::Inbound, Revision::Current),
            ("PingToo", "PING%4i", Direction::Both, Revision::Current),
        ];
        assert_eq!(
            Registry::from_table(&table).unwrap_err(),
            RegistryError::DuplicateIdentifier {
                first: "Ping",
                second: "PingToo",
                identifier: "PING".to_string(),
            }
        );
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let table = [
            ("Ping", "PING", Direction::Inbound, Revision::Current),
            ("Ping", "PONG", Direction::Outbound, Revision::Current),
        ];
        assert_eq!(
            Registry::from_table(&table).unwrap_err(),
            RegistryError::DuplicateName("Ping")
        );
    }

    #[test]
    fn test_bad_template_rejected() {
        let table = [("Ping", "PING%3i", Direction::Inbound, Revision::Current)];
        assert!(matches!(
            Registry::from_table(&table),
            Err(RegistryError::Template { name: "Ping", .. })
        ));
    }
}
