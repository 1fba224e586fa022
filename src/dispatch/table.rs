//! Handler table and dispatcher
//!
//! Handlers are looked up by a key derived from the message name:
//! `CEnter` is handled by `c_enter`, `DKeyDown` by `d_key_down`.

use std::collections::HashMap;

use super::context::HandlerContext;
use super::{DispatchError, HandlerResult, Outcome};
use crate::protocol::{ParsedMessage, Registry};

/// Leading marker some message names carry (`kMsgHello`)
const NAME_MARKER: &str = "kMsg";

/// Derive the handler key for a message name
pub fn handler_key(name: &str) -> String {
    let name = name.strip_prefix(NAME_MARKER).unwrap_or(name);
    let mut key = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                key.push('_');
            }
            key.push(c.to_ascii_lowercase());
        } else {
            key.push(c);
        }
    }
    key
}

/// Behavior invoked for one message kind
pub trait Handler: Send + Sync {
    fn handle(&self, ctx: &mut HandlerContext<'_>, msg: &ParsedMessage) -> HandlerResult;
}

impl<F> Handler for F
where
    F: Fn(&mut HandlerContext<'_>, &ParsedMessage) -> HandlerResult + Send + Sync,
{
    fn handle(&self, ctx: &mut HandlerContext<'_>, msg: &ParsedMessage) -> HandlerResult {
        self(ctx, msg)
    }
}

/// Mapping from handler key to handler
#[derive(Default)]
pub struct HandlerTable {
    handlers: HashMap<String, Box<dyn Handler>>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under `key`, replacing any previous one
    pub fn register<H>(&mut self, key: &str, handler: H)
    where
        H: Handler + 'static,
    {
        self.handlers.insert(key.to_string(), Box::new(handler));
    }

    /// Builder-style registration
    pub fn with<H>(mut self, key: &str, handler: H) -> Self
    where
        H: Handler + 'static,
    {
        self.register(key, handler);
        self
    }

    pub fn get(&self, key: &str) -> Option<&dyn Handler> {
        self.handlers.get(key).map(|h| h.as_ref())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.handlers.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Routes parsed messages to their handlers
pub struct Dispatcher {
    table: HandlerTable,
    missing: Vec<&'static str>,
}

impl Dispatcher {
    /// Create a dispatcher, checking the table against every inbound message
    pub fn new(table: HandlerTable, registry: &Registry) -> Self {
        let missing: Vec<&'static str> = registry
            .inbound()
            .filter(|def| !table.contains(&handler_key(def.name)))
            .map(|def| def.name)
            .collect();

        for name in &missing {
            tracing::warn!("No handler registered for {} ({})", name, handler_key(name));
        }

        Self { table, missing }
    }

    /// Decodable messages that have no handler
    pub fn missing(&self) -> &[&'static str] {
        &self.missing
    }

    /// Invoke the handler for `msg`
    pub fn dispatch(
        &self,
        ctx: &mut HandlerContext<'_>,
        msg: &ParsedMessage,
    ) -> Result<Outcome, DispatchError> {
        let key = handler_key(msg.name);
        let handler = self.table.get(&key).ok_or_else(|| DispatchError::Unhandled {
            name: msg.name,
            key: key.clone(),
        })?;

        handler
            .handle(ctx, msg)
            .map_err(|source| DispatchError::HandlerFailed {
                message: msg.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{HandlerError, SessionState};
    use crate::input::{InputError, RecordingInputSink};
    use crate::protocol::names;
    use crate::screen::{ScreenGeometry, StaticDisplay};

    #[test]
    fn test_handler_keys() {
        assert_eq!(handler_key("Hello"), "hello");
        assert_eq!(handler_key("kMsgHello"), "hello");
        assert_eq!(handler_key("CEnter"), "c_enter");
        assert_eq!(handler_key("kMsgDInfo"), "d_info");
        assert_eq!(handler_key("DKeyDown1_0"), "d_key_down1_0");
        assert_eq!(handler_key("DSetOptions"), "d_set_options");
        assert_eq!(handler_key("QInfo"), "q_info");
    }

    fn echo_keep_alive(_: &mut HandlerContext<'_>, _: &ParsedMessage) -> HandlerResult {
        Ok(Outcome::Reply(ParsedMessage::bare(names::C_KEEP_ALIVE)))
    }

    fn unsupported(_: &mut HandlerContext<'_>, _: &ParsedMessage) -> HandlerResult {
        Err(HandlerError::Input(InputError::NotSupported))
    }

    fn run(dispatcher: &Dispatcher, msg: &ParsedMessage) -> Result<Outcome, DispatchError> {
        let mut sink = RecordingInputSink::new();
        let display = StaticDisplay::new(ScreenGeometry::centered(0, 0, 640, 480));
        let mut state = SessionState::new("test", Default::default());
        let mut ctx = HandlerContext::new(&mut sink, &display, &mut state);
        dispatcher.dispatch(&mut ctx, msg)
    }

    #[test]
    fn test_dispatch_to_registered_handler() {
        let registry = Registry::standard().unwrap();
        let table = HandlerTable::new().with("c_keep_alive", echo_keep_alive);
        let dispatcher = Dispatcher::new(table, &registry);

        let outcome = run(&dispatcher, &ParsedMessage::bare(names::C_KEEP_ALIVE)).unwrap();
        assert_eq!(outcome, Outcome::Reply(ParsedMessage::bare(names::C_KEEP_ALIVE)));
    }

    #[test]
    fn test_missing_handlers_reported() {
        let registry = Registry::standard().unwrap();
        let dispatcher = Dispatcher::new(HandlerTable::new(), &registry);
        assert_eq!(dispatcher.missing().len(), registry.inbound().count());

        let err = run(&dispatcher, &ParsedMessage::bare(names::Q_INFO)).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Unhandled { name: "QInfo", ref key } if key == "q_info"
        ));
    }

    #[test]
    fn test_handler_failure_carries_message() {
        let registry = Registry::standard().unwrap();
        let table = HandlerTable::new().with("d_mouse_down", unsupported);
        let dispatcher = Dispatcher::new(table, &registry);

        let msg = ParsedMessage::new(names::D_MOUSE_DOWN, vec![1.into()]);
        match run(&dispatcher, &msg).unwrap_err() {
            DispatchError::HandlerFailed { message, source } => {
                assert_eq!(message, msg);
                assert!(matches!(source, HandlerError::Input(InputError::NotSupported)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
