//! Input event types
//!
//! Decoded key and mouse events as delivered by the primary, ready to be
//! injected into the local system.

/// Keyboard modifier flags (Synergy `KeyModifierMask`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
    pub super_key: bool,
    pub alt_gr: bool,
    pub caps_lock: bool,
    pub num_lock: bool,
    pub scroll_lock: bool,
}

impl Modifiers {
    pub fn to_bits(&self) -> u16 {
        let mut bits = 0u16;
        if self.shift { bits |= 0x0001; }
        if self.ctrl { bits |= 0x0002; }
        if self.alt { bits |= 0x0004; }
        if self.meta { bits |= 0x0008; }
        if self.super_key { bits |= 0x0010; }
        if self.alt_gr { bits |= 0x0020; }
        if self.caps_lock { bits |= 0x1000; }
        if self.num_lock { bits |= 0x2000; }
        if self.scroll_lock { bits |= 0x4000; }
        bits
    }

    pub fn from_bits(bits: u16) -> Self {
        Self {
            shift: bits & 0x0001 != 0,
            ctrl: bits & 0x0002 != 0,
            alt: bits & 0x0004 != 0,
            meta: bits & 0x0008 != 0,
            super_key: bits & 0x0010 != 0,
            alt_gr: bits & 0x0020 != 0,
            caps_lock: bits & 0x1000 != 0,
            num_lock: bits & 0x2000 != 0,
            scroll_lock: bits & 0x4000 != 0,
        }
    }

    /// Reinterpret a signed 16-bit wire value as a mask
    pub fn from_wire(value: i32) -> Self {
        Self::from_bits(value as u16)
    }
}

/// Mouse button identifiers as numbered on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    Other(i32),
}

impl MouseButton {
    pub fn from_wire(id: i32) -> Self {
        match id {
            1 => MouseButton::Left,
            2 => MouseButton::Middle,
            3 => MouseButton::Right,
            other => MouseButton::Other(other),
        }
    }
}

/// A key press, repeat or release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    /// Synergy KeyID (X11-style keysym, 0xE000 range for special keys)
    pub key_id: u16,
    pub modifiers: Modifiers,
    /// Physical key on the primary; release must use the same button
    pub button: u16,
    /// Language code attached by newer primaries
    pub language: Option<String>,
}

impl KeyEvent {
    pub fn from_wire(key_id: i32, modifiers: i32, button: i32) -> Self {
        Self {
            key_id: key_id as u16,
            modifiers: Modifiers::from_wire(modifiers),
            button: button as u16,
            language: None,
        }
    }

    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }
}

/// Union of all events the client injects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// Cursor entered this screen
    Enter {
        x: i32,
        y: i32,
        modifiers: Modifiers,
    },
    /// Cursor left this screen
    Leave,
    KeyDown(KeyEvent),
    KeyRepeat { key: KeyEvent, count: i32 },
    KeyUp(KeyEvent),
    MouseDown(MouseButton),
    MouseUp(MouseButton),
    /// Absolute position in screen coordinates
    MouseMove { x: i32, y: i32 },
    MouseRelativeMove { dx: i32, dy: i32 },
    /// +120 per tick away from the user or to the right
    MouseWheel { dx: i32, dy: i32 },
    ScreenSaver { active: bool },
}

impl InputEvent {
    /// Check if this is a mouse event
    pub fn is_mouse(&self) -> bool {
        matches!(
            self,
            InputEvent::MouseDown(_)
                | InputEvent::MouseUp(_)
                | InputEvent::MouseMove { .. }
                | InputEvent::MouseRelativeMove { .. }
                | InputEvent::MouseWheel { .. }
        )
    }

    /// Check if this is a keyboard event
    pub fn is_keyboard(&self) -> bool {
        matches!(
            self,
            InputEvent::KeyDown(_) | InputEvent::KeyRepeat { .. } | InputEvent::KeyUp(_)
        )
    }
}
