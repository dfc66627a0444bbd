//! X11 keysyms, the key codes carried by RFB key events
//!
//! Printable Latin-1 characters are their own keysym, everything else is
//! listed in [VncKey]

/// Keysyms of the non-printable keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum VncKey {
    BackSpace = 0xff08,
    Tab = 0xff09,
    Return = 0xff0d,
    Escape = 0xff1b,
    Insert = 0xff63,
    Delete = 0xffff,
    Home = 0xff50,
    End = 0xff57,
    PageUp = 0xff55,
    PageDown = 0xff56,
    Left = 0xff51,
    Up = 0xff52,
    Right = 0xff53,
    Down = 0xff54,
    F1 = 0xffbe,
    F2 = 0xffbf,
    F3 = 0xffc0,
    F4 = 0xffc1,
    F5 = 0xffc2,
    F6 = 0xffc3,
    F7 = 0xffc4,
    F8 = 0xffc5,
    F9 = 0xffc6,
    F10 = 0xffc7,
    F11 = 0xffc8,
    F12 = 0xffc9,
    ShiftLeft = 0xffe1,
    ShiftRight = 0xffe2,
    ControlLeft = 0xffe3,
    ControlRight = 0xffe4,
    CapsLock = 0xffe5,
    MetaLeft = 0xffe7,
    MetaRight = 0xffe8,
    AltLeft = 0xffe9,
    AltRight = 0xffea,
}

impl From<VncKey> for u32 {
    fn from(key: VncKey) -> Self {
        key as u32
    }
}

/// Keysym for a typed character
///
/// Latin-1 maps directly, the rest of Unicode uses the `0x0100_0000 + code point`
/// range, control characters with a key of their own map to that key
///
pub fn keysym_for_char(c: char) -> Option<u32> {
    match c {
        '\u{8}' => Some(VncKey::BackSpace.into()),
        '\t' => Some(VncKey::Tab.into()),
        '\r' | '\n' => Some(VncKey::Return.into()),
        '\u{1b}' => Some(VncKey::Escape.into()),
        '\u{7f}' => Some(VncKey::Delete.into()),
        c if c.is_control() => None,
        c if (c as u32) <= 0xff => Some(c as u32),
        c => Some(0x0100_0000 + c as u32),
    }
}
