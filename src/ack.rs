use std::fmt;

/// Error codes carried by `ACK` lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum AckCode {
    NotList = 1,
    Arg = 2,
    Password = 3,
    Permission = 4,
    Unknown = 5,
    NoExist = 50,
    PlaylistMax = 51,
    System = 52,
    PlaylistLoad = 53,
    UpdateAlready = 54,
    PlayerSync = 55,
    Exist = 56,
}

impl AckCode {
    pub fn value(self) -> u16 {
        self as u16
    }
}

/// One error response line: `ACK [code@index] {command} message`.
///
/// The `@index` part is only present for failures inside a command list.
#[derive(Debug)]
pub struct Ack<'a> {
    pub code: AckCode,
    pub index: Option<usize>,
    pub command: &'a str,
    pub message: String,
}

impl fmt::Display for Ack<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ACK [{}", self.code.value())?;
        if let Some(index) = self.index {
            write!(f, "@{}", index)?;
        }
        write!(f, "] {{{}}} {}", self.command, self.message)
    }
}
