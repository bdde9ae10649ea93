use std::collections::HashMap;
use std::fmt;

use snafu::prelude::*;

use crate::ack::AckCode;
use crate::connection::Connection;
use crate::permission::Permission;
use crate::service::Service;

pub mod args;
mod playback;
mod query;
mod session;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RequestError {
    #[snafu(display("Wrong arg count"))]
    ArgCountError,
    #[snafu(display("invalid arg"))]
    InvalidArgError,
    #[snafu(display("arg in range not a number"))]
    RangeNumberError,
    #[snafu(display("invalid range"))]
    RangeError,
    #[snafu(display("arg not a number"))]
    NumberError,
    #[snafu(display("Insufficient permission"))]
    PermissionError,
    #[snafu(display("Password incorrect"))]
    PasswordError,
    #[snafu(display("begin without end"))]
    NestedListError,
    #[snafu(display("list_end without begin"))]
    NotListError,
}

impl RequestError {
    pub fn code(&self) -> AckCode {
        match self {
            RequestError::ArgCountError
            | RequestError::InvalidArgError
            | RequestError::RangeNumberError
            | RequestError::RangeError
            | RequestError::NumberError => AckCode::Arg,
            RequestError::PermissionError => AckCode::Permission,
            RequestError::PasswordError => AckCode::Password,
            RequestError::NestedListError => AckCode::Unknown,
            RequestError::NotListError => AckCode::NotList,
        }
    }
}

pub type Result<T, E = RequestError> = std::result::Result<T, E>;

// the trailing `OK` of auto acked commands is written by the caller
pub type CommandFn = fn(&mut Connection, &mut Service, &[String]) -> Result<()>;

#[derive(Clone, Copy)]
pub struct Entry {
    pub name: &'static str,
    pub handler: CommandFn,
    pub auto_ack: bool,
    pub permission: Permission,
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("name", &self.name)
            .field("auto_ack", &self.auto_ack)
            .field("permission", &self.permission)
            .finish()
    }
}

/// Command table, filled once at startup and read-only afterwards.
#[derive(Debug, Default)]
pub struct Registry {
    entries: Vec<Entry>,
    index: HashMap<&'static str, usize>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    pub fn command(&mut self, name: &'static str, handler: CommandFn) -> &mut Registry {
        self.register(name, handler, true, Permission::ADMIN)
    }

    /// # Panics
    ///
    /// Panics if `name` is already registered.
    pub fn register(
        &mut self,
        name: &'static str,
        handler: CommandFn,
        auto_ack: bool,
        permission: Permission,
    ) -> &mut Registry {
        assert!(
            !self.index.contains_key(name),
            "command {} registered twice",
            name
        );

        self.index.insert(name, self.entries.len());
        self.entries.push(Entry {
            name,
            handler,
            auto_ack,
            permission,
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<Entry> {
        self.index.get(name).map(|i| self.entries[*i])
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|entry| entry.name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn standard() -> Registry {
        let mut registry = Registry::new();
        session::register(&mut registry);
        playback::register(&mut registry);
        query::register(&mut registry);
        registry
    }
}
