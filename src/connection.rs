use std::fmt;
use std::mem;
use std::rc::Rc;

use snafu::prelude::*;
use tracing::debug;

use crate::ack::Ack;
use crate::cmd::{NestedListSnafu, PasswordSnafu, PermissionSnafu, Registry, RequestError};
use crate::frame::LineBuffer;
use crate::outbox::Outbox;
use crate::parser::parse_command;
use crate::permission::Permission;
use crate::service::Service;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
pub struct Failure {
    pub error: RequestError,
    pub index: Option<usize>,
}

impl From<RequestError> for Failure {
    fn from(error: RequestError) -> Failure {
        Failure { error, index: None }
    }
}

#[derive(Debug)]
enum State {
    AwaitingLine,
    InCommandList {
        ok: bool,
        commands: Vec<(String, Vec<String>)>,
    },
    Closed,
}

#[derive(Clone, Copy, Debug)]
enum Mode {
    Single,
    List { ok: bool },
}

/// Protocol state of one client. The socket belongs to the task driving it.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    commands: Rc<Registry>,
    lines: LineBuffer,
    outbox: Outbox,
    state: State,
    // name of the command being handled, for ACK lines
    command: Option<String>,
    permission: Permission,
}

impl Connection {
    pub fn new(id: ConnectionId, commands: Rc<Registry>, service: &mut Service) -> Connection {
        let outbox = Outbox::new();
        service.add_connection(id, outbox.clone());
        outbox.write_line(&format!("OK MPD {}", service.version()));

        Connection {
            id,
            commands,
            lines: LineBuffer::new(),
            outbox,
            state: State::AwaitingLine,
            command: None,
            permission: service.default_permission(),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    pub fn permission(&self) -> Permission {
        self.permission
    }

    pub fn registry(&self) -> &Registry {
        &self.commands
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }

    pub fn in_command_list(&self) -> bool {
        matches!(self.state, State::InCommandList { .. })
    }

    pub fn write_line(&self, line: &str) {
        debug!("[{}] <- {:?}", self.id, line);
        self.outbox.write_line(line);
    }

    pub fn ok(&self) {
        self.write_line("OK");
    }

    pub fn handle_read(&mut self, data: &[u8], service: &mut Service) {
        self.lines.feed(data);

        while !self.is_closed() {
            let line = match self.lines.next_line() {
                Some(line) => line,
                None => break,
            };

            debug!("[{}] -> {:?}", self.id, String::from_utf8_lossy(&line));

            let (command, args) = match parse_command(&line) {
                Ok(parsed) => parsed,
                Err(e) => {
                    // unparseable lines are dropped without an answer
                    debug!("[{}] dropping line: {}", self.id, e);
                    continue;
                }
            };

            if let Err(failure) = self.handle_command(service, command, args) {
                self.error(&failure);
                if self.in_command_list() {
                    self.state = State::AwaitingLine;
                }
            }
        }
    }

    fn handle_command(
        &mut self,
        service: &mut Service,
        command: String,
        args: Vec<String>,
    ) -> Result<(), Failure> {
        self.command = Some(command.clone());

        match command.as_str() {
            "command_list_end" => {
                let (ok, commands) = match mem::replace(&mut self.state, State::AwaitingLine) {
                    State::InCommandList { ok, commands } => (ok, commands),
                    other => {
                        self.state = other;
                        return Err(Failure {
                            error: RequestError::NotListError,
                            index: Some(0),
                        });
                    }
                };

                for (i, (command, args)) in commands.into_iter().enumerate() {
                    if self.is_closed() {
                        return Ok(());
                    }
                    self.exec_command(service, &command, &args, Mode::List { ok })
                        .map_err(|error| Failure {
                            error,
                            index: Some(i),
                        })?;
                }

                if !self.is_closed() {
                    self.ok();
                }
                Ok(())
            }
            "command_list_begin" | "command_list_ok_begin" => {
                if self.in_command_list() {
                    return Err(NestedListSnafu.build().into());
                }

                self.state = State::InCommandList {
                    ok: command == "command_list_ok_begin",
                    commands: vec![],
                };
                Ok(())
            }
            _ => match &mut self.state {
                State::InCommandList { commands, .. } => {
                    commands.push((command, args));
                    Ok(())
                }
                _ => Ok(self.exec_command(service, &command, &args, Mode::Single)?),
            },
        }
    }

    fn exec_command(
        &mut self,
        service: &mut Service,
        command: &str,
        args: &[String],
        mode: Mode,
    ) -> Result<(), RequestError> {
        self.command = Some(command.to_string());

        let entry = match self.commands.get(command) {
            Some(entry) => entry,
            None => {
                // clients probe for optional commands, answer like `ping`
                log::warn!("unhandled command {:?}, sending OK", command);
                match mode {
                    Mode::Single => self.ok(),
                    Mode::List { ok: true } => self.write_line("list_OK"),
                    Mode::List { ok: false } => {}
                }
                return Ok(());
            }
        };

        ensure!(self.permission.contains(entry.permission), PermissionSnafu);

        // player changes made so far must be visible to this command, and
        // the ones it makes to the next
        service.drain_events();
        let res = (entry.handler)(self, service, args);
        service.drain_events();
        res?;

        if self.is_closed() {
            return Ok(());
        }

        match mode {
            Mode::List { ok: true } => self.write_line("list_OK"),
            Mode::List { ok: false } => {}
            Mode::Single => {
                if entry.auto_ack {
                    self.ok();
                }
            }
        }

        Ok(())
    }

    fn error(&self, failure: &Failure) {
        let ack = Ack {
            code: failure.error.code(),
            index: failure.index,
            command: self.command.as_deref().unwrap_or(""),
            message: failure.error.to_string(),
        };
        self.write_line(&ack.to_string());
    }

    pub fn authenticate(&mut self, service: &Service, password: &str) -> Result<(), RequestError> {
        if service.password_matches(password) {
            self.permission = Permission::ALL;
            Ok(())
        } else {
            self.permission = service.default_permission();
            PasswordSnafu.fail()
        }
    }

    /// Idempotent. Unsent output is dropped.
    pub fn close(&mut self, service: &mut Service) {
        if self.is_closed() {
            return;
        }

        debug!("[{}] connection closed", self.id);
        self.state = State::Closed;
        self.outbox.discard();
        service.remove_connection(self.id);
    }
}
