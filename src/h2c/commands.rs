//! Operator commands
//!
//! `connect`, `settings`, `send` and `close` as registered with the
//! terminal. Every handler validates its arguments first and reports all
//! failures as [`Error`] values.

use super::engine::{Engine, H2Engine};
use super::lifecycle::{Connection, Target};
use super::settings::TuningSettings;
use super::{Error, Result};
use crate::http::h2::H2Request;
use crate::repl::{CommandOutput, StatusBanner, Terminal};
use std::io::{BufRead, Write};

/// Client state shared by all commands
pub struct H2cClient<E: Engine = H2Engine> {
    settings: TuningSettings,
    connection: Connection<E>,
}

impl<E: Engine> H2cClient<E> {
    /// Start with default settings and no connection
    pub fn new(connection: Connection<E>) -> Self {
        H2cClient {
            settings: TuningSettings::new(),
            connection,
        }
    }

    pub fn settings(&self) -> &TuningSettings {
        &self.settings
    }

    pub fn connection(&self) -> &Connection<E> {
        &self.connection
    }

    pub fn connection_mut(&mut self) -> &mut Connection<E> {
        &mut self.connection
    }

    /// Register the four commands on `terminal`
    pub fn register<R: BufRead, W: Write>(terminal: &mut Terminal<Self, R, W>) {
        terminal.add_cmd("connect", Self::connect_cmd);
        terminal.add_cmd("settings", Self::settings_cmd);
        terminal.add_cmd("send", Self::send_cmd);
        terminal.add_cmd("close", Self::close_cmd);
    }

    /// `connect <host[:port]>`
    pub fn connect_cmd(&mut self, args: &[String]) -> Result<CommandOutput> {
        let target = match args {
            [] => return Err(Error::MissingHost),
            [target] => target,
            _ => return Err(Error::TooManyArguments { expected: 1 }),
        };

        self.connection.connect(target, &self.settings)?;
        Ok(CommandOutput::new("create a connection to server"))
    }

    /// `close`
    pub fn close_cmd(&mut self, _args: &[String]) -> Result<CommandOutput> {
        self.connection.close()?;
        Ok(CommandOutput::new("connection closed"))
    }

    /// `send PING` or `send GET <path>`
    pub fn send_cmd(&mut self, args: &[String]) -> Result<CommandOutput> {
        let authority = self
            .connection
            .target()
            .map(Target::authority)
            .unwrap_or_default()
            .to_string();
        let conn = self.connection.ensure_usable()?;

        let Some(method) = args.first() else {
            return Err(Error::MissingMethod);
        };

        let mut output = CommandOutput::new("send request success");
        match method.as_str() {
            "PING" => {
                conn.ping().map_err(Error::PingFailed)?;
            }
            "GET" => {
                let path = args.get(1).ok_or(Error::MissingPath)?;
                let path = if path.starts_with('/') {
                    path.clone()
                } else {
                    format!("/{}", path)
                };

                let request = H2Request::get(authority, path);
                let response = conn.round_trip(&request).map_err(Error::RequestFailed)?;

                output.info(format!("status code: {}", response.status()));
                output.info(format!("data: {}", String::from_utf8_lossy(response.body())));
            }
            other => return Err(Error::InvalidMethod(other.to_string())),
        }

        Ok(output)
    }

    /// `settings [name=value ...]`
    ///
    /// Tokens are applied in order and the first bad one stops processing;
    /// earlier updates stay applied. The resulting settings are pushed to a
    /// live connection.
    pub fn settings_cmd(&mut self, args: &[String]) -> Result<CommandOutput> {
        let mut output = CommandOutput::default();

        for token in args {
            let (name, value) = match token.split_once('=') {
                Some((name, value)) if !value.is_empty() && !value.contains('=') => (name, value),
                _ => return Err(Error::InvalidSettingFormat(token.clone())),
            };

            if self.settings.apply(name, value)? {
                log::debug!("setting {} updated to {}", name, value);
                output.info(format!("setting {} was updated to {}", name, value));
            }
        }

        if let Some(conn) = self.connection.live() {
            if let Err(e) = conn.write_settings(&self.settings.serialize()) {
                log::warn!("sending settings update failed: {}", e);
            }
        }

        output.message = self.settings.describe();
        Ok(output)
    }
}

impl<E: Engine> StatusBanner for H2cClient<E> {
    fn status(&self) -> &str {
        self.connection.status()
    }
}
