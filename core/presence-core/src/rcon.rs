//! Minimal Minecraft RCON client.
//!
//! Wire format (all integers little-endian `i32`):
//!
//! ```text
//! length | request id | packet type | body bytes | 0x00 0x00
//! ```
//!
//! `length` counts everything after itself. A login reply carrying request
//! id `-1` means the password was rejected.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::debug;

use crate::error::{PresenceError, Result};

pub const DEFAULT_RCON_PORT: u16 = 25575;

const PACKET_LOGIN: i32 = 3;
const PACKET_COMMAND: i32 = 2;
const PACKET_RESPONSE: i32 = 0;
const AUTH_FAILED_ID: i32 = -1;

/// Late replies drained before giving up on a command.
const MAX_STALE_REPLIES: usize = 8;

/// id + type + two terminating NULs.
const MIN_PACKET_LEN: i32 = 10;
/// Servers cap response bodies at 4096 bytes.
const MAX_PACKET_LEN: i32 = 4096 + MIN_PACKET_LEN;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub request_id: i32,
    pub kind: i32,
    pub body: String,
}

pub fn write_packet<W: Write>(writer: &mut W, request_id: i32, kind: i32, body: &str) -> Result<()> {
    let length = body.len() as i32 + MIN_PACKET_LEN;
    if length > MAX_PACKET_LEN {
        return Err(PresenceError::Protocol(format!(
            "RCON payload too large ({} bytes)",
            body.len()
        )));
    }

    let mut buffer = Vec::with_capacity(length as usize + 4);
    buffer.extend_from_slice(&length.to_le_bytes());
    buffer.extend_from_slice(&request_id.to_le_bytes());
    buffer.extend_from_slice(&kind.to_le_bytes());
    buffer.extend_from_slice(body.as_bytes());
    buffer.extend_from_slice(&[0, 0]);

    writer
        .write_all(&buffer)
        .and_then(|_| writer.flush())
        .map_err(|err| PresenceError::io("Failed to send RCON packet", err))
}

pub fn read_packet<R: Read>(reader: &mut R) -> Result<Packet> {
    let length = read_i32(reader)?;
    if !(MIN_PACKET_LEN..=MAX_PACKET_LEN).contains(&length) {
        return Err(PresenceError::Protocol(format!(
            "RCON packet length {} out of range",
            length
        )));
    }

    let request_id = read_i32(reader)?;
    let kind = read_i32(reader)?;
    let mut payload = vec![0u8; (length - 8) as usize];
    reader
        .read_exact(&mut payload)
        .map_err(|err| PresenceError::io("Failed to read RCON payload", err))?;

    if payload[payload.len() - 2..] != [0, 0] {
        return Err(PresenceError::Protocol(
            "RCON packet missing terminator".to_string(),
        ));
    }
    payload.truncate(payload.len() - 2);

    Ok(Packet {
        request_id,
        kind,
        body: String::from_utf8_lossy(&payload).into_owned(),
    })
}

fn read_i32<R: Read>(reader: &mut R) -> Result<i32> {
    let mut bytes = [0u8; 4];
    reader
        .read_exact(&mut bytes)
        .map_err(|err| PresenceError::io("Failed to read RCON header", err))?;
    Ok(i32::from_le_bytes(bytes))
}

#[derive(Debug)]
pub struct RconClient {
    stream: TcpStream,
    next_id: i32,
}

impl RconClient {
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|err| PresenceError::SourceUnavailable(format!("{}:{}: {}", host, port, err)))?
            .next()
            .ok_or_else(|| {
                PresenceError::SourceUnavailable(format!("{}:{} did not resolve", host, port))
            })?;

        let stream = TcpStream::connect_timeout(&addr, timeout)
            .map_err(|err| PresenceError::SourceUnavailable(format!("{}: {}", addr, err)))?;
        stream
            .set_read_timeout(Some(timeout))
            .and_then(|_| stream.set_write_timeout(Some(timeout)))
            .map_err(|err| PresenceError::io("Failed to configure RCON socket", err))?;

        debug!(addr = %addr, "RCON connected");
        Ok(Self { stream, next_id: 1 })
    }

    /// Returns false when the server rejects the password.
    pub fn login(&mut self, password: &str) -> Result<bool> {
        let id = self.allocate_id();
        write_packet(&mut self.stream, id, PACKET_LOGIN, password)?;
        let reply = read_packet(&mut self.stream)?;
        if reply.request_id == AUTH_FAILED_ID {
            return Ok(false);
        }
        if reply.request_id != id {
            return Err(PresenceError::Protocol(format!(
                "RCON login reply id {} does not match request {}",
                reply.request_id, id
            )));
        }
        Ok(true)
    }

    pub fn command(&mut self, command: &str) -> Result<String> {
        let id = self.allocate_id();
        write_packet(&mut self.stream, id, PACKET_COMMAND, command)?;
        let mut skipped = 0;
        loop {
            let reply = read_packet(&mut self.stream)?;
            if reply.kind == PACKET_RESPONSE && reply.request_id == id {
                return Ok(reply.body);
            }
            // A reply that missed its read timeout arrives ahead of ours.
            if reply.request_id > 0 && reply.request_id < id && skipped < MAX_STALE_REPLIES {
                debug!(
                    stale_id = reply.request_id,
                    request_id = id,
                    "Discarding late RCON reply"
                );
                skipped += 1;
                continue;
            }
            return Err(PresenceError::Protocol(format!(
                "Unexpected RCON reply (id {}, type {}) to request {}",
                reply.request_id, reply.kind, id
            )));
        }
    }

    pub fn shutdown(&mut self) {
        if let Err(err) = self.stream.shutdown(Shutdown::Both) {
            debug!(error = %err, "RCON socket already closed");
        }
    }

    fn allocate_id(&mut self) -> i32 {
        let id = self.next_id;
        self.next_id = if self.next_id == i32::MAX { 1 } else { self.next_id + 1 };
        id
    }
}
