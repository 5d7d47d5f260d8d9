//! Blocking RESP2 client
//!
//! Speaks just enough of the Redis serialization protocol to authenticate,
//! select a database and issue `GET`s, either one at a time or pipelined.
//! Connections are kept in a small idle pool so each worker thread reuses a
//! socket instead of reconnecting per lookup. A connection that sees an I/O
//! or framing error is dropped; the lookup is reported as a transient error.

use std::{
    io::{BufRead, BufReader, Write},
    net::{SocketAddr, TcpStream, ToSocketAddrs},
    sync::Mutex,
};

use log::{debug, trace};

use crate::{
    client::{GetOutcome, StoreClient},
    config::StoreConfig,
    error::{Result, StoreError},
};

/// A decoded RESP2 reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Option<Vec<u8>>),
    Array(Option<Vec<Reply>>),
}

/// Encodes a command as a RESP array of bulk strings
#[must_use]
pub fn encode_command(args: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::with_capacity(16 + args.iter().map(|a| a.len() + 16).sum::<usize>());
    out.extend_from_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        out.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        out.extend_from_slice(arg);
        out.extend_from_slice(b"\r\n");
    }
    out
}

fn read_line<R: BufRead>(reader: &mut R) -> Result<String> {
    let mut line = String::new();
    let n = reader.read_line(&mut line)?;
    if n == 0 {
        return Err(StoreError::network_msg("connection closed by server"));
    }
    if !line.ends_with("\r\n") {
        return Err(StoreError::protocol(format!("unterminated line: {line:?}")));
    }
    line.truncate(line.len() - 2);
    Ok(line)
}

fn parse_len(s: &str) -> Result<i64> {
    s.parse::<i64>()
        .map_err(|_| StoreError::protocol(format!("invalid length: {s:?}")))
}

/// Largest bulk string accepted, matching the server's `proto-max-bulk-len` default
pub const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

/// Deepest array nesting accepted in a reply
pub const MAX_NESTING: usize = 32;

/// Reads one complete reply from `reader`
pub fn read_reply<R: BufRead>(reader: &mut R) -> Result<Reply> {
    read_nested(reader, 0)
}

fn read_nested<R: BufRead>(reader: &mut R, depth: usize) -> Result<Reply> {
    if depth > MAX_NESTING {
        return Err(StoreError::protocol(format!(
            "reply nested deeper than {MAX_NESTING} arrays"
        )));
    }
    let line = read_line(reader)?;
    let mut chars = line.chars();
    let kind = chars.next();
    let rest = chars.as_str();

    match kind {
        Some('+') => Ok(Reply::Simple(rest.to_string())),
        Some('-') => Ok(Reply::Error(rest.to_string())),
        Some(':') => Ok(Reply::Integer(parse_len(rest)?)),
        Some('$') => {
            let len = parse_len(rest)?;
            if len < 0 {
                return Ok(Reply::Bulk(None));
            }
            if len > MAX_BULK_LEN {
                return Err(StoreError::protocol(format!(
                    "bulk length {len} exceeds {MAX_BULK_LEN}"
                )));
            }
            let mut buf = vec![0u8; len as usize + 2];
            reader.read_exact(&mut buf)?;
            if !buf.ends_with(b"\r\n") {
                return Err(StoreError::protocol("bulk string missing terminator"));
            }
            buf.truncate(len as usize);
            Ok(Reply::Bulk(Some(buf)))
        }
        Some('*') => {
            let len = parse_len(rest)?;
            if len < 0 {
                return Ok(Reply::Array(None));
            }
            let items = (0..len)
                .map(|_| read_nested(reader, depth + 1))
                .collect::<Result<Vec<_>>>()?;
            Ok(Reply::Array(Some(items)))
        }
        _ => Err(StoreError::protocol(format!("unknown reply type: {line:?}"))),
    }
}

fn get_outcome(reply: Reply) -> GetOutcome {
    match reply {
        Reply::Bulk(Some(bytes)) => GetOutcome::Found(String::from_utf8_lossy(&bytes).into_owned()),
        Reply::Bulk(None) => GetOutcome::Absent,
        Reply::Error(e) => GetOutcome::TransientError(format!("server error: {e}")),
        other => GetOutcome::TransientError(format!("unexpected GET reply: {other:?}")),
    }
}

struct Connection {
    stream: BufReader<TcpStream>,
}

impl Connection {
    fn open(addr: SocketAddr, config: &StoreConfig) -> Result<Self> {
        let stream = TcpStream::connect_timeout(&addr, config.connect_timeout())
            .map_err(|e| StoreError::network(format!("Failed to connect to {addr}"), e))?;
        stream.set_read_timeout(Some(config.socket_timeout()))?;
        stream.set_write_timeout(Some(config.socket_timeout()))?;
        stream.set_nodelay(true)?;

        let mut conn = Self {
            stream: BufReader::new(stream),
        };

        if let Some(password) = &config.password {
            conn.expect_ok(&[b"AUTH", password.as_bytes()])?;
        }
        if config.db != 0 {
            let db = config.db.to_string();
            conn.expect_ok(&[b"SELECT", db.as_bytes()])?;
        }
        match conn.call(&[b"PING"])? {
            Reply::Simple(s) if s == "PONG" => {}
            other => return Err(StoreError::protocol(format!("unexpected PING reply: {other:?}"))),
        }

        Ok(conn)
    }

    fn call(&mut self, args: &[&[u8]]) -> Result<Reply> {
        self.stream.get_mut().write_all(&encode_command(args))?;
        read_reply(&mut self.stream)
    }

    fn expect_ok(&mut self, args: &[&[u8]]) -> Result<()> {
        match self.call(args)? {
            Reply::Simple(s) if s == "OK" => Ok(()),
            Reply::Error(e) => Err(StoreError::protocol(e)),
            other => Err(StoreError::protocol(format!("expected OK, got {other:?}"))),
        }
    }
}

/// Pooled RESP2 client implementing `StoreClient`
pub struct RespStore {
    addr: SocketAddr,
    config: StoreConfig,
    idle: Mutex<Vec<Connection>>,
}

impl RespStore {
    /// Resolves the configured address and opens (and checks) a first connection
    pub fn connect(config: &StoreConfig) -> Result<Self> {
        config.validate()?;

        let target = format!("{}:{}", config.host, config.port);
        let addr = target
            .to_socket_addrs()
            .map_err(|e| StoreError::network(format!("Failed to resolve {target}"), e))?
            .next()
            .ok_or_else(|| StoreError::network_msg(format!("No address found for {target}")))?;

        let first = Connection::open(addr, config)?;
        debug!("Connected to store at {addr} (db {})", config.db);

        Ok(Self {
            addr,
            config: config.clone(),
            idle: Mutex::new(vec![first]),
        })
    }

    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Round-trips a `PING` on a pooled connection
    pub fn ping(&self) -> Result<()> {
        let mut conn = self.checkout()?;
        match conn.call(&[b"PING"])? {
            Reply::Simple(s) if s == "PONG" => {
                self.checkin(conn);
                Ok(())
            }
            other => Err(StoreError::protocol(format!("unexpected PING reply: {other:?}"))),
        }
    }

    fn checkout(&self) -> Result<Connection> {
        let pooled = self.idle.lock().ok().and_then(|mut idle| idle.pop());
        match pooled {
            Some(conn) => Ok(conn),
            None => Connection::open(self.addr, &self.config),
        }
    }

    fn checkin(&self, conn: Connection) {
        if let Ok(mut idle) = self.idle.lock() {
            if idle.len() < self.config.max_connections {
                idle.push(conn);
            }
        }
    }

    /// Writes every `GET` before reading any reply
    fn pipeline(conn: &mut Connection, keys: &[String]) -> Result<Vec<Reply>> {
        let mut payload = Vec::new();
        for key in keys {
            payload.extend_from_slice(&encode_command(&[b"GET", key.as_bytes()]));
        }
        conn.stream.get_mut().write_all(&payload)?;
        keys.iter().map(|_| read_reply(&mut conn.stream)).collect()
    }
}

impl StoreClient for RespStore {
    fn get(&self, key: &str) -> GetOutcome {
        let mut conn = match self.checkout() {
            Ok(conn) => conn,
            Err(e) => return GetOutcome::TransientError(e.to_string()),
        };

        match conn.call(&[b"GET", key.as_bytes()]) {
            Ok(reply) => {
                self.checkin(conn);
                get_outcome(reply)
            }
            Err(e) => {
                trace!("GET {key} failed, dropping connection: {e}");
                GetOutcome::TransientError(e.to_string())
            }
        }
    }

    fn get_many(&self, keys: &[String]) -> Vec<GetOutcome> {
        if keys.is_empty() {
            return Vec::new();
        }

        let mut conn = match self.checkout() {
            Ok(conn) => conn,
            Err(e) => return vec![GetOutcome::TransientError(e.to_string()); keys.len()],
        };

        match Self::pipeline(&mut conn, keys) {
            Ok(replies) => {
                self.checkin(conn);
                replies.into_iter().map(get_outcome).collect()
            }
            Err(e) => {
                trace!("Pipelined GET of {} keys failed: {e}", keys.len());
                vec![GetOutcome::TransientError(e.to_string()); keys.len()]
            }
        }
    }
}
