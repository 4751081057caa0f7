// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal FTP client for the artifact store.
//!
//! Speaks the RFC 959 subset the store needs (`USER`, `PASS`, `TYPE`, `PASV`,
//! `MKD`, `CWD`, `STOR`, `RETR`, `NLST`, `QUIT`) over a tokio control
//! connection. Every reply wait is bounded by the client timeout.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum FtpError {
    #[error("ftp i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ftp {0} timed out")]
    Timeout(String),

    #[error("ftp {command} failed: {code} {message}")]
    Reply { command: String, code: u16, message: String },

    #[error("ftp protocol error: {0}")]
    Protocol(String),
}

impl FtpError {
    pub fn code(&self) -> Option<u16> {
        match self {
            FtpError::Reply { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// 4xx replies and broken connections are worth another try.
    pub fn is_transient(&self) -> bool {
        match self {
            FtpError::Io(_) | FtpError::Timeout(_) => true,
            FtpError::Reply { code, .. } => (400..500).contains(code),
            FtpError::Protocol(_) => false,
        }
    }
}

/// One parsed server reply; multi-line replies are joined with `\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    pub message: String,
}

pub struct FtpClient {
    control: BufReader<TcpStream>,
    peer: SocketAddr,
    timeout: Duration,
    made_dirs: HashSet<String>,
}

impl FtpClient {
    /// Connect and log in as `user`. The store accepts any password.
    pub async fn connect(addr: &str, user: &str) -> Result<Self, FtpError> {
        Self::connect_with_timeout(addr, user, DEFAULT_TIMEOUT).await
    }

    pub async fn connect_with_timeout(
        addr: &str,
        user: &str,
        timeout: Duration,
    ) -> Result<Self, FtpError> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| FtpError::Timeout(format!("connect to {addr}")))??;
        let peer = stream.peer_addr()?;
        let mut client = Self {
            control: BufReader::new(stream),
            peer,
            timeout,
            made_dirs: HashSet::new(),
        };

        client.expect("greeting", &[220]).await?;
        let reply = client.command(&format!("USER {user}"), &[230, 331]).await?;
        if reply.code == 331 {
            client.command("PASS kraken", &[230, 202]).await?;
        }
        client.command("TYPE I", &[200]).await?;
        tracing::debug!(%addr, user, "ftp login");
        Ok(client)
    }

    /// Create `path` and every missing parent. "Already exists" is fine.
    pub async fn mkdirs(&mut self, path: &str) -> Result<(), FtpError> {
        let mut current = String::new();
        for part in path.split('/').filter(|p| !p.is_empty()) {
            current.push('/');
            current.push_str(part);
            if self.made_dirs.contains(&current) {
                continue;
            }
            match self.command(&format!("MKD {current}"), &[257]).await {
                Ok(_) => {}
                Err(FtpError::Reply { code: 550 | 521, .. }) => {}
                Err(e) => return Err(e),
            }
            self.made_dirs.insert(current.clone());
        }
        Ok(())
    }

    pub async fn cwd(&mut self, path: &str) -> Result<(), FtpError> {
        self.command(&format!("CWD {path}"), &[250, 200]).await.map(|_| ())
    }

    /// Upload everything `source` yields to `path`; returns the byte count.
    pub async fn stor<R>(&mut self, path: &str, source: &mut R) -> Result<u64, FtpError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut data = self.passive().await?;
        self.command(&format!("STOR {path}"), &[125, 150]).await?;
        let sent = tokio::io::copy(source, &mut data).await?;
        data.shutdown().await?;
        drop(data);
        self.expect("STOR", &[226, 250]).await?;
        Ok(sent)
    }

    /// Download `path` into `sink`; returns the byte count.
    pub async fn retr<W>(&mut self, path: &str, sink: &mut W) -> Result<u64, FtpError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut data = self.passive().await?;
        self.command(&format!("RETR {path}"), &[125, 150]).await?;
        let received = tokio::io::copy(&mut data, sink).await?;
        sink.flush().await?;
        drop(data);
        self.expect("RETR", &[226, 250]).await?;
        Ok(received)
    }

    /// Entry names under `path`, as bare names. An empty or missing
    /// directory yields an empty list.
    pub async fn nlst(&mut self, path: &str) -> Result<Vec<String>, FtpError> {
        let mut data = self.passive().await?;
        match self.command(&format!("NLST {path}"), &[125, 150]).await {
            Ok(_) => {}
            Err(FtpError::Reply { code: 450 | 550, .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        }
        let mut raw = String::new();
        data.read_to_string(&mut raw).await?;
        drop(data);
        self.expect("NLST", &[226, 250]).await?;

        Ok(raw
            .lines()
            .map(|l| l.trim_end_matches('\r').trim_end_matches('/'))
            .filter(|l| !l.is_empty())
            .map(|l| l.rsplit('/').next().unwrap_or(l).to_string())
            .filter(|name| name != "." && name != "..")
            .collect())
    }

    pub async fn quit(mut self) -> Result<(), FtpError> {
        self.command("QUIT", &[221]).await.map(|_| ())
    }

    async fn passive(&mut self) -> Result<TcpStream, FtpError> {
        let reply = self.command("PASV", &[227]).await?;
        let port = parse_pasv_port(&reply.message)?;
        // Servers behind NAT advertise unusable hosts; only the port is trusted.
        let addr = SocketAddr::new(self.peer.ip(), port);
        tokio::time::timeout(self.timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| FtpError::Timeout(format!("data connection to {addr}")))?
            .map_err(FtpError::from)
    }

    async fn command(&mut self, line: &str, ok: &[u16]) -> Result<Reply, FtpError> {
        let verb = line.split_whitespace().next().unwrap_or(line).to_string();
        let stream = self.control.get_mut();
        stream.write_all(format!("{line}\r\n").as_bytes()).await?;
        stream.flush().await?;
        self.expect(&verb, ok).await
    }

    async fn expect(&mut self, what: &str, ok: &[u16]) -> Result<Reply, FtpError> {
        let reply = tokio::time::timeout(self.timeout, read_reply(&mut self.control))
            .await
            .map_err(|_| FtpError::Timeout(what.to_string()))??;
        if ok.contains(&reply.code) {
            Ok(reply)
        } else {
            Err(FtpError::Reply { command: what.to_string(), code: reply.code, message: reply.message })
        }
    }
}

async fn read_reply<R>(reader: &mut BufReader<R>) -> Result<Reply, FtpError>
where
    R: AsyncRead + Unpin,
{
    let mut lines = Vec::new();
    let mut first_code: Option<u16> = None;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Err(FtpError::Protocol("connection closed".into()));
        }
        let line = line.trim_end_matches(['\r', '\n']).to_string();
        let code = line.get(..3).and_then(|c| c.parse::<u16>().ok());
        let sep = line.as_bytes().get(3).copied();
        match (first_code, code) {
            (None, Some(c)) => {
                first_code = Some(c);
                lines.push(line.get(4..).unwrap_or_default().to_string());
                if sep != Some(b'-') {
                    break;
                }
            }
            (None, None) => return Err(FtpError::Protocol(format!("bad reply line '{line}'"))),
            (Some(c), Some(this)) if this == c && sep == Some(b' ') => {
                lines.push(line.get(4..).unwrap_or_default().to_string());
                break;
            }
            (Some(_), _) => lines.push(line),
        }
    }
    let code = first_code.ok_or_else(|| FtpError::Protocol("empty reply".into()))?;
    Ok(Reply { code, message: lines.join("\n") })
}

/// Port from `227 Entering Passive Mode (h1,h2,h3,h4,p1,p2)`.
pub(crate) fn parse_pasv_port(message: &str) -> Result<u16, FtpError> {
    let bad = || FtpError::Protocol(format!("bad PASV reply '{message}'"));
    let open = message.find('(').ok_or_else(bad)?;
    let close = message[open..].find(')').ok_or_else(bad)? + open;
    let nums: Vec<u16> = message[open + 1..close]
        .split(',')
        .map(|n| n.trim().parse::<u16>())
        .collect::<Result<_, _>>()
        .map_err(|_| bad())?;
    match nums.as_slice() {
        [_, _, _, _, hi, lo] if *hi < 256 && *lo < 256 => Ok(hi * 256 + lo),
        _ => Err(bad()),
    }
}

#[cfg(test)]
#[path = "ftp_tests.rs"]
mod tests;
