// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process FTP server backed by a temp directory.
//!
//! Each login user gets its own root directory, mirroring how the artifact
//! store scopes flows. Only the commands the client uses are implemented.

use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

pub struct FakeFtpServer {
    addr: SocketAddr,
    root: tempfile::TempDir,
    logins: Arc<Mutex<Vec<String>>>,
    commands: Arc<Mutex<Vec<String>>>,
    task: JoinHandle<()>,
}

impl FakeFtpServer {
    pub async fn start() -> std::io::Result<Self> {
        let root = tempfile::tempdir()?;
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let logins = Arc::new(Mutex::new(Vec::new()));
        let commands = Arc::new(Mutex::new(Vec::new()));

        let base = root.path().to_path_buf();
        let (l, c) = (Arc::clone(&logins), Arc::clone(&commands));
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let session = Session {
                    base: base.clone(),
                    home: None,
                    cwd: PathBuf::from("/"),
                    passive: None,
                    logins: Arc::clone(&l),
                    commands: Arc::clone(&c),
                };
                tokio::spawn(session.serve(stream));
            }
        });

        Ok(Self { addr, root, logins, commands, task })
    }

    pub fn addr(&self) -> String {
        self.addr.to_string()
    }

    /// On-disk root of `user`'s files.
    pub fn user_root(&self, user: &str) -> PathBuf {
        self.root.path().join(user)
    }

    pub fn logins(&self) -> Vec<String> {
        self.logins.lock().clone()
    }

    /// Every command verb received, in order, across sessions.
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }
}

impl Drop for FakeFtpServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct Session {
    base: PathBuf,
    home: Option<PathBuf>,
    cwd: PathBuf,
    passive: Option<TcpListener>,
    logins: Arc<Mutex<Vec<String>>>,
    commands: Arc<Mutex<Vec<String>>>,
}

impl Session {
    async fn serve(mut self, stream: TcpStream) {
        let (read, mut write) = stream.into_split();
        let mut lines = BufReader::new(read).lines();
        if write.write_all(b"220 fake ftp ready\r\n").await.is_err() {
            return;
        }
        while let Ok(Some(line)) = lines.next_line().await {
            let (verb, arg) = match line.split_once(' ') {
                Some((v, a)) => (v.to_ascii_uppercase(), a.trim().to_string()),
                None => (line.trim().to_ascii_uppercase(), String::new()),
            };
            self.commands.lock().push(verb.clone());
            let reply = self.handle(&verb, &arg, &mut write).await;
            if write.write_all(reply.as_bytes()).await.is_err() || verb == "QUIT" {
                break;
            }
        }
    }

    async fn handle(
        &mut self,
        verb: &str,
        arg: &str,
        control: &mut tokio::net::tcp::OwnedWriteHalf,
    ) -> String {
        match verb {
            "USER" => {
                let home = self.base.join(arg);
                if tokio::fs::create_dir_all(&home).await.is_err() {
                    return "550 cannot create home\r\n".into();
                }
                self.home = Some(home);
                self.logins.lock().push(arg.to_string());
                "331 password please\r\n".into()
            }
            "PASS" => "230 logged in\r\n".into(),
            "TYPE" => "200 type set\r\n".into(),
            "QUIT" => "221 bye\r\n".into(),
            "PASV" => match TcpListener::bind("127.0.0.1:0").await.and_then(|l| {
                let port = l.local_addr()?.port();
                Ok((l, port))
            }) {
                Ok((listener, port)) => {
                    self.passive = Some(listener);
                    format!("227 Entering Passive Mode (127,0,0,1,{},{})\r\n", port / 256, port % 256)
                }
                Err(_) => "425 cannot open data port\r\n".into(),
            },
            "MKD" => {
                let Some((_, local)) = self.resolve(arg) else {
                    return "550 bad path\r\n".into();
                };
                if local.exists() {
                    return "550 File exists\r\n".into();
                }
                match tokio::fs::create_dir(&local).await {
                    Ok(()) => format!("257 \"{arg}\" created\r\n"),
                    Err(_) => "550 cannot create directory\r\n".into(),
                }
            }
            "CWD" => match self.resolve(arg) {
                Some((virt, local)) if local.is_dir() => {
                    self.cwd = virt;
                    "250 ok\r\n".into()
                }
                _ => "550 not a directory\r\n".into(),
            },
            "STOR" => {
                let Some((_, local)) = self.resolve(arg) else {
                    return "550 bad path\r\n".into();
                };
                let Some(mut data) = self.accept_data(control, "150 ok to send\r\n").await else {
                    return "425 no data connection\r\n".into();
                };
                let mut body = Vec::new();
                if data.read_to_end(&mut body).await.is_err() {
                    return "426 transfer aborted\r\n".into();
                }
                match tokio::fs::write(&local, body).await {
                    Ok(()) => "226 stored\r\n".into(),
                    Err(_) => "550 cannot store\r\n".into(),
                }
            }
            "RETR" => {
                let file = match self.resolve(arg) {
                    Some((_, local)) if local.is_file() => local,
                    _ => return "550 no such file\r\n".into(),
                };
                let Ok(body) = tokio::fs::read(&file).await else {
                    return "550 cannot read\r\n".into();
                };
                self.send_data(control, &body).await
            }
            "NLST" => {
                let dir = match self.resolve(if arg.is_empty() { "." } else { arg }) {
                    Some((_, local)) if local.is_dir() => local,
                    _ => return "550 no such directory\r\n".into(),
                };
                let mut names = Vec::new();
                if let Ok(mut entries) = tokio::fs::read_dir(&dir).await {
                    while let Ok(Some(e)) = entries.next_entry().await {
                        names.push(e.file_name().to_string_lossy().into_owned());
                    }
                }
                names.sort();
                let listing: String = names.iter().map(|n| format!("{n}\r\n")).collect();
                self.send_data(control, listing.as_bytes()).await
            }
            _ => "502 not implemented\r\n".into(),
        }
    }

    async fn accept_data(
        &mut self,
        control: &mut tokio::net::tcp::OwnedWriteHalf,
        preliminary: &str,
    ) -> Option<TcpStream> {
        let listener = self.passive.take()?;
        let (stream, _) = listener.accept().await.ok()?;
        control.write_all(preliminary.as_bytes()).await.ok()?;
        Some(stream)
    }

    async fn send_data(&mut self, control: &mut tokio::net::tcp::OwnedWriteHalf, body: &[u8]) -> String {
        let Some(mut data) = self.accept_data(control, "150 opening data connection\r\n").await else {
            return "425 no data connection\r\n".into();
        };
        if data.write_all(body).await.is_err() || data.shutdown().await.is_err() {
            return "426 transfer aborted\r\n".into();
        }
        "226 transfer complete\r\n".into()
    }

    /// Virtual and on-disk path for `arg`; `None` when it escapes the home.
    fn resolve(&self, arg: &str) -> Option<(PathBuf, PathBuf)> {
        let home = self.home.as_ref()?;
        let joined = if arg.starts_with('/') { PathBuf::from(arg) } else { self.cwd.join(arg) };
        let mut virt = PathBuf::from("/");
        for c in joined.components() {
            match c {
                Component::Normal(p) => virt.push(p),
                Component::ParentDir => {
                    if !virt.pop() {
                        return None;
                    }
                }
                _ => {}
            }
        }
        let rel = virt.strip_prefix("/").unwrap_or(Path::new(""));
        Some((virt.clone(), home.join(rel)))
    }
}
