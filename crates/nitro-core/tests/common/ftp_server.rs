//! Minimal passive-mode FTP server for integration tests.
//!
//! Serves a single static body under any path. Understands the commands
//! libcurl issues for a `REST`+`RETR` download or a `SIZE` probe; everything
//! else gets `502`. Records every `REST` offset it receives.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct FtpServerOptions {
    /// Require this user/password; anonymous logins are refused.
    pub login: Option<(String, String)>,
}

pub struct FtpServer {
    port: u16,
    offsets: Arc<Mutex<Vec<u64>>>,
}

impl FtpServer {
    /// `ftp://127.0.0.1:<port>/<path>`, optionally with userinfo.
    pub fn url(&self, path: &str) -> String {
        format!("ftp://127.0.0.1:{}/{}", self.port, path)
    }

    pub fn url_with_login(&self, user: &str, pass: &str, path: &str) -> String {
        format!("ftp://{}:{}@127.0.0.1:{}/{}", user, pass, self.port, path)
    }

    /// `REST` offsets received so far, sorted.
    pub fn recorded_offsets(&self) -> Vec<u64> {
        let mut o = self.offsets.lock().unwrap().clone();
        o.sort_unstable();
        o
    }
}

pub fn start(body: Vec<u8>) -> FtpServer {
    start_with_options(body, FtpServerOptions::default())
}

pub fn start_with_options(body: Vec<u8>, opts: FtpServerOptions) -> FtpServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    let offsets = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&offsets);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let recorder = Arc::clone(&recorder);
            let opts = opts.clone();
            thread::spawn(move || {
                let _ = session(stream, &body, &opts, &recorder);
            });
        }
    });
    FtpServer { port, offsets }
}

fn session(
    control: TcpStream,
    body: &[u8],
    opts: &FtpServerOptions,
    recorder: &Mutex<Vec<u64>>,
) -> std::io::Result<()> {
    control.set_read_timeout(Some(Duration::from_secs(10)))?;
    let mut out = control.try_clone()?;
    let mut lines = BufReader::new(control);
    let mut reply = |text: &str| out.write_all(format!("{}\r\n", text).as_bytes());

    reply("220 test server ready")?;
    let mut user = String::new();
    let mut offset = 0u64;
    let mut passive: Option<TcpListener> = None;

    let mut line = String::new();
    loop {
        line.clear();
        if lines.read_line(&mut line)? == 0 {
            return Ok(());
        }
        let line = line.trim_end();
        let (cmd, arg) = line.split_once(' ').unwrap_or((line, ""));
        match cmd.to_ascii_uppercase().as_str() {
            "USER" => {
                user = arg.to_string();
                reply("331 password required")?;
            }
            "PASS" => {
                let accepted = match &opts.login {
                    Some((u, p)) => *u == user && p == arg,
                    None => true,
                };
                if accepted {
                    reply("230 logged in")?;
                } else {
                    reply("530 login incorrect")?;
                }
            }
            "PWD" => reply("257 \"/\" is current directory")?,
            "CWD" => reply("250 directory changed")?,
            "SYST" => reply("215 UNIX Type: L8")?,
            "TYPE" => reply("200 type set")?,
            "EPSV" => {
                let l = TcpListener::bind("127.0.0.1:0")?;
                let p = l.local_addr()?.port();
                passive = Some(l);
                reply(&format!("229 Entering Extended Passive Mode (|||{}|)", p))?;
            }
            "PASV" => {
                let l = TcpListener::bind("127.0.0.1:0")?;
                let p = l.local_addr()?.port();
                passive = Some(l);
                reply(&format!(
                    "227 Entering Passive Mode (127,0,0,1,{},{})",
                    p >> 8,
                    p & 0xff
                ))?;
            }
            "SIZE" => reply(&format!("213 {}", body.len()))?,
            "REST" => match arg.parse::<u64>() {
                Ok(n) if n <= body.len() as u64 => {
                    offset = n;
                    recorder.lock().unwrap().push(n);
                    reply(&format!("350 restarting at {}", n))?;
                }
                _ => reply("501 bad offset")?,
            },
            "RETR" => {
                let Some(l) = passive.take() else {
                    reply("425 use PASV first")?;
                    continue;
                };
                reply("150 opening data connection")?;
                let (mut data, _) = l.accept()?;
                // The client hangs up once it has its segment; that is not an error here.
                let _ = data.write_all(&body[offset as usize..]);
                drop(data);
                offset = 0;
                if reply("226 transfer complete").is_err() {
                    return Ok(());
                }
            }
            "ABOR" => reply("226 abort ok")?,
            "QUIT" => {
                reply("221 bye")?;
                return Ok(());
            }
            _ => reply("502 command not implemented")?,
        }
    }
}
