use super::form::FormData;
use async_trait::async_trait;
use colored::*;
use parking_lot::Mutex;
use ssh2::{Channel, ExtendedData, Session};
use std::io::{self, prelude::*};
use std::net::{IpAddr, Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub const DIAL_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("Failed to connect: {0}")]
    Connect(String),
    #[error("Failed to create SSH session: {0}")]
    Session(String),
    #[error("Command execution failed: {0}")]
    Exec(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(String),
    Failed(RunError),
    Cancelled,
}

impl RunOutcome {
    /// The terminal console entry for this outcome. Cancelled runs stay silent.
    pub fn console_line(&self) -> Option<String> {
        match self {
            RunOutcome::Completed(output) => Some(format!(
                "{}\n{}",
                "Command executed successfully:".green(),
                output
            )),
            RunOutcome::Failed(err) => Some(err.to_string().red().bold().to_string()),
            RunOutcome::Cancelled => None,
        }
    }
}

/// One connect-exec-collect-close attempt against the form's target.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, data: FormData, token: CancellationToken) -> RunOutcome;
}

pub struct SshRunner {
    dial_timeout: Duration,
}

impl SshRunner {
    pub fn new() -> Self {
        SshRunner {
            dial_timeout: DIAL_TIMEOUT,
        }
    }

    pub fn with_dial_timeout(dial_timeout: Duration) -> Self {
        SshRunner { dial_timeout }
    }
}

impl Default for SshRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for SshRunner {
    async fn run(&self, data: FormData, token: CancellationToken) -> RunOutcome {
        let abort = Arc::new(SocketAbort::default());
        let worker_abort = abort.clone();
        let dial_timeout = self.dial_timeout;

        // ssh2 blocks, so the transaction lives on the blocking pool and is
        // interrupted by shutting its socket down.
        let mut job =
            tokio::task::spawn_blocking(move || execute(&data, dial_timeout, &worker_abort));

        tokio::select! {
            biased;
            _ = token.cancelled() => {
                abort.trip();
                if let Err(err) = job.await {
                    warn!(error = %err, "ssh worker did not unwind cleanly");
                }
                RunOutcome::Cancelled
            }
            joined = &mut job => {
                if token.is_cancelled() {
                    return RunOutcome::Cancelled;
                }
                match joined {
                    Ok(Ok(output)) => RunOutcome::Completed(output),
                    Ok(Err(err)) => RunOutcome::Failed(err),
                    Err(err) => RunOutcome::Failed(RunError::Exec(format!("worker stopped: {}", err))),
                }
            }
        }
    }
}

#[derive(Default)]
struct SocketAbort {
    state: Mutex<AbortState>,
}

#[derive(Default)]
struct AbortState {
    tripped: bool,
    stream: Option<TcpStream>,
}

impl SocketAbort {
    /// Registers the live socket. Fails if the abort already fired.
    fn attach(&self, stream: &TcpStream) -> io::Result<()> {
        let clone = stream.try_clone()?;
        let mut state = self.state.lock();
        if state.tripped {
            let _ = clone.shutdown(Shutdown::Both);
            return Err(io::Error::new(io::ErrorKind::Interrupted, "cancelled"));
        }
        state.stream = Some(clone);
        Ok(())
    }

    fn trip(&self) {
        let mut state = self.state.lock();
        state.tripped = true;
        if let Some(stream) = state.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    fn is_tripped(&self) -> bool {
        self.state.lock().tripped
    }
}

/// Resolves `host` and connects to the first address that answers. One
/// `budget` covers resolution and every connect attempt.
fn dial(host: &str, port: u16, budget: Duration, abort: &SocketAbort) -> io::Result<TcpStream> {
    let deadline = Instant::now() + budget;
    let addrs = resolve(host, port, budget)?;
    if addrs.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no address found for {}", host),
        ));
    }

    let mut last_err = None;
    for addr in addrs {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() || abort.is_tripped() {
            break;
        }
        match TcpStream::connect_timeout(&addr, remaining) {
            Ok(stream) => return Ok(stream),
            Err(err) => {
                debug!(%addr, error = %err, "connect attempt failed");
                last_err = Some(err);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::TimedOut, format!("timed out dialing {}:{}", host, port))
    }))
}

/// Name lookup is blocking and has no timeout of its own, so it runs on a
/// helper thread that is abandoned once `timeout` passes.
fn resolve(host: &str, port: u16, timeout: Duration) -> io::Result<Vec<SocketAddr>> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(vec![SocketAddr::new(ip, port)]);
    }

    let target = (host.to_string(), port);
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("ssh-resolve".to_string())
        .spawn(move || {
            let _ = tx.send(target.to_socket_addrs().map(|addrs| addrs.collect::<Vec<_>>()));
        })?;
    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("timed out resolving {}", host),
        )),
    }
}

/// Authenticated client. Dropping it disconnects.
struct Client {
    session: Session,
}

impl Client {
    fn connect(
        tcp: TcpStream,
        data: &FormData,
        handshake_timeout: Duration,
    ) -> Result<Self, RunError> {
        let session = Session::new().map_err(|e| RunError::Connect(e.to_string()))?;
        let mut client = Client { session };
        client.session.set_tcp_stream(tcp);
        client
            .session
            .set_timeout(handshake_timeout.as_millis().min(u32::MAX as u128) as u32);
        client
            .session
            .handshake()
            .map_err(|e| RunError::Connect(e.to_string()))?;

        // Host key is accepted without verification.
        client
            .session
            .userauth_password(&data.username, &data.password)
            .map_err(|e| RunError::Connect(e.to_string()))?;
        if !client.session.authenticated() {
            return Err(RunError::Connect("authentication failed".to_string()));
        }

        // Command execution is unbounded.
        client.session.set_timeout(0);
        Ok(client)
    }

    fn open_channel(&self) -> Result<ExecChannel, RunError> {
        let mut channel = self
            .session
            .channel_session()
            .map_err(|e| RunError::Session(e.to_string()))?;
        channel
            .handle_extended_data(ExtendedData::Merge)
            .map_err(|e| RunError::Session(e.to_string()))?;
        Ok(ExecChannel { channel })
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Err(err) = self.session.disconnect(None, "closing", None) {
            debug!(error = %err, "ssh disconnect");
        }
    }
}

struct ExecChannel {
    channel: Channel,
}

impl ExecChannel {
    /// Runs `command` and returns stdout and stderr as one blob.
    fn exec(&mut self, command: &str) -> Result<String, RunError> {
        self.channel
            .exec(command)
            .map_err(|e| RunError::Exec(e.to_string()))?;

        let mut output = Vec::new();
        self.channel
            .read_to_end(&mut output)
            .map_err(|e| RunError::Exec(e.to_string()))?;
        self.channel
            .wait_close()
            .map_err(|e| RunError::Exec(e.to_string()))?;
        let status = self
            .channel
            .exit_status()
            .map_err(|e| RunError::Exec(e.to_string()))?;

        let output = String::from_utf8_lossy(&output).into_owned();
        if status != 0 {
            let mut reason = format!("Process exited with status {}", status);
            if !output.is_empty() {
                reason.push('\n');
                reason.push_str(&output);
            }
            return Err(RunError::Exec(reason));
        }
        Ok(output)
    }
}

impl Drop for ExecChannel {
    fn drop(&mut self) {
        let _ = self.channel.close();
    }
}

fn execute(data: &FormData, dial_timeout: Duration, abort: &SocketAbort) -> Result<String, RunError> {
    let tcp = dial(&data.ip, data.port, dial_timeout, abort)
        .map_err(|e| RunError::Connect(e.to_string()))?;
    abort
        .attach(&tcp)
        .map_err(|e| RunError::Connect(e.to_string()))?;

    // Channel is declared after the client so it is released first.
    let client = Client::connect(tcp, data, dial_timeout)?;
    let mut channel = client.open_channel()?;
    channel.exec(&data.command)
}
