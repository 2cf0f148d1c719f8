//! Remote execution channel.
//!
//! Dispatch is one-way: a command envelope is written into the remote
//! context and the call returns once the write is accepted. The optional
//! dispatch callback fires at that point - NOT when the remote code
//! finishes executing, which may be long after (or never, as far as this
//! channel can tell). Remote execution errors do not come back through
//! `dispatch`; they arrive, if at all, as `failed` reports on the bus.

use std::io::Write;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use tracing::{debug, info, warn};

use crate::bus::EventBus;
use crate::error::BridgeError;
use crate::protocol::{serialize_envelope, CommandEnvelope, JsonlReader};

/// Callback invoked once a dispatch completes (the write is accepted).
pub type DispatchCallback = Box<dyn FnOnce() + Send>;

/// One-way code dispatch into the remote context.
pub trait RemoteExecutionChannel: Send + Sync {
    /// Send a command envelope for remote execution.
    ///
    /// Sequential dispatches from one caller reach the remote context in
    /// order, but their *effects* are not observably ordered when the
    /// remote code is asynchronous.
    fn dispatch(
        &self,
        envelope: &CommandEnvelope,
        on_dispatched: Option<DispatchCallback>,
    ) -> Result<(), BridgeError>;
}

/// Channel backed by a harvester child process speaking JSONL.
///
/// Commands are written to the child's stdin; tagged reports are read from
/// its stdout on a background thread, queued, and routed to the bus.
pub struct ProcessChannel {
    child: Mutex<Child>,
    stdin: Mutex<ChildStdin>,
    reader_handle: Option<JoinHandle<()>>,
    router_handle: Option<JoinHandle<()>>,
}

impl ProcessChannel {
    /// Spawn the harvester process and start pumping its output into the bus.
    pub fn spawn(program: &str, args: &[&str], bus: Arc<EventBus>) -> Result<Self, BridgeError> {
        info!(program = %program, "Spawning harvester process");

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(BridgeError::Spawn)?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BridgeError::ChannelClosed("no stdin handle".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BridgeError::ChannelClosed("no stdout handle".to_string()))?;
        let stderr = child.stderr.take();

        // Reader thread parses stdout lines; the router thread drains the
        // queue into the bus. The queue keeps parsing off the routing path.
        let (tx, rx) = async_channel::unbounded();

        let reader_handle = std::thread::Builder::new()
            .name("harvest-channel-reader".to_string())
            .spawn(move || {
                let mut reader = JsonlReader::new(stdout);
                loop {
                    match reader.next_message() {
                        Ok(Some(msg)) => {
                            if tx.send_blocking(msg).is_err() {
                                debug!("Message queue closed, stopping reader");
                                break;
                            }
                        }
                        Ok(None) => {
                            debug!("Remote output stream ended");
                            break;
                        }
                        Err(e) => {
                            warn!(error = %e, "IO error reading remote output");
                            break;
                        }
                    }
                }
            })
            .map_err(BridgeError::Io)?;

        let router_handle = std::thread::Builder::new()
            .name("harvest-channel-router".to_string())
            .spawn(move || {
                while let Ok(msg) = rx.recv_blocking() {
                    bus.on_message(msg);
                }
                debug!("Message queue drained, stopping router");
            })
            .map_err(BridgeError::Io)?;

        if let Some(stderr) = stderr {
            // Not joined on shutdown; exits on its own at stream EOF
            let _ = std::thread::Builder::new()
                .name("harvest-channel-stderr".to_string())
                .spawn(move || {
                    use std::io::{BufRead, BufReader};
                    for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                        debug!(target: "harvester", "{}", line);
                    }
                })
                .map_err(BridgeError::Io)?;
        }

        Ok(Self {
            child: Mutex::new(child),
            stdin: Mutex::new(stdin),
            reader_handle: Some(reader_handle),
            router_handle: Some(router_handle),
        })
    }

    /// Kill the harvester process and join the pump threads.
    pub fn shutdown(&mut self) {
        {
            let mut child = self.child.lock().expect("child handle poisoned");
            if let Err(e) = child.kill() {
                debug!(error = %e, "Harvester process already gone");
            }
            let _ = child.wait();
        }

        if let Some(handle) = self.reader_handle.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.router_handle.take() {
            let _ = handle.join();
        }
    }
}

impl RemoteExecutionChannel for ProcessChannel {
    fn dispatch(
        &self,
        envelope: &CommandEnvelope,
        on_dispatched: Option<DispatchCallback>,
    ) -> Result<(), BridgeError> {
        let line = serialize_envelope(envelope)?;
        debug!(request_id = %envelope.id, command = %envelope.command.name(), "Dispatching command");

        {
            let mut stdin = self.stdin.lock().expect("stdin handle poisoned");
            stdin
                .write_all(line.as_bytes())
                .and_then(|_| stdin.write_all(b"\n"))
                .and_then(|_| stdin.flush())
                .map_err(|e| BridgeError::ChannelClosed(e.to_string()))?;
        }

        // Dispatch completed: the payload is in the remote context's hands.
        if let Some(callback) = on_dispatched {
            callback();
        }
        Ok(())
    }
}

impl Drop for ProcessChannel {
    fn drop(&mut self) {
        self.shutdown();
    }
}
