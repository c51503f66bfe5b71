//! Scripted in-memory device for driving the engine in tests.
//!
//! The fake echoes each command line, appends the scripted reply, then
//! the SR Linux two-line prompt for the current mode. Everything sent is
//! recorded so tests can assert on the exact command sequence.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::config::{AuthMethod, HostKeyVerification, SshConfig};
use super::shell::{Connector, Shell};
use crate::error::{ChannelError, Result, TransportError};

pub(crate) const RUNNING_PROMPT: &str = "--{ running }--[  ]--\r\nA:srl1# ";
pub(crate) const CANDIDATE_PROMPT: &str = "--{ candidate shared default }--[  ]--\r\nA:srl1# ";

/// Connection settings pointing at the fake device.
pub(crate) fn ssh_config() -> SshConfig {
    SshConfig {
        host: "srl1".into(),
        port: 22,
        username: "admin".into(),
        auth: AuthMethod::None,
        timeout: Duration::from_secs(5),
        idle_timeout: Duration::from_secs(30),
        terminal_width: 511,
        terminal_height: 24,
        host_key_verification: HostKeyVerification::Disabled,
        known_hosts_path: None,
    }
}

#[derive(Default)]
struct DeviceState {
    replies: HashMap<String, String>,
    stalled: HashSet<String>,
    ignore_candidate: bool,
    colored: bool,
    chunk_size: Option<usize>,
    candidate: bool,
    sent: Vec<String>,
    pending: VecDeque<Vec<u8>>,
    connects: usize,
    closes: usize,
    fail_auth: bool,
    closing: HashSet<String>,
    closed: bool,
}

/// Shared handle on the fake device; clones observe the same state.
#[derive(Clone, Default)]
pub(crate) struct MockDevice {
    state: Arc<Mutex<DeviceState>>,
}

impl MockDevice {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap()
    }

    /// Script the body printed in response to `command`.
    pub(crate) fn reply(self, command: &str, body: &str) -> Self {
        self.state()
            .replies
            .insert(command.to_string(), body.to_string());
        self
    }

    /// The device prints `body` for `command` but never shows a prompt.
    pub(crate) fn stall(self, command: &str, body: &str) -> Self {
        {
            let mut state = self.state();
            state.stalled.insert(command.to_string());
            state
                .replies
                .insert(command.to_string(), body.to_string());
        }
        self
    }

    /// `enter candidate` leaves the device in running mode.
    pub(crate) fn refuse_candidate(self) -> Self {
        self.state().ignore_candidate = true;
        self
    }

    /// Wrap prompts in the escape sequences a real PTY emits.
    pub(crate) fn colored(self) -> Self {
        self.state().colored = true;
        self
    }

    /// Deliver output in chunks of at most `size` bytes.
    pub(crate) fn chunked(self, size: usize) -> Self {
        self.state().chunk_size = Some(size);
        self
    }

    pub(crate) fn fail_auth(self) -> Self {
        self.state().fail_auth = true;
        self
    }

    /// Drop the channel after echoing `command`. With `quit` this is a
    /// CLI that exits; with anything else, a link that dies mid-command.
    pub(crate) fn close_on(self, command: &str) -> Self {
        self.state().closing.insert(command.to_string());
        self
    }

    pub(crate) fn connector(&self) -> MockConnector {
        MockConnector {
            device: self.clone(),
        }
    }

    /// Every command line received, in order.
    pub(crate) fn sent(&self) -> Vec<String> {
        self.state().sent.clone()
    }

    pub(crate) fn count(&self, command: &str) -> usize {
        self.state().sent.iter().filter(|c| *c == command).count()
    }

    pub(crate) fn connects(&self) -> usize {
        self.state().connects
    }

    pub(crate) fn closes(&self) -> usize {
        self.state().closes
    }

    pub(crate) fn in_candidate(&self) -> bool {
        self.state().candidate
    }

    fn prompt(state: &DeviceState) -> String {
        let prompt = if state.candidate {
            CANDIDATE_PROMPT
        } else {
            RUNNING_PROMPT
        };
        if state.colored {
            format!("\x1b[?2004h\x1b[1m{}\x1b[0m\x1b]0;srl1\x07", prompt)
        } else {
            prompt.to_string()
        }
    }

    fn enqueue(state: &mut DeviceState, output: String) {
        let bytes = output.into_bytes();
        match state.chunk_size {
            Some(size) if size > 0 => {
                for chunk in bytes.chunks(size) {
                    state.pending.push_back(chunk.to_vec());
                }
            }
            _ => state.pending.push_back(bytes),
        }
    }
}

pub(crate) struct MockConnector {
    device: MockDevice,
}

impl Connector for MockConnector {
    type Shell = MockShell;

    async fn connect(&self, config: &SshConfig) -> Result<MockShell> {
        let mut state = self.device.state();
        if state.fail_auth {
            return Err(TransportError::AuthenticationFailed {
                user: config.username.clone(),
            }
            .into());
        }
        state.connects += 1;
        state.closed = false;
        state.candidate = false;
        let banner = format!("Welcome to the srlinux CLI.\r\n\r\n{}", MockDevice::prompt(&state));
        MockDevice::enqueue(&mut state, banner);
        Ok(MockShell {
            device: self.device.clone(),
            open: true,
        })
    }
}

pub(crate) struct MockShell {
    device: MockDevice,
    open: bool,
}

impl Shell for MockShell {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let mut state = self.device.state();
        if state.closed {
            return Err(ChannelError::Closed.into());
        }

        let line = String::from_utf8_lossy(data).trim_end().to_string();
        state.sent.push(line.clone());

        match line.as_str() {
            "enter candidate" if !state.ignore_candidate => state.candidate = true,
            "quit" => state.candidate = false,
            _ => {}
        }

        let body = state.replies.get(&line).cloned().unwrap_or_default();
        let mut output = format!("{}\r\n", line);
        if !body.is_empty() {
            output.push_str(&body.replace('\n', "\r\n"));
            output.push_str("\r\n");
        }
        let exits = state.closing.contains(&line);
        if !state.stalled.contains(&line) && !exits {
            output.push_str(&MockDevice::prompt(&state));
        }
        MockDevice::enqueue(&mut state, output);

        if exits {
            state.closed = true;
        }
        Ok(())
    }

    fn try_read(&mut self) -> Result<Option<Vec<u8>>> {
        let mut state = self.device.state();
        match state.pending.pop_front() {
            Some(chunk) => Ok(Some(chunk)),
            None if state.closed => Err(ChannelError::Closed.into()),
            None => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if self.open {
            self.open = false;
            let mut state = self.device.state();
            state.closes += 1;
            state.closed = true;
            state.pending.clear();
        }
        Ok(())
    }
}
