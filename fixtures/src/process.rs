//! Fixture for servers running as a separate process.

use crate::background::{STARTUP_TIMEOUT, run_in_background_with_timeout};
use crate::fixture::ServerFixture;
use errors::FixtureError;
use parking_lot::Mutex;
use regex::Regex;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::{Arc, LazyLock};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(25);

static LISTENING_ON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Now listening on:\s*(\S+)").expect("listening pattern is valid")
});

/// Launches a server process and waits for it to print
/// `Now listening on: <url>`.
///
/// The announced url becomes the root address. Output after the announcement
/// is forwarded to `tracing` at debug level. Disposing kills the process.
pub struct ProcessServerFixture {
    program: String,
    args: Vec<String>,
    envs: Vec<(String, String)>,
    working_dir: Option<PathBuf>,
    startup_timeout: Duration,
    child: Arc<Mutex<Option<Child>>>,
}

impl ProcessServerFixture {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            working_dir: None,
            startup_timeout: STARTUP_TIMEOUT,
            child: Arc::new(Mutex::new(None)),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Overrides how long to wait for the announcement.
    pub fn startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    /// Process id of the running server.
    pub fn pid(&self) -> Option<u32> {
        self.child.lock().as_ref().map(Child::id)
    }

    fn spawn(&self) -> Result<ChildStdout, FixtureError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| FixtureError::Spawn {
            program: self.program.clone(),
            reason: e.to_string(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| FixtureError::Spawn {
            program: self.program.clone(),
            reason: "stdout was not captured".to_string(),
        })?;

        debug!(program = %self.program, pid = child.id(), "Server process spawned");
        *self.child.lock() = Some(child);
        Ok(stdout)
    }
}

impl ServerFixture for ProcessServerFixture {
    fn start_and_get_root_uri(&self) -> anyhow::Result<String> {
        let stdout = self.spawn()?;
        let child = Arc::clone(&self.child);
        let program = self.program.clone();

        let root_uri = run_in_background_with_timeout(
            &format!("'{}' to announce its address", self.program),
            self.startup_timeout,
            move || wait_for_address(stdout, &child, &program),
        )?;

        info!(program = %self.program, %root_uri, "Server process listening");
        Ok(root_uri)
    }

    fn dispose(&mut self) -> anyhow::Result<()> {
        let Some(mut child) = self.child.lock().take() else {
            return Ok(());
        };

        match child.kill() {
            Ok(()) => {}
            // Already exited.
            Err(e) if e.kind() == ErrorKind::InvalidInput => {}
            Err(e) => return Err(FixtureError::Io(e).into()),
        }
        let status = child.wait().map_err(FixtureError::Io)?;
        debug!(program = %self.program, %status, "Server process stopped");
        Ok(())
    }
}

fn wait_for_address(
    stdout: ChildStdout,
    child: &Mutex<Option<Child>>,
    program: &str,
) -> anyhow::Result<String> {
    let mut lines = BufReader::new(stdout).lines();

    while let Some(line) = lines.next() {
        let line = line.map_err(FixtureError::Io)?;
        debug!(program, "{line}");

        if let Some(captures) = LISTENING_ON.captures(&line) {
            let root_uri = captures[1].to_string();
            forward_output(lines, program.to_string());
            return Ok(root_uri);
        }
    }

    // Stdout closed before the announcement. The lock is only held for
    // `try_wait` so that `dispose` can always take the child and kill it.
    let status = loop {
        if let Some(child) = child.lock().as_mut() {
            if let Some(status) = child.try_wait().map_err(FixtureError::Io)? {
                break status.to_string();
            }
        } else {
            break "disposed".to_string();
        }
        thread::sleep(EXIT_POLL_INTERVAL);
    };
    Err(FixtureError::ProcessExited {
        program: program.to_string(),
        status,
    }
    .into())
}

// Keeps the pipe drained so the server never blocks on a full stdout.
fn forward_output(lines: std::io::Lines<BufReader<ChildStdout>>, program: String) {
    let spawned = thread::Builder::new()
        .name(format!("{program}-stdout"))
        .spawn(move || {
            for line in lines.map_while(Result::ok) {
                debug!(program = %program, "{line}");
            }
        });
    if let Err(e) = spawned {
        debug!(error = %e, "Cannot forward server output");
    }
}
