//! Command shell
//!
//! A small line-oriented language for driving a heap by hand or from a
//! script:
//!
//! ```text
//! alloc 24          allocate 24 bytes, prints the handle
//! write #0 0xff     fill the payload of handle 0
//! read #0           hex dump of the payload
//! free #0           release handle 0
//! minor | major     run a collection
//! dump | verify     inspect the heap
//! reset best        start over with best-fit (or first-fit)
//! ```
//!
//! Blank lines and lines starting with `;` are ignored.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::{HeapConfig, Strategy};
use crate::error::{ConfigError, HeapError, IntegrityError};
use crate::gc::{Handle, Heap};

static COMMAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<cmd>[a-z]+)(?:\s+(?P<first>\S+))?(?:\s+(?P<second>\S+))?$")
        .expect("command pattern")
});

static HANDLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#?(\d+)$").expect("handle pattern"));

pub const HELP: &str = "\
commands:
  alloc <size>           allocate <size> bytes
  free <handle>          release a handle
  write <handle> <byte>  fill a payload with <byte>
  read <handle>          show a payload
  minor                  run a minor collection
  major                  run a major collection
  dump                   print the heap
  verify                 check heap invariants
  reset [first|best]     reconfigure the heap
  help                   show this text
  quit                   leave";

/// One parsed shell command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Alloc(usize),
    Free(Handle),
    Write(Handle, u8),
    Read(Handle),
    Minor,
    Major,
    Dump,
    Verify,
    Reset(Option<Strategy>),
    Help,
    Quit,
}

/// Error from parsing or running a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellError {
    Parse(String),
    Heap(HeapError),
    Config(ConfigError),
    Integrity(IntegrityError),
}

impl fmt::Display for ShellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShellError::Parse(msg) => write!(f, "parse error: {}", msg),
            ShellError::Heap(e) => write!(f, "{}", e),
            ShellError::Config(e) => write!(f, "config error: {}", e),
            ShellError::Integrity(e) => write!(f, "integrity error: {}", e),
        }
    }
}

impl std::error::Error for ShellError {}

impl From<HeapError> for ShellError {
    fn from(e: HeapError) -> Self {
        ShellError::Heap(e)
    }
}

impl From<ConfigError> for ShellError {
    fn from(e: ConfigError) -> Self {
        ShellError::Config(e)
    }
}

impl From<IntegrityError> for ShellError {
    fn from(e: IntegrityError) -> Self {
        ShellError::Integrity(e)
    }
}

fn parse_handle(text: Option<&str>) -> Result<Handle, ShellError> {
    let text = text.ok_or_else(|| ShellError::Parse("missing handle".into()))?;
    HANDLE
        .captures(text)
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .map(Handle::from_raw)
        .ok_or_else(|| ShellError::Parse(format!("bad handle '{}'", text)))
}

fn parse_number(text: Option<&str>, what: &str) -> Result<usize, ShellError> {
    let text = text.ok_or_else(|| ShellError::Parse(format!("missing {}", what)))?;
    let parsed = match text.strip_prefix("0x") {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|_| ShellError::Parse(format!("bad {} '{}'", what, text)))
}

impl FromStr for Command {
    type Err = ShellError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let caps = COMMAND
            .captures(line.trim())
            .ok_or_else(|| ShellError::Parse(format!("cannot parse '{}'", line.trim())))?;
        let first = caps.name("first").map(|m| m.as_str());
        let second = caps.name("second").map(|m| m.as_str());
        let no_args = |command: Command| match first {
            None => Ok(command),
            Some(extra) => Err(ShellError::Parse(format!("unexpected argument '{}'", extra))),
        };

        match &caps["cmd"] {
            "alloc" | "malloc" => Ok(Command::Alloc(parse_number(first, "size")?)),
            "free" => Ok(Command::Free(parse_handle(first)?)),
            "read" => Ok(Command::Read(parse_handle(first)?)),
            "write" => {
                let handle = parse_handle(first)?;
                let byte = parse_number(second, "byte")?;
                let byte = u8::try_from(byte)
                    .map_err(|_| ShellError::Parse(format!("byte {} out of range", byte)))?;
                Ok(Command::Write(handle, byte))
            }
            "minor" => no_args(Command::Minor),
            "major" => no_args(Command::Major),
            "dump" => no_args(Command::Dump),
            "verify" => no_args(Command::Verify),
            "reset" => Ok(Command::Reset(first.map(str::parse::<Strategy>).transpose()?)),
            "help" => no_args(Command::Help),
            "quit" | "exit" => no_args(Command::Quit),
            other => Err(ShellError::Parse(format!("unknown command '{}'", other))),
        }
    }
}

/// Result of a successfully executed line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Text to show, possibly empty
    Output(String),
    Quit,
}

/// Interpreter state: a heap and nothing else
pub struct Shell {
    heap: Heap,
}

impl Shell {
    pub fn new(config: HeapConfig) -> Result<Self, ConfigError> {
        Ok(Shell {
            heap: Heap::new(config)?,
        })
    }

    #[inline]
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Parse and run one line
    pub fn execute(&mut self, line: &str) -> Result<Outcome, ShellError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') {
            return Ok(Outcome::Output(String::new()));
        }
        let command: Command = line.parse()?;
        self.run(command)
    }

    /// Run one parsed command
    pub fn run(&mut self, command: Command) -> Result<Outcome, ShellError> {
        let output = match command {
            Command::Alloc(size) => {
                let handle = self.heap.allocate(size)?;
                format!("{} -> {}", handle, self.heap.dereference(handle)?)
            }
            Command::Free(handle) => {
                self.heap.release(handle)?;
                format!("released {}", handle)
            }
            Command::Write(handle, byte) => {
                let payload = self.heap.payload_mut(handle)?;
                payload.fill(byte);
                format!("wrote {} bytes to {}", payload.len(), handle)
            }
            Command::Read(handle) => {
                let payload = self.heap.payload(handle)?;
                payload
                    .chunks(16)
                    .map(|row| {
                        row.iter()
                            .map(|b| format!("{:02x}", b))
                            .collect::<Vec<_>>()
                            .join(" ")
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            Command::Minor => format!("minor: {}", self.heap.minor_collection()?),
            Command::Major => format!("major: {}", self.heap.major_collection()),
            Command::Dump => self.heap.dump().to_string(),
            Command::Verify => {
                self.heap.verify()?;
                "ok".to_string()
            }
            Command::Reset(strategy) => {
                let strategy = strategy.unwrap_or(self.heap.config().strategy);
                let config = HeapConfig {
                    strategy,
                    ..self.heap.config().clone()
                };
                self.heap.configure(config)?;
                format!("heap reset ({})", strategy)
            }
            Command::Help => HELP.to_string(),
            Command::Quit => return Ok(Outcome::Quit),
        };
        Ok(Outcome::Output(output))
    }
}
