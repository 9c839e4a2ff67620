//! CLI argument definitions and shared statics.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

pub fn json_mode() -> bool {
    JSON_MODE.get().copied().unwrap_or(false)
}

#[derive(Parser, Debug)]
#[command(name = "stroker", version, about = "Multi-axis stroker motion CLI")]
pub struct Cli {
    /// Path to config TOML. Built-in defaults are used when omitted.
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Force the simulated transport regardless of the config
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    pub sim: bool,

    /// Print results and errors as JSON
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "warn", global = true)]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Memory locking mode for real-time operation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum RtLock {
    /// Do not lock memory
    None,
    /// Lock currently resident pages
    Current,
    /// Lock current and future pages
    All,
}

impl RtLock {
    #[inline]
    pub fn os_default() -> Self {
        if cfg!(target_os = "linux") {
            RtLock::Current
        } else {
            RtLock::None
        }
    }
}

/// Real-time knobs shared by the commands that run the tick thread.
#[derive(Args, Debug, Clone, Copy)]
pub struct RtArgs {
    /// Enable real-time mode (SCHED_FIFO and mlockall)
    #[arg(
        long,
        action = ArgAction::SetTrue,
        long_help = "Enable real-time mode on supported OSes.\n\nLinux: requests SCHED_FIFO for the process before the tick thread starts, so the thread inherits it, and locks memory with mlockall. Needs CAP_SYS_NICE / CAP_IPC_LOCK or root.\n\nmacOS: only mlockall is applied."
    )]
    pub rt: bool,
    /// SCHED_FIFO priority (Linux only); defaults to the system maximum
    #[arg(long, value_name = "PRIO")]
    pub rt_prio: Option<i32>,
    /// Memory locking mode for --rt
    #[arg(long, value_enum, value_name = "MODE")]
    pub rt_lock: Option<RtLock>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Play the scripts that belong to a media file
    Play {
        /// Media file; scripts are matched next to it
        #[arg(long, value_name = "FILE")]
        media: PathBuf,
        /// Media position to start from, in milliseconds
        #[arg(long, value_name = "MS", default_value_t = 0)]
        start_ms: i64,
        /// Stop after this many seconds (default: until the last keyframe)
        #[arg(long, value_name = "SECS")]
        seconds: Option<f64>,
        #[command(flatten)]
        rt: RtArgs,
    },
    /// Run the test pattern on one axis, then ramp it down
    Test {
        /// Axis name (stroke|twist|roll|pitch) or wire code (L0|R0|R1|R2)
        #[arg(long)]
        axis: String,
        /// Pattern speed in Hz
        #[arg(long, default_value_t = 1.0)]
        speed: f64,
        /// Test duration in seconds
        #[arg(long, value_name = "SECS", default_value_t = 3.0)]
        seconds: f64,
        #[command(flatten)]
        rt: RtArgs,
    },
    /// Parse a script file and summarize its tracks
    Inspect {
        /// Script file
        script: PathBuf,
        /// Axis the file's top-level actions belong to
        #[arg(long, default_value = "stroke")]
        axis: String,
    },
    /// List the scripts that would be loaded for a media file
    Match {
        /// Media file
        media: PathBuf,
    },
    /// Validate the config and open the transport
    SelfCheck,
}
