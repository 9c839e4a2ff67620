#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Real-time motion engine for a multi-axis stroker (hardware-agnostic).
//!
//! All device I/O goes through `stroker_traits::Transport`; time comes from
//! `stroker_traits::Clock`.
//!
//! ## Architecture
//!
//! - **Tracks**: immutable keyframe tracks with linear interpolation (`keyframe`)
//! - **Ingestion**: script parsing and media-file matching (`script`, `matching`)
//! - **Patterns**: procedural fill modes for axes without a script (`pattern`)
//! - **Resolution**: per-axis source selection, remap and offset (`resolver`)
//! - **Encoding**: the `L0500I10` command line with dirty tracking (`command`, `tick`)
//! - **Engine**: the tick thread and host-facing API (`engine`)
//!
//! ## Positions
//!
//! Scripts and patterns produce normalized positions in `0..=100`. Each axis
//! maps them into its `[min, max]` range, adds its offset and is encoded on
//! the wire as `round(percent * 10)` clamped to `000..=999`.

pub mod axis;
pub mod command;
pub mod config;
pub mod conversions;
pub mod engine;
pub mod error;
pub mod keyframe;
pub mod matching;
pub mod mocks;
pub mod pattern;
pub mod resolver;
pub mod script;
pub mod status;
pub mod tick;
pub mod transport_error;
pub mod util;

pub use axis::{AxisConfig, AxisConfigs, AxisId, AxisKind, OffsetKind};
pub use config::{EngineSettings, OutputCfg};
pub use engine::{MotionEngine, TransportHandle, transport_handle};
pub use error::{ConfigError, EngineError, ScriptError};
pub use keyframe::{Keyframe, KeyframeTrack};
pub use matching::{LoadReport, MatchedScripts, load_for_media, match_scripts};
pub use pattern::FillMode;
pub use script::{ScriptSet, load_script, parse_script};
pub use status::{AxisActivity, EngineEvent};
pub use tick::{MotionCore, TickInput, TickReport, Tracks};
