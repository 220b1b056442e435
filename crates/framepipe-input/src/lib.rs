//! FramePipe Input - Sequential video input over a rendering engine
//!
//! Opens a script file through a script host, validates that its output can
//! be delivered as planar YUV or RGB, and exposes the open / allocate / read
//! / release / close contract a sequential encoder front end expects.

pub mod host;
pub mod info;
pub mod input;

pub use host::{PatternHost, ScriptHost};
pub use info::VideoInfo;
pub use input::{InputHandle, ScriptInput};
