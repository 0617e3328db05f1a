//! Tick/frame decoupling: smooth presentation of a fixed-step simulation at an arbitrary frame rate.
//!
//! [`Interpolator`] keeps short histories of every entity kind, blends them into live state right before
//! a frame is rendered and puts the authoritative values back right after. Live state is reached only
//! through the accessor traits in [`host`].

pub mod camera;
pub mod chain;
pub mod cli;
pub mod config;
pub mod generation;
pub mod host;
pub mod interpolator;
pub mod light;
pub mod math;
pub mod object;
pub mod particle;
pub mod profiler;
pub mod progress;
pub mod report;
pub mod sandbox;
pub mod trace;
pub mod view_model;

pub use config::InterpolationConfig;
pub use interpolator::{EntityInterpolator, FramePass, Interpolator};
pub use report::{BlendCounts, FrameReport};
