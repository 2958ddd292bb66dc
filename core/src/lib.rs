mod binning;
mod bins;
mod config;
pub mod constants;
mod controller;
pub mod generators;
mod layout;
pub mod render;
mod runner;
mod scheduler;
mod simulation;
mod stacks;
pub mod stats;
mod time;

pub use binning::{
    BinContext, BinRange, Binner, BinnerFn, ExternalBinner, LinearBinner, LogBinner,
    ScaleAwareBinner, linear_bin,
};
pub use bins::BinBuffer;
pub use config::{ConfigOverrides, SimulationConfig};
pub use controller::{ControllerHooks, LoopControl, SimulationController};
pub use generators::{Preset, VisualKind};
pub use layout::{BinLayout, LayoutFn, LayoutStrategy, StandardLayout, bin_positions, make_layout};
pub use runner::{
    FrameReport, RunnerPhase, RunnerSnapshot, RunnerState, SampleGenerator, SimulationRunner,
    WeakRunner,
};
pub use scheduler::{FrameCallback, FrameSlot, ManualScheduler, ScheduleToken, Scheduler};
pub use simulation::{
    RangeFn, SampleContext, SampleHook, SampleObserver, SimulationBuilder, SimulationParams,
    StandardSimulation,
};
pub use stacks::StackTransform;
pub use time::FrameClock;
