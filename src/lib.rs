pub mod types;
pub mod geometry;
pub mod topology;
pub mod neighbor;
pub mod error_model;
pub mod channel;
pub mod scheduler;
pub mod ftm;
pub mod trace;
pub mod orchestrator;
pub mod utils;

pub use error_model::{select_error_model, ChannelBandwidth, ErrorMap, ErrorModelBinding};
pub use geometry::{place, Layout};
pub use neighbor::{build_and_install, NeighborTable};
pub use orchestrator::{
    run_experiment, Experiment, ExperimentConfig, ExperimentError, ExperimentReport, SessionHandle, StartMode,
};
