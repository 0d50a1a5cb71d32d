pub mod client;
pub mod types;

pub use client::{ApiError, BackendClient};
pub use types::{
    ChartType, ChatOutcome, ChatRequest, ImageSource, PlotOutcome, PlotRequest, PlotSpec,
    UploadOutcome,
};
