pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use config::{Config, Surface};
pub use error::{FeedError, Result};
pub use services::{
    FeedState, FeedSurface, PlaybackCoordinator, RotationContext, RotationSampler, Scorer,
    ViewIngestCoordinator, ViewSession,
};
