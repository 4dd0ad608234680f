// Application layer - Use case interactors

pub mod container;
pub mod encode_interactor;

// Re-export interactors
pub use container::{AppContainer, DefaultAppContainer};
pub use encode_interactor::{
    EncodeOrchestrator, EncodeRequest, JobReport, OrchestratorOptions, PublishedOutput, Submission,
};
