//! Error kinds shared by every stage of route generation.

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no valid endpoint found after {attempts} attempts")]
    SamplingExhausted { attempts: u32 },

    #[error("routing service error: HTTP {status}")]
    RoutingService { status: u16 },

    #[error("routing service request failed: {0}")]
    RoutingTransport(String),

    #[error("routing service returned an unusable response: {0}")]
    RoutingResponse(String),

    #[error("no elevation data: {0}")]
    ElevationUnavailable(String),

    #[error("segment {index} has zero horizontal length")]
    DegenerateSegment { index: usize },

    #[error("invalid land boundary: {0}")]
    Boundary(String),

    #[error("failed to render artifact: {0}")]
    Render(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable machine-readable code for this error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "invalid_input",
            Error::SamplingExhausted { .. } => "sampling_exhausted",
            Error::RoutingService { .. } => "routing_service",
            Error::RoutingTransport(_) => "routing_transport",
            Error::RoutingResponse(_) => "routing_response",
            Error::ElevationUnavailable(_) => "elevation_unavailable",
            Error::DegenerateSegment { .. } => "degenerate_segment",
            Error::Boundary(_) => "boundary",
            Error::Render(_) => "render",
            Error::Io(_) => "io",
        }
    }

    /// True when the caller supplied bad parameters, as opposed to a collaborator failing.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Error::InvalidInput(_))
    }
}
