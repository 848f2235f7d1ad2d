pub mod config;
pub mod context;
pub mod error;
pub mod fallback;
pub mod http;
pub mod normalize;
pub mod pipeline;
pub mod prompts;
pub mod registry;
pub mod responders;
pub mod router;

pub use context::{Intent, Request, Role, SessionContext};
pub use error::{AdvisorError, Result};
pub use pipeline::{AdvisorPipeline, NormalizedResult};
