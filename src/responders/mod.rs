pub mod chat_completion;
pub mod traits;

pub use chat_completion::ChatCompletionResponder;
pub use traits::{RawOutput, Responder, ResponderFailure};
