//! Flowbridge core library — chat message model, Dialogflow NLU client, intent resolution
//! middleware, and action matching used by bot frameworks and the CLI.

pub mod config;
pub mod init;
pub mod matcher;
pub mod message;
pub mod middleware;
pub mod nlu;
pub mod session;

pub use matcher::{Anchored, Matcher, Target};
pub use message::{Fulfillment, Interpretation, Message};
pub use middleware::{Middleware, MiddlewareOptions};
pub use nlu::{ApiVersion, DialogflowClient, NluBackend, NluError, QueryRequest};
