pub mod error;
pub mod event;
pub mod message;
pub mod question;
pub mod route;
pub mod sink;
pub mod state;

pub use error::{CoreError, Result};
pub use event::ChatEvent;
pub use message::{Message, Metadata, Role};
pub use question::{Hint, Question, QuestionSource};
pub use route::{AgentName, RouteDecision, RouteSource, RouteTarget};
pub use sink::{MessageSink, NullSink, SqliteSink};
pub use state::{AgentReply, SessionId, TurnState, UserProfile};
