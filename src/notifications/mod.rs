pub mod queue;
pub mod sender;
pub mod template;

pub use queue::{EmailQueue, OutboundEmail};
pub use sender::SmtpSender;
