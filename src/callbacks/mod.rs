//! Subscriber notification for finalized jobs

mod dispatcher;
mod sender;

pub use dispatcher::{CallbackDispatcher, DispatchReport};
pub use sender::{CallbackSender, HttpCallbackSender};
