//! Front ends and the question/answer rendezvous they share.

pub mod awaiter;
pub mod chat;
pub mod cli;
pub mod front_end;
pub mod interaction;

pub use awaiter::{Answer, Awaiter};
pub use chat::{ChatFrontEnd, InboundStream, inbound_channel, spawn_inbound};
pub use cli::ConsoleFrontEnd;
pub use front_end::{FrontEnd, FrontEndExt, QUIT_QUESTION};
pub use interaction::{Interaction, InteractionState, Received};
