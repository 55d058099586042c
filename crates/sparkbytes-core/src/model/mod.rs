pub mod account;
pub mod event;
pub mod profile;
pub mod rsvp;
pub mod session;

pub use account::*;
pub use event::*;
pub use profile::*;
pub use rsvp::*;
pub use session::*;
