pub mod homeserver;
pub mod session;
pub mod store;
pub mod wire;

pub use homeserver::{Homeserver, HttpHomeserver};
pub use session::{MatrixSession, SessionSettings};
