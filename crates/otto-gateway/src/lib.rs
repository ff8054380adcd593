//! External collaborator traits: agent session lifecycle and outbound
//! message transport, kept separate from `otto-storage` so the engine and
//! outbound crates can be tested against fakes without any I/O.

mod error;
mod session;
mod transport;

pub use error::{GatewayError, TransportError};
pub use session::{NoopSessionController, NoopSessionGateway, SessionController, SessionGateway};
pub use transport::{MessageTransport, NoopTransport};

#[cfg(feature = "test-support")]
pub use session::fake::{FakeSessionController, FakeSessionGateway};
#[cfg(feature = "test-support")]
pub use transport::fake::FakeMessageTransport;
