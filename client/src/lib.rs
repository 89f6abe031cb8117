//! Client-side synchronization for server-authoritative lobbies.
//!
//! The library keeps a local mirror of a remote lobby fresh over two
//! channels: a low-latency WebSocket push feed ([`transport::PushChannel`])
//! and a fixed-cadence HTTP poller owned by [`sync::LobbySync`]. Both feed
//! the same last-write-wins reducer, so the channels may race freely —
//! snapshots replace local state wholesale and the backend remains the
//! single source of truth.
//!
//! ERROR HANDLING
//! ==============
//! Nothing escapes the sync boundary as a panic or error: transport failures
//! drive [`transport::ConnectionState`], action failures land in a single
//! readable error slot on [`sync::LobbySync`], and malformed push messages
//! are logged and dropped.

pub mod api;
pub mod error;
pub mod reducer;
pub mod search;
pub mod sync;
pub mod task;
pub mod transport;
pub mod view;

pub use lobby_protocol as protocol;

pub use api::{CreateLobbyRequest, HttpLobbyApi, LobbyApi, LobbyStats};
pub use error::ClientError;
pub use search::{GlobalSearch, HttpSearchApi, SearchApi, SearchHit, SearchResults};
pub use sync::{LobbySync, LobbySyncConfig};
pub use transport::{ConnectionState, PushChannel, PushChannelConfig, ReconnectPolicy};
pub use view::LobbyView;
