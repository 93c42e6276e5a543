//! cursor_sync - client-side state sync for shared live cursors
//!
//! Maintains a live, eventually-consistent view of remote participants'
//! cursor positions over a single persistent WebSocket. One tokio task owns
//! the connection and the peer map; callers hold a cloneable [`CursorClient`]
//! handle and watch [`SyncView`] snapshots.
//!
//! # Example
//!
//! ```no_run
//! use cursor_sync::{CursorClient, SyncConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = CursorClient::spawn(SyncConfig::new("cursors.example.com:8787", "my-id"));
//!     let mut view = client.view();
//!
//!     // feed pointer samples as fast as they arrive; the throttle bounds
//!     // what actually goes out on the wire
//!     client.send_position(0.25, 0.75).await.unwrap();
//!
//!     while view.changed().await.is_ok() {
//!         let snapshot = view.borrow().clone();
//!         println!("{} peers connected", snapshot.peers.len());
//!     }
//! }
//! ```

mod config;
mod connection;
mod error;
pub mod protocol;
mod pulse;
mod store;
mod throttle;

pub use config::{SyncConfig, load_config};
pub use connection::{ConnState, CursorClient, SyncView};
pub use error::{ClientError, ProtocolError};
pub use protocol::{PeerSession, UNKNOWN_POSITION, WireMessage};
pub use pulse::ActivityPulse;
pub use store::SessionStore;
pub use throttle::OutboundThrottle;
