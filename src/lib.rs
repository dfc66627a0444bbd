//! # rfb-engine
//!
//! An async client side engine for the RFB (VNC) protocol, version 3.8.
//!
//! It drives the handshake, no-auth or VNC password authentication and the
//! init exchange over any tokio byte stream, then keeps a receive loop
//! running that hands every raw-encoded rectangle to an [EventHandler].
//! Input and update requests may be sent from any task at the same time.
//!
//! ```no_run
//! use futures::StreamExt;
//! use vnc::{EventSender, VncConnector, VncEvent};
//!
//! # async fn run() -> Result<(), vnc::VncError> {
//! let (sender, mut events) = EventSender::new();
//! let vnc = VncConnector::connect("127.0.0.1:5900")
//!     .await?
//!     .set_event_handler(sender)
//!     .build();
//!
//! if vnc.handshake().await? {
//!     vnc.send_password("123").await?;
//! }
//! vnc.initialize(true).await?;
//! vnc.start().await?;
//! vnc.update(true).await?;
//!
//! while let Some(event) = events.next().await {
//!     if let VncEvent::Rectangle(rect) = event {
//!         println!("{}x{} at {},{}", rect.width, rect.height, rect.left, rect.top);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
mod codec;
pub mod config;
pub mod error;
pub mod event;
pub mod keysym;

pub use client::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use keysym::*;
