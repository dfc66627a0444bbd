use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::VncError;

/// Lifecycle of a connection
///
/// Moves forward only, except that any state may fall back to `Disconnected`
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Handshaking = 1,
    SendingPassword = 2,
    Initializing = 3,
    Connected = 4,
}

impl From<u8> for ConnectionState {
    fn from(num: u8) -> Self {
        match num {
            1 => ConnectionState::Handshaking,
            2 => ConnectionState::SendingPassword,
            3 => ConnectionState::Initializing,
            4 => ConnectionState::Connected,
            _ => ConnectionState::Disconnected,
        }
    }
}

/// What the server told us about itself during initialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub name: String,
    pub width: u16,
    pub height: u16,
}

/// A block of raw pixels pushed by the server
///
/// `pixels` holds `width * height` pixels in the server's pixel format,
/// row by row
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rectangle {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    pub pixels: Vec<u8>,
}

/// Observer of a running connection
///
/// Callbacks run on the task that caused them, the receive loop for
/// rectangles and bells, so they should hand work off quickly
///
pub trait EventHandler: Send + Sync {
    fn on_rectangle(&self, _rect: Rectangle) {}

    fn on_state_change(&self, _state: ConnectionState) {}

    fn on_error(&self, _error: &VncError) {}

    fn on_bell(&self) {}
}

impl<H> EventHandler for std::sync::Arc<H>
where
    H: EventHandler + ?Sized,
{
    fn on_rectangle(&self, rect: Rectangle) {
        (**self).on_rectangle(rect)
    }

    fn on_state_change(&self, state: ConnectionState) {
        (**self).on_state_change(state)
    }

    fn on_error(&self, error: &VncError) {
        (**self).on_error(error)
    }

    fn on_bell(&self) {
        (**self).on_bell()
    }
}

/// Handler used when the caller does not register one
pub(crate) struct NoopHandler;

impl EventHandler for NoopHandler {}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VncEvent {
    Rectangle(Rectangle),
    StateChange(ConnectionState),
    Error(String),
    Bell,
}

/// An [EventHandler] that queues every callback as a [VncEvent]
///
/// ```no_run
/// use futures::StreamExt;
/// use vnc::{EventSender, VncConnector};
/// use tokio::net::TcpStream;
///
/// # async fn run() -> Result<(), vnc::VncError> {
/// let (sender, mut events) = EventSender::new();
/// let tcp = TcpStream::connect("127.0.0.1:5900").await?;
/// let vnc = VncConnector::new(tcp).set_event_handler(sender).build();
/// while let Some(event) = events.next().await {
///     println!("{:?}", event);
/// }
/// # Ok(())
/// # }
/// ```
///
#[derive(Debug, Clone)]
pub struct EventSender {
    output_ch: UnboundedSender<VncEvent>,
}

impl EventSender {
    pub fn new() -> (Self, EventStream) {
        let (output_ch, rx) = unbounded_channel();
        (
            Self { output_ch },
            EventStream {
                inner: UnboundedReceiverStream::new(rx),
            },
        )
    }

    fn send(&self, event: VncEvent) {
        // the consumer going away is not the connection's problem
        let _ = self.output_ch.send(event);
    }
}

impl EventHandler for EventSender {
    fn on_rectangle(&self, rect: Rectangle) {
        self.send(VncEvent::Rectangle(rect));
    }

    fn on_state_change(&self, state: ConnectionState) {
        self.send(VncEvent::StateChange(state));
    }

    fn on_error(&self, error: &VncError) {
        self.send(VncEvent::Error(error.to_string()));
    }

    fn on_bell(&self) {
        self.send(VncEvent::Bell);
    }
}

/// Receiving end of an [EventSender]
///
/// Ends once every clone of the sender, including the one held by the
/// connection, is dropped
///
#[derive(Debug)]
pub struct EventStream {
    inner: UnboundedReceiverStream<VncEvent>,
}

impl Stream for EventStream {
    type Item = VncEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl EventStream {
    /// Take an event if one is already queued
    pub fn poll_event(&mut self) -> Option<VncEvent> {
        AsMut::<UnboundedReceiver<VncEvent>>::as_mut(&mut self.inner)
            .try_recv()
            .ok()
    }
}
