use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};

#[cfg(not(target_arch = "wasm32"))]
use tokio::net::{TcpStream, ToSocketAddrs};

use super::connection::{BoxedReader, BoxedWriter, VncConnection};
use crate::event::NoopHandler;
use crate::{ConnectionConfig, EventHandler};
#[cfg(not(target_arch = "wasm32"))]
use crate::VncError;

/// Connection Builder to setup a vnc client
pub struct VncConnector {
    reader: BoxedReader,
    writer: BoxedWriter,
    handler: Arc<dyn EventHandler>,
    config: ConnectionConfig,
}

impl VncConnector {
    /// To new a vnc client configuration with stream `S`
    ///
    /// `S` should implement async I/O methods
    ///
    /// ```no_run
    /// use vnc::VncConnector;
    /// use tokio::{self, net::TcpStream};
    /// use anyhow::Result;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<()> {
    ///     let tcp = TcpStream::connect("127.0.0.1:5900").await?;
    ///     let vnc = VncConnector::new(tcp).build();
    ///     if vnc.handshake().await? {
    ///         vnc.send_password("password").await?;
    ///     }
    ///     let name = vnc.initialize(true).await?;
    ///     println!("connected to {name}");
    ///     vnc.start().await?;
    ///     vnc.update(true).await?;
    ///     Ok(())
    /// }
    /// ```
    ///
    pub fn new<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        Self::from_halves(reader, writer)
    }

    /// For transports that come as two separate directions
    ///
    pub fn from_halves<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
            handler: Arc::new(NoopHandler),
            config: ConnectionConfig::default(),
        }
    }

    /// Open a TCP connection to the server
    ///
    #[cfg(not(target_arch = "wasm32"))]
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, VncError> {
        let tcp = TcpStream::connect(addr).await?;
        // input events are tiny and latency sensitive
        tcp.set_nodelay(true)?;
        Ok(Self::new(tcp))
    }

    /// The observer that gets rectangles, bells, state changes and errors
    ///
    /// Events are dropped if none is set
    ///
    pub fn set_event_handler<H>(mut self, handler: H) -> Self
    where
        H: EventHandler + 'static,
    {
        self.handler = Arc::new(handler);
        self
    }

    pub fn set_config(mut self, config: ConnectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Deadline of every read and write done for a caller
    ///
    /// 5 minutes if not set
    ///
    pub fn set_io_timeout(mut self, timeout: Duration) -> Self {
        self.config.io_timeout = timeout;
        self
    }

    /// Minimal gap between two low priority pointer events
    ///
    /// 50 milliseconds if not set
    ///
    pub fn set_pointer_interval(mut self, interval: Duration) -> Self {
        self.config.pointer_interval = interval;
        self
    }

    /// Request an incremental update every `interval` once started
    ///
    /// Off if not set, the caller drives updates itself then
    ///
    pub fn set_update_interval(mut self, interval: Duration) -> Self {
        self.config.update_interval = Some(interval);
        self
    }

    /// Complete the client configuration
    ///
    pub fn build(self) -> VncConnection {
        VncConnection::new(self.reader, self.writer, self.handler, self.config)
    }
}
