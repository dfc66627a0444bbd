use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::*;

#[cfg(not(target_arch = "wasm32"))]
use tokio::spawn;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen_futures::spawn_local as spawn;

use super::auth::{read_reason, AuthHelper, AuthResult, SecurityType};
use super::lock::ExclusiveLock;
use super::messages::{ClientMsg, ServerInit};
use super::receiver;
use crate::{
    ConnectionConfig, ConnectionInfo, ConnectionState, EventHandler, PixelFormat, VncError,
    VncVersion,
};

pub(crate) type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
pub(crate) type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Bound a single read or write
pub(super) async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, VncError>
where
    F: Future<Output = Result<T, VncError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(VncError::Timeout(limit)),
    }
}

/// Everything that touches the wire, only reachable through the lock
struct Channel {
    /// Handed over to the receive loop by `start`
    reader: Option<BoxedReader>,
    writer: BoxedWriter,
    requires_password: bool,
}

struct Session {
    info: ConnectionInfo,
    pixel_format: PixelFormat,
}

pub(super) struct VncInner {
    channel: ExclusiveLock<Channel>,
    state: AtomicU8,
    closed: AtomicBool,
    /// Update requests sent but not yet answered
    pending_updates: AtomicUsize,
    last_pointer: Mutex<Option<Instant>>,
    session: OnceLock<Session>,
    receiver_stop: Mutex<Option<oneshot::Sender<()>>>,
    pub(super) handler: Arc<dyn EventHandler>,
    pub(super) config: ConnectionConfig,
}

impl VncInner {
    pub(super) fn state(&self) -> ConnectionState {
        self.state.load(Ordering::SeqCst).into()
    }

    fn set_state(&self, state: ConnectionState) {
        let old: ConnectionState = self.state.swap(state as u8, Ordering::SeqCst).into();
        if old != state {
            debug!("Connection state {:?} -> {:?}", old, state);
            self.handler.on_state_change(state);
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn stop_receiver(&self) {
        if let Some(stop) = self.receiver_stop.lock().take() {
            let _ = stop.send(());
        }
    }

    /// Tear the connection down after a failure, reporting only the first one
    pub(super) fn fail(&self, err: VncError) -> VncError {
        if self.closed.swap(true, Ordering::SeqCst) {
            trace!("Error after the connection closed: {}", err);
            return err;
        }
        error!("Connection failed: {}", err);
        self.stop_receiver();
        self.set_state(ConnectionState::Disconnected);
        self.handler.on_error(&err);
        err
    }

    fn check<T>(&self, result: Result<T, VncError>) -> Result<T, VncError> {
        result.map_err(|e| self.fail(e))
    }

    /// The receive loop finished one FramebufferUpdate
    pub(super) fn update_done(&self) {
        // servers may push updates nobody asked for
        let _ = self
            .pending_updates
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    fn connected_info(&self) -> Result<&ConnectionInfo, VncError> {
        if self.is_closed() || self.state() != ConnectionState::Connected {
            return Err(VncError::NotConnected);
        }
        self.session
            .get()
            .map(|session| &session.info)
            .ok_or(VncError::NotConnected)
    }

    async fn negotiate(&self, channel: &mut Channel) -> Result<bool, VncError> {
        let timeout = self.config.io_timeout;
        let Channel {
            reader,
            writer,
            requires_password,
        } = channel;
        let reader = reader.as_mut().ok_or(VncError::NotConnected)?;

        let version = with_timeout(timeout, VncVersion::read(reader)).await?;
        info!("Server rfb version: {}.{}", version.major, version.minor);
        with_timeout(timeout, VncVersion::RFB38.write(writer)).await?;

        let security = with_timeout(timeout, SecurityType::read(reader)).await?;
        trace!("Chosen security type: {:?}", security);
        with_timeout(timeout, security.write(writer)).await?;

        *requires_password = security.requires_password();
        Ok(*requires_password)
    }

    async fn authenticate(&self, channel: &mut Channel, credential: &[u8]) -> Result<(), VncError> {
        let timeout = self.config.io_timeout;
        let Channel { reader, writer, .. } = channel;
        let reader = reader.as_mut().ok_or(VncError::NotConnected)?;

        let auth = with_timeout(timeout, AuthHelper::read(reader, credential)).await?;
        with_timeout(timeout, auth.write(writer)).await?;
        match with_timeout(timeout, auth.finish(reader)).await? {
            AuthResult::Ok => {
                info!("auth done");
                Ok(())
            }
            AuthResult::Failed => {
                let reason = with_timeout(timeout, read_reason(reader))
                    .await
                    .unwrap_or_else(|_| "invalid password".to_string());
                Err(VncError::Authentication(reason))
            }
        }
    }

    async fn server_init(&self, channel: &mut Channel, shared: bool) -> Result<Session, VncError> {
        let timeout = self.config.io_timeout;
        let Channel { reader, writer, .. } = channel;
        let reader = reader.as_mut().ok_or(VncError::NotConnected)?;

        trace!("Send shared flag: {}", shared);
        with_timeout(timeout, ClientMsg::ClientInit(shared).write(writer)).await?;

        trace!("server init msg");
        let init = with_timeout(timeout, ServerInit::read(reader)).await?;
        let name = with_timeout(timeout, init.read_name(reader)).await?;
        trace!("Server pixel format {:?}", init.pixel_format);

        Ok(Session {
            info: ConnectionInfo {
                name,
                width: init.width,
                height: init.height,
            },
            pixel_format: init.pixel_format,
        })
    }
}

impl Drop for VncInner {
    fn drop(&mut self) {
        self.stop_receiver();
    }
}

/// A connection to a vnc server
///
/// Built by [crate::VncConnector]. The caller walks it through
/// `handshake`, `send_password` (when the handshake says so), `initialize`
/// and `start`; each step checks that the previous one happened.
///
/// Clones share the same connection. Operations that use the wire are
/// serialized, so input may be sent from several tasks while the receive
/// loop streams updates in.
///
/// Any failure closes the connection for good: the state drops to
/// [ConnectionState::Disconnected], the handler's `on_error` runs once and
/// later calls fail with [VncError::NotConnected].
///
#[derive(Clone)]
pub struct VncConnection {
    inner: Arc<VncInner>,
}

impl VncConnection {
    pub(super) fn from_inner(inner: Arc<VncInner>) -> Self {
        Self { inner }
    }

    pub(super) fn new(
        reader: BoxedReader,
        writer: BoxedWriter,
        handler: Arc<dyn EventHandler>,
        config: ConnectionConfig,
    ) -> Self {
        Self {
            inner: Arc::new(VncInner {
                channel: ExclusiveLock::new(Channel {
                    reader: Some(reader),
                    writer,
                    requires_password: false,
                }),
                state: AtomicU8::new(ConnectionState::Disconnected as u8),
                closed: AtomicBool::new(false),
                pending_updates: AtomicUsize::new(0),
                last_pointer: Mutex::new(None),
                session: OnceLock::new(),
                receiver_stop: Mutex::new(None),
                handler,
                config,
            }),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    /// Name and screen size, once `initialize` succeeded
    pub fn connection_info(&self) -> Option<ConnectionInfo> {
        self.inner.session.get().map(|session| session.info.clone())
    }

    /// The format of every rectangle's pixels, once `initialize` succeeded
    pub fn pixel_format(&self) -> Option<PixelFormat> {
        self.inner.session.get().map(|session| session.pixel_format)
    }

    /// Exchange versions and pick a security type
    ///
    /// Returns whether `send_password` has to be called before `initialize`
    ///
    pub async fn handshake(&self) -> Result<bool, VncError> {
        let inner = &self.inner;
        let mut channel = inner.channel.enter().await;
        if inner.is_closed() || inner.state() != ConnectionState::Disconnected {
            return Err(VncError::InvalidOperation(
                "handshake needs a fresh connection",
            ));
        }

        inner.set_state(ConnectionState::Handshaking);
        let result = inner.negotiate(&mut channel).await;
        inner.check(result)
    }

    /// Answer the server's challenge with a password
    ///
    /// Only the first 8 bytes of the password are significant
    ///
    pub async fn send_password(&self, password: &str) -> Result<(), VncError> {
        let inner = &self.inner;
        let mut channel = inner.channel.enter().await;
        if inner.is_closed()
            || inner.state() != ConnectionState::Handshaking
            || !channel.requires_password
        {
            return Err(VncError::InvalidOperation(
                "no password is expected at this point",
            ));
        }
        if password.is_empty() {
            return Err(VncError::InvalidArgument("password must not be empty"));
        }

        inner.set_state(ConnectionState::SendingPassword);
        let result = inner.authenticate(&mut channel, password.as_bytes()).await;
        inner.check(result)
    }

    /// Exchange the init messages, returns the desktop name
    ///
    /// `share_desktop` asks the server to keep other clients connected
    ///
    pub async fn initialize(&self, share_desktop: bool) -> Result<String, VncError> {
        let inner = &self.inner;
        let mut channel = inner.channel.enter().await;
        let expected = if channel.requires_password {
            ConnectionState::SendingPassword
        } else {
            ConnectionState::Handshaking
        };
        if inner.is_closed() || inner.state() != expected {
            return Err(VncError::InvalidOperation(
                "initialize must follow the handshake or the password",
            ));
        }

        inner.set_state(ConnectionState::Initializing);
        let result = inner.server_init(&mut channel, share_desktop).await;
        let session = inner.check(result)?;
        let info = session.info.clone();
        if inner.session.set(session).is_err() {
            return Err(inner.fail(VncError::InvalidOperation("already initialized")));
        }

        inner.set_state(ConnectionState::Connected);
        info!(
            "VNC Client {} connected, screen {}x{}",
            info.name, info.width, info.height
        );
        Ok(info.name)
    }

    /// Spawn the receive loop, returns as soon as it is scheduled
    ///
    pub async fn start(&self) -> Result<(), VncError> {
        let inner = &self.inner;
        let mut channel = inner.channel.enter().await;
        let pixel_format = match inner.session.get() {
            Some(session)
                if !inner.is_closed() && inner.state() == ConnectionState::Connected =>
            {
                session.pixel_format
            }
            _ => {
                return Err(VncError::InvalidOperation(
                    "start needs an initialized connection",
                ))
            }
        };
        let reader = channel
            .reader
            .take()
            .ok_or(VncError::InvalidOperation("already started"))?;

        // registered before the lock is released so `shutdown` always finds it
        let (stop_tx, stop_rx) = oneshot::channel();
        *inner.receiver_stop.lock() = Some(stop_tx);
        drop(channel);

        spawn(receiver::run(
            Arc::downgrade(inner),
            reader,
            pixel_format,
            inner.config.io_timeout,
            stop_rx,
        ));
        if let Some(period) = inner.config.update_interval {
            spawn(receiver::tick_updates(Arc::downgrade(inner), period));
        }
        info!("VNC Client starts");
        Ok(())
    }

    /// Ask for the whole screen
    ///
    /// `refresh` asks for every pixel, otherwise only for what changed.
    /// An incremental request is dropped while an earlier request is
    /// still unanswered
    ///
    pub async fn update(&self, refresh: bool) -> Result<(), VncError> {
        let inner = &self.inner;
        let mut channel = inner.channel.enter().await;
        let screen = inner.connected_info()?;
        if !refresh && inner.pending_updates.load(Ordering::SeqCst) > 0 {
            trace!("Update request still pending, skipped");
            return Ok(());
        }

        inner.pending_updates.fetch_add(1, Ordering::SeqCst);
        let msg = ClientMsg::FramebufferUpdateRequest {
            incremental: !refresh,
            width: screen.width,
            height: screen.height,
        };
        let result = with_timeout(inner.config.io_timeout, msg.write(&mut channel.writer)).await;
        inner.check(result)
    }

    /// Move the pointer and set the button mask
    ///
    /// Unless `high_priority`, a call closer than the configured pointer
    /// interval to the previous one is dropped. A sent event is followed
    /// by an incremental update request
    ///
    pub async fn set_pointer(
        &self,
        buttons: u8,
        x: u16,
        y: u16,
        high_priority: bool,
    ) -> Result<(), VncError> {
        let inner = &self.inner;
        {
            let mut channel = inner.channel.enter().await;
            inner.connected_info()?;
            // checked and stamped under the lock, queued callers see each other
            let now = Instant::now();
            {
                let mut last_pointer = inner.last_pointer.lock();
                if let Some(last) = *last_pointer {
                    if !high_priority
                        && now.saturating_duration_since(last) < inner.config.pointer_interval
                    {
                        trace!("Pointer event dropped");
                        return Ok(());
                    }
                }
                *last_pointer = Some(now);
            }
            let msg = ClientMsg::PointerEvent(x, y, buttons);
            let result =
                with_timeout(inner.config.io_timeout, msg.write(&mut channel.writer)).await;
            inner.check(result)?;
        }
        self.update(false).await
    }

    /// Press or release a key, `keysym` being an X11 keysym
    ///
    pub async fn send_key(
        &self,
        down: bool,
        keysym: u32,
        triggers_update: bool,
    ) -> Result<(), VncError> {
        let inner = &self.inner;
        {
            let mut channel = inner.channel.enter().await;
            inner.connected_info()?;
            let msg = ClientMsg::KeyEvent(keysym, down);
            let result =
                with_timeout(inner.config.io_timeout, msg.write(&mut channel.writer)).await;
            inner.check(result)?;
        }
        if triggers_update {
            self.update(false).await?;
        }
        Ok(())
    }

    /// Press and release a key, then ask for the result
    ///
    pub async fn send_key_press(&self, keysym: u32) -> Result<(), VncError> {
        self.send_key(true, keysym, false).await?;
        self.send_key(false, keysym, true).await
    }

    /// Close the connection, calling it again does nothing
    ///
    pub async fn shutdown(&self) {
        let inner = &self.inner;
        inner.stop_receiver();

        let mut channel = inner.channel.enter().await;
        if !inner.closed.swap(true, Ordering::SeqCst) {
            info!("VNC Client stops");
            channel.reader.take();
            let writer = &mut channel.writer;
            let result = with_timeout(inner.config.io_timeout, async {
                writer.shutdown().await?;
                Ok::<(), VncError>(())
            })
            .await;
            if let Err(e) = result {
                trace!("Ignored error while closing: {}", e);
            }
        }
        inner.set_state(ConnectionState::Disconnected);
    }
}
