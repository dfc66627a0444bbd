use std::sync::Weak;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;
use tracing::*;

use super::connection::{with_timeout, BoxedReader, VncConnection, VncInner};
use super::messages::{ImageRect, ServerMsg};
use crate::{codec, ConnectionState, PixelFormat, VncEncoding, VncError};

/// Read server messages until the stream fails or `stop` fires
///
/// Only a weak reference to the connection is kept, dropping every
/// [VncConnection] ends the loop as well
///
pub(super) async fn run(
    conn: Weak<VncInner>,
    mut reader: BoxedReader,
    pf: PixelFormat,
    io_timeout: Duration,
    mut stop: oneshot::Receiver<()>,
) {
    trace!("Receive loop starts");
    let result = tokio::select! {
        biased;
        _ = &mut stop => Ok(()),
        result = read_loop(&conn, &mut reader, &pf, io_timeout) => result,
    };
    if let Err(e) = result {
        if let Some(inner) = conn.upgrade() {
            inner.fail(e);
        }
    }
    trace!("Receive loop stops");
}

async fn read_loop(
    conn: &Weak<VncInner>,
    reader: &mut BoxedReader,
    pf: &PixelFormat,
    io_timeout: Duration,
) -> Result<(), VncError> {
    let raw_decoder = codec::RawDecoder::new(pf);

    loop {
        // a quiet server is fine, only the message body is time bound
        let message_type = ServerMsg::read_type(reader).await?;
        let server_msg = with_timeout(io_timeout, ServerMsg::read_body(message_type, reader)).await?;
        trace!("Server message got: {:?}", server_msg);

        let Some(inner) = conn.upgrade() else {
            return Ok(());
        };
        match server_msg {
            ServerMsg::FramebufferUpdate(rect_num) => {
                for _ in 0..rect_num {
                    let rect = with_timeout(io_timeout, ImageRect::read(reader)).await?;
                    match rect.encoding()? {
                        VncEncoding::Raw => {
                            let decoded = with_timeout(
                                io_timeout,
                                raw_decoder.decode(rect.x, rect.y, rect.width, rect.height, reader),
                            )
                            .await?;
                            inner.handler.on_rectangle(decoded);
                        }
                    }
                }
                inner.update_done();
            }
            ServerMsg::Bell => inner.handler.on_bell(),
        }
    }
}

/// Keep incremental updates flowing while the connection is up
pub(super) async fn tick_updates(conn: Weak<VncInner>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let Some(inner) = conn.upgrade() else {
            break;
        };
        if inner.state() != ConnectionState::Connected {
            break;
        }
        if let Err(e) = VncConnection::from_inner(inner).update(false).await {
            debug!("Update ticker stops: {}", e);
            break;
        }
    }
}

