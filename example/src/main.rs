use std::time::Duration;

use anyhow::{bail, Context, Result};
use futures::StreamExt;
use tracing::Level;
use vnc::{
    keysym_for_char, ConnectionState, EventSender, PixelFormat, Rectangle, VncConnection,
    VncConnector, VncEvent,
};

/// Off-screen copy of the remote desktop
struct Canvas {
    frame: Vec<u8>,
    width: usize,
    height: usize,
    bytes_per_pixel: usize,
    dirty: bool,
}

impl Canvas {
    fn new(width: u16, height: u16, pf: &PixelFormat) -> Self {
        let bytes_per_pixel = pf.bytes_per_pixel();
        Self {
            frame: vec![0; width as usize * height as usize * bytes_per_pixel],
            width: width as usize,
            height: height as usize,
            bytes_per_pixel,
            dirty: false,
        }
    }

    fn draw(&mut self, rect: Rectangle) -> Result<()> {
        let (left, top) = (rect.left as usize, rect.top as usize);
        let (width, height) = (rect.width as usize, rect.height as usize);
        if left + width > self.width || top + height > self.height {
            bail!("Rectangle {}x{} at {},{} is off screen", width, height, left, top);
        }

        let row_len = width * self.bytes_per_pixel;
        if row_len == 0 || height == 0 {
            return Ok(());
        }
        if rect.pixels.len() != row_len * height {
            bail!(
                "Rectangle body of {} bytes, expected {}",
                rect.pixels.len(),
                row_len * height
            );
        }
        for (y, row) in rect.pixels.chunks_exact(row_len).enumerate() {
            let start = ((top + y) * self.width + left) * self.bytes_per_pixel;
            self.frame[start..start + row_len].copy_from_slice(row);
        }
        self.dirty = true;
        Ok(())
    }

    fn flush(&mut self) {
        if self.dirty {
            // a real viewer would blit the frame here
            tracing::debug!("Frame of {} bytes ready", self.frame.len());
            self.dirty = false;
        }
    }
}

/// Returns false once the connection is gone
fn handle_vnc_event(canvas: &mut Canvas, event: VncEvent) -> Result<bool> {
    match event {
        VncEvent::Rectangle(rect) => canvas.draw(rect)?,
        VncEvent::Bell => tracing::warn!("Bell event got, but ignore it"),
        VncEvent::StateChange(ConnectionState::Disconnected) => return Ok(false),
        VncEvent::Error(e) => tracing::error!("{}", e),
        e => tracing::debug!("{:?}", e),
    }
    Ok(true)
}

async fn type_text(vnc: &VncConnection, text: &str) -> Result<()> {
    for c in text.chars() {
        match keysym_for_char(c) {
            Some(keysym) => vnc.send_key_press(keysym).await?,
            None => tracing::warn!("No keysym for {:?}", c),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Create tracing subscriber
    #[cfg(debug_assertions)]
    let subscriber = tracing_subscriber::fmt()
        .pretty()
        .with_max_level(Level::TRACE)
        .finish();
    #[cfg(not(debug_assertions))]
    let subscriber = tracing_subscriber::fmt()
        .pretty()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:5900".to_string());
    let (sender, mut events) = EventSender::new();
    let vnc = VncConnector::connect(addr.as_str())
        .await
        .with_context(|| format!("Unable to reach {addr}"))?
        .set_event_handler(sender)
        .set_update_interval(Duration::from_millis(100))
        .build();

    if vnc.handshake().await? {
        let password =
            std::env::var("VNC_PASSWORD").context("Server wants a password, set VNC_PASSWORD")?;
        vnc.send_password(&password).await?;
    }
    let name = vnc.initialize(true).await?;
    let (info, pf) = match (vnc.connection_info(), vnc.pixel_format()) {
        (Some(info), Some(pf)) => (info, pf),
        _ => bail!("Connection has no screen after initialization"),
    };
    tracing::info!("Connected to {}, {}x{}, {:?}", name, info.width, info.height, pf);

    let mut canvas = Canvas::new(info.width, info.height, &pf);
    vnc.start().await?;
    vnc.update(true).await?;

    if let Ok(text) = std::env::var("VNC_TYPE") {
        type_text(&vnc, &text).await?;
    }

    let mut redraw = tokio::time::interval(Duration::from_micros(16600));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = redraw.tick() => canvas.flush(),
            event = events.next() => match event {
                Some(event) => {
                    if !handle_vnc_event(&mut canvas, event)? {
                        // the error that closed the connection is queued right behind
                        while let Some(event) = events.poll_event() {
                            handle_vnc_event(&mut canvas, event)?;
                        }
                        break;
                    }
                }
                None => break,
            },
        }
    }

    vnc.shutdown().await;
    Ok(())
}
