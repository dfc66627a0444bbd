use crate::{PixelFormat, Rectangle, VncError};
use tokio::io::{AsyncRead, AsyncReadExt};

pub struct Decoder {
    bytes_per_pixel: usize,
}

impl Decoder {
    pub fn new(format: &PixelFormat) -> Self {
        Self {
            bytes_per_pixel: format.bytes_per_pixel(),
        }
    }

    pub async fn decode<S>(
        &self,
        left: u16,
        top: u16,
        width: u16,
        height: u16,
        input: &mut S,
    ) -> Result<Rectangle, VncError>
    where
        S: AsyncRead + Unpin,
    {
        // +----------------------------+--------------+-------------+
        // | No. of bytes               | Type [Value] | Description |
        // +----------------------------+--------------+-------------+
        // | width*height*bytesPerPixel | PIXEL array  | pixels      |
        // +----------------------------+--------------+-------------+
        let buffer_size = body_len(self.bytes_per_pixel, width, height).ok_or_else(|| {
            VncError::Protocol(format!("raw rectangle {width}x{height} is too large"))
        })?;
        let mut pixels = vec![0_u8; buffer_size];
        input.read_exact(&mut pixels).await?;
        Ok(Rectangle {
            left,
            top,
            width,
            height,
            pixels,
        })
    }
}

/// `None` when the body does not fit in memory on this target
fn body_len(bytes_per_pixel: usize, width: u16, height: u16) -> Option<usize> {
    bytes_per_pixel
        .checked_mul(width as usize)?
        .checked_mul(height as usize)
}
