use crate::{error::VncError, PixelFormat, VncEncoding};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub(super) enum ClientMsg {
    ClientInit(bool),
    FramebufferUpdateRequest {
        incremental: bool,
        width: u16,
        height: u16,
    },
    KeyEvent(u32, bool),
    PointerEvent(u16, u16, u8),
}

impl ClientMsg {
    pub(super) fn to_bytes(&self) -> Vec<u8> {
        match *self {
            ClientMsg::ClientInit(shared) => {
                // +--------------+--------------+-------------+
                // | No. of bytes | Type [Value] | Description |
                // +--------------+--------------+-------------+
                // | 1            | U8           | shared-flag |
                // +--------------+--------------+-------------+
                vec![shared as u8]
            }
            ClientMsg::FramebufferUpdateRequest {
                incremental,
                width,
                height,
            } => {
                // +--------------+--------------+--------------+
                // | No. of bytes | Type [Value] | Description  |
                // +--------------+--------------+--------------+
                // | 1            | U8 [3]       | message-type |
                // | 1            | U8           | incremental  |
                // | 2            | U16          | x-position   |
                // | 2            | U16          | y-position   |
                // | 2            | U16          | width        |
                // | 2            | U16          | height       |
                // +--------------+--------------+--------------+
                // always the whole screen
                let mut payload = vec![3, incremental as u8, 0, 0, 0, 0];
                payload.extend_from_slice(&width.to_be_bytes());
                payload.extend_from_slice(&height.to_be_bytes());
                payload
            }
            ClientMsg::KeyEvent(keycode, down) => {
                // +--------------+--------------+--------------+
                // | No. of bytes | Type [Value] | Description  |
                // +--------------+--------------+--------------+
                // | 1            | U8 [4]       | message-type |
                // | 1            | U8           | down-flag    |
                // | 2            |              | padding      |
                // | 4            | U32          | key          |
                // +--------------+--------------+--------------+
                let mut payload = vec![4, down as u8, 0, 0];
                payload.extend_from_slice(&keycode.to_be_bytes());
                payload
            }
            ClientMsg::PointerEvent(x, y, mask) => {
                // +--------------+--------------+--------------+
                // | No. of bytes | Type [Value] | Description  |
                // +--------------+--------------+--------------+
                // | 1            | U8 [5]       | message-type |
                // | 1            | U8           | button-mask  |
                // | 2            | U16          | x-position   |
                // | 2            | U16          | y-position   |
                // +--------------+--------------+--------------+
                let mut payload = vec![5, mask];
                payload.extend_from_slice(&x.to_be_bytes());
                payload.extend_from_slice(&y.to_be_bytes());
                payload
            }
        }
    }

    pub(super) async fn write<S>(self, writer: &mut S) -> Result<(), VncError>
    where
        S: AsyncWrite + Unpin,
    {
        writer.write_all(&self.to_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct ServerInit {
    pub(super) width: u16,
    pub(super) height: u16,
    pub(super) pixel_format: PixelFormat,
    pub(super) name_len: u32,
}

impl ServerInit {
    const HEADER_LEN: usize = 24;

    fn parse(buf: [u8; Self::HEADER_LEN]) -> Result<Self, VncError> {
        // +--------------+--------------+------------------------------+
        // | No. of bytes | Type [Value] | Description                  |
        // +--------------+--------------+------------------------------+
        // | 2            | U16          | framebuffer-width in pixels  |
        // | 2            | U16          | framebuffer-height in pixels |
        // | 16           | PIXEL_FORMAT | server-pixel-format          |
        // | 4            | U32          | name-length                  |
        // | name-length  | U8 array     | name-string                  |
        // +--------------+--------------+------------------------------+
        let mut pf = [0_u8; 16];
        pf.copy_from_slice(&buf[4..20]);
        Ok(Self {
            width: u16::from_be_bytes([buf[0], buf[1]]),
            height: u16::from_be_bytes([buf[2], buf[3]]),
            pixel_format: pf.try_into()?,
            name_len: u32::from_be_bytes([buf[20], buf[21], buf[22], buf[23]]),
        })
    }

    /// Reads the fixed header, the name follows it on the wire
    pub(super) async fn read<S>(reader: &mut S) -> Result<Self, VncError>
    where
        S: AsyncRead + Unpin,
    {
        let mut buf = [0_u8; Self::HEADER_LEN];
        reader.read_exact(&mut buf).await?;
        Self::parse(buf)
    }

    pub(super) async fn read_name<S>(&self, reader: &mut S) -> Result<String, VncError>
    where
        S: AsyncRead + Unpin,
    {
        // grows with what actually arrives, not with what the header claims
        let mut name_buf = Vec::new();
        reader
            .take(self.name_len as u64)
            .read_to_end(&mut name_buf)
            .await?;
        if name_buf.len() != self.name_len as usize {
            return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
        }
        Ok(String::from_utf8_lossy(&name_buf).into_owned())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(super) enum ServerMsg {
    FramebufferUpdate(u16),
    Bell,
}

impl ServerMsg {
    /// The message type byte, the only read done without a deadline
    pub(super) async fn read_type<S>(reader: &mut S) -> Result<u8, VncError>
    where
        S: AsyncRead + Unpin,
    {
        Ok(reader.read_u8().await?)
    }

    pub(super) async fn read_body<S>(message_type: u8, reader: &mut S) -> Result<Self, VncError>
    where
        S: AsyncRead + Unpin,
    {
        match message_type {
            0 => {
                // FramebufferUpdate
                //   +--------------+--------------+----------------------+
                //   | No. of bytes | Type [Value] | Description          |
                //   +--------------+--------------+----------------------+
                //   | 1            | U8 [0]       | message-type         |
                //   | 1            |              | padding              |
                //   | 2            | U16          | number-of-rectangles |
                //   +--------------+--------------+----------------------+
                let _padding = reader.read_u8().await?;
                let rects = reader.read_u16().await?;
                Ok(ServerMsg::FramebufferUpdate(rects))
            }
            2 => {
                // Bell
                //   +--------------+--------------+--------------+
                //   | No. of bytes | Type [Value] | Description  |
                //   +--------------+--------------+--------------+
                //   | 1            | U8 [2]       | message-type |
                //   +--------------+--------------+--------------+
                Ok(ServerMsg::Bell)
            }
            // SetColourMapEntries (1) needs a colour map and ServerCutText (3)
            // a clipboard, neither of which this client keeps
            other => Err(VncError::UnsupportedMessage(other)),
        }
    }
}

/// Header in front of every rectangle of a FramebufferUpdate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct ImageRect {
    pub(super) x: u16,
    pub(super) y: u16,
    pub(super) width: u16,
    pub(super) height: u16,
    pub(super) encoding: u32,
}

impl From<[u8; 12]> for ImageRect {
    fn from(buf: [u8; 12]) -> Self {
        // +--------------+--------------+---------------+
        // | No. of bytes | Type [Value] | Description   |
        // +--------------+--------------+---------------+
        // | 2            | U16          | x-position    |
        // | 2            | U16          | y-position    |
        // | 2            | U16          | width         |
        // | 2            | U16          | height        |
        // | 4            | S32          | encoding-type |
        // +--------------+--------------+---------------+
        Self {
            x: u16::from_be_bytes([buf[0], buf[1]]),
            y: u16::from_be_bytes([buf[2], buf[3]]),
            width: u16::from_be_bytes([buf[4], buf[5]]),
            height: u16::from_be_bytes([buf[6], buf[7]]),
            encoding: u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]),
        }
    }
}

impl ImageRect {
    pub(super) async fn read<S>(reader: &mut S) -> Result<Self, VncError>
    where
        S: AsyncRead + Unpin,
    {
        let mut rect_buf = [0_u8; 12];
        reader.read_exact(&mut rect_buf).await?;
        Ok(rect_buf.into())
    }

    pub(super) fn encoding(&self) -> Result<VncEncoding, VncError> {
        self.encoding.try_into()
    }
}
