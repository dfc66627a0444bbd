use crate::VncError;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// All supported vnc encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum VncEncoding {
    Raw = 0,
}

impl TryFrom<u32> for VncEncoding {
    type Error = VncError;

    fn try_from(num: u32) -> Result<Self, Self::Error> {
        match num {
            0 => Ok(VncEncoding::Raw),
            other => Err(VncError::UnsupportedEncoding(other)),
        }
    }
}

impl From<VncEncoding> for u32 {
    fn from(e: VncEncoding) -> Self {
        e as u32
    }
}

/// A protocol version as announced in the 12 byte `"RFB xxx.yyy\n"` line
///
/// Versions order by major first, then minor
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct VncVersion {
    pub major: u16,
    pub minor: u16,
}

const VERSION_PREFIX: &[u8; 4] = b"RFB ";

impl VncVersion {
    /// The only version this client speaks, and the lowest one it accepts
    pub const RFB38: VncVersion = VncVersion { major: 3, minor: 8 };

    pub fn parse(line: &[u8; 12]) -> Result<Self, VncError> {
        if &line[..4] != VERSION_PREFIX {
            return Err(VncError::Protocol(format!(
                "expecting \"RFB \", got {:?}",
                String::from_utf8_lossy(&line[..4])
            )));
        }
        let number = |digits: &[u8]| -> Option<u16> {
            if !digits.iter().all(u8::is_ascii_digit) {
                return None;
            }
            std::str::from_utf8(digits).ok()?.parse().ok()
        };
        let (major, minor) = match (number(&line[4..7]), number(&line[8..11])) {
            (Some(major), Some(minor)) if line[7] == b'.' && line[11] == b'\n' => {
                (major, minor)
            }
            _ => {
                return Err(VncError::Protocol(format!(
                    "cannot parse protocol version {:?}",
                    String::from_utf8_lossy(line)
                )))
            }
        };
        let version = VncVersion { major, minor };
        if version < Self::RFB38 {
            return Err(VncError::Protocol(format!(
                "server protocol version {major}.{minor} is not supported"
            )));
        }
        Ok(version)
    }

    pub fn to_bytes(self) -> [u8; 12] {
        let mut line = [0_u8; 12];
        // three digits each, whatever the numbers
        let text = format!(
            "RFB {:03}.{:03}\n",
            self.major.min(999),
            self.minor.min(999)
        );
        line.copy_from_slice(text.as_bytes());
        line
    }

    pub(crate) async fn read<S>(reader: &mut S) -> Result<Self, VncError>
    where
        S: AsyncRead + Unpin,
    {
        let mut buffer = [0_u8; 12];
        reader.read_exact(&mut buffer).await?;
        Self::parse(&buffer)
    }

    pub(crate) async fn write<S>(self, writer: &mut S) -> Result<(), VncError>
    where
        S: AsyncWrite + Unpin,
    {
        writer.write_all(&self.to_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }
}

///  Pixel Format Data Structure according to [RFC6143](https://www.rfc-editor.org/rfc/rfc6143.html#section-7.4)
///
/// ```text
/// +--------------+--------------+-----------------+
/// | No. of bytes | Type [Value] | Description     |
/// +--------------+--------------+-----------------+
/// | 1            | U8           | bits-per-pixel  |
/// | 1            | U8           | depth           |
/// | 1            | U8           | big-endian-flag |
/// | 1            | U8           | true-color-flag |
/// | 2            | U16          | red-max         |
/// | 2            | U16          | green-max       |
/// | 2            | U16          | blue-max        |
/// | 1            | U8           | red-shift       |
/// | 1            | U8           | green-shift     |
/// | 1            | U8           | blue-shift      |
/// | 3            |              | padding         |
/// +--------------+--------------+-----------------+
/// ```
///
/// The client always keeps the format the server announced,
/// pixel bytes are handed out exactly as they came off the wire
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelFormat {
    /// the number of bits used for each pixel value on the wire
    ///
    /// 8, 16, 32 only
    ///
    pub bits_per_pixel: u8,
    /// Although the depth should
    ///
    /// be consistent with the bits-per-pixel and the various -max values,
    ///
    /// clients do not use it when interpreting pixel data.
    ///
    pub depth: u8,
    /// true if multi-byte pixels are interpreted as big endian
    ///
    pub big_endian: bool,
    /// true then the last six items specify how to extract the red, green and blue intensities from the pixel value
    ///
    pub true_color: bool,
    /// the next three always in big-endian order
    /// no matter how `big_endian` is set
    ///
    pub red_max: u16,
    pub green_max: u16,
    pub blue_max: u16,
    /// the number of shifts needed to get the red value in a pixel to the least significant bit
    ///
    pub red_shift: u8,
    pub green_shift: u8,
    pub blue_shift: u8,
}

impl From<PixelFormat> for [u8; 16] {
    fn from(pf: PixelFormat) -> [u8; 16] {
        let red_max = pf.red_max.to_be_bytes();
        let green_max = pf.green_max.to_be_bytes();
        let blue_max = pf.blue_max.to_be_bytes();
        [
            pf.bits_per_pixel,
            pf.depth,
            pf.big_endian as u8,
            pf.true_color as u8,
            red_max[0],
            red_max[1],
            green_max[0],
            green_max[1],
            blue_max[0],
            blue_max[1],
            pf.red_shift,
            pf.green_shift,
            pf.blue_shift,
            0,
            0,
            0,
        ]
    }
}

impl TryFrom<[u8; 16]> for PixelFormat {
    type Error = VncError;

    fn try_from(pf: [u8; 16]) -> Result<Self, Self::Error> {
        let bits_per_pixel = pf[0];
        if bits_per_pixel != 8 && bits_per_pixel != 16 && bits_per_pixel != 32 {
            return Err(VncError::WrongPixelFormat(bits_per_pixel));
        }
        Ok(PixelFormat {
            bits_per_pixel,
            depth: pf[1],
            big_endian: pf[2] != 0,
            true_color: pf[3] != 0,
            red_max: u16::from_be_bytes([pf[4], pf[5]]),
            green_max: u16::from_be_bytes([pf[6], pf[7]]),
            blue_max: u16::from_be_bytes([pf[8], pf[9]]),
            red_shift: pf[10],
            green_shift: pf[11],
            blue_shift: pf[12],
        })
    }
}

impl Default for PixelFormat {
    // (a << 24 | r << 16 || g << 8 | b) in le
    // which is [b, g, r, a] in network
    fn default() -> Self {
        Self {
            bits_per_pixel: 32,
            depth: 24,
            big_endian: false,
            true_color: true,
            red_max: 255,
            green_max: 255,
            blue_max: 255,
            red_shift: 16,
            green_shift: 8,
            blue_shift: 0,
        }
    }
}

impl PixelFormat {
    /// Byte stride of one pixel in a raw rectangle body
    pub fn bytes_per_pixel(&self) -> usize {
        self.bits_per_pixel as usize / 8
    }
}

/// Runtime knobs of a connection
///
/// Set through [crate::VncConnector], or pass a whole value to
/// [crate::VncConnector::set_config]
///
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Upper bound of every single read or write done on behalf of a caller
    ///
    pub io_timeout: Duration,
    /// Low priority pointer events closer together than this are dropped
    ///
    pub pointer_interval: Duration,
    /// When set, `start` also requests an incremental update at this period
    ///
    pub update_interval: Option<Duration>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            io_timeout: Duration::from_secs(5 * 60),
            pointer_interval: Duration::from_millis(50),
            update_interval: None,
        }
    }
}
