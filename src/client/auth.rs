use crate::VncError;
use des::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use des::Des;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(super) enum SecurityType {
    None = 1,
    VncAuth = 2,
}

impl From<SecurityType> for u8 {
    fn from(e: SecurityType) -> Self {
        e as u8
    }
}

/// Our preference, strongest first
const PREFERRED: [SecurityType; 2] = [SecurityType::VncAuth, SecurityType::None];

impl SecurityType {
    /// First type of our preference list that the server offers
    pub(super) fn choose(offered: &[u8]) -> Option<Self> {
        PREFERRED
            .into_iter()
            .find(|wanted| offered.contains(&u8::from(*wanted)))
    }

    pub(super) fn requires_password(self) -> bool {
        matches!(self, SecurityType::VncAuth)
    }

    pub(super) async fn read<S>(reader: &mut S) -> Result<Self, VncError>
    where
        S: AsyncRead + Unpin,
    {
        // +--------------------------+-------------+--------------------------+
        // | No. of bytes             | Type        | Description              |
        // |                          | [Value]     |                          |
        // +--------------------------+-------------+--------------------------+
        // | 1                        | U8          | number-of-security-types |
        // | number-of-security-types | U8 array    | security-types           |
        // +--------------------------+-------------+--------------------------+
        let num = reader.read_u8().await?;

        if num == 0 {
            let reason = read_reason(reader).await?;
            return Err(VncError::Protocol(format!(
                "server refused the connection: {reason}"
            )));
        }

        let mut offered = vec![0_u8; num as usize];
        reader.read_exact(&mut offered).await?;
        Self::choose(&offered).ok_or_else(|| {
            VncError::Protocol(format!(
                "unable to negotiate a security type from {:?}",
                offered
            ))
        })
    }

    pub(super) async fn write<S>(self, writer: &mut S) -> Result<(), VncError>
    where
        S: AsyncWrite + Unpin,
    {
        writer.write_u8(self.into()).await?;
        writer.flush().await?;
        Ok(())
    }
}

/// Longest failure text kept, the rest is left on the wire
const MAX_REASON_LEN: u32 = 1024;

/// Failure text the server sends before closing,
/// a U32 length followed by that many bytes
///
/// The connection is torn down right after, so a truncated text
/// does not desync anything
///
pub(super) async fn read_reason<S>(reader: &mut S) -> Result<String, VncError>
where
    S: AsyncRead + Unpin,
{
    let len = reader.read_u32().await?;
    let mut reason = vec![0_u8; len.min(MAX_REASON_LEN) as usize];
    reader.read_exact(&mut reason).await?;
    Ok(String::from_utf8_lossy(&reason).into_owned())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum AuthResult {
    Ok,
    Failed,
}

impl From<u32> for AuthResult {
    fn from(num: u32) -> Self {
        if num == 0 {
            AuthResult::Ok
        } else {
            AuthResult::Failed
        }
    }
}

/// VNC Authentication, a DES challenge-response
pub(super) struct AuthHelper {
    challenge: [u8; 16],
    key: [u8; 8],
}

impl AuthHelper {
    pub(super) async fn read<S>(reader: &mut S, credential: &[u8]) -> Result<Self, VncError>
    where
        S: AsyncRead + Unpin,
    {
        let mut challenge = [0; 16];
        reader.read_exact(&mut challenge).await?;

        Ok(Self {
            challenge,
            key: des_key(credential),
        })
    }

    pub(super) fn response(&self) -> [u8; 16] {
        encrypt(&self.challenge, &self.key)
    }

    pub(super) async fn write<S>(&self, writer: &mut S) -> Result<(), VncError>
    where
        S: AsyncWrite + Unpin,
    {
        writer.write_all(&self.response()).await?;
        writer.flush().await?;
        Ok(())
    }

    pub(super) async fn finish<S>(self, reader: &mut S) -> Result<AuthResult, VncError>
    where
        S: AsyncRead + Unpin,
    {
        let result = reader.read_u32().await?;
        Ok(result.into())
    }
}

/// The first 8 bytes of the password, zero padded, each byte bit-mirrored
pub(super) fn des_key(credential: &[u8]) -> [u8; 8] {
    let mut key = [0_u8; 8];
    for (key_i, c) in key.iter_mut().zip(credential) {
        *key_i = c.reverse_bits();
    }
    key
}

/// DES-ECB over both 8 byte halves of the challenge
pub(super) fn encrypt(challenge: &[u8; 16], key: &[u8; 8]) -> [u8; 16] {
    let cipher = Des::new(GenericArray::from_slice(key));
    let mut response = *challenge;
    for block in response.chunks_exact_mut(8) {
        cipher.encrypt_block(GenericArray::from_mut_slice(block));
    }
    response
}
