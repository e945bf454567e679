//! Length-prefixed byte frames over a stream, used between the simulator
//! and the ground CLI. Each frame is a big-endian `u32` length followed by
//! that many bytes.

use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest frame either side accepts.
pub const MAX_LINK_FRAME: usize = 4096;

pub fn encode(data: &[u8]) -> Vec<u8> {
    let mut framed = (data.len() as u32).to_be_bytes().to_vec();
    framed.extend_from_slice(data);
    framed
}

/// Read one frame; `Ok(None)` on a clean end of stream.
///
/// # Errors
///
/// I/O errors, a stream that ends mid-frame, or a length above
/// [`MAX_LINK_FRAME`].
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<Option<Vec<u8>>> {
    let mut prefix = [0u8; 4];
    match reader.read_exact(&mut prefix).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let len = u32::from_be_bytes(prefix) as usize;
    if len > MAX_LINK_FRAME {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame of {len} bytes exceeds {MAX_LINK_FRAME}"),
        ));
    }

    let mut payload = vec![0; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

/// # Errors
///
/// I/O errors, or `data` longer than [`MAX_LINK_FRAME`].
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, data: &[u8]) -> io::Result<()> {
    if data.len() > MAX_LINK_FRAME {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("frame of {} bytes exceeds {MAX_LINK_FRAME}", data.len()),
        ));
    }
    writer.write_all(&encode(data)).await?;
    writer.flush().await
}
