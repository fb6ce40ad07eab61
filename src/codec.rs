//! Frame header codec and control-reply stream shared by both sides
//!
//! A header frame is big-endian binary: `total_len: i64`, `header_len: i64`,
//! a length-prefixed UTF-8 path (u32 byte count followed by the bytes) and a
//! single `0x01`/`0x00` byte for the single-transfer flag. `header_len` is
//! the encoded size of the header itself; `total_len` adds the body bytes of
//! file items. The end sentinel keeps both integers at zero.

use anyhow::{bail, Context, Result};
use std::io::Read;

use crate::protocol::{reply, END_SENTINEL, MAX_PATH_BYTES};

// Fixed part of the encoding: two i64, the u32 string prefix, the flag byte
const FIXED_LEN: usize = 8 + 8 + 4 + 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    pub total_len: i64,
    pub header_len: i64,
    pub path: String,
    pub single_transfer: bool,
}

impl FrameHeader {
    pub fn new(path: impl Into<String>, body_len: i64, single_transfer: bool) -> Self {
        let path = path.into();
        let header_len = (FIXED_LEN + path.len()) as i64;
        FrameHeader {
            total_len: header_len + body_len,
            header_len,
            path,
            single_transfer,
        }
    }

    /// The end-of-transfer sentinel: fixed path literal, sizes left at zero.
    pub fn end() -> Self {
        FrameHeader {
            total_len: 0,
            header_len: 0,
            path: END_SENTINEL.to_owned(),
            single_transfer: true,
        }
    }

    pub fn is_end(&self) -> bool {
        self.path == END_SENTINEL
    }

    pub fn encoded_len(&self) -> usize {
        FIXED_LEN + self.path.len()
    }

    pub fn body_len(&self) -> i64 {
        if self.is_end() {
            0
        } else {
            self.total_len - self.header_len
        }
    }

    /// Encode the header. The two size fields start out as zero placeholders
    /// and the first sixteen bytes are rewritten once the layout is known;
    /// for the sentinel the placeholders are the final value.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.extend_from_slice(&[0u8; 16]);
        buf.extend_from_slice(&(self.path.len() as u32).to_be_bytes());
        buf.extend_from_slice(self.path.as_bytes());
        buf.push(u8::from(self.single_transfer));
        buf[0..8].copy_from_slice(&self.total_len.to_be_bytes());
        buf[8..16].copy_from_slice(&self.header_len.to_be_bytes());
        buf
    }

    /// Read one header frame. Returns `Ok(None)` when the peer closed the
    /// connection cleanly at a frame boundary.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Option<FrameHeader>> {
        let mut first = [0u8; 8];
        let mut filled = 0;
        while filled < first.len() {
            let n = reader
                .read(&mut first[filled..])
                .context("reading frame header")?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                bail!("peer closed the connection mid-header");
            }
            filled += n;
        }
        let total_len = i64::from_be_bytes(first);
        let header_len = read_i64(reader).context("reading frame header length")?;

        let path_len = read_u32(reader).context("reading frame path length")? as usize;
        if path_len > MAX_PATH_BYTES {
            bail!("frame path too long: {} bytes (max {})", path_len, MAX_PATH_BYTES);
        }
        let mut raw = vec![0u8; path_len];
        reader.read_exact(&mut raw).context("reading frame path")?;
        let path = String::from_utf8(raw).context("frame path is not valid UTF-8")?;

        let mut flag = [0u8; 1];
        reader.read_exact(&mut flag).context("reading frame flag")?;

        let header = FrameHeader {
            total_len,
            header_len,
            path,
            single_transfer: flag[0] != 0,
        };
        if !header.is_end() {
            let encoded = header.encoded_len() as i64;
            if header.header_len != encoded {
                bail!(
                    "frame header length mismatch: claims {}, encoded {}",
                    header.header_len,
                    encoded
                );
            }
            if header.total_len < header.header_len {
                bail!(
                    "frame total length {} smaller than header length {}",
                    header.total_len,
                    header.header_len
                );
            }
        }
        Ok(Some(header))
    }
}

fn read_i64<R: Read>(reader: &mut R) -> std::io::Result<i64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(i64::from_be_bytes(buf))
}

fn read_u32<R: Read>(reader: &mut R) -> std::io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

/// One control event from the reverse channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    OkSend,
    KoSend,
    Ok,
}

/// Buffered reader for the reverse channel. Tokens are consumed greedily at
/// each await point and leftover bytes stay in the buffer, so replies that
/// arrive coalesced in one TCP segment (`Z_OK_SENDZ_OK`) decode exactly like
/// replies that arrive separately.
pub struct ReplyStream<R: Read> {
    inner: R,
    buf: Vec<u8>,
}

impl<R: Read> ReplyStream<R> {
    pub fn new(inner: R) -> Self {
        ReplyStream {
            inner,
            buf: Vec::new(),
        }
    }

    fn fill_to(&mut self, wanted: usize) -> Result<()> {
        let mut chunk = [0u8; 64];
        while self.buf.len() < wanted {
            let n = self
                .inner
                .read(&mut chunk)
                .context("reading control reply")?;
            if n == 0 {
                bail!("peer closed the control channel");
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
        Ok(())
    }

    fn take(&mut self, n: usize) {
        self.buf.drain(..n);
    }

    /// Await the accept/deny decision for an announced item.
    pub fn next_accept(&mut self) -> Result<Reply> {
        self.fill_to(reply::OK_SEND.len())?;
        if self.buf.starts_with(reply::OK_SEND) {
            self.take(reply::OK_SEND.len());
            Ok(Reply::OkSend)
        } else if self.buf.starts_with(reply::KO_SEND) {
            self.take(reply::KO_SEND.len());
            Ok(Reply::KoSend)
        } else {
            bail!(
                "unexpected control reply: {}",
                String::from_utf8_lossy(&self.buf)
            )
        }
    }

    /// Await the item-complete acknowledgement.
    pub fn next_ok(&mut self) -> Result<Reply> {
        self.fill_to(reply::OK.len())?;
        if self.buf.starts_with(reply::OK) {
            self.take(reply::OK.len());
            Ok(Reply::Ok)
        } else {
            bail!(
                "unexpected control reply: {}",
                String::from_utf8_lossy(&self.buf)
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn header_sizes_add_up() {
        let header = FrameHeader::new("A/b.txt", 1024, false);
        assert_eq!(header.header_len, 21 + 7);
        assert_eq!(header.total_len, header.header_len + 1024);
        assert_eq!(header.body_len(), 1024);
    }

    #[test]
    fn header_golden_encoding() {
        let header = FrameHeader::new("a", 2, true);
        let bytes = header.encode();
        let mut expected = Vec::new();
        expected.extend_from_slice(&24i64.to_be_bytes()); // 22 header + 2 body
        expected.extend_from_slice(&22i64.to_be_bytes());
        expected.extend_from_slice(&1u32.to_be_bytes());
        expected.push(b'a');
        expected.push(1);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn header_round_trip() {
        let header = FrameHeader::new("some/dir/file.bin", 4096, false);
        let mut cursor = Cursor::new(header.encode());
        let decoded = FrameHeader::read_from(&mut cursor).unwrap().unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn sentinel_keeps_zero_sizes() {
        let end = FrameHeader::end();
        let bytes = end.encode();
        assert!(bytes[..16].iter().all(|b| *b == 0));
        let decoded = FrameHeader::read_from(&mut Cursor::new(bytes)).unwrap().unwrap();
        assert!(decoded.is_end());
        assert_eq!(decoded.body_len(), 0);
        assert!(decoded.single_transfer);
    }

    #[test]
    fn clean_close_yields_none() {
        let mut cursor = Cursor::new(Vec::new());
        assert!(FrameHeader::read_from(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn corrupt_header_len_rejected() {
        let mut bytes = FrameHeader::new("x.txt", 10, true).encode();
        bytes[15] ^= 0x01;
        assert!(FrameHeader::read_from(&mut Cursor::new(bytes)).is_err());
    }

    #[test]
    fn oversized_path_rejected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0i64.to_be_bytes());
        bytes.extend_from_slice(&0i64.to_be_bytes());
        bytes.extend_from_slice(&(u32::MAX).to_be_bytes());
        assert!(FrameHeader::read_from(&mut Cursor::new(bytes)).is_err());
    }

    #[test]
    fn coalesced_replies_decode_in_order() {
        let mut replies = ReplyStream::new(Cursor::new(b"Z_OK_SENDZ_OK".to_vec()));
        assert_eq!(replies.next_accept().unwrap(), Reply::OkSend);
        assert_eq!(replies.next_ok().unwrap(), Reply::Ok);
    }

    #[test]
    fn separate_replies_decode_the_same() {
        let mut replies = ReplyStream::new(Cursor::new(b"Z_OK_SEND".to_vec()));
        assert_eq!(replies.next_accept().unwrap(), Reply::OkSend);
        let mut replies = ReplyStream::new(Cursor::new(b"Z_OK".to_vec()));
        assert_eq!(replies.next_ok().unwrap(), Reply::Ok);
    }

    #[test]
    fn deny_reply_decodes() {
        let mut replies = ReplyStream::new(Cursor::new(b"Z_KO_SEND".to_vec()));
        assert_eq!(replies.next_accept().unwrap(), Reply::KoSend);
    }

    /// Reader that trickles one byte per read call.
    struct OneByte(Cursor<Vec<u8>>);

    impl Read for OneByte {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = 1.min(buf.len());
            self.0.read(&mut buf[..n])
        }
    }

    #[test]
    fn replies_split_across_reads_decode() {
        let mut replies = ReplyStream::new(OneByte(Cursor::new(b"Z_OK_SENDZ_OK".to_vec())));
        assert_eq!(replies.next_accept().unwrap(), Reply::OkSend);
        assert_eq!(replies.next_ok().unwrap(), Reply::Ok);
    }

    #[test]
    fn garbage_reply_rejected() {
        let mut replies = ReplyStream::new(Cursor::new(b"Z_WHATEVER".to_vec()));
        assert!(replies.next_accept().is_err());
    }
}
