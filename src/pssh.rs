//! Construction and inspection of ISO-BMFF `pssh` (Protection System Specific Header) boxes.
//
// A PSSH box wraps the opaque initialization data of one DRM system so that it can be carried
// alongside the media (in the moov box of an MP4 init segment) or, Base64-encoded, in a cenc:pssh
// element of a DASH ContentProtection descriptor. Layout (ISO/IEC 23001-7, all fields big-endian):
//
//    size (4) | "pssh" (4) | version (1) + flags (3) | SystemID (16)
//    [version 1 only: KID_count (4) | KID_count x KID (16)]
//    DataSize (4) | Data (DataSize)
//
// The builder only emits version 0 boxes; the inspector accepts versions 0 and 1.

use std::io::{Cursor, Read, Write};
use base64::prelude::{Engine as _, BASE64_STANDARD};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use hex_literal::hex;
use tracing::trace;
use crate::DashMpdError;


/// DRM system ID for Google Widevine.
pub const WIDEVINE_SYSTEM_ID: [u8; 16] = hex!("edef8ba979d64acea3c827dcd51d21ed");
/// DRM system ID for Microsoft PlayReady.
pub const PLAYREADY_SYSTEM_ID: [u8; 16] = hex!("9a04f07998404286ab92e65be0885f95");
/// DRM system ID used by PlayReady 1.0 clients (the byte-swapped form of `PLAYREADY_SYSTEM_ID`).
pub const PLAYREADY_V10_SYSTEM_ID: [u8; 16] = hex!("79f0049a40988642ab92e65be0885f95");

const PSSH_HEADER_LEN: usize = 32;


/// The decoded contents of a PSSH box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PsshBox {
    pub version: u8,
    pub flags: u32,
    pub system_id: [u8; 16],
    /// Key IDs listed in the box header; always empty for version 0 boxes.
    pub key_ids: Vec<[u8; 16]>,
    pub data: Vec<u8>,
}

fn io_error(e: std::io::Error) -> DashMpdError {
    DashMpdError::Io(e, String::from("writing PSSH box"))
}

/// Build a version 0 PSSH box for DRM system `system_id` carrying `payload`.
///
/// Fails if `system_id` is not exactly 16 bytes long.
pub fn build_pssh_box(system_id: &[u8], payload: &[u8]) -> Result<Vec<u8>, DashMpdError> {
    if system_id.len() != 16 {
        return Err(DashMpdError::InvalidSystemId(system_id.len()));
    }
    let total = PSSH_HEADER_LEN + payload.len();
    let size = u32::try_from(total)
        .map_err(|_| DashMpdError::InvalidPssh(format!("payload of {} bytes is too large", payload.len())))?;
    let mut buf = Vec::with_capacity(total);
    buf.write_u32::<BigEndian>(size).map_err(io_error)?;
    buf.write_all(b"pssh").map_err(io_error)?;
    // version 0, flags 0
    buf.write_u32::<BigEndian>(0).map_err(io_error)?;
    buf.write_all(system_id).map_err(io_error)?;
    buf.write_u32::<BigEndian>(size - PSSH_HEADER_LEN as u32).map_err(io_error)?;
    buf.write_all(payload).map_err(io_error)?;
    trace!("built PSSH box of {size} octets");
    Ok(buf)
}

/// Build a PSSH box and return it Base64-encoded (standard alphabet, padded), the form used in
/// `cenc:pssh` elements.
pub fn build_pssh_box_base64(system_id: &[u8], payload: &[u8]) -> Result<String, DashMpdError> {
    build_pssh_box(system_id, payload).map(|b| BASE64_STANDARD.encode(b))
}

fn truncated(what: &str) -> DashMpdError {
    DashMpdError::InvalidPssh(format!("truncated PSSH box (reading {what})"))
}

/// Parse a binary PSSH box.
pub fn inspect_pssh_box(bytes: &[u8]) -> Result<PsshBox, DashMpdError> {
    let mut rdr = Cursor::new(bytes);
    let size = rdr.read_u32::<BigEndian>().map_err(|_| truncated("size"))?;
    if size as usize != bytes.len() {
        return Err(DashMpdError::InvalidPssh(
            format!("box size field is {size} but {} octets were provided", bytes.len())));
    }
    let mut box_type = [0u8; 4];
    rdr.read_exact(&mut box_type).map_err(|_| truncated("box type"))?;
    if &box_type != b"pssh" {
        return Err(DashMpdError::InvalidPssh(
            format!("expecting box type pssh, found {}", String::from_utf8_lossy(&box_type))));
    }
    let version = rdr.read_u8().map_err(|_| truncated("version"))?;
    let flags = rdr.read_u24::<BigEndian>().map_err(|_| truncated("flags"))?;
    if version > 1 {
        return Err(DashMpdError::InvalidPssh(format!("unsupported PSSH box version {version}")));
    }
    let mut system_id = [0u8; 16];
    rdr.read_exact(&mut system_id).map_err(|_| truncated("system ID"))?;
    let mut key_ids = Vec::new();
    if version == 1 {
        let kid_count = rdr.read_u32::<BigEndian>().map_err(|_| truncated("KID count"))?;
        for _ in 0..kid_count {
            let mut kid = [0u8; 16];
            rdr.read_exact(&mut kid).map_err(|_| truncated("KID"))?;
            key_ids.push(kid);
        }
    }
    let data_size = rdr.read_u32::<BigEndian>().map_err(|_| truncated("data size"))? as usize;
    let remaining = bytes.len() - rdr.position() as usize;
    if data_size != remaining {
        return Err(DashMpdError::InvalidPssh(
            format!("data size field is {data_size} but {remaining} octets remain")));
    }
    let mut data = vec![0u8; data_size];
    rdr.read_exact(&mut data).map_err(|_| truncated("data"))?;
    Ok(PsshBox { version, flags, system_id, key_ids, data })
}

impl TryFrom<&[u8]> for PsshBox {
    type Error = DashMpdError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        inspect_pssh_box(value)
    }
}

impl PsshBox {
    /// The name of the DRM system, if the system ID is one we know about.
    pub fn system_name(&self) -> Option<&'static str> {
        match self.system_id {
            WIDEVINE_SYSTEM_ID => Some("Widevine"),
            PLAYREADY_SYSTEM_ID => Some("PlayReady"),
            PLAYREADY_V10_SYSTEM_ID => Some("PlayReady v1.0"),
            _ => None,
        }
    }
}


#[cfg(test)]
mod tests {
    use base64::prelude::{Engine as _, BASE64_STANDARD};
    use hex_literal::hex;
    use super::*;

    const WV_HEADER: &str = "CAESEFq91S9VSk8quNBh92FCUVUaCGNhc3RsYWJzIhhXcjNWTDFWS1R5cTQwR0gzWVVKUlZRPT0yB2RlZmF1bHQ=";
    const WV_PSSH: &str = "AAAAYXBzc2gAAAAA7e+LqXnWSs6jyCfc1R0h7QAAAEEIARIQWr3VL1VKTyq40GH3YUJRVRoIY2FzdGxhYnMiGFdyM1ZMMVZLVHlxNDBHSDNZVUpSVlE9PTIHZGVmYXVsdA==";

    #[test]
    fn test_widevine_pssh() {
        let header = BASE64_STANDARD.decode(WV_HEADER).unwrap();
        let pssh = build_pssh_box_base64(&WIDEVINE_SYSTEM_ID, &header).unwrap();
        assert_eq!(pssh, WV_PSSH);
    }

    #[test]
    fn test_pssh_layout() {
        let payload = [0xde, 0xad, 0xbe, 0xef];
        let b = build_pssh_box(&PLAYREADY_SYSTEM_ID, &payload).unwrap();
        assert_eq!(b.len(), 36);
        assert_eq!(&b[0..4], &[0, 0, 0, 36]);
        assert_eq!(&b[4..8], b"pssh");
        assert_eq!(&b[8..12], &[0, 0, 0, 0]);
        assert_eq!(&b[12..28], &hex!("9a04f07998404286ab92e65be0885f95"));
        assert_eq!(&b[28..32], &[0, 0, 0, 4]);
        assert_eq!(&b[32..], &payload);
    }

    #[test]
    fn test_pssh_empty_payload() {
        let b = build_pssh_box(&WIDEVINE_SYSTEM_ID, &[]).unwrap();
        assert_eq!(b.len(), 32);
        assert_eq!(&b[28..32], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_pssh_bad_system_id() {
        let err = build_pssh_box(b"edef8ba979d64acea3c827", b"payload").unwrap_err();
        assert_eq!(err.to_string(), "system ID must be 16 bytes, was: 22");
        assert!(build_pssh_box(&[], &[]).is_err());
        assert!(build_pssh_box(&[0u8; 17], &[1, 2, 3]).is_err());
    }

    #[test]
    fn test_inspect_pssh() {
        let bytes = BASE64_STANDARD.decode(WV_PSSH).unwrap();
        let pssh = inspect_pssh_box(&bytes).unwrap();
        assert_eq!(pssh.version, 0);
        assert_eq!(pssh.flags, 0);
        assert_eq!(pssh.system_id, WIDEVINE_SYSTEM_ID);
        assert_eq!(pssh.system_name(), Some("Widevine"));
        assert!(pssh.key_ids.is_empty());
        assert_eq!(pssh.data, BASE64_STANDARD.decode(WV_HEADER).unwrap());
    }

    #[test]
    fn test_inspect_pssh_v1() {
        let kid = hex!("08e367028f33436ca5dd60ffe5571e60");
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&[0, 0, 0, 52]);
        bytes.extend_from_slice(b"pssh");
        bytes.extend_from_slice(&[1, 0, 0, 0]);
        bytes.extend_from_slice(&PLAYREADY_SYSTEM_ID);
        bytes.extend_from_slice(&[0, 0, 0, 1]);
        bytes.extend_from_slice(&kid);
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        let pssh = PsshBox::try_from(bytes.as_slice()).unwrap();
        assert_eq!(pssh.version, 1);
        assert_eq!(pssh.key_ids, vec![kid]);
        assert!(pssh.data.is_empty());
    }

    #[test]
    fn test_inspect_pssh_malformed() {
        let good = build_pssh_box(&WIDEVINE_SYSTEM_ID, b"abcdef").unwrap();
        assert!(inspect_pssh_box(&good[..20]).is_err());
        assert!(inspect_pssh_box(&[]).is_err());
        let mut wrong_type = good.clone();
        wrong_type[4..8].copy_from_slice(b"moov");
        assert!(inspect_pssh_box(&wrong_type).is_err());
        let mut wrong_size = good.clone();
        wrong_size[31] = 99;
        assert!(inspect_pssh_box(&wrong_size).is_err());
    }
}
