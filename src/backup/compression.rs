//! Archive compression, matching the `CompressionKind` a `PlatformBackup`
//! selects.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::crd::backup::CompressionKind;
use crate::error::{Error, Result};

pub fn compress(data: &[u8], kind: CompressionKind) -> Result<Vec<u8>> {
    match kind {
        CompressionKind::None => Ok(data.to_vec()),
        CompressionKind::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(data).map_err(Error::Io)?;
            encoder.finish().map_err(Error::Io)
        }
    }
}

pub fn decompress(data: &[u8], kind: CompressionKind) -> Result<Vec<u8>> {
    match kind {
        CompressionKind::None => Ok(data.to_vec()),
        CompressionKind::Gzip => {
            let mut decoder = GzDecoder::new(data);
            let mut out = Vec::new();
            decoder.read_to_end(&mut out).map_err(Error::Io)?;
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gzip_round_trips() {
        let original = b"observability platform backup payload".to_vec();
        let compressed = compress(&original, CompressionKind::Gzip).unwrap();
        assert_ne!(compressed, original);
        let decompressed = decompress(&compressed, CompressionKind::Gzip).unwrap();
        assert_eq!(decompressed, original);
    }

    #[test]
    fn none_is_passthrough() {
        let original = b"raw".to_vec();
        let compressed = compress(&original, CompressionKind::None).unwrap();
        assert_eq!(compressed, original);
    }
}
