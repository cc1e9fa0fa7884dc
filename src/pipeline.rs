//! 청크 파이프라인 - 암호화 후 압축
//!
//! 전송: encrypt → compress, 수신: decompress → decrypt.
//! 순서는 와이어 계약이므로 양측 설정이 동일해야 한다.

use crate::config::Config;
use crate::crypto::ChunkCipher;
use crate::error::{Error, Result};

/// 송수신 대칭 청크 파이프라인
#[derive(Clone)]
pub struct Pipeline {
    cipher: Option<ChunkCipher>,
    compression: bool,
    zstd_level: i32,
}

impl Pipeline {
    /// 설정에서 파이프라인 구성
    pub fn from_config(config: &Config) -> Self {
        Self {
            cipher: config.encryption_key.map(ChunkCipher::new),
            compression: config.compression,
            zstd_level: config.zstd_level,
        }
    }

    /// 아무 변환도 하지 않는 파이프라인
    pub fn passthrough() -> Self {
        Self {
            cipher: None,
            compression: false,
            zstd_level: 0,
        }
    }

    /// 두 단계 모두 비활성 여부
    pub fn is_passthrough(&self) -> bool {
        self.cipher.is_none() && !self.compression
    }

    /// 송신 방향: 암호화 후 압축
    pub fn seal(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let encrypted = match &self.cipher {
            Some(cipher) => cipher.encrypt(payload),
            None => payload.to_vec(),
        };

        if self.compression {
            zstd::encode_all(encrypted.as_slice(), self.zstd_level)
                .map_err(|e| Error::Compression(e.to_string()))
        } else {
            Ok(encrypted)
        }
    }

    /// 수신 방향: 압축 해제 후 복호화
    pub fn open(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let decompressed = if self.compression {
            zstd::decode_all(payload).map_err(|e| Error::Compression(e.to_string()))?
        } else {
            payload.to_vec()
        };

        match &self.cipher {
            Some(cipher) => Ok(cipher.decrypt(&decompressed)?),
            None => Ok(decompressed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_pipeline() -> Pipeline {
        let mut config = Config::default().with_key(&[7u8; 32]).unwrap();
        config.compression = true;
        Pipeline::from_config(&config)
    }

    fn compress_only() -> Pipeline {
        let mut config = Config::default();
        config.compression = true;
        Pipeline::from_config(&config)
    }

    #[test]
    fn test_passthrough_identity() {
        let pipeline = Pipeline::passthrough();
        let payload = b"unchanged bytes";
        assert_eq!(pipeline.seal(payload).unwrap(), payload);
        assert_eq!(pipeline.open(payload).unwrap(), payload);
    }

    #[test]
    fn test_compress_roundtrip_empty_small_large() {
        let pipeline = compress_only();

        let empty: Vec<u8> = Vec::new();
        let small = b"short payload under 100 bytes".to_vec();
        // 수 메가바이트 페이로드
        let large: Vec<u8> = (0..3 * 1024 * 1024u32).map(|i| (i % 251) as u8).collect();

        for payload in [&empty, &small, &large] {
            let sealed = pipeline.seal(payload).unwrap();
            let opened = pipeline.open(&sealed).unwrap();
            assert_eq!(&opened, payload);
        }
    }

    #[test]
    fn test_encrypt_then_compress_roundtrip() {
        let pipeline = full_pipeline();
        let payload: Vec<u8> = (0..5000u32).map(|i| (i % 256) as u8).collect();

        let sealed = pipeline.seal(&payload).unwrap();
        assert_ne!(sealed, payload);
        assert_eq!(pipeline.open(&sealed).unwrap(), payload);
    }

    #[test]
    fn test_corrupt_compressed_stream_fails() {
        let pipeline = compress_only();
        let err = pipeline.open(b"definitely not a zstd stream").unwrap_err();
        assert!(matches!(err, Error::Compression(_)));
    }

    #[test]
    fn test_encrypted_then_compressed_too_short_fails_as_crypto() {
        let pipeline = full_pipeline();
        // 유효한 zstd 스트림이지만 내용물이 IV 한 블록보다 짧은 경우
        let sealed = zstd::encode_all(&[0u8; 4][..], 3).unwrap();
        let err = pipeline.open(&sealed).unwrap_err();
        assert!(matches!(err, Error::Crypto(_)));
    }
}
