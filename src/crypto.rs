//! 암호화 모듈 - AES-256-CFB 청크 암호화
//!
//! 흐름:
//! 1. 청크마다 16바이트 랜덤 IV 생성
//! 2. CFB 스트림 모드로 암호화 (패딩 없음, 길이 보존)
//! 3. `iv || ciphertext` 형태로 출력
//!
//! 키는 배포 단위로 고정된 32바이트 대칭 키 하나를 양측이 공유한다.

use aes::cipher::{AsyncStreamCipher, KeyIvInit};
use aes::Aes256;
use rand::rngs::OsRng;
use rand::RngCore;

type Aes256CfbEnc = cfb_mode::Encryptor<Aes256>;
type Aes256CfbDec = cfb_mode::Decryptor<Aes256>;

/// 대칭 키 크기 (AES-256, 바이트)
pub const KEY_SIZE: usize = 32;

/// IV 크기 (AES 블록, 바이트)
pub const IV_SIZE: usize = 16;

/// 암호화 오류
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("유효하지 않은 키 길이: expected {expected}, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("암호문이 IV 블록보다 짧음: {0} bytes")]
    CiphertextTooShort(usize),
}

/// 청크 암호화기
///
/// CFB는 청크별 IV로 자기 동기화되므로 암호화기 자체는 상태가 없다.
#[derive(Clone)]
pub struct ChunkCipher {
    key: [u8; KEY_SIZE],
}

impl ChunkCipher {
    /// 32바이트 키로 생성
    pub fn new(key: [u8; KEY_SIZE]) -> Self {
        Self { key }
    }

    /// 임의 길이 슬라이스에서 생성 (키 길이 검증)
    pub fn from_slice(key: &[u8]) -> Result<Self, CryptoError> {
        if key.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_SIZE,
                got: key.len(),
            });
        }
        let mut k = [0u8; KEY_SIZE];
        k.copy_from_slice(key);
        Ok(Self::new(k))
    }

    /// 청크 암호화
    /// 반환: iv(16) + ciphertext (평문과 같은 길이)
    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        let mut iv = [0u8; IV_SIZE];
        OsRng.fill_bytes(&mut iv);

        let mut out = Vec::with_capacity(IV_SIZE + plaintext.len());
        out.extend_from_slice(&iv);
        out.extend_from_slice(plaintext);

        Aes256CfbEnc::new(&self.key.into(), &iv.into()).encrypt(&mut out[IV_SIZE..]);
        out
    }

    /// 청크 복호화
    /// 입력: iv(16) + ciphertext
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if data.len() < IV_SIZE {
            return Err(CryptoError::CiphertextTooShort(data.len()));
        }

        let (iv, ciphertext) = data.split_at(IV_SIZE);
        let mut iv_arr = [0u8; IV_SIZE];
        iv_arr.copy_from_slice(iv);

        let mut out = ciphertext.to_vec();
        Aes256CfbDec::new(&self.key.into(), &iv_arr.into()).decrypt(&mut out);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> [u8; KEY_SIZE] {
        let mut key = [0u8; KEY_SIZE];
        for (i, b) in key.iter_mut().enumerate() {
            *b = i as u8;
        }
        key
    }

    #[test]
    fn test_roundtrip_various_lengths() {
        let cipher = ChunkCipher::new(test_key());

        // 빈 페이로드, 1바이트, 블록-1, 블록, 블록 5개
        for len in [0usize, 1, IV_SIZE - 1, IV_SIZE, IV_SIZE * 5] {
            let plaintext: Vec<u8> = (0..len).map(|i| (i * 7 % 256) as u8).collect();
            let encrypted = cipher.encrypt(&plaintext);

            assert_eq!(encrypted.len(), IV_SIZE + len);
            let decrypted = cipher.decrypt(&encrypted).unwrap();
            assert_eq!(decrypted, plaintext, "len={}", len);
        }
    }

    #[test]
    fn test_random_iv_per_chunk() {
        let cipher = ChunkCipher::new(test_key());
        let plaintext = b"same plaintext, different ciphertext";

        let a = cipher.encrypt(plaintext);
        let b = cipher.encrypt(plaintext);
        assert_ne!(a, b);
    }

    #[test]
    fn test_ciphertext_shorter_than_iv_fails() {
        let cipher = ChunkCipher::new(test_key());
        let err = cipher.decrypt(&[0u8; IV_SIZE - 1]).unwrap_err();
        assert!(matches!(err, CryptoError::CiphertextTooShort(_)));
    }

    #[test]
    fn test_wrong_key_garbles_plaintext() {
        let cipher = ChunkCipher::new(test_key());
        let other = ChunkCipher::new([0xFFu8; KEY_SIZE]);

        let plaintext = b"plaintext that must not survive a key mismatch";
        let encrypted = cipher.encrypt(plaintext);
        let garbled = other.decrypt(&encrypted).unwrap();
        assert_ne!(garbled.as_slice(), plaintext.as_slice());
    }

    #[test]
    fn test_from_slice_key_length_policy() {
        assert!(ChunkCipher::from_slice(&[0u8; 16]).is_err());
        assert!(ChunkCipher::from_slice(&[0u8; 31]).is_err());
        assert!(ChunkCipher::from_slice(&[0u8; 32]).is_ok());
    }
}
