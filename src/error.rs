//! 에러 타입 정의

use thiserror::Error;

/// UFT 프로토콜 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO 에러: {0}")]
    Io(#[from] std::io::Error),

    #[error("직렬화 에러: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("암호화 에러: {0}")]
    Crypto(#[from] crate::crypto::CryptoError),

    #[error("압축 에러: {0}")]
    Compression(String),

    #[error("프레임 길이 초과 (손상 간주): len={len}, max={max}")]
    FrameTooLarge { len: usize, max: usize },

    #[error("프레임 형식 오류: {0}")]
    MalformedFrame(String),

    #[error("유효하지 않은 컨트롤 메시지: {0}")]
    InvalidControl(String),

    #[error("ACK 재시도 한도 초과: sequence={sequence}, attempts={attempts}")]
    AckRetriesExhausted { sequence: u32, attempts: u32 },

    #[error("채널 종료")]
    ChannelClosed,

    #[error("모든 청크 디코딩 실패")]
    AllChunksFailed,

    #[error("설정/준비 에러: {0}")]
    Setup(String),

    #[error("알 수 없는 에러: {0}")]
    Unknown(String),
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, Error>;
