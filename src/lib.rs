//! # UFT (UDP File Transfer)
//!
//! UDP 기반 ACK 청크 전송/재조립 프로토콜
//!
//! ## 핵심 특징
//! - **청크 분할**: 바이트 소스를 고정 크기 청크로 분할, 조밀한 시퀀스 번호 부여
//! - **ACK 기반 전송**: 유닛(프레임/배치)마다 ACK 확인 후 다음 유닛 전송
//! - **비순서 재조립**: 워커 풀이 병렬 디코딩, 연속 프리픽스만 순서대로 기록
//! - **샤딩**: 소스를 바이트 범위로 나눠 포트별 독립 병렬 전송
//! - **암호화 + 압축**: AES-256-CFB (청크별 랜덤 IV) 후 zstd
//! - **유휴 타임아웃 종료**: total 미수신/부분 수신 상태에서도 세션 종료 보장

pub mod assembly;
pub mod chunk;
pub mod config;
pub mod crypto;
pub mod error;
pub mod frame;
pub mod message;
pub mod pipeline;
pub mod receiver;
pub mod sender;
pub mod shard;
pub mod stats;

pub use assembly::PendingStore;
pub use chunk::{Chunk, Chunker, SequenceNumber};
pub use config::{Config, DeliveryMode, WireFormat};
pub use crypto::ChunkCipher;
pub use error::{Error, Result};
pub use frame::{BatchBuilder, FrameBuffer};
pub use pipeline::Pipeline;
pub use receiver::{ReceiveOutcome, ReceiveSummary, Receiver};
pub use sender::Sender;
pub use shard::{Shard, ShardPlan};
pub use stats::{ReceiverStats, SenderStats};

/// 기본 청크 크기 (바이트)
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// 배치 최대 크기 (바이트, MTU 이하 유지)
pub const MAX_BATCH_BYTES: usize = 1400;

/// 배치 최대 프레임 수
pub const MAX_BATCH_FRAMES: usize = 10;

/// ACK 데이터그램 토큰 (페이로드 선두 일치로 판정)
pub const ACK_TOKEN: &[u8] = b"ACK";

/// 총 청크 수 알림 컨트롤 프리픽스
pub const CONTROL_PREFIX: &[u8] = b"total:";
