//! 프로토콜 설정

use crate::crypto::KEY_SIZE;
use crate::error::{Error, Result};
use crate::{DEFAULT_CHUNK_SIZE, MAX_BATCH_BYTES, MAX_BATCH_FRAMES};

/// 와이어 포맷
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    /// `[4바이트 BE 시퀀스][페이로드]`, 데이터그램당 프레임 1개, 배치 없음
    FixedHeader,

    /// `[4바이트 BE 길이][구조화 인코딩 청크]` 프레임을 배치로 연접
    LengthPrefixed,
}

/// 전송 신뢰성 모드
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// 유닛마다 ACK 확인 후 다음 유닛 전송, 타임아웃 시 동일 유닛 재전송
    Ack,

    /// ACK 없이 연속 전송, 수신측 유휴 타임아웃으로 종료 판정
    Stream,
}

/// UFT 프로토콜 설정
#[derive(Debug, Clone)]
pub struct Config {
    /// 청크 크기 (바이트)
    pub chunk_size: usize,

    /// 배치 최대 크기 (바이트)
    pub max_batch_bytes: usize,

    /// 배치 최대 프레임 수
    pub max_batch_frames: usize,

    /// 와이어 포맷
    pub wire_format: WireFormat,

    /// 전송 모드
    pub delivery_mode: DeliveryMode,

    /// ACK 대기 타임아웃 (밀리초)
    pub ack_timeout_ms: u64,

    /// ACK 재시도 한도 (초과 시 명시적 포기)
    pub ack_max_retries: u32,

    /// ACK 재시도 백오프 상한 (밀리초)
    pub ack_backoff_cap_ms: u64,

    /// 수신측 유휴 타임아웃 (밀리초)
    pub idle_timeout_ms: u64,

    /// 재조립 워커 수
    pub workers: usize,

    /// 샤드 수 (1이면 샤딩 없음)
    pub shard_count: usize,

    /// 전송 시작 전 총 청크 수(`total:<N>`) 알림 여부
    pub announce_total: bool,

    /// 암호화 키 (None이면 암호화 비활성)
    pub encryption_key: Option<[u8; KEY_SIZE]>,

    /// 압축 활성화
    pub compression: bool,

    /// zstd 압축 레벨
    pub zstd_level: i32,

    /// 수신 작업 큐 크기 (초과 시 리스너 블로킹 = 백프레셔)
    pub work_queue_size: usize,

    /// 수신 버퍼 크기 (바이트)
    pub recv_buffer_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_batch_bytes: MAX_BATCH_BYTES,
            max_batch_frames: MAX_BATCH_FRAMES,
            wire_format: WireFormat::LengthPrefixed,
            delivery_mode: DeliveryMode::Ack,
            ack_timeout_ms: 5000,             // 5초
            ack_max_retries: 8,
            ack_backoff_cap_ms: 60_000,       // 60초
            idle_timeout_ms: 10_000,          // 10초
            workers: 4,
            shard_count: 1,
            announce_total: true,
            encryption_key: None,
            compression: false,
            zstd_level: 3,
            work_queue_size: 100,
            recv_buffer_size: 65535,
        }
    }
}

impl Config {
    /// 새 설정 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 불안정한 네트워크용 설정
    pub fn lossy_network() -> Self {
        Self {
            chunk_size: 512,
            ack_timeout_ms: 2000,
            ack_max_retries: 16,
            idle_timeout_ms: 30_000,
            ..Self::default()
        }
    }

    /// 루프백/근거리 고속 전송용 설정
    pub fn local_loopback() -> Self {
        Self {
            delivery_mode: DeliveryMode::Stream,
            ack_timeout_ms: 500,
            idle_timeout_ms: 2000,
            work_queue_size: 1000,
            ..Self::default()
        }
    }

    /// 키 슬라이스 검증 후 암호화 활성화
    pub fn with_key(mut self, key: &[u8]) -> Result<Self> {
        if key.len() != KEY_SIZE {
            return Err(Error::Setup(format!(
                "키 길이는 {}바이트여야 함: got {}",
                KEY_SIZE,
                key.len()
            )));
        }
        let mut k = [0u8; KEY_SIZE];
        k.copy_from_slice(key);
        self.encryption_key = Some(k);
        Ok(self)
    }

    /// 소스 길이 기준 총 청크 수 계산
    pub fn chunk_count(&self, source_len: u64) -> u32 {
        let size = self.chunk_size as u64;
        ((source_len + size - 1) / size) as u32
    }

    /// 설정 유효성 검사
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Setup("chunk_size는 0이 될 수 없음".into()));
        }
        if self.max_batch_frames == 0 {
            return Err(Error::Setup("max_batch_frames는 0이 될 수 없음".into()));
        }
        if self.workers == 0 {
            return Err(Error::Setup("workers는 0이 될 수 없음".into()));
        }
        if self.shard_count == 0 {
            return Err(Error::Setup("shard_count는 1 이상이어야 함".into()));
        }
        if !(1..=22).contains(&self.zstd_level) {
            return Err(Error::Setup(format!(
                "zstd_level 범위 초과 (1~22): {}",
                self.zstd_level
            )));
        }
        Ok(())
    }
}
