//! 전송 통계

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// 송신측 통계
#[derive(Debug, Clone)]
pub struct SenderStats {
    /// 시작 시간
    start_time: Instant,

    /// 전송한 청크 수
    pub chunks_sent: u64,

    /// 전송한 데이터그램 수 (재전송 포함)
    pub datagrams_sent: u64,

    /// 재전송 횟수
    pub retries: u64,

    /// 파이프라인 적용 전 페이로드 바이트
    pub payload_bytes: u64,

    /// 와이어 바이트 (프레이밍 포함, 재전송 포함)
    pub wire_bytes: u64,
}

impl SenderStats {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            chunks_sent: 0,
            datagrams_sent: 0,
            retries: 0,
            payload_bytes: 0,
            wire_bytes: 0,
        }
    }

    /// 경과 시간
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// 페이로드 기준 처리율 (bytes/sec)
    pub fn throughput(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed == 0.0 {
            return 0.0;
        }
        self.payload_bytes as f64 / elapsed
    }

    /// 샤드별 통계 합산
    pub fn merge(&mut self, other: &SenderStats) {
        if other.start_time < self.start_time {
            self.start_time = other.start_time;
        }
        self.chunks_sent += other.chunks_sent;
        self.datagrams_sent += other.datagrams_sent;
        self.retries += other.retries;
        self.payload_bytes += other.payload_bytes;
        self.wire_bytes += other.wire_bytes;
    }

    /// 통계 요약 문자열
    pub fn summary(&self) -> String {
        format!(
            "Elapsed: {:.2}s | Chunks: {} | Datagrams: {} | Retries: {} | Payload: {} bytes | Wire: {} bytes | Throughput: {:.2} MB/s",
            self.elapsed().as_secs_f64(),
            self.chunks_sent,
            self.datagrams_sent,
            self.retries,
            self.payload_bytes,
            self.wire_bytes,
            self.throughput() / 1_000_000.0,
        )
    }
}

impl Default for SenderStats {
    fn default() -> Self {
        Self::new()
    }
}

/// 수신측 통계 (리스너/워커 태스크가 공유하는 원자 카운터)
#[derive(Debug)]
pub struct ReceiverStats {
    start_time: Instant,
    datagrams: AtomicU64,
    frames: AtomicU64,
    decode_failures: AtomicU64,
}

impl ReceiverStats {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            datagrams: AtomicU64::new(0),
            frames: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
        }
    }

    pub fn record_datagram(&self) {
        self.datagrams.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame(&self) {
        self.frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn datagrams(&self) -> u64 {
        self.datagrams.load(Ordering::Relaxed)
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    pub fn decode_failures(&self) -> u64 {
        self.decode_failures.load(Ordering::Relaxed)
    }

    /// 경과 시간
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl Default for ReceiverStats {
    fn default() -> Self {
        Self::new()
    }
}
