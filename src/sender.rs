//! 송신자
//!
//! - 청크 분할 → 파이프라인 → 프레임 → 배치 → 전송
//! - ACK 모드: 유닛마다 ACK 대기, 타임아웃 시 동일 유닛 재전송 (한도 + 백오프)
//! - 스트림 모드: ACK 없이 연속 전송
//! - 샤딩: 바이트 범위별 독립 태스크/소켓/포트, 완료 시점에만 합류

use std::io::Read;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::chunk::{Chunk, Chunker, SequenceNumber};
use crate::config::{Config, DeliveryMode, WireFormat};
use crate::error::{Error, Result};
use crate::frame::{self, BatchBuilder};
use crate::message;
use crate::pipeline::Pipeline;
use crate::shard::ShardPlan;
use crate::stats::SenderStats;

/// 송신자
pub struct Sender {
    config: Config,
    pipeline: Pipeline,
    stats: SenderStats,
}

impl Sender {
    /// 새 송신자 생성
    pub fn new(config: Config) -> Self {
        let pipeline = Pipeline::from_config(&config);
        Self {
            config,
            pipeline,
            stats: SenderStats::new(),
        }
    }

    /// 통계 반환
    pub fn stats(&self) -> &SenderStats {
        &self.stats
    }

    /// 바이트 슬라이스 전송 (단일 스트림)
    pub async fn send_bytes(&mut self, data: &[u8], dest: SocketAddr) -> Result<()> {
        self.send_reader(data, Some(data.len() as u64), dest).await
    }

    /// 바이트 소스 전송 (단일 스트림)
    ///
    /// `source_len`을 알면 전송 전에 `total:<N>` 컨트롤 데이터그램을 보낸다.
    pub async fn send_reader<R: Read>(
        &mut self,
        source: R,
        source_len: Option<u64>,
        dest: SocketAddr,
    ) -> Result<()> {
        self.config.validate()?;

        let socket = UdpSocket::bind(("0.0.0.0", 0))
            .await
            .map_err(|e| Error::Setup(format!("송신 소켓 바인드 실패: {}", e)))?;

        info!("UFT Sender started: dest={}, mode={:?}", dest, self.config.delivery_mode);
        self.send_on(&socket, dest, source, source_len).await?;
        info!("전송 완료: {}", self.stats.summary());
        Ok(())
    }

    /// 샤드 전송: 소스를 연속 범위로 나눠 `base_port + index`로 병렬 전송
    ///
    /// 샤드마다 소켓과 시퀀스 공간(0부터)을 따로 가지며, 전체 전송은 모든
    /// 샤드 태스크가 끝나야 완료된다. 샤드 하나가 실패하면 전체가 실패한다.
    pub async fn send_sharded(
        config: Config,
        data: Bytes,
        host: IpAddr,
        base_port: u16,
    ) -> Result<SenderStats> {
        config.validate()?;

        let plan = ShardPlan::partition(data.len(), config.shard_count, base_port);
        info!(
            "샤드 전송 시작: {} bytes, {} shards, base_port={}",
            data.len(),
            plan.len(),
            base_port
        );

        let mut handles = Vec::with_capacity(plan.len());
        for shard in plan.shards() {
            let shard = *shard;
            let config = config.clone();
            let slice = data.slice(shard.offset..shard.offset + shard.len);
            let dest = SocketAddr::new(host, shard.port);

            handles.push(tokio::spawn(async move {
                let mut sender = Sender::new(config);
                debug!("샤드 {} 전송: {} bytes → {}", shard.index, slice.len(), dest);
                sender
                    .send_reader(slice.as_ref(), Some(slice.len() as u64), dest)
                    .await?;
                Ok::<SenderStats, Error>(sender.stats)
            }));
        }

        let mut merged = SenderStats::new();
        for handle in handles {
            let stats = handle
                .await
                .map_err(|e| Error::Unknown(format!("샤드 태스크 조인 실패: {}", e)))??;
            merged.merge(&stats);
        }

        info!("샤드 전송 완료: {}", merged.summary());
        Ok(merged)
    }

    async fn send_on<R: Read>(
        &mut self,
        socket: &UdpSocket,
        dest: SocketAddr,
        source: R,
        source_len: Option<u64>,
    ) -> Result<()> {
        // 총 청크 수 사전 알림 (컨트롤이므로 ACK 대상 아님)
        if self.config.announce_total {
            if let Some(len) = source_len {
                let total = self.config.chunk_count(len);
                socket.send_to(&message::encode_total(total), dest).await?;
                debug!("총 청크 수 알림: total={}", total);
            }
        }

        let mut chunker = Chunker::new(source, self.config.chunk_size);
        match self.config.wire_format {
            WireFormat::FixedHeader => self.send_fixed(socket, dest, &mut chunker).await,
            WireFormat::LengthPrefixed => self.send_batched(socket, dest, &mut chunker).await,
        }
    }

    /// 고정 헤더 전송: 데이터그램 = 프레임 1개
    async fn send_fixed<R: Read>(
        &mut self,
        socket: &UdpSocket,
        dest: SocketAddr,
        chunker: &mut Chunker<R>,
    ) -> Result<()> {
        while let Some(chunk) = chunker.next_chunk()? {
            self.stats.payload_bytes += chunk.data.len() as u64;
            let sequence = chunk.sequence;

            let sealed = self.pipeline.seal(&chunk.data)?;
            let datagram = frame::encode_fixed_header(&Chunk::new(sequence, sealed));

            self.dispatch(socket, dest, &datagram, sequence).await?;
            self.stats.chunks_sent += 1;
        }
        Ok(())
    }

    /// 길이 프리픽스 전송: 프레임을 배치로 묶어 데이터그램 구성
    async fn send_batched<R: Read>(
        &mut self,
        socket: &UdpSocket,
        dest: SocketAddr,
        chunker: &mut Chunker<R>,
    ) -> Result<()> {
        let mut batch = BatchBuilder::new(self.config.max_batch_bytes, self.config.max_batch_frames);
        let mut last_sequence: SequenceNumber = 0;

        while let Some(chunk) = chunker.next_chunk()? {
            self.stats.payload_bytes += chunk.data.len() as u64;
            last_sequence = chunk.sequence;

            let sealed = self.pipeline.seal(&chunk.data)?;
            let encoded = frame::encode_length_prefixed(&Chunk::new(chunk.sequence, sealed))?;

            if encoded.len() > self.config.max_batch_bytes {
                debug!(
                    "프레임이 배치 한도를 초과해 단독 전송: sequence={}, len={}",
                    chunk.sequence,
                    encoded.len()
                );
            }

            if let Some(full) = batch.push(&encoded) {
                self.dispatch(socket, dest, &full, chunk.sequence).await?;
            }
            self.stats.chunks_sent += 1;
        }

        if let Some(rest) = batch.flush() {
            self.dispatch(socket, dest, &rest, last_sequence).await?;
        }
        Ok(())
    }

    /// 데이터그램 하나 전송. ACK 모드면 확인될 때까지 재시도한다.
    async fn dispatch(
        &mut self,
        socket: &UdpSocket,
        dest: SocketAddr,
        datagram: &[u8],
        sequence: SequenceNumber,
    ) -> Result<()> {
        match self.config.delivery_mode {
            DeliveryMode::Stream => {
                socket.send_to(datagram, dest).await?;
                self.stats.datagrams_sent += 1;
                self.stats.wire_bytes += datagram.len() as u64;
                Ok(())
            }
            DeliveryMode::Ack => self.dispatch_acked(socket, dest, datagram, sequence).await,
        }
    }

    /// ACK 확인 전송
    ///
    /// 타임아웃마다 동일 데이터그램을 다시 보내고 대기 구간을 2배로 늘린다
    /// (상한 `ack_backoff_cap_ms`). 한도를 넘으면 명시적으로 포기한다.
    async fn dispatch_acked(
        &mut self,
        socket: &UdpSocket,
        dest: SocketAddr,
        datagram: &[u8],
        sequence: SequenceNumber,
    ) -> Result<()> {
        let mut wait = Duration::from_millis(self.config.ack_timeout_ms);
        let cap = Duration::from_millis(self.config.ack_backoff_cap_ms);
        let mut buf = [0u8; 2048];

        for attempt in 0..=self.config.ack_max_retries {
            socket.send_to(datagram, dest).await?;
            self.stats.datagrams_sent += 1;
            self.stats.wire_bytes += datagram.len() as u64;

            if attempt > 0 {
                self.stats.retries += 1;
                debug!("재전송: sequence={}, attempt={}", sequence, attempt);
            }

            let deadline = tokio::time::Instant::now() + wait;
            loop {
                match tokio::time::timeout_at(deadline, socket.recv_from(&mut buf)).await {
                    Ok(Ok((len, _addr))) => {
                        if message::is_ack(&buf[..len]) {
                            return Ok(());
                        }
                        // ACK 외 데이터그램은 무시하고 같은 데드라인으로 계속 대기
                    }
                    Ok(Err(e)) => {
                        warn!("ACK 수신 에러: {}", e);
                        break;
                    }
                    Err(_) => break, // 타임아웃 → 재전송
                }
            }

            wait = (wait * 2).min(cap);
        }

        Err(Error::AckRetriesExhausted {
            sequence,
            attempts: self.config.ack_max_retries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 스트림 모드 송신이 보낸 데이터그램을 그대로 수집하는 허수 수신 소켓
    async fn capture_datagrams(
        config: Config,
        data: &[u8],
    ) -> (Vec<Vec<u8>>, SenderStats) {
        let receiver = UdpSocket::bind(("127.0.0.1", 0)).await.unwrap();
        let dest = receiver.local_addr().unwrap();

        let mut sender = Sender::new(config);
        sender.send_bytes(data, dest).await.unwrap();

        let mut datagrams = Vec::new();
        let mut buf = vec![0u8; 65535];
        loop {
            match tokio::time::timeout(
                Duration::from_millis(200),
                receiver.recv_from(&mut buf),
            )
            .await
            {
                Ok(Ok((len, _))) => datagrams.push(buf[..len].to_vec()),
                _ => break,
            }
        }
        (datagrams, sender.stats.clone())
    }

    #[tokio::test]
    async fn test_stream_fixed_header_sends_one_frame_per_datagram() {
        let mut config = Config::default();
        config.delivery_mode = DeliveryMode::Stream;
        config.wire_format = WireFormat::FixedHeader;
        config.chunk_size = 100;

        let data = vec![3u8; 250];
        let (datagrams, stats) = capture_datagrams(config, &data).await;

        // total 컨트롤 1개 + 청크 3개
        assert_eq!(datagrams.len(), 4);
        assert_eq!(datagrams[0], b"total:3");
        assert_eq!(stats.chunks_sent, 3);

        let chunk = frame::decode_frame(WireFormat::FixedHeader, &datagrams[1]).unwrap();
        assert_eq!(chunk.sequence, 0);
        assert_eq!(chunk.data, vec![3u8; 100]);
    }

    #[tokio::test]
    async fn test_stream_batched_packs_frames() {
        let mut config = Config::default();
        config.delivery_mode = DeliveryMode::Stream;
        config.wire_format = WireFormat::LengthPrefixed;
        config.chunk_size = 100;

        let data = vec![9u8; 1000];
        let (datagrams, stats) = capture_datagrams(config, &data).await;
        assert_eq!(stats.chunks_sent, 10);

        // 컨트롤 데이터그램을 제외한 배치에서 청크 10개가 순서대로 복원돼야 한다
        let mut fb = crate::frame::FrameBuffer::new();
        for dg in datagrams.iter().filter(|d| !message::is_control(d)) {
            fb.extend(dg);
        }
        let mut sequences = Vec::new();
        while let Some(body) = fb.try_extract().unwrap() {
            sequences.push(
                frame::decode_frame(WireFormat::LengthPrefixed, &body)
                    .unwrap()
                    .sequence,
            );
        }
        assert_eq!(sequences, (0..10).collect::<Vec<u32>>());
    }

    #[tokio::test]
    async fn test_ack_mode_gives_up_after_retry_budget() {
        let mut config = Config::default();
        config.delivery_mode = DeliveryMode::Ack;
        config.wire_format = WireFormat::FixedHeader;
        config.chunk_size = 64;
        config.ack_timeout_ms = 20;
        config.ack_backoff_cap_ms = 40;
        config.ack_max_retries = 2;

        // 아무도 ACK하지 않는 주소로 전송
        let silent = UdpSocket::bind(("127.0.0.1", 0)).await.unwrap();
        let dest = silent.local_addr().unwrap();

        let mut sender = Sender::new(config);
        let err = sender.send_bytes(&[0u8; 64], dest).await.unwrap_err();
        assert!(matches!(
            err,
            Error::AckRetriesExhausted { sequence: 0, .. }
        ));
        // 최초 1회 + 재시도 2회
        assert_eq!(sender.stats.datagrams_sent, 3);
        assert_eq!(sender.stats.retries, 2);
    }
}
