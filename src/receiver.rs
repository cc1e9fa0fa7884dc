//! 수신자
//!
//! - 리스너 태스크: 데이터그램 분류 (컨트롤/데이터), 프레임 추출, 작업 큐 투입
//! - 워커 풀: 프레임 디코딩 → 파이프라인 역변환 → 보류 저장소 삽입
//! - 조정 루프: 연속 프리픽스 플러시, total 도달/유휴 타임아웃 종료 판정
//!
//! 상태 흐름: Listening → Draining → Finalizing → Done

use std::io::Write;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, info, warn};

use crate::assembly::PendingStore;
use crate::config::{Config, DeliveryMode, WireFormat};
use crate::error::{Error, Result};
use crate::frame::{self, FrameBuffer};
use crate::message;
use crate::pipeline::Pipeline;
use crate::stats::ReceiverStats;

/// 세션 종료 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// total 도달 (완전 수신)
    Complete,

    /// 유휴 타임아웃 (부분 수신 가능)
    IdleTimeout,
}

/// 세션 종료 요약
///
/// `missed > 0`도 정상 종료다 — 실패 대신 가시성을 택한다.
#[derive(Debug, Clone)]
pub struct ReceiveSummary {
    pub outcome: ReceiveOutcome,
    pub total_expected: Option<u32>,
    pub chunks_written: u64,
    pub bytes_written: u64,
    pub missed: u64,
    pub duplicates: u64,
    pub decode_failures: u64,
    pub elapsed: Duration,
}

impl ReceiveSummary {
    /// 요약 문자열
    pub fn report(&self) -> String {
        let expected = self
            .total_expected
            .map(|t| t.to_string())
            .unwrap_or_else(|| "?".into());
        format!(
            "Outcome: {:?} | Expected: {} | Written: {} chunks / {} bytes | Missed: {} | Duplicates: {} | Decode failures: {} | Elapsed: {:.2}s",
            self.outcome,
            expected,
            self.chunks_written,
            self.bytes_written,
            self.missed,
            self.duplicates,
            self.decode_failures,
            self.elapsed.as_secs_f64(),
        )
    }
}

/// 수신자 세션
pub struct Receiver {
    config: Config,
    socket: Arc<UdpSocket>,
}

impl Receiver {
    /// 주소에 바인드해 수신자 생성 (실패는 치명적 준비 에러)
    pub async fn bind(config: Config, addr: SocketAddr) -> Result<Self> {
        config.validate()?;
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| Error::Setup(format!("바인드 실패 {}: {}", addr, e)))?;
        Ok(Self {
            config,
            socket: Arc::new(socket),
        })
    }

    /// 실제 바인드된 로컬 주소 (포트 0 바인드 시 확인용)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// 세션 실행: 종료 판정까지 수신해 sink에 순서대로 기록
    pub async fn run<W: Write>(self, mut sink: W) -> Result<ReceiveSummary> {
        let stats = Arc::new(ReceiverStats::new());
        let store = Arc::new(PendingStore::new());
        let pipeline = Pipeline::from_config(&self.config);
        let running = Arc::new(AtomicBool::new(true));

        let (work_tx, work_rx) = mpsc::channel::<Bytes>(self.config.work_queue_size);
        let work_rx = Arc::new(Mutex::new(work_rx));
        let (ready_tx, mut ready_rx) = mpsc::channel::<u32>(self.config.work_queue_size);
        let (total_tx, mut total_rx) = watch::channel::<Option<u32>>(None);
        let (fatal_tx, mut fatal_rx) = mpsc::channel::<Error>(1);

        info!("UFT Receiver started on {}", self.socket.local_addr()?);

        // ─── 리스너 태스크 ───
        let listener = {
            let socket = self.socket.clone();
            let config = self.config.clone();
            let stats = stats.clone();
            let running = running.clone();
            tokio::spawn(async move {
                if let Err(e) = listen_loop(socket, config, work_tx, total_tx, stats, running).await
                {
                    let _ = fatal_tx.send(e).await;
                }
            })
        };

        // ─── 워커 풀 ───
        let mut workers = Vec::with_capacity(self.config.workers);
        for worker_id in 0..self.config.workers {
            let work_rx = work_rx.clone();
            let store = store.clone();
            let pipeline = pipeline.clone();
            let ready_tx = ready_tx.clone();
            let stats = stats.clone();
            let wire_format = self.config.wire_format;

            workers.push(tokio::spawn(async move {
                debug!("워커 {} 시작", worker_id);
                loop {
                    let body = { work_rx.lock().await.recv().await };
                    let Some(body) = body else { break };

                    let chunk = match frame::decode_frame(wire_format, &body) {
                        Ok(chunk) => chunk,
                        Err(e) => {
                            warn!("프레임 디코딩 실패: {}", e);
                            stats.record_decode_failure();
                            continue;
                        }
                    };

                    // 파이프라인 역변환: 압축 해제 → 복호화
                    let payload = match pipeline.open(&chunk.data) {
                        Ok(payload) => payload,
                        Err(e) => {
                            warn!("청크 {} 복원 실패: {}", chunk.sequence, e);
                            stats.record_decode_failure();
                            continue;
                        }
                    };

                    store.insert(chunk.sequence, Bytes::from(payload));
                    // 종료 중이면 신호 채널이 닫혀 있을 수 있다 — 드레인은 계속
                    let _ = ready_tx.send(chunk.sequence).await;
                }
                debug!("워커 {} 종료", worker_id);
            }));
        }
        drop(ready_tx);

        // ─── 조정 루프 ───
        let idle = Duration::from_millis(self.config.idle_timeout_ms);
        let mut bytes_written: u64 = 0;
        let mut outcome = ReceiveOutcome::IdleTimeout;
        let mut fatal: Option<Error> = None;

        'session: loop {
            // total 도달 확인 (total=0인 빈 전송 포함)
            if let Some(total) = *total_rx.borrow() {
                if store.lowest_unwritten() >= total {
                    outcome = ReceiveOutcome::Complete;
                    break 'session;
                }
            }

            tokio::select! {
                Some(e) = fatal_rx.recv() => {
                    fatal = Some(e);
                    break 'session;
                }
                changed = total_rx.changed() => {
                    if changed.is_err() {
                        // 리스너 종료: 더 올 데이터 없음
                        break 'session;
                    }
                    // 루프 선두에서 완료 조건 재평가
                }
                result = tokio::time::timeout(idle, ready_rx.recv()) => {
                    match result {
                        Ok(Some(_sequence)) => {
                            for payload in store.take_ready() {
                                if let Err(e) = sink.write_all(&payload) {
                                    fatal = Some(e.into());
                                    break 'session;
                                }
                                bytes_written += payload.len() as u64;
                            }
                        }
                        Ok(None) => break 'session,
                        Err(_) => {
                            info!("유휴 타임아웃: {:?} 동안 새 청크 없음", idle);
                            break 'session;
                        }
                    }
                }
            }
        }

        // ─── Finalizing: 새 작업 중단, 큐 드레인, 워커 합류 ───
        running.store(false, Ordering::SeqCst);
        drop(ready_rx);
        for worker in workers {
            let _ = worker.await;
        }
        drop(work_rx);
        let _ = listener.await;

        if fatal.is_none() {
            if let Ok(e) = fatal_rx.try_recv() {
                fatal = Some(e);
            }
        }
        if let Some(e) = fatal {
            return Err(e);
        }

        // 종료 직전 삽입된 연속 구간까지 기록하고 플러시
        for payload in store.take_ready() {
            sink.write_all(&payload)?;
            bytes_written += payload.len() as u64;
        }
        sink.flush()?;

        let total_expected = *total_rx.borrow();
        if let Some(total) = total_expected {
            if store.lowest_unwritten() >= total {
                outcome = ReceiveOutcome::Complete;
            }
        }

        // 수신은 했지만 청크 전부가 복원에 실패한 세션은 실패로 처리
        if store.written() == 0 && store.pending_len() == 0 && stats.decode_failures() > 0 {
            return Err(Error::AllChunksFailed);
        }

        let result = ReceiveSummary {
            outcome,
            total_expected,
            chunks_written: store.written(),
            bytes_written,
            missed: store.missed(total_expected),
            duplicates: store.duplicates(),
            decode_failures: stats.decode_failures(),
            elapsed: stats.elapsed(),
        };
        info!("세션 종료: {}", result.report());
        Ok(result)
    }
}

/// 리스너 루프: 데이터그램 분류와 프레임 추출
///
/// 치명 에러(프레임 손상)만 Err로 돌아온다. 일시적 수신 에러는 로깅 후 계속.
async fn listen_loop(
    socket: Arc<UdpSocket>,
    config: Config,
    work_tx: mpsc::Sender<Bytes>,
    total_tx: watch::Sender<Option<u32>>,
    stats: Arc<ReceiverStats>,
    running: Arc<AtomicBool>,
) -> Result<()> {
    let mut buf = vec![0u8; config.recv_buffer_size];
    let mut frame_buf = FrameBuffer::new();
    let mut announced = false;

    while running.load(Ordering::SeqCst) {
        let (len, addr) = match tokio::time::timeout(
            Duration::from_millis(10),
            socket.recv_from(&mut buf),
        )
        .await
        {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => {
                warn!("수신 에러: {}", e);
                continue;
            }
            Err(_) => continue, // 폴링 타임아웃: 종료 플래그 확인
        };

        let payload = &buf[..len];
        stats.record_datagram();

        // 컨트롤 데이터그램: total 알림 (데이터 큐에 넣지 않음)
        if message::is_control(payload) {
            match message::parse_total(payload) {
                Ok(total) => {
                    if !announced {
                        info!("총 청크 수 수신: total={}", total);
                        announced = true;
                    }
                    let _ = total_tx.send(Some(total));
                }
                Err(e) => warn!("컨트롤 메시지 무시: {}", e),
            }
            continue;
        }

        // 데이터 데이터그램 → 프레임 추출 → 작업 큐 (가득 차면 블로킹 = 백프레셔)
        match config.wire_format {
            WireFormat::FixedHeader => {
                if work_tx.send(Bytes::copy_from_slice(payload)).await.is_err() {
                    return Ok(());
                }
                stats.record_frame();
            }
            WireFormat::LengthPrefixed => {
                frame_buf.extend(payload);
                loop {
                    match frame_buf.try_extract() {
                        Ok(Some(body)) => {
                            if work_tx.send(body).await.is_err() {
                                return Ok(());
                            }
                            stats.record_frame();
                        }
                        Ok(None) => break, // 프레임 미완성: 다음 데이터그램 대기
                        Err(e) => {
                            warn!("프레임 손상, 세션 중단: {}", e);
                            return Err(e);
                        }
                    }
                }
            }
        }

        // ACK 모드: 데이터그램의 프레임이 모두 큐에 수용된 뒤 유닛 단위로 확인
        if config.delivery_mode == DeliveryMode::Ack {
            if let Err(e) = socket.send_to(message::encode_ack(), addr).await {
                warn!("ACK 전송 실패: {}", e);
            }
        }
    }

    Ok(())
}
