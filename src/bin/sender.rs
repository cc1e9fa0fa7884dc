//! UFT 송신자 바이너리
//!
//! 파일을 청크로 나눠 UDP로 전송한다.
//! - ACK 모드: 유닛마다 확인 후 전송 (기본)
//! - 스트림 모드: ACK 없이 연속 전송
//! - 샤딩: --shards N이면 base_port부터 N개 포트로 병렬 전송
//!
//! 사용법:
//!   cargo run --release --bin uft-sender -- <FILE> <HOST:PORT> [OPTIONS]
//!
//! 예시:
//!   # 기본 전송
//!   cargo run --release --bin uft-sender -- data.bin 127.0.0.1:30000
//!
//!   # 암호화 + 압축 스트림 전송
//!   cargo run --release --bin uft-sender -- data.bin 10.0.0.2:30000 --mode stream --key <32바이트 키> --compress

use std::fs::File;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;

use bytes::Bytes;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use uft::{Config, DeliveryMode, Sender, WireFormat};

/// 송신자 CLI 설정
struct SenderArgs {
    source: PathBuf,
    dest: String,
    shards: usize,
    config: Config,
}

fn print_help() {
    println!(
        r#"UFT Sender - UDP 파일 전송 송신자

사용법:
  cargo run --release --bin uft-sender -- <FILE> <HOST:PORT> [OPTIONS]

인자:
  <FILE>                  전송할 파일 경로
  <HOST:PORT>             수신자 주소

옵션:
  --mode <ack|stream>     신뢰성 모드 (기본: ack)
  --wire <fixed|batch>    와이어 포맷 (기본: batch = 길이 프리픽스 배치)
  --shards <N>            샤드 수, base_port부터 N개 포트 사용 (기본: 1)
  --key <KEY>             32바이트 암호화 키 (AES-256-CFB)
  --compress              zstd 압축 활성화
  --chunk-size <BYTES>    청크 크기 (기본: 1024)
  --ack-timeout <MS>      ACK 대기 타임아웃 밀리초 (기본: 5000)
  --retries <N>           ACK 재시도 한도 (기본: 8)
  --no-announce           total:<N> 사전 알림 생략
  -h, --help              이 도움말 출력

예시:
  # ACK 기반 전송
  cargo run --release --bin uft-sender -- data.bin 192.168.1.10:30000

  # 3개 샤드로 병렬 전송
  cargo run --release --bin uft-sender -- data.bin 192.168.1.10:30000 --shards 3

  # 암호화 + 압축
  cargo run --release --bin uft-sender -- data.bin 192.168.1.10:30000 --key 12345678901234567890123456789012 --compress
"#
    );
}

fn parse_args() -> SenderArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut positional: Vec<String> = Vec::new();
    let mut shards = 1usize;
    let mut config = Config::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--mode" => {
                if i + 1 < args.len() {
                    config.delivery_mode = match args[i + 1].as_str() {
                        "ack" => DeliveryMode::Ack,
                        "stream" => DeliveryMode::Stream,
                        other => panic!("알 수 없는 모드: {}", other),
                    };
                    i += 1;
                }
            }
            "--wire" => {
                if i + 1 < args.len() {
                    config.wire_format = match args[i + 1].as_str() {
                        "fixed" => WireFormat::FixedHeader,
                        "batch" => WireFormat::LengthPrefixed,
                        other => panic!("알 수 없는 와이어 포맷: {}", other),
                    };
                    i += 1;
                }
            }
            "--shards" => {
                if i + 1 < args.len() {
                    shards = args[i + 1].parse().expect("유효한 숫자 필요");
                    config.shard_count = shards;
                    i += 1;
                }
            }
            "--key" => {
                if i + 1 < args.len() {
                    config = config
                        .with_key(args[i + 1].as_bytes())
                        .expect("키는 32바이트여야 함");
                    i += 1;
                }
            }
            "--compress" => {
                config.compression = true;
            }
            "--chunk-size" => {
                if i + 1 < args.len() {
                    config.chunk_size = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--ack-timeout" => {
                if i + 1 < args.len() {
                    config.ack_timeout_ms = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--retries" => {
                if i + 1 < args.len() {
                    config.ack_max_retries = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--no-announce" => {
                config.announce_total = false;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    if positional.len() != 2 {
        print_help();
        eprintln!("<FILE>과 <HOST:PORT> 인자가 필요함");
        std::process::exit(2);
    }

    SenderArgs {
        source: PathBuf::from(&positional[0]),
        dest: positional[1].clone(),
        shards,
        config,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = parse_args();

    // 주소 해석 실패는 치명적 준비 에러
    let dest: SocketAddr = args
        .dest
        .to_socket_addrs()
        .map_err(|e| format!("주소 해석 실패 {}: {}", args.dest, e))?
        .next()
        .ok_or_else(|| format!("주소 해석 결과 없음: {}", args.dest))?;

    info!("UFT Sender starting...");
    info!("Source: {:?}", args.source);
    info!("Destination: {}", dest);
    info!("Mode: {:?}, Wire: {:?}", args.config.delivery_mode, args.config.wire_format);
    info!("Chunk size: {} bytes", args.config.chunk_size);
    if args.config.encryption_key.is_some() {
        info!("Encryption: AES-256-CFB");
    }
    if args.config.compression {
        info!("Compression: zstd level {}", args.config.zstd_level);
    }

    let start = std::time::Instant::now();

    if args.shards > 1 {
        // 샤딩은 범위 분할이 필요하므로 파일 전체를 메모리에 올린다
        let data = Bytes::from(std::fs::read(&args.source)?);
        info!("Loaded {} bytes, {} shards", data.len(), args.shards);
        Sender::send_sharded(args.config, data, dest.ip(), dest.port()).await?;
    } else {
        let file = File::open(&args.source)?;
        let len = file.metadata()?.len();
        let mut sender = Sender::new(args.config);
        sender.send_reader(file, Some(len), dest).await?;
    }

    info!("Total time taken: {:.2}s", start.elapsed().as_secs_f64());
    Ok(())
}
