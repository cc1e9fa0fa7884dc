//! UFT 수신자 바이너리
//!
//! UDP로 청크를 수신해 순서대로 파일에 기록한다.
//! - total 도달 또는 유휴 타임아웃으로 종료
//! - 누락 청크가 있어도 정상 종료하고 개수를 보고한다
//!
//! 사용법:
//!   cargo run --release --bin uft-receiver -- <PORT> <OUTPUT> [OPTIONS]
//!
//! 예시:
//!   cargo run --release --bin uft-receiver -- 30000 output.bin
//!   cargo run --release --bin uft-receiver -- 30000 output.bin --workers 8 --idle-timeout 30000

use std::fs::File;
use std::io::BufWriter;
use std::net::SocketAddr;
use std::path::PathBuf;

use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use uft::{Config, DeliveryMode, ReceiveOutcome, Receiver, WireFormat};

/// 수신자 CLI 설정
struct ReceiverArgs {
    port: u16,
    output: PathBuf,
    config: Config,
}

fn print_help() {
    println!(
        r#"UFT Receiver - UDP 파일 전송 수신자

사용법:
  cargo run --release --bin uft-receiver -- <PORT> <OUTPUT> [OPTIONS]

인자:
  <PORT>                  수신 포트 (0.0.0.0에 바인드)
  <OUTPUT>                출력 파일 경로

옵션:
  --mode <ack|stream>     신뢰성 모드, 송신자와 일치해야 함 (기본: ack)
  --wire <fixed|batch>    와이어 포맷, 송신자와 일치해야 함 (기본: batch)
  --idle-timeout <MS>     유휴 타임아웃 밀리초 (기본: 10000)
  --workers <N>           재조립 워커 수 (기본: 4)
  --key <KEY>             32바이트 복호화 키 (AES-256-CFB)
  --compress              zstd 압축 해제 활성화
  -h, --help              이 도움말 출력

예시:
  # 기본 수신
  cargo run --release --bin uft-receiver -- 30000 output.bin

  # 암호화 + 압축 수신, 워커 8개
  cargo run --release --bin uft-receiver -- 30000 output.bin --key 12345678901234567890123456789012 --compress --workers 8
"#
    );
}

fn parse_args() -> ReceiverArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut positional: Vec<String> = Vec::new();
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
            "--idle-timeout" => {
                if i + 1 < args.len() {
                    config.idle_timeout_ms = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--workers" => {
                if i + 1 < args.len() {
                    config.workers = args[i + 1].parse().expect("유효한 숫자 필요");
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
        eprintln!("<PORT>와 <OUTPUT> 인자가 필요함");
        std::process::exit(2);
    }

    ReceiverArgs {
        port: positional[0].parse().expect("유효한 포트 필요"),
        output: PathBuf::from(&positional[1]),
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

    info!("UFT Receiver starting...");
    info!("Listen port: {}", args.port);
    info!("Output: {:?}", args.output);
    info!("Mode: {:?}, Wire: {:?}", args.config.delivery_mode, args.config.wire_format);
    info!("Workers: {}, Idle timeout: {}ms", args.config.workers, args.config.idle_timeout_ms);

    // 바인드/파일 생성 실패는 데이터 수신 전 치명적 에러
    let bind_addr: SocketAddr = ([0, 0, 0, 0], args.port).into();
    let receiver = Receiver::bind(args.config, bind_addr).await?;
    let sink = BufWriter::new(File::create(&args.output)?);

    let summary = receiver.run(sink).await?;

    info!("File reassembled: {:?}", args.output);
    info!("{}", summary.report());
    match summary.outcome {
        ReceiveOutcome::Complete => info!("All chunks written"),
        ReceiveOutcome::IdleTimeout => warn!("Timeout reached, stopping reception"),
    }
    // 누락이 있어도 정상 종료 — 개수만 보고한다
    println!("Missed chunks: {}", summary.missed);

    Ok(())
}
