//! 루프백 전송 데모
//!
//! 한 프로세스 안에서 수신자와 송신자를 같이 띄워 전송 전체를 시연한다.
//!
//! 사용법:
//!   cargo run --release --example loopback_transfer -- [OPTIONS]
//!
//! 옵션:
//!   --size <KB>       테스트 데이터 크기 (기본: 1024 = 1MB)
//!   --mode <ack|stream>
//!   --wire <fixed|batch>
//!   --encrypt         AES-256-CFB 암호화 (데모용 고정 키)
//!   --compress        zstd 압축
//!   --shards <N>      샤드 수 (기본: 1)

use std::fs::File;
use std::io::BufWriter;
use std::net::{IpAddr, Ipv4Addr};

use bytes::Bytes;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use uft::{Config, DeliveryMode, Receiver, Sender, WireFormat};

/// 테스트용 텍스트 데이터 생성
fn generate_test_data(size_kb: usize) -> Vec<u8> {
    let target = size_kb * 1024;
    let mut data = Vec::with_capacity(target);

    let patterns = [
        "The quick brown fox jumps over the lazy dog. ",
        "Lorem ipsum dolor sit amet, consectetur adipiscing elit. ",
        "가나다라마바사아자차카타파하 ",
        "UFT loopback transfer demo data... ",
    ];

    let mut line = 0u64;
    while data.len() < target {
        let text = format!("[{:08}] {}\n", line, patterns[line as usize % patterns.len()]);
        data.extend_from_slice(text.as_bytes());
        line += 1;
    }
    data.truncate(target);
    data
}

fn parse_args() -> (usize, usize, Config) {
    let args: Vec<String> = std::env::args().collect();
    let mut size_kb = 1024usize;
    let mut shards = 1usize;
    let mut config = Config::default();
    config.ack_timeout_ms = 1000;
    config.idle_timeout_ms = 3000;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--size" => {
                if i + 1 < args.len() {
                    size_kb = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--mode" => {
                if i + 1 < args.len() {
                    config.delivery_mode = match args[i + 1].as_str() {
                        "stream" => DeliveryMode::Stream,
                        _ => DeliveryMode::Ack,
                    };
                    i += 1;
                }
            }
            "--wire" => {
                if i + 1 < args.len() {
                    config.wire_format = match args[i + 1].as_str() {
                        "fixed" => WireFormat::FixedHeader,
                        _ => WireFormat::LengthPrefixed,
                    };
                    i += 1;
                }
            }
            "--encrypt" => {
                config = config
                    .with_key(b"demo-key-demo-key-demo-key-demo!")
                    .expect("데모 키는 32바이트");
            }
            "--compress" => {
                config.compression = true;
            }
            "--shards" => {
                if i + 1 < args.len() {
                    shards = args[i + 1].parse().expect("유효한 숫자 필요");
                    config.shard_count = shards;
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }

    (size_kb, shards, config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let (size_kb, shards, config) = parse_args();
    let data = generate_test_data(size_kb);
    info!("Test data: {} bytes", data.len());
    info!(
        "Mode: {:?}, Wire: {:?}, Shards: {}, Encrypt: {}, Compress: {}",
        config.delivery_mode,
        config.wire_format,
        shards,
        config.encryption_key.is_some(),
        config.compression
    );

    let dir = tempfile::tempdir()?;
    let start = std::time::Instant::now();

    let reassembled = if shards > 1 {
        // 샤드 수신자들을 연속 포트에 바인드
        let base_port = 47311u16;
        let mut tasks = Vec::new();
        let mut paths = Vec::new();
        for i in 0..shards as u16 {
            let receiver = Receiver::bind(
                config.clone(),
                (Ipv4Addr::LOCALHOST, base_port + i).into(),
            )
            .await?;
            let path = dir.path().join(format!("shard_{}.bin", i));
            let sink = BufWriter::new(File::create(&path)?);
            paths.push(path);
            tasks.push(tokio::spawn(async move { receiver.run(sink).await }));
        }

        let stats = Sender::send_sharded(
            config,
            Bytes::from(data.clone()),
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            base_port,
        )
        .await?;
        info!("Sender: {}", stats.summary());

        let mut reassembled = Vec::new();
        for (task, path) in tasks.into_iter().zip(&paths) {
            let summary = task.await??;
            info!("Receiver: {}", summary.report());
            reassembled.extend(std::fs::read(path)?);
        }
        reassembled
    } else {
        let receiver = Receiver::bind(config.clone(), "127.0.0.1:0".parse()?).await?;
        let dest = receiver.local_addr()?;
        let path = dir.path().join("output.bin");
        let sink = BufWriter::new(File::create(&path)?);
        let recv_task = tokio::spawn(async move { receiver.run(sink).await });

        let mut sender = Sender::new(config);
        sender.send_bytes(&data, dest).await?;
        info!("Sender: {}", sender.stats().summary());

        let summary = recv_task.await??;
        info!("Receiver: {}", summary.report());
        std::fs::read(&path)?
    };

    let elapsed = start.elapsed();
    if reassembled == data {
        info!("Verification OK: {} bytes identical", reassembled.len());
    } else {
        info!(
            "Verification FAILED: {} bytes received, {} expected",
            reassembled.len(),
            data.len()
        );
    }
    info!(
        "Total: {:.2}s, {:.2} MB/s",
        elapsed.as_secs_f64(),
        data.len() as f64 / elapsed.as_secs_f64() / 1_000_000.0
    );

    Ok(())
}
