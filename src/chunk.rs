//! 청크 분할
//!
//! - Chunk: 시퀀스 번호가 붙은 전송 단위
//! - Chunker: 바이트 소스를 고정 크기 청크 열로 분할

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// 시퀀스 번호 (32비트, 전송 또는 샤드 내에서 0부터 조밀 증가)
pub type SequenceNumber = u32;

/// 청크 (전송 단위)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// 시퀀스 번호
    pub sequence: SequenceNumber,

    /// 페이로드
    pub data: Vec<u8>,
}

impl Chunk {
    /// 새 청크 생성
    pub fn new(sequence: SequenceNumber, data: Vec<u8>) -> Self {
        Self { sequence, data }
    }
}

/// 바이트 소스를 청크 열로 분할하는 리더
///
/// 소스를 정확히 한 번씩 빠짐없이 덮으며, 마지막 청크만 짧을 수 있다.
pub struct Chunker<R> {
    source: R,
    chunk_size: usize,
    next_sequence: SequenceNumber,
    done: bool,
}

impl<R: Read> Chunker<R> {
    pub fn new(source: R, chunk_size: usize) -> Self {
        Self {
            source,
            chunk_size,
            next_sequence: 0,
            done: false,
        }
    }

    /// 다음 청크 읽기 (소스 끝이면 None, 읽기 실패는 치명 에러)
    pub fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        if self.done {
            return Ok(None);
        }

        let mut buf = vec![0u8; self.chunk_size];
        let mut filled = 0;

        // read()는 요청보다 적게 반환할 수 있으므로 청크가 차거나 EOF까지 반복
        while filled < self.chunk_size {
            let n = self.source.read(&mut buf[filled..])?;
            if n == 0 {
                self.done = true;
                break;
            }
            filled += n;
        }

        if filled == 0 {
            return Ok(None);
        }

        buf.truncate(filled);
        let chunk = Chunk::new(self.next_sequence, buf);
        self.next_sequence += 1;
        Ok(Some(chunk))
    }

    /// 지금까지 생성한 청크 수
    pub fn produced(&self) -> u32 {
        self.next_sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_chunks(data: &[u8], chunk_size: usize) -> Vec<Chunk> {
        let mut chunker = Chunker::new(data, chunk_size);
        let mut chunks = Vec::new();
        while let Some(chunk) = chunker.next_chunk().unwrap() {
            chunks.push(chunk);
        }
        chunks
    }

    #[test]
    fn test_split_exact_cover() {
        let data: Vec<u8> = (0..250u32).map(|i| (i % 256) as u8).collect();
        let chunks = collect_chunks(&data, 100);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].sequence, 0);
        assert_eq!(chunks[1].sequence, 1);
        assert_eq!(chunks[2].sequence, 2);
        assert_eq!(chunks[0].data.len(), 100);
        assert_eq!(chunks[1].data.len(), 100);
        assert_eq!(chunks[2].data.len(), 50);

        let rejoined: Vec<u8> = chunks.into_iter().flat_map(|c| c.data).collect();
        assert_eq!(rejoined, data);
    }

    #[test]
    fn test_split_5000_bytes_into_1024_chunks() {
        let data = vec![0xA5u8; 5000];
        let chunks = collect_chunks(&data, 1024);

        // 5,000바이트 → 4개 만 청크 + 904바이트 꼬리
        assert_eq!(chunks.len(), 5);
        assert!(chunks[..4].iter().all(|c| c.data.len() == 1024));
        assert_eq!(chunks[4].data.len(), 904);
    }

    #[test]
    fn test_empty_source() {
        let chunks = collect_chunks(&[], 100);
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_chunk_boundary_exact_multiple() {
        let data = vec![1u8; 200];
        let chunks = collect_chunks(&data, 100);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].data.len(), 100);
    }
}
