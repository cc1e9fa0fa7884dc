//! 재조립 보류 저장소
//!
//! 수신했지만 아직 기록하지 못한 청크를 시퀀스별로 보관한다.
//! 저장소와 커서는 뮤텍스 하나 뒤에 함께 있으며, 잠금을 내장한
//! 메서드로만 접근할 수 있다 — 불변식을 우회하는 경로가 없다.
//!
//! 불변식:
//! - 저장소에 있는 시퀀스는 아직 싱크에 기록되지 않았다
//! - 꺼낸(플러시한) 시퀀스는 제거되며 다시 삽입되지 않는다
//! - 커서(`lowest_unwritten`)는 증가만 한다

use std::collections::HashMap;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::chunk::SequenceNumber;

struct Inner {
    /// 시퀀스 → 페이로드 (기록 전 청크만 존재)
    pending: HashMap<SequenceNumber, Bytes>,

    /// 다음 연속 기록 대상 시퀀스
    lowest_unwritten: SequenceNumber,

    /// 꺼내어 기록된 청크 수
    written: u64,

    /// 중복 수신으로 버린 수
    duplicates: u64,
}

/// 수신 청크 보류 저장소 + 연속 커서
pub struct PendingStore {
    inner: Mutex<Inner>,
}

impl PendingStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                pending: HashMap::new(),
                lowest_unwritten: 0,
                written: 0,
                duplicates: 0,
            }),
        }
    }

    /// 청크 삽입. 이미 기록됐거나 보류 중인 시퀀스는 무시한다 (멱등).
    ///
    /// 반환값: 새로 삽입됐으면 true
    pub fn insert(&self, sequence: SequenceNumber, payload: Bytes) -> bool {
        let mut inner = self.inner.lock();
        if sequence < inner.lowest_unwritten || inner.pending.contains_key(&sequence) {
            inner.duplicates += 1;
            return false;
        }
        inner.pending.insert(sequence, payload);
        true
    }

    /// 커서에서 이어지는 연속 구간을 순서대로 꺼내고 커서를 전진시킨다
    ///
    /// 반환된 페이로드는 저장소에서 제거된 상태이며, 호출자가 잠금 밖에서
    /// 싱크에 기록한다. 첫 번째 빈 시퀀스에서 멈춘다.
    pub fn take_ready(&self) -> Vec<Bytes> {
        let mut inner = self.inner.lock();
        let mut run = Vec::new();
        loop {
            let next = inner.lowest_unwritten;
            match inner.pending.remove(&next) {
                Some(payload) => {
                    run.push(payload);
                    inner.lowest_unwritten += 1;
                    inner.written += 1;
                }
                None => break,
            }
        }
        run
    }

    /// 현재 커서 (다음 기대 시퀀스)
    pub fn lowest_unwritten(&self) -> SequenceNumber {
        self.inner.lock().lowest_unwritten
    }

    /// 꺼내어 기록된 청크 수
    pub fn written(&self) -> u64 {
        self.inner.lock().written
    }

    /// 중복 수신 수
    pub fn duplicates(&self) -> u64 {
        self.inner.lock().duplicates
    }

    /// 보류 중 청크 수 (갭 뒤에 고립된 청크 포함)
    pub fn pending_len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    /// 종료 시 누락 집계
    ///
    /// total을 알면 `total - written` (미수신 + 연속 도달 실패 포함),
    /// 모르면 갭 뒤에 고립된 보류 잔량을 센다.
    pub fn missed(&self, total_expected: Option<u32>) -> u64 {
        let inner = self.inner.lock();
        match total_expected {
            Some(total) => (total as u64).saturating_sub(inner.written),
            None => inner.pending.len() as u64,
        }
    }
}

impl Default for PendingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(tag: u8) -> Bytes {
        Bytes::from(vec![tag; 8])
    }

    #[test]
    fn test_in_order_flush() {
        let store = PendingStore::new();
        store.insert(0, payload(0));
        store.insert(1, payload(1));

        let run = store.take_ready();
        assert_eq!(run.len(), 2);
        assert_eq!(store.lowest_unwritten(), 2);
        assert_eq!(store.written(), 2);
        assert_eq!(store.pending_len(), 0);
    }

    #[test]
    fn test_out_of_order_arrival_flushes_longest_prefix() {
        let store = PendingStore::new();

        // 3, 0, 2 순서로 도착
        store.insert(3, payload(3));
        assert!(store.take_ready().is_empty());

        store.insert(0, payload(0));
        let run = store.take_ready();
        assert_eq!(run.len(), 1);
        assert_eq!(run[0], payload(0));

        store.insert(2, payload(2));
        assert!(store.take_ready().is_empty());
        assert_eq!(store.lowest_unwritten(), 1);

        // 1이 도착하면 1, 2, 3이 한꺼번에 나온다
        store.insert(1, payload(1));
        let run = store.take_ready();
        assert_eq!(run, vec![payload(1), payload(2), payload(3)]);
        assert_eq!(store.lowest_unwritten(), 4);
    }

    #[test]
    fn test_duplicate_insert_is_noop() {
        let store = PendingStore::new();

        assert!(store.insert(0, payload(0)));
        assert!(!store.insert(0, payload(9)));

        let run = store.take_ready();
        assert_eq!(run, vec![payload(0)]);

        // 이미 기록된 시퀀스 재삽입도 무시
        assert!(!store.insert(0, payload(9)));
        assert!(store.take_ready().is_empty());
        assert_eq!(store.written(), 1);
        assert_eq!(store.duplicates(), 2);
    }

    #[test]
    fn test_arbitrary_permutation_yields_ascending_prefix() {
        let store = PendingStore::new();
        let order = [7u32, 2, 5, 0, 9, 1, 4, 3, 8, 6];

        let mut written = Vec::new();
        for &seq in &order {
            store.insert(seq, Bytes::from(vec![seq as u8]));
            for p in store.take_ready() {
                written.push(p[0] as u32);
            }
        }

        // 최종 출력은 0..10 오름차순, 중복 없음
        assert_eq!(written, (0..10).collect::<Vec<_>>());
        assert_eq!(store.written(), 10);
    }

    #[test]
    fn test_gap_strands_tail_and_missed_accounting() {
        let store = PendingStore::new();

        // 10개 중 시퀀스 3만 누락
        for seq in (0..10u32).filter(|&s| s != 3) {
            store.insert(seq, Bytes::from(vec![seq as u8]));
        }

        let run = store.take_ready();
        assert_eq!(run.len(), 3); // 0, 1, 2
        assert_eq!(store.lowest_unwritten(), 3);
        assert_eq!(store.pending_len(), 6); // 4..10 고립

        // total을 알면 미수신 3 + 고립 6 = 7
        assert_eq!(store.missed(Some(10)), 7);
        // total을 모르면 고립 잔량만
        assert_eq!(store.missed(None), 6);
    }

    #[test]
    fn test_missed_zero_on_complete() {
        let store = PendingStore::new();
        for seq in 0..5u32 {
            store.insert(seq, payload(seq as u8));
        }
        store.take_ready();
        assert_eq!(store.missed(Some(5)), 0);
    }
}
