//! 컨트롤/ACK 데이터그램
//!
//! 데이터 프레임이 아닌 메시지는 두 가지뿐이다:
//! - `total:<N>` — 총 청크 수 알림, 데이터 전송 전 1회
//! - `ACK` — 유닛 수신 확인 (선두 일치, 뒤따르는 바이트는 무시)

use crate::error::{Error, Result};
use crate::{ACK_TOKEN, CONTROL_PREFIX};

/// `total:<N>` 컨트롤 페이로드 인코딩
pub fn encode_total(total: u32) -> Vec<u8> {
    format!("total:{}", total).into_bytes()
}

/// 컨트롤 데이터그램 여부 (프리픽스 일치)
pub fn is_control(payload: &[u8]) -> bool {
    payload.starts_with(CONTROL_PREFIX)
}

/// `total:` 컨트롤 페이로드 파싱
pub fn parse_total(payload: &[u8]) -> Result<u32> {
    if !is_control(payload) {
        return Err(Error::InvalidControl("total: 프리픽스 없음".into()));
    }
    let digits = &payload[CONTROL_PREFIX.len()..];
    let text = std::str::from_utf8(digits)
        .map_err(|_| Error::InvalidControl("total 페이로드가 UTF-8이 아님".into()))?;
    text.trim()
        .parse::<u32>()
        .map_err(|_| Error::InvalidControl(format!("total 숫자 파싱 실패: {:?}", text)))
}

/// ACK 데이터그램 여부 (선두 일치, 트레일링 바이트 무시)
pub fn is_ack(payload: &[u8]) -> bool {
    payload.starts_with(ACK_TOKEN)
}

/// ACK 페이로드
pub fn encode_ack() -> &'static [u8] {
    ACK_TOKEN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_roundtrip() {
        let payload = encode_total(1234);
        assert_eq!(payload, b"total:1234");
        assert!(is_control(&payload));
        assert_eq!(parse_total(&payload).unwrap(), 1234);
    }

    #[test]
    fn test_total_zero() {
        assert_eq!(parse_total(&encode_total(0)).unwrap(), 0);
    }

    #[test]
    fn test_malformed_total() {
        assert!(parse_total(b"total:").is_err());
        assert!(parse_total(b"total:abc").is_err());
        assert!(parse_total(b"total:-3").is_err());
    }

    #[test]
    fn test_data_is_not_control() {
        assert!(!is_control(b"xtotal:5"));
        assert!(!is_control(b"ACK"));
        // "total:"로 시작하기만 하면 컨트롤로 분류된다
        assert!(is_control(b"total:junk"));
    }

    #[test]
    fn test_ack_ignores_trailing_bytes() {
        assert!(is_ack(b"ACK"));
        assert!(is_ack(b"ACK\0\0garbage"));
        assert!(!is_ack(b"NAK"));
        assert!(!is_ack(b"AC"));
    }
}
