/// Byte a writer fills its slot with for its `seq`-th write. Never 0, so a
/// slot that was never written cannot pass [`verify`].
#[inline]
pub fn stamp(writer: usize, seq: u64) -> u8 {
    let mixed = (writer as u64).wrapping_mul(31).wrapping_add(seq);
    (mixed % 255) as u8 + 1
}

/// True if every byte of `payload` carries the same non-zero stamp.
#[inline]
pub fn verify(payload: &[u8]) -> bool {
    payload
        .first()
        .is_some_and(|&first| first != 0 && payload.iter().all(|&b| b == first))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamp_is_never_zero() {
        for writer in 0..8 {
            for seq in 0..1_024 {
                assert_ne!(stamp(writer, seq), 0, "writer {writer} seq {seq}");
            }
        }
    }

    #[test]
    fn consecutive_writes_change_stamp() {
        assert_ne!(stamp(0, 0), stamp(0, 1));
        assert_ne!(stamp(0, 0), stamp(1, 0));
    }

    #[test]
    fn uniform_payload_verifies() {
        assert!(verify(&[7; 500]));
        assert!(verify(&[1]));
    }

    #[test]
    fn mixed_payload_fails() {
        let mut payload = [7u8; 500];
        payload[250] = 8;
        assert!(!verify(&payload));
    }

    #[test]
    fn unwritten_payload_fails() {
        assert!(!verify(&[0; 16]));
        assert!(!verify(&[]));
    }
}
