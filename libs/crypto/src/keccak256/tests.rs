use super::*;
use rand::Rng as _;

#[test]
fn known_digests() {
    assert_eq!(
        "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470",
        Keccak256::new(b"").to_hex()
    );
    assert_eq!(
        "4e03657aea45a94fc7d47ba826c8d667c0d1e6e33a64a036ec44f58fa12d6c45",
        Keccak256::new(b"abc").to_hex()
    );
}

#[test]
fn chain_equals_concatenation() {
    assert_eq!(
        Keccak256::new(b"snapshot-queue"),
        Keccak256::chain([b"snapshot".as_slice(), b"-".as_slice(), b"queue".as_slice()])
    );
}

#[test]
fn text_encoding() {
    let h: Keccak256 = rand::thread_rng().gen();
    let s = TextFmt::encode(&h);
    assert_eq!(64, s.len());
    assert_eq!(h, Text::new(&s).decode::<Keccak256>().unwrap());
    assert_eq!(s, h.to_string());
    assert!(Text::new("abcd").decode::<Keccak256>().is_err());
    assert!(Text::new("zz").decode::<Keccak256>().is_err());
}
