use super::*;
use meridian_crypto::{keccak256::Keccak256, ByteFmt, Text, TextFmt};
use rand::Rng as _;

#[test]
fn byte_encoding() {
    let key = SecretKey::generate();
    assert_eq!(key, ByteFmt::decode(&ByteFmt::encode(&key)).unwrap());
    assert_eq!(
        key.public(),
        ByteFmt::decode(&ByteFmt::encode(&key.public())).unwrap()
    );
}

#[test]
fn text_encoding_is_typed() {
    let key: SecretKey = rand::thread_rng().gen();
    let secret = TextFmt::encode(&key);
    let public = TextFmt::encode(&key.public());
    assert!(secret.starts_with("node:secret:ed25519:"));
    assert!(public.starts_with("node:public:ed25519:"));
    assert_eq!(key, Text::new(&secret).decode::<SecretKey>().unwrap());
    assert_eq!(key.public(), Text::new(&public).decode().unwrap());
    // Secret and public forms are not interchangeable.
    assert!(Text::new(&secret).decode::<PublicKey>().is_err());
    assert!(Text::new(&public).decode::<SecretKey>().is_err());
}

#[test]
fn json_uses_text_form() {
    let key: SecretKey = rand::thread_rng().gen();
    let json = serde_json::to_string(&key.public()).unwrap();
    assert_eq!(format!("{:?}", TextFmt::encode(&key.public())), json);
    let back: PublicKey = serde_json::from_str(&json).unwrap();
    assert_eq!(key.public(), back);
    assert!(serde_json::from_str::<PublicKey>("\"node:public:ed25519:00\"").is_err());
}

#[test]
fn verify() {
    let rng = &mut rand::thread_rng();
    let (d1, d2): (Keccak256, Keccak256) = (rng.gen(), rng.gen());
    let (k1, k2): (SecretKey, SecretKey) = (rng.gen(), rng.gen());
    let sig = k1.sign(&d1);
    assert!(k1.public().verify(&d1, &sig).is_ok());
    assert!(k1.public().verify(&d2, &sig).is_err());
    assert!(k2.public().verify(&d1, &sig).is_err());
}
