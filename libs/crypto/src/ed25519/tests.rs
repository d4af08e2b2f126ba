use super::*;
use rand::Rng as _;

#[test]
fn rfc8032_vector() {
    // RFC 8032, section 7.1, TEST 2.
    let sk = hex::decode("4ccd089b28ff96da9db6c346ec114e0f5b8a319f35aba624da8cf6ed4fb8a6fb")
        .unwrap();
    let pk = hex::decode("3d4017c3e843895a92b70aa74d1b7ebc9c982ccf2ec4968cc0cd55f12af4660c")
        .unwrap();
    let sig = hex::decode(
        "92a009a9f0d4cab8720e820b5f642540a2b27b5416503f8fb3762223ebdb69da\
         085ac1e43e15996e458f3613d0f11d8c387b2eaeb4302aeeb00d291612bb0c00",
    )
    .unwrap();
    let sk = <SecretKey as ByteFmt>::decode(&sk).unwrap();
    assert_eq!(pk, ByteFmt::encode(&sk.public()));
    let got = sk.sign(&[0x72]);
    assert_eq!(sig, ByteFmt::encode(&got));
    sk.public().verify(&[0x72], &got).unwrap();
}

#[test]
fn verify_rejects_tampering() {
    let rng = &mut rand::thread_rng();
    let sk: SecretKey = rng.gen();
    let other: SecretKey = rng.gen();
    let sig = sk.sign(b"snapshot");
    assert!(sk.public().verify(b"snapshot", &sig).is_ok());
    assert_eq!(
        Err(InvalidSignatureError),
        sk.public().verify(b"snapshoT", &sig)
    );
    assert_eq!(
        Err(InvalidSignatureError),
        other.public().verify(b"snapshot", &sig)
    );
}

#[test]
fn byte_encoding() {
    let rng = &mut rand::thread_rng();
    let sk: SecretKey = rng.gen();
    let pk = sk.public();
    let decoded: PublicKey = ByteFmt::decode(&ByteFmt::encode(&pk)).unwrap();
    assert_eq!(pk, decoded);
    let sig: Signature = rng.gen();
    let decoded: Signature = ByteFmt::decode(&ByteFmt::encode(&sig)).unwrap();
    assert_eq!(sig, decoded);
    assert!(<PublicKey as ByteFmt>::decode(&[1, 2, 3]).is_err());
}
