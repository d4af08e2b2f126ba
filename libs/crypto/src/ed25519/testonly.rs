//! Random keys and signatures for tests.
use super::{SecretKey, Signature};
use ed25519_dalek as ed;
use rand::{
    distributions::{Distribution, Standard},
    Rng,
};

impl Distribution<SecretKey> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> SecretKey {
        let raw: [u8; ed::SECRET_KEY_LENGTH] = rng.gen();
        SecretKey(ed::SigningKey::from_bytes(&raw))
    }
}

impl Distribution<Signature> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Signature {
        rng.gen::<SecretKey>().sign(&rng.gen::<[u8; 8]>())
    }
}
