use super::*;
use crate::{node, proto};
use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use rand::Rng as _;

#[test]
fn thresholds() {
    for (n, want) in [(1, 1), (2, 2), (3, 3), (4, 3), (7, 5), (10, 7)] {
        assert_eq!(want, threshold(n), "n = {n}");
    }
}

#[test]
fn committee_rejects_invalid_sets() {
    let rng = &mut rand::thread_rng();
    let key = rng.gen::<node::SecretKey>().public();
    assert!(Committee::new(Vec::<node::PublicKey>::new()).is_err());
    assert!(Committee::new([key, key]).is_err());
    let c = Committee::new([key]).unwrap();
    assert!(c.contains(&key));
    assert_eq!(1, c.threshold());
}

#[test]
fn hash_ignores_committee_signatures() {
    let rng = &mut rand::thread_rng();
    let mut s: Snapshot = rng.gen();
    let hash = s.hash();
    let key: node::SecretKey = rng.gen();
    s.signatures.push(s.sign(&key));
    assert_eq!(hash, s.hash());
    s.transaction.transaction.extra = vec![7];
    assert_ne!(hash, s.hash());
}

#[test]
fn merge_keeps_one_signature_per_signer() {
    let rng = &mut rand::thread_rng();
    let keys: Vec<node::SecretKey> = (0..3).map(|_| rng.gen()).collect();
    let mut s: Snapshot = rng.gen();
    let sigs: Vec<_> = keys.iter().map(|k| s.sign(k)).collect();
    assert_eq!(2, s.merge_signatures(sigs[..2].iter().copied()));
    assert_eq!(1, s.merge_signatures(sigs.iter().copied()));
    assert_eq!(0, s.merge_signatures(sigs.iter().copied()));
    assert_eq!(3, s.signatures.len());
    for k in &keys {
        assert!(s.is_signed_by(&k.public()));
    }
}

#[test]
fn verify_and_finality() {
    let rng = &mut rand::thread_rng();
    let keys: Vec<node::SecretKey> = (0..7).map(|_| rng.gen()).collect();
    let committee = Committee::new(keys.iter().map(|k| k.public())).unwrap();
    let mut s: Snapshot = rng.gen();
    for (i, k) in keys.iter().enumerate() {
        assert_eq!(i >= 5, s.is_final(&committee), "{i} signatures");
        s.signatures.push(s.sign(k));
        s.verify(&committee).unwrap();
    }

    // Outsider.
    let mut bad = s.clone();
    bad.signatures.push(bad.sign(&rng.gen()));
    assert!(bad.verify(&committee).is_err());

    // Signature over a different snapshot.
    let mut bad = s.clone();
    let other: Snapshot = rng.gen();
    bad.signatures[0] = other.sign(&keys[0]);
    assert!(bad.verify(&committee).is_err());
    assert_matches!(bad.verify_signature(&bad.signatures[0]), Err(_));

    // Duplicate signer.
    let mut bad = s.clone();
    bad.signatures.push(s.signatures[0]);
    assert!(bad.verify(&committee).is_err());
}

#[test]
fn proto_encoding() {
    let rng = &mut rand::thread_rng();
    let mut s: Snapshot = rng.gen();
    let key: node::SecretKey = rng.gen();
    s.signatures.push(s.sign(&key));
    let got: Snapshot = proto::decode(&proto::encode(&s)).unwrap();
    assert_eq!(s, got);
    assert_eq!(s.hash(), got.hash());
}

#[test]
fn genesis_snapshots() {
    let rng = &mut rand::thread_rng();
    let (genesis, keys) = testonly::localnet(rng, 7);
    genesis.verify().unwrap();
    assert_eq!(7, genesis.committee().unwrap().len());

    let snapshots = genesis.snapshots();
    assert_eq!(8, snapshots.len());
    // Deterministic and unique.
    assert_eq!(snapshots, genesis.snapshots());
    let hashes: std::collections::BTreeSet<_> = snapshots.iter().map(|s| s.hash()).collect();
    assert_eq!(8, hashes.len());
    assert_eq!(
        keys[3].public(),
        snapshots[3].transaction.transaction.outputs[0].keys[0]
    );

    let json = serde_json::to_string(&genesis).unwrap();
    let back: Genesis = serde_json::from_str(&json).unwrap();
    assert_eq!(genesis.network_id(), back.network_id());

    let mut other = genesis.clone();
    other.epoch += 1;
    assert_ne!(genesis.network_id(), other.network_id());

    let mut dup = genesis.clone();
    dup.nodes.push(dup.nodes[0].clone());
    assert!(dup.verify().is_err());
}
