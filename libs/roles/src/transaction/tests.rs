use super::*;
use crate::proto;
use pretty_assertions::assert_eq;
use rand::Rng as _;

fn deposit(rng: &mut impl rand::Rng, i: u64, key: &node::SecretKey) -> SignedTransaction {
    let mut tx = Transaction::new(rng.gen());
    tx.inputs.push(Input::Deposit(DepositData {
        chain: rng.gen(),
        asset: "0xa974c709cfb4566686553a20790685a47aceaa33".into(),
        transaction: format!("0xc7c1132b58e1f64c263957d7857fe5ec5294fce95d30dcd64efef71da1{i:06}"),
        index: 0,
        amount: "100.035".parse().unwrap(),
    }));
    tx.add_script_output(vec![key.public()], vec![0xff, 0xfe, 0x01], "100.035".parse().unwrap());
    SignedTransaction::sign(tx, &[key.clone()])
}

#[test]
fn amount_parsing() {
    assert_eq!(Amount(10_003_500_000), "100.035".parse().unwrap());
    assert_eq!(Amount::whole(10_000), "10000".parse().unwrap());
    assert_eq!(Amount(1), "0.00000001".parse().unwrap());
    assert_eq!("100.03500000", Amount(10_003_500_000).to_string());
    for bad in ["", ".5", "1.", "1.000000001", "-1", "1e5", "1.2.3", "18446744073709551616"] {
        assert!(bad.parse::<Amount>().is_err(), "{bad:?}");
    }
}

#[test]
fn hash_ignores_signatures() {
    let rng = &mut rand::thread_rng();
    let (k1, k2): (node::SecretKey, node::SecretKey) = (rng.gen(), rng.gen());
    let tx = deposit(rng, 1, &k1);
    let resigned = SignedTransaction::sign(tx.transaction.clone(), &[k2]);
    assert_ne!(tx, resigned);
    assert_eq!(tx.hash(), resigned.hash());
    // Any change of the content changes the identity.
    let mut other = tx.transaction.clone();
    other.extra = vec![1];
    assert_ne!(tx.hash(), other.hash());
}

#[test]
fn proto_encoding() {
    let rng = &mut rand::thread_rng();
    let key: node::SecretKey = rng.gen();
    let tx = deposit(rng, 7, &key);
    let got: SignedTransaction = proto::decode(&proto::encode(&tx)).unwrap();
    assert_eq!(tx, got);

    let mut spend = Transaction::new(tx.transaction.asset);
    spend.inputs.push(Input::Utxo(UtxoInput {
        hash: tx.hash(),
        index: 0,
    }));
    spend.inputs.push(Input::Genesis(GenesisInput {
        network: rng.gen(),
        index: 3,
    }));
    let spend = SignedTransaction::sign(spend, &[key]);
    let got: SignedTransaction = proto::decode(&proto::encode(&spend)).unwrap();
    assert_eq!(spend, got);

    assert!(proto::decode::<SignedTransaction>(&[0xff, 0x01]).is_err());
}

#[test]
fn signature_count_must_match_inputs() {
    let rng = &mut rand::thread_rng();
    let key: node::SecretKey = rng.gen();
    let mut tx = deposit(rng, 2, &key);
    tx.signatures.push(vec![]);
    assert!(proto::decode::<SignedTransaction>(&proto::encode(&tx)).is_err());
}

#[test]
fn verify_input() {
    let rng = &mut rand::thread_rng();
    let (key, other): (node::SecretKey, node::SecretKey) = (rng.gen(), rng.gen());
    let tx = deposit(rng, 3, &key);
    tx.verify_input(0, &[key.public()]).unwrap();
    assert!(tx.verify_input(0, &[other.public()]).is_err());
    assert!(tx.verify_input(0, &[]).is_err());
    assert!(tx.verify_input(1, &[key.public()]).is_err());
}

#[test]
fn json_form() {
    let rng = &mut rand::thread_rng();
    let key: node::SecretKey = rng.gen();
    let tx = deposit(rng, 4, &key);
    let json = serde_json::to_value(&tx).unwrap();
    assert_eq!("100.03500000", json["outputs"][0]["amount"]);
    assert_eq!("fffe01", json["outputs"][0]["script"]);
    assert_eq!(0, json["outputs"][0]["type"]);
    assert_eq!(
        tx.transaction.asset.to_string(),
        json["asset"].as_str().unwrap()
    );
    assert!(json["inputs"][0]["deposit"].is_object());
    let back: SignedTransaction = serde_json::from_value(json).unwrap();
    assert_eq!(tx, back);
}
