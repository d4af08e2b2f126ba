use super::{
    output_kind, Amount, DepositData, Input, Output, SignedTransaction, Transaction, VERSION,
};
use rand::{
    distributions::{Distribution, Standard},
    Rng,
};

impl Distribution<DepositData> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> DepositData {
        DepositData {
            chain: rng.gen(),
            asset: format!("0x{}", hex::encode(rng.gen::<[u8; 20]>())),
            transaction: format!("0x{}", hex::encode(rng.gen::<[u8; 32]>())),
            index: rng.gen_range(0..4),
            amount: Amount(rng.gen_range(1..1 << 40)),
        }
    }
}

impl Distribution<Output> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Output {
        Output {
            kind: output_kind::SCRIPT,
            amount: Amount(rng.gen_range(1..1 << 40)),
            script: vec![0xff, 0xfe, 0x01],
            keys: vec![rng.gen::<crate::node::SecretKey>().public()],
        }
    }
}

impl Distribution<Transaction> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Transaction {
        Transaction {
            version: VERSION,
            asset: rng.gen(),
            inputs: vec![Input::Deposit(rng.gen())],
            outputs: vec![rng.gen()],
            extra: vec![],
        }
    }
}

impl Distribution<SignedTransaction> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> SignedTransaction {
        let key: crate::node::SecretKey = rng.gen();
        SignedTransaction::sign(rng.gen(), &[key])
    }
}
