//! End-to-end tests: key generation, signing, verification, and the byte
//! formats, on the lifetime-2^8 instantiation.

use gxmss_core::serialization::ssz;
use gxmss_core::{
    hash_message_to_digest, PublicKey, SecretKey, Serializable, Signature, XmssLifetime8,
    XmssError,
};

const SEED: [u8; 32] = [0x42; 32];

fn seed_from_hex(hex_seed: &str) -> [u8; 32] {
    let bytes = hex::decode(hex_seed).expect("valid hex seed");
    bytes.as_slice().try_into().expect("32-byte seed")
}

#[test]
fn full_lifetime_sign_verify_round_trip() {
    let (pk, sk) = XmssLifetime8::key_gen(&SEED, 0, 256).unwrap();
    let message = hash_message_to_digest(b"hello world");

    let sig = XmssLifetime8::sign(&sk, 0, &message).unwrap();
    assert!(XmssLifetime8::verify(&pk, 0, &message, &sig));

    let wrong = hash_message_to_digest(b"goodbye world");
    assert!(!XmssLifetime8::verify(&pk, 0, &wrong, &sig));
}

#[test]
fn hex_seed_matches_raw_seed() {
    let hex_seed = seed_from_hex("4242424242424242424242424242424242424242424242424242424242424242");
    assert_eq!(hex_seed, SEED);

    let (pk_a, _) = XmssLifetime8::key_gen(&hex_seed, 0, 16).unwrap();
    let (pk_b, _) = XmssLifetime8::key_gen(&SEED, 0, 16).unwrap();
    assert_eq!(pk_a, pk_b);
}

#[test]
fn signature_survives_bincode_round_trip() {
    let (pk, sk) = XmssLifetime8::key_gen(&SEED, 0, 16).unwrap();
    let message = hash_message_to_digest(b"wire format check");
    let sig = XmssLifetime8::sign(&sk, 7, &message).unwrap();

    let pk_bytes = pk.to_bytes().unwrap();
    let sig_bytes = sig.to_bytes().unwrap();

    let pk_back = PublicKey::<8>::from_bytes(&pk_bytes).unwrap();
    let sig_back = Signature::<8, 7>::from_bytes(&sig_bytes).unwrap();
    assert_eq!(pk_back, pk);
    assert_eq!(sig_back, sig);
    assert!(XmssLifetime8::verify(&pk_back, 7, &message, &sig_back));
}

#[test]
fn secret_key_survives_bincode_round_trip_and_still_signs() {
    let (pk, sk) = XmssLifetime8::key_gen(&SEED, 0, 16).unwrap();
    let sk_back = SecretKey::<8>::from_bytes(&sk.to_bytes().unwrap()).unwrap();
    assert_eq!(sk_back, sk);

    let message = hash_message_to_digest(b"restored key");
    let sig = XmssLifetime8::sign(&sk_back, 9, &message).unwrap();
    assert!(XmssLifetime8::verify(&pk, 9, &message, &sig));
}

#[test]
fn ssz_signature_container_is_3116_bytes() {
    let (pk, sk) = XmssLifetime8::key_gen(&SEED, 0, 16).unwrap();
    let message = hash_message_to_digest(b"ssz container");
    let sig = XmssLifetime8::sign(&sk, 2, &message).unwrap();

    let bytes = XmssLifetime8::signature_to_ssz(&sig);
    assert_eq!(bytes.len(), 3116);
    assert_eq!(bytes.len(), XmssLifetime8::SIGNATURE_SSZ_LEN);

    let back = XmssLifetime8::signature_from_ssz(&bytes).unwrap();
    assert_eq!(back, sig);
    assert!(XmssLifetime8::verify(&pk, 2, &message, &back));
}

#[test]
fn ssz_key_round_trips() {
    let (pk, sk) = XmssLifetime8::key_gen(&SEED, 32, 16).unwrap();

    let pk_back = ssz::public_key_from_bytes::<8>(&ssz::public_key_to_bytes(&pk)).unwrap();
    assert_eq!(pk_back, pk);

    let sk_back = ssz::secret_key_from_bytes::<8>(&ssz::secret_key_to_bytes(&sk)).unwrap();
    assert_eq!(sk_back, sk);
}

#[test]
fn epoch_exhaustion_reports_key_not_active() {
    let (_, sk) = XmssLifetime8::key_gen(&SEED, 100, 10).unwrap();
    let message = hash_message_to_digest(b"exhausted");
    assert!(matches!(
        XmssLifetime8::sign(&sk, 110, &message),
        Err(XmssError::KeyNotActive { epoch: 110, .. })
    ));
}

#[test]
fn last_epoch_of_a_full_lifetime_key_signs() {
    let (pk, mut sk) = XmssLifetime8::key_gen(&SEED, 224, 32).unwrap();
    let message = hash_message_to_digest(b"final epoch");

    // The activation window [224, 256) is exactly the prepared window.
    let sig = XmssLifetime8::sign(&sk, 255, &message).unwrap();
    assert!(XmssLifetime8::verify(&pk, 255, &message, &sig));

    // Advancing at the end of the window is a no-op.
    XmssLifetime8::advance_preparation(&mut sk).unwrap();
    let again = XmssLifetime8::sign(&sk, 255, &message).unwrap();
    assert_eq!(again.path, sig.path);
}
