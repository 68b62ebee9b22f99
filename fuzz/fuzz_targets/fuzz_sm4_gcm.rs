#![no_main]
use gmcore_crypto::modes::gcm::Sm4Gcm;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 29 {
        return;
    }
    let (key, rest) = data.split_at(16);
    let (iv, rest) = rest.split_at(12);
    let split = rest.len() / 2;
    let (aad, plaintext) = rest.split_at(split);

    let gcm = Sm4Gcm::new(key).unwrap();
    let (ciphertext, tag) = gcm.seal(iv, aad, plaintext).unwrap();
    assert_eq!(ciphertext.len(), plaintext.len());

    let recovered = gcm.open(iv, aad, &ciphertext, &tag).unwrap();
    assert_eq!(recovered, plaintext);

    // Any single corrupted ciphertext byte must fail authentication.
    if !ciphertext.is_empty() {
        let mut tampered = ciphertext.clone();
        tampered[0] ^= 1;
        assert!(gcm.open(iv, aad, &tampered, &tag).is_err());
    }
});
