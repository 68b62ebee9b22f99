//! Integration tests for gmcore.
//! End-to-end roundtrip and regression tests through the public API.

#[cfg(test)]
mod tests {
    use gmcore_crypto::cipher::Aead;
    use gmcore_crypto::modes::gcm::{sm4_gcm_decrypt, sm4_gcm_encrypt, Sm4Gcm};
    use gmcore_crypto::sm4::Sm4Key;
    use gmcore_types::CryptoError;

    fn hex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    fn to_hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    // -------------------------------------------------------
    // 1. Pinned end-to-end SM4-GCM regression fixture
    // -------------------------------------------------------
    #[test]
    fn test_sm4_gcm_regression_fixture() {
        let key = hex("0123456789abcdeffedcba9876543210");
        let iv = hex("00112233445566778899aabb");
        let aad = b"hello";
        let plaintext = hex("00112233445566778899aabbccddeeff0011");

        let gcm = Sm4Gcm::new(&key).unwrap();
        let (ciphertext, tag) = gcm.seal(&iv, aad, &plaintext).unwrap();

        assert_eq!(ciphertext.len(), plaintext.len());
        assert_eq!(to_hex(&ciphertext), "acb4ff6928908267da76ca895115e2002457");
        assert_eq!(to_hex(&tag), "da2f78f4e3c786201941b69b15c7ffeb");

        let recovered = gcm.open(&iv, aad, &ciphertext, &tag).unwrap();
        assert_eq!(recovered, plaintext);
    }

    // -------------------------------------------------------
    // 2. Raw block API against the standard known answer
    // -------------------------------------------------------
    #[test]
    fn test_sm4_block_known_answer() {
        let key = Sm4Key::new(&hex("0123456789abcdeffedcba9876543210")).unwrap();

        let mut block: [u8; 16] = hex("0123456789abcdeffedcba9876543210").try_into().unwrap();
        key.encrypt_block(&mut block).unwrap();
        assert_eq!(to_hex(&block), "681edf34d206965e86b3e94f536e4246");
    }

    // -------------------------------------------------------
    // 3. AEAD trait object with appended-tag framing
    // -------------------------------------------------------
    #[test]
    fn test_aead_trait_object() {
        let mut gcm = Sm4Gcm::new(&[0u8; 16]).unwrap();
        gcm.set_key(&[0x24u8; 16]).unwrap();
        let aead: &dyn Aead = &gcm;

        assert_eq!(aead.tag_size(), 16);
        assert_eq!(aead.nonce_size(), 12);
        assert_eq!(aead.key_size(), 16);

        let nonce = [7u8; 12];
        let sealed = aead.encrypt(&nonce, b"header", b"payload").unwrap();
        let opened = aead.decrypt(&nonce, b"header", &sealed).unwrap();
        assert_eq!(opened, b"payload");

        // The trait framing must interoperate with the one-shot helpers.
        let opened = sm4_gcm_decrypt(&[0x24u8; 16], &nonce, b"header", &sealed).unwrap();
        assert_eq!(opened, b"payload");
    }

    // -------------------------------------------------------
    // 4. A shared key is usable from multiple threads
    // -------------------------------------------------------
    #[test]
    fn test_round_keys_shared_across_threads() {
        use std::sync::Arc;

        let key = Arc::new(Sm4Key::new(&[0x99u8; 16]).unwrap());
        let mut expected = [0x33u8; 16];
        key.encrypt_block(&mut expected).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let key = Arc::clone(&key);
                std::thread::spawn(move || {
                    let mut block = [0x33u8; 16];
                    key.encrypt_block(&mut block).unwrap();
                    block
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    }

    // -------------------------------------------------------
    // 5. Failure surface: no plaintext on authentication failure
    // -------------------------------------------------------
    #[test]
    fn test_no_plaintext_on_auth_failure() {
        let key = [0x42u8; 16];
        let nonce = [1u8; 12];
        let sealed = sm4_gcm_encrypt(&key, &nonce, &[], b"top secret").unwrap();

        let mut tampered = sealed;
        tampered[0] ^= 0x80;
        match sm4_gcm_decrypt(&key, &nonce, &[], &tampered) {
            Err(CryptoError::AeadTagVerifyFail) => {}
            other => panic!("expected tag failure, got {other:?}"),
        }
    }
}
