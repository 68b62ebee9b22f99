#![no_main]
use gmcore_crypto::sm4::Sm4Key;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 80 {
        return;
    }
    let key = Sm4Key::new(&data[..16]).unwrap();

    let mut blocks: [u8; 64] = data[16..80].try_into().unwrap();
    let original = blocks;

    // The 4-block path must agree with four single-block operations.
    key.encrypt_blocks4(&mut blocks).unwrap();
    let mut expected = original;
    for chunk in expected.chunks_exact_mut(16) {
        key.encrypt_block(chunk).unwrap();
    }
    assert_eq!(blocks, expected);

    key.decrypt_blocks4(&mut blocks).unwrap();
    assert_eq!(blocks, original);
});
