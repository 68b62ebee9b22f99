//! Hardware-accelerated SM4 using x86-64 AES-NI intrinsics.
//!
//! This module is only compiled on `x86_64` targets (gated via
//! `#[cfg(target_arch = "x86_64")]` at the module declaration in
//! `mod.rs`). SM4 has no dedicated instruction on x86, but its S-box
//! and the AES S-box are both built from inversion in GF(2^8): a fixed
//! affine transform maps each byte from the SM4 field representation
//! into the AES representation, one `_mm_aesenclast_si128` supplies the
//! non-linear inversion, and the inverse affine transform maps back.
//! The result is bit-identical to the table lookup in `soft.rs`.
//!
//! Four blocks are processed per invocation: after a per-word byte
//! swap, the 4x4 matrix of 32-bit words is transposed so that each
//! register holds word `i` of all four blocks, which lets one round
//! computation advance all four Feistel states at once.

use core::arch::x86_64::*;

// ---------------------------------------------------------------------------
// Affine isomorphism constants
// ---------------------------------------------------------------------------
//
// The SM4 S-box factors as S(x) = M(inv(M(x) ^ 0xD3)) ^ 0xD3 with M the
// circulant GF(2) matrix generated by 0xA7 and inv taken in
// GF(2^8)/x^8+x^7+x^6+x^5+x^4+x^2+1. Mapping through the field
// isomorphism rooted at 0x23 into the AES polynomial x^8+x^4+x^3+x+1
// turns that inversion into the AES S-box core. The composed input and
// output affine maps are applied per nibble with `pshufb`:
// A(x) = LO[x & 0xf] ^ HI[x >> 4], the constant folded into LO.

const PRE_AFFINE_LO: [u8; 16] = [
    0x3e, 0xb2, 0x0e, 0x82, 0xbb, 0x37, 0x8b, 0x07, 0xa1, 0x2d, 0x91, 0x1d, 0x24, 0xa8, 0x14, 0x98,
];
const PRE_AFFINE_HI: [u8; 16] = [
    0x00, 0xdc, 0x2e, 0xf2, 0xc5, 0x19, 0xeb, 0x37, 0x08, 0xd4, 0x26, 0xfa, 0xcd, 0x11, 0xe3, 0x3f,
];
const POST_AFFINE_LO: [u8; 16] = [
    0x6c, 0xd4, 0xa6, 0x1e, 0x52, 0xea, 0x98, 0x20, 0x0b, 0xb3, 0xc1, 0x79, 0x35, 0x8d, 0xff, 0x47,
];
const POST_AFFINE_HI: [u8; 16] = [
    0x00, 0xe0, 0x50, 0xb0, 0x9d, 0x7d, 0xcd, 0x2d, 0xc0, 0x20, 0x90, 0x70, 0x5d, 0xbd, 0x0d, 0xed,
];

/// Inverse-ShiftRows byte permutation, applied before `aesenclast` so
/// that its ShiftRows step lands every byte back in its own lane.
const INV_SHIFT_ROWS: [u8; 16] = [
    0x00, 0x0d, 0x0a, 0x07, 0x04, 0x01, 0x0e, 0x0b, 0x08, 0x05, 0x02, 0x0f, 0x0c, 0x09, 0x06, 0x03,
];

/// Byte swap within each 32-bit lane, converting between memory order
/// and the big-endian word convention of the round function.
const BSWAP32: [u8; 16] = [3, 2, 1, 0, 7, 6, 5, 4, 11, 10, 9, 8, 15, 14, 13, 12];

#[inline(always)]
unsafe fn load(table: &[u8; 16]) -> __m128i {
    _mm_loadu_si128(table.as_ptr() as *const __m128i)
}

/// Rotate each 32-bit lane left by a constant.
macro_rules! rotl_epi32 {
    ($x:expr, $n:literal) => {
        _mm_or_si128(_mm_slli_epi32::<$n>($x), _mm_srli_epi32::<{ 32 - $n }>($x))
    };
}

// ---------------------------------------------------------------------------
// S-box via aesenclast
// ---------------------------------------------------------------------------

/// Apply the SM4 S-box to all 16 bytes of `x` through the AES domain.
#[inline]
#[target_feature(enable = "aes", enable = "ssse3")]
unsafe fn sbox_transform(x: __m128i) -> __m128i {
    let nibble = _mm_set1_epi8(0x0f);

    // Affine map into the AES field representation.
    let lo = _mm_and_si128(x, nibble);
    let hi = _mm_and_si128(_mm_srli_epi64::<4>(x), nibble);
    let mut y = _mm_xor_si128(
        _mm_shuffle_epi8(load(&PRE_AFFINE_LO), lo),
        _mm_shuffle_epi8(load(&PRE_AFFINE_HI), hi),
    );

    // aesenclast = ShiftRows, SubBytes, AddRoundKey. The pre-permutation
    // cancels ShiftRows and the zero key leaves SubBytes as the payload.
    y = _mm_shuffle_epi8(y, load(&INV_SHIFT_ROWS));
    y = _mm_aesenclast_si128(y, _mm_setzero_si128());

    // Inverse affine map back to the SM4 representation.
    let lo = _mm_and_si128(y, nibble);
    let hi = _mm_and_si128(_mm_srli_epi64::<4>(y), nibble);
    _mm_xor_si128(
        _mm_shuffle_epi8(load(&POST_AFFINE_LO), lo),
        _mm_shuffle_epi8(load(&POST_AFFINE_HI), hi),
    )
}

/// Apply the S-box to 16 independent bytes and return the result.
///
/// Equivalence hook for testing against the `soft.rs` table; the bulk
/// path below inlines the same transform.
#[target_feature(enable = "aes", enable = "ssse3")]
pub(crate) unsafe fn sbox_bytes(input: &[u8; 16]) -> [u8; 16] {
    let x = _mm_loadu_si128(input.as_ptr() as *const __m128i);
    let y = sbox_transform(x);
    let mut out = [0u8; 16];
    _mm_storeu_si128(out.as_mut_ptr() as *mut __m128i, y);
    out
}

// ---------------------------------------------------------------------------
// 4-block parallel transform
// ---------------------------------------------------------------------------

/// Transpose a 4x4 matrix of 32-bit lanes.
///
/// On input register `j` holds the four words of block `j`; on output
/// register `i` holds word `i` of every block. The transform is its own
/// inverse.
#[inline]
#[target_feature(enable = "ssse3")]
unsafe fn transpose4(r: [__m128i; 4]) -> [__m128i; 4] {
    let t0 = _mm_unpacklo_epi32(r[0], r[1]);
    let t1 = _mm_unpacklo_epi32(r[2], r[3]);
    let t2 = _mm_unpackhi_epi32(r[0], r[1]);
    let t3 = _mm_unpackhi_epi32(r[2], r[3]);
    [
        _mm_unpacklo_epi64(t0, t1),
        _mm_unpackhi_epi64(t0, t1),
        _mm_unpacklo_epi64(t2, t3),
        _mm_unpackhi_epi64(t2, t3),
    ]
}

/// Run the 32-round transform on four blocks at once.
///
/// `decrypt` selects the reversed round-key order; the round function
/// itself is shared, as in the scalar path.
#[target_feature(enable = "aes", enable = "ssse3")]
pub(crate) unsafe fn crypt_blocks4(rk: &[u32; 32], data: &mut [u8; 64], decrypt: bool) {
    let bswap = load(&BSWAP32);

    let mut regs = [
        _mm_loadu_si128(data.as_ptr() as *const __m128i),
        _mm_loadu_si128(data.as_ptr().add(16) as *const __m128i),
        _mm_loadu_si128(data.as_ptr().add(32) as *const __m128i),
        _mm_loadu_si128(data.as_ptr().add(48) as *const __m128i),
    ];
    for r in &mut regs {
        *r = _mm_shuffle_epi8(*r, bswap);
    }
    let [mut x0, mut x1, mut x2, mut x3] = transpose4(regs);

    for i in 0..32 {
        let key = if decrypt { rk[31 - i] } else { rk[i] };
        let k = _mm_set1_epi32(key as i32);

        let mut t = _mm_xor_si128(_mm_xor_si128(x1, x2), _mm_xor_si128(x3, k));
        t = sbox_transform(t);
        let l = _mm_xor_si128(
            _mm_xor_si128(rotl_epi32!(t, 2), rotl_epi32!(t, 10)),
            _mm_xor_si128(rotl_epi32!(t, 18), rotl_epi32!(t, 24)),
        );
        t = _mm_xor_si128(t, l);

        let next = _mm_xor_si128(x0, t);
        x0 = x1;
        x1 = x2;
        x2 = x3;
        x3 = next;
    }

    // The last four state words come out in reverse order.
    let mut regs = transpose4([x3, x2, x1, x0]);
    for r in &mut regs {
        *r = _mm_shuffle_epi8(*r, bswap);
    }
    _mm_storeu_si128(data.as_mut_ptr() as *mut __m128i, regs[0]);
    _mm_storeu_si128(data.as_mut_ptr().add(16) as *mut __m128i, regs[1]);
    _mm_storeu_si128(data.as_mut_ptr().add(32) as *mut __m128i, regs[2]);
    _mm_storeu_si128(data.as_mut_ptr().add(48) as *mut __m128i, regs[3]);
}
