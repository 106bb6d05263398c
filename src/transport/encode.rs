use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Default slice size for [`to_base64_sliced`], in bytes.
pub const DEFAULT_SLICE_BYTES: usize = 32 * 1024;

/// Encode a binary buffer as standard Base64 for JSON embedding.
pub fn to_base64(bytes: &[u8]) -> String {
    to_base64_sliced(bytes, DEFAULT_SLICE_BYTES)
}

/// Encode in bounded slices instead of one monolithic pass.
///
/// Multi-second recordings run to hundreds of kilobytes, so the input is
/// processed in fixed-size slices appended to one output string. The slice
/// size is rounded down to a multiple of 3, which keeps every slice's
/// encoding padding-free; the concatenated runs are therefore byte-for-byte
/// identical to encoding the whole buffer at once, whatever slice size is
/// chosen.
pub fn to_base64_sliced(bytes: &[u8], slice_bytes: usize) -> String {
    let aligned = (slice_bytes.max(3) / 3) * 3;
    let mut out = String::with_capacity(bytes.len().div_ceil(3) * 4);
    for slice in bytes.chunks(aligned) {
        STANDARD.encode_string(slice, &mut out);
    }
    out
}
