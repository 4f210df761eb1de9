//! Producing RFC 2047 encoded-words for header values. Decoding lives
//! with the header grammar in `rfc5322.rs`.

pub(crate) static HEX_CHARS: &[u8] = &[
    b'0', b'1', b'2', b'3', b'4', b'5', b'6', b'7', b'8', b'9', b'A', b'B', b'C', b'D', b'E', b'F',
];

const Q_PREFIX: &str = "=?UTF-8?q?";
const B_PREFIX: &str = "=?UTF-8?b?";
const SUFFIX: &str = "?=";

// specials that additionally need escaping when the encoded word will
// sit next to address syntax
const ADDRESS_SPECIALS: &str = "<>[],;:@";

fn q_passthru(c: u8, address_flavor: bool) -> bool {
    (c.is_ascii_alphanumeric() || c.is_ascii_punctuation())
        && c != b'?'
        && c != b'='
        && c != b'_'
        && !(address_flavor && ADDRESS_SPECIALS.contains(c as char))
}

/// Number of output octets the Q encoding spends on one input byte.
fn q_cost(c: u8, address_flavor: bool) -> usize {
    if c == b' ' || q_passthru(c, address_flavor) {
        1
    } else {
        3
    }
}

/// Q-encode a string as one or more encoded words, wrapping onto folded
/// continuation lines so no encoded word exceeds the 75 octet budget.
/// Splits happen only between characters, never between the bytes of
/// one character.
pub fn qp_encode(s: &str) -> String {
    qp_encode_flavor(s, false)
}

/// Q-encode with the extra escapes needed inside address headers.
pub fn qp_encode_address(s: &str) -> String {
    qp_encode_flavor(s, true)
}

fn qp_encode_flavor(s: &str, address_flavor: bool) -> String {
    let limit = 74 - (Q_PREFIX.len() + SUFFIX.len());
    let mut result = String::with_capacity(s.len() + Q_PREFIX.len() + SUFFIX.len());

    result.push_str(Q_PREFIX);
    let mut line_length = 0;

    for c in s.chars() {
        let mut buf = [0u8; 4];
        let encoded = c.encode_utf8(&mut buf);
        let need_len: usize = encoded
            .bytes()
            .map(|b| q_cost(b, address_flavor))
            .sum();

        if need_len > limit - line_length {
            result.push_str(SUFFIX);
            result.push_str("\n\t");
            result.push_str(Q_PREFIX);
            line_length = 0;
        }

        for b in encoded.bytes() {
            if b == b' ' {
                result.push('_');
            } else if q_passthru(b, address_flavor) {
                result.push(b as char);
            } else {
                result.push('=');
                result.push(HEX_CHARS[(b as usize) >> 4] as char);
                result.push(HEX_CHARS[(b as usize) & 0x0f] as char);
            }
        }
        line_length += need_len;
    }

    result.push_str(SUFFIX);
    result
}

/// B-encode a string as one or more encoded words with the same 75
/// octet budget and character-boundary splits as [qp_encode].
pub fn b_encode(s: &str) -> String {
    let limit = 74 - (B_PREFIX.len() + SUFFIX.len());
    // base64 spends 4 output chars per 3 input bytes
    let max_chunk_bytes = limit / 4 * 3;

    let mut chunks: Vec<&str> = vec![];
    let mut start = 0;
    let mut end = 0;
    for (idx, c) in s.char_indices() {
        if idx + c.len_utf8() - start > max_chunk_bytes {
            chunks.push(&s[start..end]);
            start = end;
        }
        end = idx + c.len_utf8();
    }
    if start < s.len() {
        chunks.push(&s[start..]);
    }

    let mut result = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if i > 0 {
            result.push_str("\n\t");
        }
        result.push_str(B_PREFIX);
        result.push_str(&data_encoding::BASE64.encode(chunk.as_bytes()));
        result.push_str(SUFFIX);
    }
    result
}

/// Encode a header fragment, choosing Q when most bytes pass through
/// unescaped and B when escaping would dominate the output.
pub fn encode_string(s: &str) -> String {
    let escaped: usize = s.bytes().filter(|&b| q_cost(b, false) > 1).count();
    // Q spends 3 octets per escaped byte, B spends 4/3 per byte overall
    if escaped * 3 > s.len() {
        b_encode(s)
    } else {
        qp_encode(s)
    }
}

fn segment_needs_encoding(seg: &str) -> bool {
    seg.bytes()
        .any(|b| b >= 0x80 || b.is_ascii_control())
        || seg.contains("=?")
}

/// Encode a sentence, emitting encoded words only for the segments that
/// need them and leaving plain ASCII words alone. Segments are split on
/// whitespace; consecutive segments needing encoding are merged into a
/// single encoded word so their inner spacing survives a decode.
pub fn encode_sentence(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut pending: Vec<&str> = vec![];

    let flush = |pending: &mut Vec<&str>, result: &mut String| {
        if pending.is_empty() {
            return;
        }
        if !result.is_empty() {
            result.push(' ');
        }
        result.push_str(&encode_string(&pending.join(" ")));
        pending.clear();
    };

    for word in s.split_ascii_whitespace() {
        if segment_needs_encoding(word) {
            pending.push(word);
        } else {
            flush(&mut pending, &mut result);
            if !result.is_empty() {
                result.push(' ');
            }
            result.push_str(word);
        }
    }
    flush(&mut pending, &mut result);
    result
}
