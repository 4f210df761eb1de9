//! Body transfer codecs: RFC 2045 base64 and quoted-printable, plus the
//! legacy uuencode and yEnc conventions.

/// data_encoding::BASE64_MIME, despite its name, is not RFC 2045
/// compliant and will not ignore spaces, so define our own encoding.
/// Wrapping is done with LF; output stays in the LF domain until a
/// message is serialized for the wire.
pub(crate) const BASE64_RFC2045: data_encoding::Encoding = data_encoding_macro::new_encoding! {
    symbols: "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/",
    padding: '=',
    ignore: " \r\n\t",
    wrap_width: 76,
    wrap_separator: "\n",
};

/// Encode to base64 wrapped at 76 columns.
pub fn base64_encode(data: &[u8]) -> String {
    BASE64_RFC2045.encode(data)
}

const BASE64_REV: [i8; 256] = {
    let mut rev = [-1i8; 256];
    let symbols = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut i = 0;
    while i < 64 {
        rev[symbols[i] as usize] = i as i8;
        i += 1;
    }
    rev
};

/// Decode base64, ignoring whitespace, stray padding and any other
/// non-alphabet bytes. A payload that ends mid-quantum yields the bytes
/// that could be recovered; the returned flag is false in that case.
pub fn base64_decode(data: &[u8]) -> (Vec<u8>, bool) {
    let mut out = Vec::with_capacity(data.len() / 4 * 3);
    let mut acc = 0u32;
    let mut bits = 0u8;

    for &b in data {
        let v = BASE64_REV[b as usize];
        if v < 0 {
            continue;
        }
        acc = (acc << 6) | v as u32;
        bits += 6;
        if bits == 24 {
            out.push((acc >> 16) as u8);
            out.push((acc >> 8) as u8);
            out.push(acc as u8);
            acc = 0;
            bits = 0;
        }
    }

    match bits {
        0 => (out, true),
        12 => {
            out.push((acc >> 4) as u8);
            (out, true)
        }
        18 => {
            out.push((acc >> 10) as u8);
            out.push((acc >> 2) as u8);
            (out, true)
        }
        _ => (out, false),
    }
}

pub fn qp_encode(data: &[u8]) -> Vec<u8> {
    quoted_printable::encode(data)
}

pub fn qp_decode(data: &[u8]) -> (Vec<u8>, bool) {
    match quoted_printable::decode(data, quoted_printable::ParseMode::Robust) {
        Ok(bytes) => (bytes, true),
        Err(_) => (data.to_vec(), false),
    }
}

const UU_MAX_LINE: usize = 45;

fn uu_char(v: u8) -> u8 {
    if v == 0 {
        b'`'
    } else {
        v + 32
    }
}

fn uu_value(c: u8) -> u8 {
    c.wrapping_sub(32) & 0x3f
}

/// Encode a complete uuencode block, `begin` line through `end`.
pub fn uuencode(mode: u32, file_name: &str, data: &[u8]) -> String {
    let mut out = format!("begin {mode:o} {file_name}\n");

    for chunk in data.chunks(UU_MAX_LINE) {
        out.push(uu_char(chunk.len() as u8) as char);
        for group in chunk.chunks(3) {
            let b0 = group[0];
            let b1 = group.get(1).copied().unwrap_or(0);
            let b2 = group.get(2).copied().unwrap_or(0);
            out.push(uu_char(b0 >> 2) as char);
            out.push(uu_char(((b0 << 4) | (b1 >> 4)) & 0x3f) as char);
            out.push(uu_char(((b1 << 2) | (b2 >> 6)) & 0x3f) as char);
            out.push(uu_char(b2 & 0x3f) as char);
        }
        out.push('\n');
    }

    out.push_str("`\nend\n");
    out
}

/// Decode the data lines of a uuencode block. `begin` and `end` lines
/// are tolerated and skipped. Returns the recovered bytes and a flag
/// that is false when a line ended short of its declared length.
pub fn uudecode(data: &[u8]) -> (Vec<u8>, bool) {
    let mut out = vec![];
    let mut clean = true;

    for line in data.split(|&b| b == b'\n') {
        let line = match line.last() {
            Some(b'\r') => &line[..line.len() - 1],
            _ => line,
        };
        if line.is_empty() || line.starts_with(b"begin ") {
            continue;
        }
        if line == b"end" {
            break;
        }
        let want = uu_value(line[0]) as usize;
        if want == 0 {
            continue;
        }

        let mut decoded = Vec::with_capacity(want + 2);
        for group in line[1..].chunks(4) {
            if group.len() < 4 {
                clean = false;
            }
            let c0 = uu_value(group[0]);
            let c1 = group.get(1).copied().map(uu_value).unwrap_or(0);
            let c2 = group.get(2).copied().map(uu_value).unwrap_or(0);
            let c3 = group.get(3).copied().map(uu_value).unwrap_or(0);
            decoded.push((c0 << 2) | (c1 >> 4));
            decoded.push((c1 << 4) | (c2 >> 2));
            decoded.push((c2 << 6) | c3);
        }
        if decoded.len() < want {
            clean = false;
        }
        decoded.truncate(want);
        out.extend_from_slice(&decoded);
    }

    (out, clean)
}

const YENC_LINE: usize = 128;

/// Apply the yEnc byte transform: add 42 mod 256, escaping NUL, CR, LF
/// and `=` with an `=` prefix and a further +64 shift.
pub fn yenc_encode_bytes(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len() / 64);
    let mut col = 0;

    for &b in data {
        let v = b.wrapping_add(42);
        match v {
            0x00 | 0x0a | 0x0d | b'=' => {
                out.push(b'=');
                out.push(v.wrapping_add(64));
                col += 2;
            }
            _ => {
                out.push(v);
                col += 1;
            }
        }
        if col >= YENC_LINE {
            out.push(b'\n');
            col = 0;
        }
    }
    if col > 0 {
        out.push(b'\n');
    }
    out
}

/// Reverse [yenc_encode_bytes]. Line endings are skipped; an `=` at end
/// of input marks a truncated escape and clears the returned flag.
pub fn yenc_decode_bytes(data: &[u8]) -> (Vec<u8>, bool) {
    let mut out = Vec::with_capacity(data.len());
    let mut iter = data.iter().copied();

    while let Some(b) = iter.next() {
        match b {
            b'\r' | b'\n' => continue,
            b'=' => match iter.next() {
                Some(esc) => out.push(esc.wrapping_sub(64).wrapping_sub(42)),
                None => return (out, false),
            },
            _ => out.push(b.wrapping_sub(42)),
        }
    }
    (out, true)
}
