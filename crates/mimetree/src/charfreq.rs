//! Encoding-choice policy. The classifier is a pure function over the
//! body bytes; callers may substitute their own via
//! [encodings_for_data_with].

use crate::typed::TransferEncoding;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataClass {
    SevenBitText,
    EightBitText,
    SevenBitData,
    EightBitData,
}

/// Signature for a pluggable classifier.
pub type EncodingClassifier = fn(&[u8]) -> DataClass;

const MAX_TEXT_LINE: usize = 998;

/// Fraction of bytes that are printable ASCII (or tab). Used to pick
/// between quoted-printable and base64: with p printable bytes out of
/// n, qp costs about p + 3(n - p) while base64 costs 4n/3, so qp wins
/// exactly when p > 5n/6.
pub fn printable_ratio(data: &[u8]) -> f32 {
    if data.is_empty() {
        return 1.0;
    }
    let printable = data
        .iter()
        .filter(|&&b| (0x20..0x7f).contains(&b) || b == b'\t')
        .count();
    printable as f32 / data.len() as f32
}

/// The default character-frequency classifier: data if the bytes
/// contain NUL, bare CR, or lines too long to survive transport
/// untouched; eight-bit if any byte has the high bit set.
pub fn classify(data: &[u8]) -> DataClass {
    let mut eight_bit = false;
    let mut binary = data.is_empty();
    let mut line_len = 0usize;

    let mut iter = data.iter().peekable();
    while let Some(&b) = iter.next() {
        match b {
            0 => binary = true,
            b'\r' => {
                if iter.peek() != Some(&&b'\n') {
                    binary = true;
                }
            }
            b'\n' => line_len = 0,
            _ => {
                if b >= 0x80 {
                    eight_bit = true;
                }
                line_len += 1;
                if line_len > MAX_TEXT_LINE {
                    binary = true;
                }
            }
        }
    }

    match (eight_bit, binary) {
        (false, false) => DataClass::SevenBitText,
        (true, false) => DataClass::EightBitText,
        (false, true) => DataClass::SevenBitData,
        (true, true) => DataClass::EightBitData,
    }
}

/// Transfer encodings suitable for the data, most preferable first,
/// as judged by the supplied classifier.
pub fn encodings_for_data_with(
    classifier: EncodingClassifier,
    data: &[u8],
) -> Vec<TransferEncoding> {
    let mut allowed = vec![];
    let class = classifier(data);

    match class {
        DataClass::SevenBitText => {
            allowed.push(TransferEncoding::SevenBit);
            allowed.push(TransferEncoding::EightBit);
        }
        DataClass::EightBitText => {
            allowed.push(TransferEncoding::EightBit);
        }
        DataClass::SevenBitData | DataClass::EightBitData => {}
    }

    match class {
        DataClass::EightBitData => {
            allowed.push(TransferEncoding::Base64);
        }
        _ => {
            if printable_ratio(data) > 5.0 / 6.0 {
                allowed.push(TransferEncoding::QuotedPrintable);
                allowed.push(TransferEncoding::Base64);
            } else {
                allowed.push(TransferEncoding::Base64);
                allowed.push(TransferEncoding::QuotedPrintable);
            }
        }
    }

    allowed
}

/// [encodings_for_data_with] using the default classifier.
pub fn encodings_for_data(data: &[u8]) -> Vec<TransferEncoding> {
    encodings_for_data_with(classify, data)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn classification() {
        k9::assert_equal!(classify(b"plain text\r\nlines\r\n"), DataClass::SevenBitText);
        k9::assert_equal!(classify("caf\u{e9}".as_bytes()), DataClass::EightBitText);
        k9::assert_equal!(classify(b"nul\x00byte"), DataClass::SevenBitData);
        k9::assert_equal!(classify(b"\x00\xff"), DataClass::EightBitData);
        // a bare CR is not safe text
        k9::assert_equal!(classify(b"bare\rcr"), DataClass::SevenBitData);
    }

    #[test]
    fn qp_preferred_when_mostly_printable() {
        let mostly_text = b"this is mostly printable text with one \x00 byte".to_vec();
        let encodings = encodings_for_data(&mostly_text);
        k9::assert_equal!(
            encodings,
            vec![TransferEncoding::QuotedPrintable, TransferEncoding::Base64]
        );
    }

    #[test]
    fn base64_preferred_for_dense_binary() {
        let binary: Vec<u8> = (0u8..=255).collect();
        let encodings = encodings_for_data(&binary);
        k9::assert_equal!(encodings, vec![TransferEncoding::Base64]);
    }

    #[test]
    fn seven_bit_text_allows_identity() {
        let encodings = encodings_for_data(b"hello\n");
        k9::assert_equal!(encodings[0], TransferEncoding::SevenBit);
        assert!(encodings.contains(&TransferEncoding::QuotedPrintable));
    }
}
