//! Splitting raw bodies into parts: multipart boundaries, and the
//! legacy uuencode / yEnc conventions that predate MIME.

use crate::codecs;

/// The pieces of a multipart body. `preamble` is everything before the
/// first boundary line; `epilogue` everything after the closing one.
/// Each part includes its trailing newline so the original bytes can be
/// reproduced by rejoining with boundary lines.
#[derive(Debug, Default, PartialEq)]
pub struct MultiPartSplit {
    pub preamble: Vec<u8>,
    pub parts: Vec<Vec<u8>>,
    pub epilogue: Vec<u8>,
}

/// Split a body (LF line endings) at its boundary lines. Returns None
/// when no boundary line is present at all; a split that yields zero
/// parts is also None so the caller can reclassify the body.
pub fn split_multipart(body: &[u8], boundary: &str) -> Option<MultiPartSplit> {
    let marker = format!("--{boundary}");
    let marker = marker.as_bytes();

    struct BoundaryLine {
        pos: usize,
        line_end: usize,
        closing: bool,
    }

    let mut lines = vec![];
    let mut pos = 0;
    while pos < body.len() {
        let line_end = memchr::memchr(b'\n', &body[pos..])
            .map(|p| p + pos)
            .unwrap_or(body.len());
        let line = &body[pos..line_end];
        if line.starts_with(marker) {
            lines.push(BoundaryLine {
                pos,
                line_end,
                closing: line[marker.len()..].starts_with(b"--"),
            });
        }
        pos = line_end + 1;
    }

    let first = lines.first()?;
    let mut result = MultiPartSplit {
        preamble: body[..first.pos].to_vec(),
        ..Default::default()
    };

    for (idx, line) in lines.iter().enumerate() {
        if line.closing {
            let after = (line.line_end + 1).min(body.len());
            result.epilogue = body[after..].to_vec();
            break;
        }
        let start = (line.line_end + 1).min(body.len());
        let end = lines
            .get(idx + 1)
            .map(|next| next.pos)
            .unwrap_or(body.len());
        result.parts.push(body[start..end.max(start)].to_vec());
    }

    if result.parts.is_empty() {
        None
    } else {
        Some(result)
    }
}

/// A binary attachment recovered from a non-MIME body. For uuencode the
/// payload is kept in its encoded form (the node's transfer encoding
/// says so); for yEnc it is the decoded bytes.
#[derive(Debug, PartialEq)]
pub struct NonMimePart {
    pub file_name: String,
    pub mime_type: &'static str,
    pub payload: Vec<u8>,
}

#[derive(Debug, Default, PartialEq)]
pub struct NonMimeParsed {
    /// Plain text surrounding the encoded blocks
    pub text: Vec<u8>,
    pub parts: Vec<NonMimePart>,
    /// (number, total) when this body is one piece of a split posting
    pub partial: Option<(u32, u32)>,
}

/// Scan a Subject line for split-posting metadata: `N/M` or
/// `part N of M` styles.
pub fn subject_partial(subject: &str) -> Option<(u32, u32)> {
    // last "N/M" wins, so "foo 2/10" in a trailing tag beats dates
    let bytes = subject.as_bytes();
    let mut found = None;
    for (idx, &b) in bytes.iter().enumerate() {
        if b != b'/' {
            continue;
        }
        let num_start = bytes[..idx]
            .iter()
            .rposition(|b| !b.is_ascii_digit())
            .map(|p| p + 1)
            .unwrap_or(0);
        let num_end = idx
            + 1
            + bytes[idx + 1..]
                .iter()
                .position(|b| !b.is_ascii_digit())
                .unwrap_or(bytes.len() - idx - 1);
        if num_start < idx && idx + 1 < num_end {
            let number = subject[num_start..idx].parse().ok();
            let total = subject[idx + 1..num_end].parse().ok();
            if let (Some(number), Some(total)) = (number, total) {
                found = Some((number, total));
            }
        }
    }
    if found.is_some() {
        return found;
    }

    // "part N of M"
    let words: Vec<&str> = subject.split_ascii_whitespace().collect();
    for window in words.windows(3) {
        if window[1].eq_ignore_ascii_case("of") {
            if let (Ok(number), Ok(total)) = (
                window[0].trim_matches(|c: char| !c.is_ascii_digit()).parse(),
                window[2].trim_matches(|c: char| !c.is_ascii_digit()).parse(),
            ) {
                return Some((number, total));
            }
        }
    }
    None
}

fn is_uu_begin(line: &[u8]) -> Option<String> {
    let rest = line.strip_prefix(b"begin ")?;
    let space = memchr::memchr(b' ', rest)?;
    let mode = &rest[..space];
    if mode.is_empty() || !mode.iter().all(|b| (b'0'..=b'7').contains(b)) {
        return None;
    }
    let name = &rest[space + 1..];
    if name.is_empty() {
        return None;
    }
    Some(String::from_utf8_lossy(name).trim().to_string())
}

/// Recognize a uuencoded body. Complete `begin`..`end` blocks become
/// binary parts (payload still encoded); a block missing its `begin` or
/// `end` marks a split posting when the subject carries part numbers.
pub fn parse_uuencode(body: &[u8], subject: &str) -> Option<NonMimeParsed> {
    let mut result = NonMimeParsed::default();
    let mut current: Option<(String, Vec<u8>)> = None;
    let mut saw_begin = false;
    let mut saw_dangling = false;
    let mut saw_end_without_begin = false;

    for line in body.split(|&b| b == b'\n') {
        let line = match line.last() {
            Some(b'\r') => &line[..line.len() - 1],
            _ => line,
        };

        match &mut current {
            None => {
                if let Some(name) = is_uu_begin(line) {
                    saw_begin = true;
                    current = Some((name, vec![]));
                } else if line == b"end" {
                    saw_end_without_begin = true;
                } else {
                    result.text.extend_from_slice(line);
                    result.text.push(b'\n');
                }
            }
            Some((name, payload)) => {
                if line == b"end" {
                    let file_name = std::mem::take(name);
                    result.parts.push(NonMimePart {
                        mime_type: guess_mime_type(&file_name),
                        file_name,
                        payload: std::mem::take(payload),
                    });
                    current = None;
                } else {
                    payload.extend_from_slice(line);
                    payload.push(b'\n');
                }
            }
        }
    }

    if current.is_some() {
        saw_dangling = true;
    }

    if !result.parts.is_empty() && !saw_dangling {
        return Some(result);
    }

    // a block missing one of its markers is a piece of a split posting,
    // provided the subject says which piece
    if saw_dangling || saw_end_without_begin || (saw_begin && result.parts.is_empty()) {
        if let Some((number, total)) = subject_partial(subject) {
            if total != 1 {
                result.parts.clear();
                result.text.clear();
                result.partial = Some((number, total));
                return Some(result);
            }
        }
    }

    None
}

#[derive(Debug, Default)]
struct YencMeta {
    name: Option<String>,
    part: Option<u32>,
    total: Option<u32>,
}

fn parse_yenc_meta(line: &[u8]) -> YencMeta {
    let mut meta = YencMeta::default();
    let text = String::from_utf8_lossy(line);

    // name is last on the line and may contain spaces
    if let Some(pos) = text.find("name=") {
        meta.name = Some(text[pos + 5..].trim().to_string());
    }
    for word in text.split_ascii_whitespace() {
        if let Some(v) = word.strip_prefix("part=") {
            meta.part = v.parse().ok();
        } else if let Some(v) = word.strip_prefix("total=") {
            meta.total = v.parse().ok();
        }
    }
    meta
}

/// Recognize a yEnc body: `=ybegin` / optional `=ypart` / data /
/// `=yend`. Payloads are decoded; a `part=`/`total=` pair marks a
/// split posting.
pub fn parse_yenc(body: &[u8]) -> Option<NonMimeParsed> {
    let mut result = NonMimeParsed::default();
    let mut current: Option<(YencMeta, Vec<u8>)> = None;

    for line in body.split(|&b| b == b'\n') {
        let line = match line.last() {
            Some(b'\r') => &line[..line.len() - 1],
            _ => line,
        };

        match &mut current {
            None => {
                if line.starts_with(b"=ybegin ") {
                    current = Some((parse_yenc_meta(line), vec![]));
                } else {
                    result.text.extend_from_slice(line);
                    result.text.push(b'\n');
                }
            }
            Some((meta, data)) => {
                if line.starts_with(b"=ypart ") {
                    continue;
                }
                if line.starts_with(b"=yend") {
                    let (decoded, _clean) = codecs::yenc_decode_bytes(data);
                    let file_name = meta.name.take().unwrap_or_default();
                    if let (Some(part), Some(total)) = (meta.part, meta.total) {
                        if total != 1 {
                            result.partial = Some((part, total));
                        }
                    }
                    result.parts.push(NonMimePart {
                        mime_type: guess_mime_type(&file_name),
                        file_name,
                        payload: decoded,
                    });
                    current = None;
                } else {
                    data.extend_from_slice(line);
                    data.push(b'\n');
                }
            }
        }
    }

    if result.parts.is_empty() {
        None
    } else {
        Some(result)
    }
}

/// Best-effort mime type from a file extension; the uuencode and yEnc
/// conventions carry no type information of their own.
pub fn guess_mime_type(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "txt" | "text" | "log" => "text/plain",
        "htm" | "html" => "text/html",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "mp3" => "audio/mpeg",
        "wav" => "audio/x-wav",
        "mp4" => "video/mp4",
        "avi" => "video/x-msvideo",
        "mpg" | "mpeg" => "video/mpeg",
        "pdf" => "application/pdf",
        "ps" => "application/postscript",
        "zip" => "application/zip",
        "gz" | "tgz" => "application/gzip",
        "rar" => "application/vnd.rar",
        "xml" => "application/xml",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn split_two_parts() {
        let body = b"--X\nContent-Type: text/plain\n\nA\n--X\nContent-Type: text/plain\n\nB\n--X--\n";
        let split = split_multipart(body, "X").unwrap();
        k9::assert_equal!(split.parts.len(), 2);
        k9::assert_equal!(
            split.parts[0],
            b"Content-Type: text/plain\n\nA\n".to_vec()
        );
        k9::assert_equal!(
            split.parts[1],
            b"Content-Type: text/plain\n\nB\n".to_vec()
        );
        assert!(split.preamble.is_empty());
        assert!(split.epilogue.is_empty());
    }

    #[test]
    fn split_preamble_and_epilogue() {
        let body = b"This is the preamble.\n--b\n\npart\n--b--\nThis is the epilogue.\n";
        let split = split_multipart(body, "b").unwrap();
        k9::assert_equal!(split.preamble, b"This is the preamble.\n".to_vec());
        k9::assert_equal!(split.parts.len(), 1);
        k9::assert_equal!(split.parts[0], b"\npart\n".to_vec());
        k9::assert_equal!(split.epilogue, b"This is the epilogue.\n".to_vec());
    }

    #[test]
    fn split_reassembles_exactly() {
        let body = b"pre\n--b\n\nA\n--b\n\nB\n--b--\npost\n";
        let split = split_multipart(body, "b").unwrap();
        let mut rebuilt = split.preamble.clone();
        for part in &split.parts {
            rebuilt.extend_from_slice(b"--b\n");
            rebuilt.extend_from_slice(part);
        }
        rebuilt.extend_from_slice(b"--b--\n");
        rebuilt.extend_from_slice(&split.epilogue);
        k9::assert_equal!(rebuilt, body.to_vec());
    }

    #[test]
    fn split_requires_a_boundary_line() {
        assert!(split_multipart(b"no boundaries here\n", "X").is_none());
        // a closing marker alone yields zero parts
        assert!(split_multipart(b"--X--\n", "X").is_none());
    }

    #[test]
    fn subject_partial_styles() {
        k9::assert_equal!(subject_partial("my file (2/7)"), Some((2, 7)));
        k9::assert_equal!(subject_partial("my file part 3 of 9"), Some((3, 9)));
        k9::assert_equal!(subject_partial("plain subject"), None);
        // the trailing tag wins over earlier digits
        k9::assert_equal!(subject_partial("update 01/02 foo 5/10"), Some((5, 10)));
    }

    #[test]
    fn uuencode_complete_block() {
        let body = b"Here is the file I promised.\n\nbegin 644 cat.txt\n#0V%T\n`\nend\nbye\n";
        let parsed = parse_uuencode(body, "the file").unwrap();
        k9::assert_equal!(parsed.parts.len(), 1);
        k9::assert_equal!(parsed.parts[0].file_name, "cat.txt");
        k9::assert_equal!(parsed.parts[0].mime_type, "text/plain");
        k9::assert_equal!(parsed.partial, None);
        let (decoded, clean) = codecs::uudecode(&parsed.parts[0].payload);
        assert!(clean);
        k9::assert_equal!(decoded, b"Cat".to_vec());
        assert!(String::from_utf8_lossy(&parsed.text).contains("promised"));
    }

    #[test]
    fn uuencode_partial_block() {
        // begin but no end: the posting was split; subject says 1/3
        let body = b"begin 644 huge.bin\n#0V%T\n#0V%T\n";
        let parsed = parse_uuencode(body, "huge.bin (1/3)").unwrap();
        assert!(parsed.parts.is_empty());
        k9::assert_equal!(parsed.partial, Some((1, 3)));

        // without subject metadata it is not treated as uuencode
        assert!(parse_uuencode(body, "huge.bin").is_none());
    }

    #[test]
    fn uuencode_rejects_plain_text() {
        assert!(parse_uuencode(b"hello there\nbegin with some words\n", "subject").is_none());
    }

    #[test]
    fn yenc_complete_block() {
        let payload: Vec<u8> = (0u8..=255).collect();
        let mut body = b"intro text\n=ybegin line=128 size=256 name=dump.bin\n".to_vec();
        body.extend_from_slice(&codecs::yenc_encode_bytes(&payload));
        body.extend_from_slice(b"=yend size=256\n");

        let parsed = parse_yenc(&body).unwrap();
        k9::assert_equal!(parsed.parts.len(), 1);
        k9::assert_equal!(parsed.parts[0].file_name, "dump.bin");
        k9::assert_equal!(parsed.parts[0].payload, payload);
        k9::assert_equal!(parsed.partial, None);
    }

    #[test]
    fn yenc_partial_block() {
        let body = concat!(
            "=ybegin part=2 total=5 line=128 size=5000 name=big.iso\n",
            "=ypart begin=1001 end=2000\n",
            "abcdefg\n",
            "=yend size=1000 part=2\n"
        );
        let parsed = parse_yenc(body.as_bytes()).unwrap();
        k9::assert_equal!(parsed.partial, Some((2, 5)));
    }

    #[test]
    fn yenc_name_with_spaces() {
        let meta = parse_yenc_meta(b"=ybegin line=128 size=5 name=my holiday photo.jpg");
        k9::assert_equal!(meta.name.unwrap(), "my holiday photo.jpg");
    }

    #[test]
    fn mime_type_guesses() {
        k9::assert_equal!(guess_mime_type("foo.JPG"), "image/jpeg");
        k9::assert_equal!(guess_mime_type("foo.tar.gz"), "application/gzip");
        k9::assert_equal!(guess_mime_type("noext"), "application/octet-stream");
        k9::assert_equal!(guess_mime_type("foo.bin"), "application/octet-stream");
    }
}
