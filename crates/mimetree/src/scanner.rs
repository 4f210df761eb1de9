//! Line-ending normalization and header folding/unfolding over raw
//! octet buffers.

/// Collapse folded continuation lines in a header value into single
/// spaces. A CR?LF followed by SP/HT is a fold; whitespace immediately
/// before the break is dropped. A CR?LF followed by a literal `=09` or
/// `=20` is also treated as fold whitespace, matching a malformed
/// continuation style seen from some producers.
pub fn unfold_header(header: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(header.len());
    let mut pos = 0;

    while let Some(nl) = memchr::memchr(b'\n', &header[pos..]).map(|p| p + pos) {
        // back up over whitespace preceding the break
        let mut fold_begin = nl;
        while fold_begin > pos && (header[fold_begin - 1] == b' ' || header[fold_begin - 1] == b'\t' || header[fold_begin - 1] == b'\r')
        {
            fold_begin -= 1;
        }

        // skip forward over the break and any continuation whitespace
        let mut fold_end = nl + 1;
        loop {
            match header.get(fold_end) {
                Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => {
                    fold_end += 1;
                }
                Some(b'=')
                    if header[fold_end - 1] == b'\n'
                        && (header.get(fold_end + 1..fold_end + 3) == Some(b"09")
                            || header.get(fold_end + 1..fold_end + 3) == Some(b"20")) =>
                {
                    fold_end += 3;
                }
                _ => break,
            }
        }

        result.extend_from_slice(&header[pos..fold_begin]);
        if fold_begin != pos && fold_end < header.len() {
            result.push(b' ');
        }
        pos = fold_end;
    }

    if pos < header.len() {
        result.extend_from_slice(&header[pos..]);
    }
    result
}

// folding state for quoted strings and backslash escapes
#[derive(Default)]
struct FoldState {
    in_quoted_string: bool,
    escape_pair: bool,
}

impl FoldState {
    fn push(&mut self, c: u8) {
        if self.escape_pair {
            self.escape_pair = false;
        } else if c == b'\\' {
            self.escape_pair = true;
        } else if c == b'"' {
            self.in_quoted_string = !self.in_quoted_string;
        }
    }
}

pub const SOFT_LINE_LIMIT: usize = 78;
pub const HARD_LINE_LIMIT: usize = 998;

/// Insert LF at break positions so that no line of the header exceeds
/// [SOFT_LINE_LIMIT] octets where possible, never exceeding
/// [HARD_LINE_LIMIT]. Break positions are ranked: whitespace following a
/// comma or semicolon outside a quoted string, then whitespace outside a
/// quoted string, then any unescaped whitespace.
pub fn fold_header(header: &str) -> String {
    let header = header.as_bytes();
    if header.len() <= SOFT_LINE_LIMIT {
        return String::from_utf8_lossy(header).to_string();
    }

    let body_start = match memchr::memchr(b':', header) {
        Some(p) if p + 1 < header.len() => p + 1,
        _ => return String::from_utf8_lossy(header).to_string(),
    };

    let mut hdr = header.to_vec();
    let mut state = FoldState::default();

    // candidate break positions on the current line, by preference
    let mut recommended = body_start;
    let mut preferred = body_start;
    let mut eligible = body_start;

    let mut start = 0;
    let mut pos = 0;

    loop {
        if pos - start > SOFT_LINE_LIMIT && (recommended | preferred | eligible) != 0 {
            let fws = if recommended != 0 {
                recommended
            } else if preferred != 0 {
                preferred
            } else {
                eligible
            };
            hdr.insert(fws, b'\n');
            if eligible <= fws {
                eligible = 0;
            } else {
                eligible += 1;
            }
            recommended = 0;
            preferred = 0;
            start = fws + 1;
            pos += 1;
            continue;
        }
        if pos - start > HARD_LINE_LIMIT {
            // no break candidate at all on an oversized line; force one
            hdr.insert(pos, b'\t');
            hdr.insert(pos, b'\n');
            start = pos + 1;
            pos += 2;
            recommended = 0;
            preferred = 0;
            eligible = 0;
            continue;
        }

        if pos >= hdr.len() {
            break;
        }

        if hdr[pos] == b'\n' {
            recommended = 0;
            preferred = 0;
            eligible = 0;
            start = pos + 1;
        }

        if hdr[pos] == b' ' && !state.escape_pair && pos > 0 && hdr[pos - 1] != b'\n' {
            eligible = pos;
            if !state.in_quoted_string {
                preferred = pos;
                if hdr[pos - 1] == b',' || hdr[pos - 1] == b';' {
                    recommended = pos;
                }
            }
        }

        state.push(hdr[pos]);
        pos += 1;
    }

    String::from_utf8_lossy(&hdr).to_string()
}

pub fn has_lone_cr_or_lf(data: &[u8]) -> bool {
    for i in memchr::memchr2_iter(b'\r', b'\n', data) {
        match data[i] {
            b'\r' => {
                if data.get(i + 1).copied() != Some(b'\n') {
                    return true;
                }
            }
            b'\n' => {
                if i == 0 || data[i - 1] != b'\r' {
                    return true;
                }
            }
            _ => unreachable!(),
        }
    }
    false
}

/// Reduce CRLF (and lone CR) line endings to LF, the internal canonical
/// form.
pub fn crlf_to_lf(data: &[u8]) -> Vec<u8> {
    let mut normalized = Vec::with_capacity(data.len());
    let mut last_idx = 0;

    for i in memchr::memchr_iter(b'\r', data) {
        if i < last_idx {
            continue;
        }
        normalized.extend_from_slice(&data[last_idx..i]);
        if data.get(i + 1).copied() != Some(b'\n') {
            normalized.push(b'\n');
        }
        last_idx = i + 1;
    }

    normalized.extend_from_slice(&data[last_idx..]);
    normalized
}

/// Expand LF line endings to CRLF. Existing CRLF sequences are left
/// alone.
pub fn lf_to_crlf(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len() / 32);
    let mut last_idx = 0;

    for i in memchr::memchr_iter(b'\n', data) {
        normalized_line(&mut out, &data[last_idx..i]);
        out.extend_from_slice(b"\r\n");
        last_idx = i + 1;
    }
    out.extend_from_slice(&data[last_idx..]);
    out
}

fn normalized_line(out: &mut Vec<u8>, line: &[u8]) {
    match line.last() {
        Some(b'\r') => out.extend_from_slice(&line[..line.len() - 1]),
        _ => out.extend_from_slice(line),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unfold_basic() {
        k9::assert_equal!(unfold_header(b"Subject: hello"), b"Subject: hello".to_vec());
        k9::assert_equal!(
            unfold_header(b"Subject: hello\n there"),
            b"Subject: hello there".to_vec()
        );
        k9::assert_equal!(
            unfold_header(b"Subject: hello\r\n\tthere"),
            b"Subject: hello there".to_vec()
        );
        // whitespace before the break is dropped
        k9::assert_equal!(
            unfold_header(b"Subject: hello  \n there"),
            b"Subject: hello there".to_vec()
        );
    }

    #[test]
    fn unfold_qp_continuation_quirk() {
        k9::assert_equal!(
            unfold_header(b"Subject: hello\n=20there"),
            b"Subject: hello there".to_vec()
        );
        k9::assert_equal!(
            unfold_header(b"Subject: hello\n=09there"),
            b"Subject: hello there".to_vec()
        );
        // =2X that is not =20/=09 is not fold whitespace
        k9::assert_equal!(
            unfold_header(b"Subject: hello\n=2Athere"),
            b"Subject: hello=2Athere".to_vec()
        );
    }

    #[test]
    fn unfold_trailing_break() {
        k9::assert_equal!(unfold_header(b"Subject: x\n"), b"Subject: x".to_vec());
    }

    #[test]
    fn fold_short_header_is_unchanged() {
        k9::assert_equal!(fold_header("Subject: hello"), "Subject: hello");
    }

    #[test]
    fn fold_prefers_commas() {
        let folded = fold_header(
            "To: alpha@example.com, bravo@example.com, charlie@example.com, \
             delta@example.com, echo@example.com",
        );
        for line in folded.split('\n') {
            assert!(line.len() <= SOFT_LINE_LIMIT + 1, "line too long: {line}");
        }
        // every break lands after a comma
        for line in folded.split('\n').take(folded.split('\n').count() - 1) {
            assert!(line.trim_end().ends_with(','), "expected comma break: {line}");
        }
    }

    #[test]
    fn fold_long_quoted_display_name() {
        let value = format!(
            "To: \"{} long quoted display name with spaces inside it\" <a@example.com>",
            "x".repeat(60)
        );
        let folded = fold_header(&value);
        // the only permissible break is outside the quoted string
        let first_line = folded.split('\n').next().unwrap();
        assert!(!first_line.trim_end().ends_with(','));
        k9::assert_equal!(folded.matches('"').count(), 2);
    }

    #[test]
    fn loner() {
        assert!(!has_lone_cr_or_lf(b""));
        assert!(!has_lone_cr_or_lf(b"hello\r\nthere\r\n"));
        assert!(has_lone_cr_or_lf(b"hello\n"));
        assert!(has_lone_cr_or_lf(b"hello\r"));
        assert!(has_lone_cr_or_lf(b"hello\nthere\r\n"));
    }

    #[test]
    fn newline_conversions() {
        k9::assert_equal!(crlf_to_lf(b"a\r\nb\r\n"), b"a\nb\n".to_vec());
        k9::assert_equal!(crlf_to_lf(b"a\nb\n"), b"a\nb\n".to_vec());
        k9::assert_equal!(crlf_to_lf(b"a\rb"), b"a\nb".to_vec());
        k9::assert_equal!(lf_to_crlf(b"a\nb\n"), b"a\r\nb\r\n".to_vec());
        k9::assert_equal!(lf_to_crlf(b"a\r\nb\n"), b"a\r\nb\r\n".to_vec());
        k9::assert_equal!(lf_to_crlf(b"tail"), b"tail".to_vec());
    }
}
