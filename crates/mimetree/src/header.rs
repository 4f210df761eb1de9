use crate::headermap::{EncodeHeaderValue, HeaderMap};
use crate::rfc5322::Parser;
use crate::typed::{HeaderValue, MailCopiesTo};
use crate::{
    scanner, AddrSpec, AddressList, Mailbox, MailboxList, MessageID, MimeError, MimeParameters,
    ParseWarnings, Result,
};
use chrono::{DateTime, FixedOffset, TimeZone};

/// A single header: its name, raw value and the separator observed (or
/// chosen) between them. The value is kept in 7-bit wire form; the
/// `as_*` accessors parse it on demand.
#[derive(Clone, Debug, PartialEq)]
pub struct Header {
    name: String,
    value: String,
    separator: String,
    warnings: ParseWarnings,
}

/// Holds the result of parsing a block of headers
#[derive(Debug)]
pub struct HeaderParseResult {
    pub headers: HeaderMap,
    pub body_offset: usize,
    pub warnings: ParseWarnings,
}

/// Headers scoped to the MIME entity rather than the message: the
/// `Content-*` family. These move with a body when a node flips
/// between single part and multipart.
pub fn is_mime_header(name: &str) -> bool {
    name.len() >= 8 && name[..8].eq_ignore_ascii_case("content-")
}

/// Pull one named header's unfolded raw value out of a raw head block
/// without parsing the rest.
pub fn extract_header(head: &[u8], name: &str) -> Option<String> {
    let mut line_start = 0;
    let bytes = head;
    while line_start < bytes.len() {
        let line_end = memchr::memchr(b'\n', &bytes[line_start..])
            .map(|p| p + line_start)
            .unwrap_or(bytes.len());

        let line = &bytes[line_start..line_end];
        if line.len() > name.len()
            && line[name.len()] == b':'
            && line[..name.len()].eq_ignore_ascii_case(name.as_bytes())
        {
            // collect any folded continuation lines
            let mut value_end = line_end;
            while value_end < bytes.len() {
                let next_end = memchr::memchr(b'\n', &bytes[value_end + 1..])
                    .map(|p| p + value_end + 1)
                    .unwrap_or(bytes.len());
                match bytes.get(value_end + 1) {
                    Some(b' ') | Some(b'\t') => value_end = next_end,
                    _ => break,
                }
            }
            let raw = &bytes[line_start + name.len() + 1..value_end];
            let unfolded = scanner::unfold_header(raw);
            return Some(String::from_utf8_lossy(&unfolded).trim().to_string());
        }
        line_start = line_end + 1;
    }
    None
}

impl Header {
    pub fn with_name_value<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            separator: ": ".into(),
            warnings: ParseWarnings::default(),
        }
    }

    pub fn new<N: Into<String>>(name: N, value: impl EncodeHeaderValue) -> Self {
        Self {
            name: name.into(),
            value: value.encode_value(),
            separator: ": ".into(),
            warnings: ParseWarnings::default(),
        }
    }

    /// Construct an unstructured header, applying RFC 2047 encoding to
    /// the segments that need it.
    pub fn new_unstructured<N: Into<String>, V: AsRef<str>>(name: N, value: V) -> Self {
        let value = value.as_ref();
        let value = if value.is_ascii() {
            value.to_string()
        } else {
            crate::rfc2047::encode_sentence(value)
        };
        Self {
            name: name.into(),
            value,
            separator: ": ".into(),
            warnings: ParseWarnings::default(),
        }
    }

    pub fn assign(&mut self, v: impl EncodeHeaderValue) {
        self.value = v.encode_value();
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_raw_value(&self) -> &str {
        &self.value
    }

    pub fn warnings(&self) -> ParseWarnings {
        self.warnings
    }

    /// Format the header into the provided output stream the way it
    /// would appear in an assembled head block: folded to the line
    /// length budget, LF line endings.
    pub fn write_header<W: std::io::Write>(&self, out: &mut W) -> std::io::Result<()> {
        let rendered = format!("{}{}{}", self.name, self.separator, self.value);
        let folded = scanner::fold_header(&rendered);
        out.write_all(folded.as_bytes())?;
        out.write_all(b"\n")
    }

    /// Convenience method wrapping write_header that returns
    /// the formatted header as a standalone string
    pub fn to_header_string(&self) -> String {
        let mut out = vec![];
        self.write_header(&mut out).expect("writing to Vec cannot fail");
        String::from_utf8_lossy(&out).to_string()
    }

    pub fn as_content_type(&self) -> Result<MimeParameters> {
        Parser::parse_content_type_header(self.get_raw_value())
    }

    pub fn as_content_transfer_encoding(&self) -> Result<MimeParameters> {
        Parser::parse_token_with_params_header(self.get_raw_value())
    }

    pub fn as_content_disposition(&self) -> Result<MimeParameters> {
        Parser::parse_token_with_params_header(self.get_raw_value())
    }

    /// Parse the header into a mailbox-list (as defined in RFC 5322),
    /// which is how the `From` and `Resent-From` headers are defined.
    pub fn as_mailbox_list(&self) -> Result<MailboxList> {
        Parser::parse_mailbox_list_header(self.get_raw_value())
    }

    /// Parse the header into a mailbox (as defined in RFC 5322),
    /// which is how the `Sender` and `Resent-Sender` headers are
    /// defined.
    pub fn as_mailbox(&self) -> Result<Mailbox> {
        Parser::parse_mailbox_header(self.get_raw_value())
    }

    pub fn as_address_list(&self) -> Result<AddressList> {
        Parser::parse_address_list_header(self.get_raw_value())
    }

    pub fn as_message_id(&self) -> Result<MessageID> {
        Parser::parse_msg_id_header(self.get_raw_value())
    }

    pub fn as_content_id(&self) -> Result<MessageID> {
        Parser::parse_content_id_header(self.get_raw_value())
    }

    pub fn as_message_id_list(&self) -> Result<Vec<MessageID>> {
        Parser::parse_msg_id_header_list(self.get_raw_value())
    }

    pub fn as_unstructured(&self) -> Result<String> {
        Parser::parse_unstructured_header(self.get_raw_value())
    }

    pub fn as_phrase_list(&self) -> Result<Vec<String>> {
        Parser::parse_phrase_list_header(self.get_raw_value())
    }

    pub fn as_return_path(&self) -> Result<Option<AddrSpec>> {
        Parser::parse_return_path_header(self.get_raw_value())
    }

    pub fn as_newsgroups(&self) -> Result<Vec<String>> {
        Parser::parse_newsgroups_header(self.get_raw_value())
    }

    pub fn as_lines(&self) -> Result<u64> {
        Parser::parse_lines_header(self.get_raw_value())
    }

    pub fn as_control(&self) -> Result<(String, String)> {
        Parser::parse_control_header(self.get_raw_value())
    }

    pub fn as_mail_copies_to(&self) -> Result<MailCopiesTo> {
        MailCopiesTo::parse(self.get_raw_value())
    }

    pub fn as_date(&self) -> Result<DateTime<FixedOffset>> {
        let value = self.get_raw_value();
        DateTime::parse_from_rfc2822(value.trim())
            .ok()
            .or_else(|| parse_date_permissive(value))
            .ok_or_else(|| MimeError::DateParse(value.to_string()))
    }

    pub fn parse_headers(header_block: &[u8]) -> Result<HeaderParseResult> {
        let mut headers = vec![];
        let mut idx = 0;
        let mut overall = ParseWarnings::default();

        while idx < header_block.len() {
            let b = header_block[idx];
            if b == b'\n' {
                // LF: end of header block
                idx += 1;
                overall.set(ParseWarnings::NON_CANONICAL_LINE_ENDINGS, true);
                break;
            }
            if b == b'\r' {
                if header_block.get(idx + 1) == Some(&b'\n') {
                    // CRLF: end of header block
                    idx += 2;
                    break;
                }
                return Err(MimeError::HeaderParse("lone CR in header".to_string()));
            }
            if headers.is_empty() && b.is_ascii_whitespace() {
                return Err(MimeError::HeaderParse(
                    "header block must not start with spaces".to_string(),
                ));
            }
            let (header, next) = Header::parse(&header_block[idx..])?;
            overall |= header.warnings;
            headers.push(header);
            debug_assert!(next != 0, "idx={idx}, headers: {headers:#?}");
            idx += next;
        }
        Ok(HeaderParseResult {
            headers: HeaderMap::new(headers),
            body_offset: idx,
            warnings: overall,
        })
    }

    /// Like [Self::parse_headers], but never fails: a header line the
    /// strict parser rejects is stored verbatim as a generic header
    /// with the MALFORMED_HEADER warning raised.
    pub fn parse_headers_lenient(header_block: &[u8]) -> HeaderParseResult {
        let mut headers = vec![];
        let mut idx = 0;
        let mut overall = ParseWarnings::default();

        while idx < header_block.len() {
            let b = header_block[idx];
            if b == b'\n' {
                idx += 1;
                overall.set(ParseWarnings::NON_CANONICAL_LINE_ENDINGS, true);
                break;
            }
            if b == b'\r' && header_block.get(idx + 1) == Some(&b'\n') {
                idx += 2;
                break;
            }

            let parsed = if b.is_ascii_whitespace() {
                // stray continuation with nothing to continue
                Err(MimeError::HeaderParse("orphan continuation line".to_string()))
            } else {
                Header::parse(&header_block[idx..])
            };

            match parsed {
                Ok((header, next)) => {
                    overall |= header.warnings;
                    headers.push(header);
                    idx += next.max(1);
                }
                Err(err) => {
                    tracing::warn!("malformed header: {err:#}");
                    overall.set(ParseWarnings::MALFORMED_HEADER, true);
                    if has_unbalanced_comment(&header_block[idx..]) {
                        overall.set(ParseWarnings::UNBALANCED_COMMENT, true);
                    }
                    // consume the logical line, honoring folded
                    // continuations, and keep it verbatim
                    let mut end = memchr::memchr(b'\n', &header_block[idx..])
                        .map(|p| p + idx)
                        .unwrap_or(header_block.len());
                    while end < header_block.len() {
                        match header_block.get(end + 1) {
                            Some(b' ') | Some(b'\t') => {
                                end = memchr::memchr(b'\n', &header_block[end + 1..])
                                    .map(|p| p + end + 1)
                                    .unwrap_or(header_block.len());
                            }
                            _ => break,
                        }
                    }
                    let line = String::from_utf8_lossy(&header_block[idx..end]);
                    let (name, value) = match line.split_once(':') {
                        Some((name, value)) => {
                            (name.trim().to_string(), value.trim().to_string())
                        }
                        None => (line.trim().to_string(), String::new()),
                    };
                    let mut header = Header::with_name_value(name, value);
                    header.warnings.set(ParseWarnings::MALFORMED_HEADER, true);
                    headers.push(header);
                    idx = end + 1;
                }
            }
        }

        HeaderParseResult {
            headers: HeaderMap::new(headers),
            body_offset: idx.min(header_block.len()),
            warnings: overall,
        }
    }

    pub fn parse(header_block: &[u8]) -> Result<(Self, usize)> {
        enum State {
            Initial,
            Name,
            Separator,
            Value,
            NewLine,
        }

        let mut state = State::Initial;

        let mut iter = header_block.iter();
        let mut c = *iter
            .next()
            .ok_or_else(|| MimeError::HeaderParse("empty header string".to_string()))?;

        let mut name_end = None;
        let mut value_start = 0;
        let mut value_end = 0;

        let mut idx = 0usize;
        let mut warnings = ParseWarnings::default();
        let mut saw_cr = false;
        let mut line_start = 0;
        let mut max_line_len = 0;

        loop {
            match state {
                State::Initial => {
                    if c.is_ascii_whitespace() {
                        return Err(MimeError::HeaderParse(
                            "header cannot start with space".to_string(),
                        ));
                    }
                    state = State::Name;
                    continue;
                }
                State::Name => {
                    if c == b':' {
                        if name_end.is_none() {
                            name_end.replace(idx);
                        }
                        state = State::Separator;
                    } else if c == b' ' || c == b'\t' {
                        if name_end.is_none() {
                            name_end.replace(idx);
                        }
                        warnings.set(ParseWarnings::NAME_ENDS_WITH_SPACE, true);
                    } else if c == b'\n' {
                        // got a newline before the name finished
                        warnings.set(ParseWarnings::MISSING_COLON_VALUE, true);
                        name_end.replace(idx);
                        max_line_len = max_line_len.max(idx.saturating_sub(line_start));
                        value_start = idx;
                        value_end = idx;
                        idx += 1;
                        break;
                    } else if c != b'\r' && !(33..=126).contains(&c) {
                        return Err(MimeError::HeaderParse(format!(
                            "header name must be comprised of printable US-ASCII characters. Found {c:?}"
                        )));
                    }
                }
                State::Separator => {
                    if c != b' ' {
                        value_start = idx;
                        value_end = idx;
                        state = State::Value;
                        continue;
                    }
                }
                State::Value => {
                    if c == b'\n' {
                        if !saw_cr {
                            warnings.set(ParseWarnings::NON_CANONICAL_LINE_ENDINGS, true);
                        }
                        state = State::NewLine;
                        saw_cr = false;
                        max_line_len = max_line_len.max(idx.saturating_sub(line_start));
                        line_start = idx + 1;
                    } else if c != b'\r' {
                        value_end = idx + 1;
                        saw_cr = false;
                    } else {
                        saw_cr = true;
                    }
                }
                State::NewLine => {
                    if c == b' ' || c == b'\t' {
                        state = State::Value;
                        continue;
                    }
                    break;
                }
            }
            idx += 1;
            c = match iter.next() {
                None => break,
                Some(v) => *v,
            };
        }

        max_line_len = max_line_len.max(idx.saturating_sub(line_start));
        if max_line_len > scanner::SOFT_LINE_LIMIT {
            warnings.set(ParseWarnings::LINE_TOO_LONG, true);
        }

        let name_end = name_end.unwrap_or_else(|| {
            warnings.set(ParseWarnings::MISSING_COLON_VALUE, true);
            idx
        });

        let name = String::from_utf8_lossy(&header_block[0..name_end]).to_string();
        let value =
            String::from_utf8_lossy(&header_block[value_start..value_end.max(value_start)])
                .to_string();
        let separator =
            String::from_utf8_lossy(&header_block[name_end..value_start.max(name_end)])
                .to_string();

        let header = Self {
            name,
            value,
            separator,
            warnings,
        };

        Ok((header, idx))
    }

    /// Re-constitute the header: parse the value according to the known
    /// schema of the header name and re-emit the parsed form. This has
    /// the side effect of fixing non-conforming elements, at the cost
    /// of dropping anything the schema could not represent.
    pub fn rebuild(&self) -> Result<Self> {
        let value = HeaderValue::parse(self.get_name(), self.get_raw_value()).map_err(|err| {
            MimeError::HeaderParse(format!("rebuilding '{}' header: {err:#}", self.name))
        })?;
        Ok(Self::with_name_value(self.name.clone(), value.encode()))
    }
}

/// Whether a header line opens a comment it never closes; the cursor
/// of a structured parse is left parked at the outermost `(` in that
/// case, so the rest of the value is unreachable.
fn has_unbalanced_comment(line: &[u8]) -> bool {
    let mut depth = 0i32;
    let mut quoted = false;
    let mut escaped = false;
    for &b in line {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' => escaped = true,
            b'"' if depth == 0 => quoted = !quoted,
            b'(' if !quoted => depth += 1,
            b')' if !quoted => depth -= 1,
            b'\n' if depth == 0 => break,
            _ => {}
        }
    }
    depth != 0
}

const MONTHS: &[&str] = &[
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

fn zone_offset_seconds(zone: &str) -> Option<i32> {
    let zone = zone.trim();
    if let Some(rest) = zone.strip_prefix(['+', '-']) {
        if rest.len() == 4 && rest.bytes().all(|b| b.is_ascii_digit()) {
            let hours: i32 = rest[0..2].parse().ok()?;
            let mins: i32 = rest[2..4].parse().ok()?;
            let sign = if zone.starts_with('-') { -1 } else { 1 };
            return Some(sign * (hours * 3600 + mins * 60));
        }
        return None;
    }
    let hours = match zone.to_ascii_uppercase().as_str() {
        "UT" | "GMT" | "UTC" | "Z" => 0,
        "EST" => -5,
        "EDT" => -4,
        "CST" => -6,
        "CDT" => -5,
        "MST" => -7,
        "MDT" => -6,
        "PST" => -8,
        "PDT" => -7,
        // single-letter military zones carry no reliable meaning
        z if z.len() == 1 && z.bytes().all(|b| b.is_ascii_alphabetic()) => 0,
        _ => return None,
    };
    Some(hours * 3600)
}

/// Permissive date parser for the wild variants RFC 2822 parsing
/// rejects: omitted seconds, two-digit years, alphabetic or absent time
/// zones, and obsolete or full day names.
pub(crate) fn parse_date_permissive(value: &str) -> Option<DateTime<FixedOffset>> {
    let mut tokens: Vec<&str> = value
        .split(|c: char| c.is_ascii_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .collect();

    // drop a leading day name, full or abbreviated
    if let Some(first) = tokens.first() {
        if first.chars().all(|c| c.is_ascii_alphabetic())
            && !MONTHS.contains(&first.to_ascii_lowercase()[..3.min(first.len())].as_ref())
        {
            tokens.remove(0);
        }
    }

    if tokens.len() < 4 {
        return None;
    }

    let day: u32 = tokens[0].parse().ok()?;
    let month = MONTHS
        .iter()
        .position(|m| tokens[1].to_ascii_lowercase().starts_with(m))?
        as u32
        + 1;
    let year: i32 = tokens[2].parse().ok()?;
    let year = match year {
        0..=49 => year + 2000,
        50..=999 => year + 1900,
        y => y,
    };

    let mut time_parts = tokens[3].split(':');
    let hour: u32 = time_parts.next()?.parse().ok()?;
    let minute: u32 = time_parts.next()?.parse().ok()?;
    let second: u32 = match time_parts.next() {
        Some(s) => s.parse().ok()?,
        None => 0,
    };

    let offset_seconds = tokens
        .get(4)
        .and_then(|z| zone_offset_seconds(z))
        .unwrap_or(0);
    let offset = FixedOffset::east_opt(offset_seconds)?;
    offset
        .with_ymd_and_hms(year, month, day, hour, minute, second)
        .single()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn header_construction() {
        let header = Header::with_name_value("To", "someone@example.com");
        k9::assert_equal!(header.get_name(), "To");
        k9::assert_equal!(header.get_raw_value(), "someone@example.com");
        k9::assert_equal!(header.to_header_string(), "To: someone@example.com\n");
    }

    #[test]
    fn header_parsing() {
        let message = concat!(
            "Subject: hello there\n",
            "From:  Someone <someone@example.com>\n",
            "\n",
            "I am the body"
        );

        let HeaderParseResult {
            headers,
            body_offset,
            warnings,
        } = Header::parse_headers(message.as_bytes()).unwrap();
        k9::assert_equal!(&message[body_offset..], "I am the body");
        assert!(warnings.contains(ParseWarnings::NON_CANONICAL_LINE_ENDINGS));

        k9::assert_equal!(headers.len(), 2);
        k9::assert_equal!(headers[0].get_name(), "Subject");
        k9::assert_equal!(headers[0].get_raw_value(), "hello there");
        k9::assert_equal!(headers[1].get_name(), "From");
        k9::assert_equal!(headers[1].get_raw_value(), "Someone <someone@example.com>");
    }

    #[test]
    fn folded_value_parses_across_lines() {
        let block = b"Subject: hello\n\tthere\n\nbody";
        let HeaderParseResult {
            headers,
            body_offset,
            ..
        } = Header::parse_headers(block).unwrap();
        k9::assert_equal!(headers[0].get_raw_value(), "hello\n\tthere");
        k9::assert_equal!(headers[0].as_unstructured().unwrap(), "hello there");
        k9::assert_equal!(&block[body_offset..], b"body");
    }

    #[test]
    fn as_mailbox() {
        let sender = Header::with_name_value("Sender", "John Smith <jsmith@example.com>");
        k9::assert_equal!(
            sender.as_mailbox().unwrap(),
            Mailbox {
                name: Some("John Smith".to_string()),
                address: AddrSpec::new("jsmith", "example.com"),
            }
        );
    }

    #[test]
    fn assign_mailbox() {
        let mut sender = Header::with_name_value("Sender", "");
        sender.assign(Mailbox {
            name: Some("John Smith".to_string()),
            address: AddrSpec::new("john.smith", "example.com"),
        });
        k9::assert_equal!(
            sender.to_header_string(),
            "Sender: John Smith <john.smith@example.com>\n"
        );
    }

    #[test]
    fn boundary_scenario_encoded_subject() {
        let HeaderParseResult {
            headers,
            body_offset,
            ..
        } = Header::parse_headers(b"Subject: =?utf-8?B?SMOpbGxv?=\n\nbody").unwrap();
        k9::assert_equal!(headers[0].as_unstructured().unwrap(), "Héllo");
        k9::assert_equal!(body_offset, 31);
    }

    #[test]
    fn no_blank_line_terminates_head() {
        let HeaderParseResult {
            headers,
            body_offset,
            ..
        } = Header::parse_headers(b"Subject: x").unwrap();
        k9::assert_equal!(headers[0].get_raw_value(), "x");
        k9::assert_equal!(body_offset, 10);
    }

    #[test]
    fn long_header_folds_on_write() {
        let header = Header::new_unstructured(
            "Subject",
            "hello there, this is a longer header than the standard width \
             and so it should get wrapped in the produced value",
        );
        let rendered = header.to_header_string();
        assert!(rendered.contains('\n'));
        for line in rendered.trim_end().split('\n') {
            assert!(line.len() <= scanner::SOFT_LINE_LIMIT + 1, "{line}");
        }
        // and it still parses back to the original text
        let (parsed, _) = Header::parse(rendered.as_bytes()).unwrap();
        k9::assert_equal!(
            parsed.as_unstructured().unwrap(),
            "hello there, this is a longer header than the standard width \
             and so it should get wrapped in the produced value"
        );
    }

    #[test]
    fn unstructured_encode_roundtrip() {
        let header = Header::new_unstructured("Subject", "hello André Pirard");
        k9::assert_equal!(
            header.get_raw_value(),
            "hello =?UTF-8?q?Andr=C3=A9?= Pirard"
        );
        k9::assert_equal!(header.as_unstructured().unwrap(), "hello André Pirard");
    }

    #[test]
    fn rebuild_canonicalizes() {
        let (header, _) = Header::parse(
            b"Subject: =?UTF-8?q?=D8=AA=D8=B3=D8=AA_=DB=8C=DA=A9_=D8=AF=D9=88_=D8=B3=D9=87?=",
        )
        .unwrap();
        k9::assert_equal!(header.as_unstructured().unwrap(), "تست یک دو سه");

        let rebuilt = header.rebuild().unwrap();
        k9::assert_equal!(rebuilt.as_unstructured().unwrap(), "تست یک دو سه");
    }

    #[test]
    fn rfc2231_multi_line_filename() {
        let header = Header::with_name_value(
            "Content-Disposition",
            "attachment;\n\
            \tfilename*0*=UTF-8''%D0%A7%D0%B0%D1%81%D1%82%D0%B8%D0%BD%D0%B0%20%D0%B2;\n\
            \tfilename*1*=%D0%BA%D0%BB%D0%B0%D0%B4%D0%B5%D0%BD%D0%BE%D0%B3%D0%BE%20;\n\
            \tfilename*2*=%D0%BF%D0%BE%D0%B2%D1%96%D0%B4%D0%BE%D0%BC%D0%BB%D0%B5%D0%BD;\n\
            \tfilename*3*=%D0%BD%D1%8F",
        );
        let cd = header.as_content_disposition().unwrap();
        k9::assert_equal!(
            cd.get("filename").unwrap(),
            "Частина вкладеного повідомлення"
        );
    }

    #[test]
    fn date_variants() {
        let header = Header::with_name_value("Date", "Tue, 1 Jul 2003 10:52:37 +0200");
        k9::assert_equal!(
            header.as_date().unwrap().to_rfc2822(),
            "Tue, 1 Jul 2003 10:52:37 +0200"
        );

        // omitted seconds
        let header = Header::with_name_value("Date", "1 Jul 2003 10:52 +0200");
        k9::assert_equal!(
            header.as_date().unwrap().to_rfc2822(),
            "Tue, 1 Jul 2003 10:52:00 +0200"
        );

        // alphabetic zone
        let header = Header::with_name_value("Date", "Tue, 1 Jul 2003 10:52:37 EST");
        k9::assert_equal!(
            header.as_date().unwrap().to_rfc2822(),
            "Tue, 1 Jul 2003 10:52:37 -0500"
        );

        // full day name and two-digit year
        let header = Header::with_name_value("Date", "Tuesday, 1 Jul 03 10:52:37 GMT");
        k9::assert_equal!(
            header.as_date().unwrap().to_rfc2822(),
            "Tue, 1 Jul 2003 10:52:37 +0000"
        );

        // no zone at all
        let header = Header::with_name_value("Date", "1 Jul 2003 10:52:37");
        k9::assert_equal!(
            header.as_date().unwrap().to_rfc2822(),
            "Tue, 1 Jul 2003 10:52:37 +0000"
        );

        let header = Header::with_name_value("Date", "not a date");
        assert!(header.as_date().is_err());
    }

    #[test]
    fn lenient_parse_keeps_malformed_headers() {
        let block = b"Subject: ok\nBad\xffName: value\nX-Tail: yes\n\nbody";
        let result = Header::parse_headers_lenient(block);
        assert!(result.warnings.contains(ParseWarnings::MALFORMED_HEADER));
        k9::assert_equal!(result.headers.len(), 3);
        k9::assert_equal!(result.headers[0].get_raw_value(), "ok");
        k9::assert_equal!(result.headers[2].get_name(), "X-Tail");
        k9::assert_equal!(&block[result.body_offset..], b"body");
    }

    #[test]
    fn lenient_parse_flags_unbalanced_comments() {
        // the control byte makes the strict parser reject the line, and
        // the unbalanced comment is reported alongside
        let block = b"T\x01o: (dangling comment\n\nbody";
        let result = Header::parse_headers_lenient(block);
        assert!(result.warnings.contains(ParseWarnings::MALFORMED_HEADER));
        assert!(result.warnings.contains(ParseWarnings::UNBALANCED_COMMENT));
    }

    #[test]
    fn extract_header_from_block() {
        let head = b"Subject: foo (1/3)\nX-Other: bar\n\tbaz\n";
        k9::assert_equal!(extract_header(head, "subject").unwrap(), "foo (1/3)");
        k9::assert_equal!(extract_header(head, "X-Other").unwrap(), "bar baz");
        assert!(extract_header(head, "Missing").is_none());
    }

    #[test]
    fn mime_header_predicate() {
        assert!(is_mime_header("Content-Type"));
        assert!(is_mime_header("content-transfer-encoding"));
        assert!(!is_mime_header("Subject"));
        assert!(!is_mime_header("X-Content"));
    }
}
