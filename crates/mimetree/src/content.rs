//! The Content tree: a node owning raw head and body octets, an
//! ordered list of children, and the cached typed headers parsed from
//! the head. A node flips between leaf and container according to its
//! Content-Type, including the conversion of uuencoded and yEnc bodies
//! into a proper MIME structure.

use crate::bodyparse;
use crate::codecs;
use crate::header::{extract_header, is_mime_header, Header};
use crate::headermap::HeaderMap;
use crate::typed::TransferEncoding;
use crate::{charsets, scanner, ContentIndex, MimeParameters, ParseWarnings};
use bstr::BString;

/// The role a node plays in its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentCategory {
    /// A standalone or leaf part
    #[default]
    Single,
    /// A part holding sub-parts
    Container,
    /// A sub-part of a multipart/mixed (or equivalent) container
    MixedPart,
    /// A sub-part of a multipart/alternative container
    AlternativePart,
}

/// Generate a boundary string for a synthesized multipart container.
pub fn multipart_boundary() -> String {
    let uuid = uuid::Uuid::new_v4();
    data_encoding::BASE64_NOPAD.encode(uuid.as_bytes())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    head: BString,
    body: BString,
    /// Exact original bytes (LF-normalized) from set_content; the
    /// source of truth for a frozen node
    raw: BString,
    children: Vec<Content>,
    headers: HeaderMap,
    parsed: bool,
    category: ContentCategory,
    preamble: BString,
    epilogue: BString,
    frozen: bool,
    /// Whether the in-memory body holds the decoded form (true) or the
    /// encoded wire form (false)
    transfer_decoded: bool,
    default_charset: String,
    force_default_charset: bool,
    warnings: ParseWarnings,
}

impl Default for Content {
    fn default() -> Self {
        Self {
            head: BString::default(),
            body: BString::default(),
            raw: BString::default(),
            children: vec![],
            headers: HeaderMap::default(),
            parsed: false,
            category: ContentCategory::default(),
            preamble: BString::default(),
            epilogue: BString::default(),
            frozen: false,
            transfer_decoded: true,
            default_charset: charsets::default_charset(),
            force_default_charset: charsets::force_default_charset(),
            warnings: ParseWarnings::default(),
        }
    }
}

impl Content {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct from raw message bytes and parse in one step.
    pub fn from_bytes<B: AsRef<[u8]>>(bytes: B) -> Self {
        let mut content = Self::new();
        content.set_content(bytes);
        content.parse();
        content
    }

    /// Install raw message bytes: line endings are normalized to LF and
    /// the buffer split at the first empty line into head and body. A
    /// solitary trailing LF terminates the head when no blank line is
    /// present. Resets any previously parsed state.
    pub fn set_content<B: AsRef<[u8]>>(&mut self, bytes: B) {
        let normalized = scanner::crlf_to_lf(bytes.as_ref());

        self.children.clear();
        self.headers = HeaderMap::default();
        self.parsed = false;
        self.preamble.clear();
        self.epilogue.clear();
        self.warnings = ParseWarnings::default();
        self.transfer_decoded = false;

        match memchr::memmem::find(&normalized, b"\n\n") {
            Some(pos) => {
                self.head = BString::from(&normalized[..pos + 1]);
                self.body = BString::from(&normalized[pos + 2..]);
            }
            None => {
                self.head = BString::from(normalized.as_slice());
                self.body = BString::default();
            }
        }
        self.raw = BString::from(normalized);
    }

    pub fn head(&self) -> &[u8] {
        &self.head
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Install body bytes directly, bypassing line-ending
    /// normalization. Used for binary payloads.
    pub fn set_body<B: AsRef<[u8]>>(&mut self, bytes: B) {
        self.body = BString::from(bytes.as_ref());
    }

    pub fn children(&self) -> &[Content] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<Content> {
        &mut self.children
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn category(&self) -> ContentCategory {
        self.category
    }

    pub fn set_category(&mut self, category: ContentCategory) {
        self.category = category;
    }

    /// Bytes before the first boundary of a multipart body.
    pub fn preamble(&self) -> &[u8] {
        &self.preamble
    }

    /// Bytes after the closing boundary of a multipart body.
    pub fn epilogue(&self) -> &[u8] {
        &self.epilogue
    }

    pub fn warnings(&self) -> ParseWarnings {
        self.warnings
    }

    /// Whether cached headers (and children, where applicable) have
    /// been materialized from the raw buffers.
    pub fn is_parsed(&self) -> bool {
        self.parsed
    }

    /// Freeze the node: assemble becomes a no-op and encoded_content
    /// reproduces the bytes originally set (modulo the line-ending
    /// normalization applied on ingest).
    pub fn freeze(&mut self) {
        self.frozen = true;
        for child in &mut self.children {
            child.freeze();
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn default_charset(&self) -> &str {
        &self.default_charset
    }

    /// Set the fallback charset for this subtree and reparse it so any
    /// cached header decisions pick up the change.
    pub fn set_default_charset(&mut self, charset: &str) {
        self.propagate_charset(&charsets::cached_charset(charset));
        self.parse();
    }

    fn propagate_charset(&mut self, canonical: &str) {
        self.default_charset = canonical.to_string();
        for child in &mut self.children {
            child.propagate_charset(canonical);
        }
    }

    pub fn force_default_charset(&self) -> bool {
        self.force_default_charset
    }

    /// When set, the default charset overrides any charset declared in
    /// this subtree's headers. Triggers a reparse like
    /// [Self::set_default_charset].
    pub fn set_force_default_charset(&mut self, force: bool) {
        self.propagate_force(force);
        self.parse();
    }

    fn propagate_force(&mut self, force: bool) {
        self.force_default_charset = force;
        for child in &mut self.children {
            child.propagate_force(force);
        }
    }

    /// The charset governing this node's text body.
    pub fn charset(&self) -> String {
        if self.force_default_charset {
            return self.default_charset.clone();
        }
        self.content_type()
            .and_then(|ct| ct.charset())
            .map(|cs| charsets::cached_charset(&cs))
            .unwrap_or_else(|| self.default_charset.clone())
    }

    /// The cached Content-Type, if present and well formed.
    pub fn content_type(&self) -> Option<MimeParameters> {
        self.headers.content_type().ok().flatten()
    }

    /// The transfer encoding declared for this node's body; 7bit when
    /// absent or unparseable.
    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.headers
            .content_transfer_encoding()
            .ok()
            .flatten()
            .and_then(|params| params.value.parse().ok())
            .unwrap_or_default()
    }

    /// Whether the in-memory body bytes are the decoded form.
    pub fn is_transfer_decoded(&self) -> bool {
        self.transfer_decoded
    }

    pub fn is_text_type(&self) -> bool {
        self.content_type().map(|ct| ct.is_text()).unwrap_or(true)
    }

    fn raw_subject(&self) -> String {
        extract_header(&self.head, "Subject").unwrap_or_default()
    }

    /// Parse the node: materialize cached headers from the head bytes
    /// and split the body into child parts as its Content-Type
    /// dictates. Recoverable problems degrade the classification and
    /// raise warnings; parse itself never fails.
    pub fn parse(&mut self) {
        let parsed = Header::parse_headers_lenient(&self.head);
        self.headers = parsed.headers;
        self.warnings = parsed.warnings;
        self.parsed = true;

        // headers that admit one value keep their first occurrence
        for name in ["Content-Type", "Content-Transfer-Encoding", "Return-Path", "Sender"] {
            if self.headers.iter_named(name).count() > 1 {
                tracing::warn!("multiple {name} headers; keeping the first");
                self.warnings
                    .set(ParseWarnings::MULTIPLE_WHERE_SINGLE_EXPECTED, true);
            }
        }

        // if this node was already split into parts, reparse those
        // instead of re-splitting a body we no longer hold
        if self.body.is_empty() && !self.children.is_empty() {
            for child in &mut self.children {
                child.parse();
            }
            return;
        }
        self.children.clear();

        // a bare "text" mime type comes from broken producers; coerce
        // it so the body is re-examined for uuencode/yEnc payloads
        let ct_header_present = self.headers.get_first("Content-Type").is_some();
        let mut ct = match self.headers.content_type() {
            Ok(ct) => ct,
            Err(err) => {
                tracing::warn!("malformed Content-Type: {err:#}");
                self.warnings.set(ParseWarnings::MALFORMED_HEADER, true);
                None
            }
        };
        if ct.is_none()
            && ct_header_present
            && self
                .headers
                .get_first("Content-Type")
                .map(|h| h.get_raw_value().trim().eq_ignore_ascii_case("text"))
                .unwrap_or(false)
        {
            let coerced = MimeParameters::new("invalid/invalid");
            self.headers.set_content_type(coerced.clone());
            ct = Some(coerced);
        }

        self.transfer_decoded = self.transfer_encoding().is_identity();
        self.category = ContentCategory::Single;

        if let Some(cs) = ct.as_ref().and_then(|ct| ct.charset()) {
            if charsets::codec_for(&cs).is_none() {
                tracing::warn!("no codec for declared charset '{cs}'");
                self.warnings.set(ParseWarnings::UNKNOWN_CHARSET, true);
            }
        }

        let mime_type = ct.as_ref().map(|ct| ct.value.clone()).unwrap_or_default();

        if ct.as_ref().map(|ct| ct.is_multipart()).unwrap_or(false) {
            self.parse_multipart(ct.expect("checked multipart"));
        } else if mime_type == "message/rfc822" {
            let mut child = self.make_child();
            child.set_content(std::mem::take(&mut self.body));
            child.parse();
            self.children.push(child);
            self.category = ContentCategory::Container;
        } else if !ct_header_present || mime_type == "invalid/invalid" {
            // no MIME structure declared; the body may carry one of the
            // legacy binary conventions
            self.parse_non_mime();
        }
        // anything else, text/* included, stays a leaf
    }

    fn make_child(&self) -> Content {
        let mut child = Content::new();
        child.default_charset = self.default_charset.clone();
        child.force_default_charset = self.force_default_charset;
        child
    }

    fn parse_multipart(&mut self, ct: MimeParameters) {
        let split = ct
            .boundary()
            .and_then(|b| bodyparse::split_multipart(&self.body, &b));

        let split = match split {
            Some(split) => split,
            None => {
                // no boundary, or it matched nothing: reclassify
                tracing::warn!("multipart body without usable boundary; treating as text/plain");
                self.warnings.set(ParseWarnings::BOUNDARY_MISSING, true);
                let mut fallback = MimeParameters::new("text/plain");
                fallback.set("charset", "US-ASCII");
                self.headers.set_content_type(fallback);
                return;
            }
        };

        let child_category = if ct.sub_type().eq_ignore_ascii_case("alternative") {
            ContentCategory::AlternativePart
        } else {
            ContentCategory::MixedPart
        };

        for part in split.parts {
            let mut child = self.make_child();
            child.set_content(part);
            child.parse();
            child.category = child_category;
            self.children.push(child);
        }
        self.preamble = BString::from(split.preamble);
        self.epilogue = BString::from(split.epilogue);
        self.body.clear();
        self.category = ContentCategory::Container;
    }

    fn parse_non_mime(&mut self) {
        let subject = self.raw_subject();

        if let Some(uu) = bodyparse::parse_uuencode(&self.body, &subject) {
            if let Some((number, total)) = uu.partial {
                let mut ct = MimeParameters::new("message/partial");
                ct.set_partial_params(total, number);
                self.headers.set_content_type(ct);
                self.headers.set_content_transfer_encoding("7bit");
                self.transfer_decoded = true;
                return;
            }
            let parts = uu
                .parts
                .into_iter()
                .map(|part| {
                    (
                        part.file_name,
                        part.mime_type,
                        TransferEncoding::Uuencode,
                        part.payload,
                    )
                })
                .collect();
            self.become_non_mime_container(uu.text, parts);
            return;
        }

        if let Some(yenc) = bodyparse::parse_yenc(&self.body) {
            if let Some((number, total)) = yenc.partial {
                let mut ct = MimeParameters::new("message/partial");
                ct.set_partial_params(total, number);
                self.headers.set_content_type(ct);
                self.headers.set_content_transfer_encoding("binary");
                self.transfer_decoded = false;
                return;
            }
            let parts = yenc
                .parts
                .into_iter()
                .map(|part| {
                    (
                        part.file_name,
                        part.mime_type,
                        TransferEncoding::Binary,
                        part.payload,
                    )
                })
                .collect();
            self.become_non_mime_container(yenc.text, parts);
            return;
        }

        // nothing recognizable; it is just text
        self.headers
            .set_content_type(MimeParameters::new("text/plain"));
    }

    /// Turn a non-MIME body into a multipart/mixed container: a text
    /// prelude child followed by one child per recovered binary part.
    fn become_non_mime_container(
        &mut self,
        text: Vec<u8>,
        parts: Vec<(String, &'static str, TransferEncoding, Vec<u8>)>,
    ) {
        let mut prelude = self.make_child();
        prelude.set_content(
            [
                b"Content-Type: text/plain\nContent-Transfer-Encoding: 7bit\n\n".to_vec(),
                text,
            ]
            .concat(),
        );
        prelude.parse();
        prelude.category = ContentCategory::MixedPart;
        self.children.push(prelude);

        for (file_name, mime_type, encoding, payload) in parts {
            let mut child = self.make_child();
            let head = format!(
                "Content-Type: {mime_type}; name=\"{file_name}\"\n\
                 Content-Transfer-Encoding: {encoding}\n\
                 Content-Disposition: attachment; filename=\"{file_name}\"\n",
            );
            child.set_content(head);
            child.set_body(payload);
            child.parse();
            child.category = ContentCategory::MixedPart;
            self.children.push(child);
        }

        self.body.clear();
        let mut ct = MimeParameters::new("multipart/mixed");
        ct.set("boundary", &multipart_boundary());
        self.headers.set_content_type(ct);
        self.headers.set_content_transfer_encoding("7bit");
        self.transfer_decoded = true;
        self.category = ContentCategory::Container;
        // the head no longer matches the synthesized structure
        self.assemble();
    }

    /// Regenerate the head bytes from the cached headers, MIME headers
    /// first in canonical order, everything else in first-seen order.
    /// A no-op on a frozen node.
    pub fn assemble(&mut self) {
        if self.frozen {
            return;
        }

        let mut ordered: Vec<&Header> = vec![];
        for name in [
            "Content-Type",
            "Content-Transfer-Encoding",
            "Content-Description",
            "Content-Disposition",
        ] {
            ordered.extend(self.headers.iter_named(name));
        }
        for header in self.headers.iter() {
            if !matches!(
                header.get_name().to_ascii_lowercase().as_str(),
                "content-type"
                    | "content-transfer-encoding"
                    | "content-description"
                    | "content-disposition"
            ) {
                ordered.push(header);
            }
        }

        let mut head = vec![];
        for header in ordered {
            header
                .write_header(&mut head)
                .expect("writing to Vec cannot fail");
        }
        self.head = BString::from(head);
    }

    /// Serialize the node and its subtree. `use_crlf` translates the
    /// final LF output to CRLF for the wire.
    pub fn encoded_content(&mut self, use_crlf: bool) -> Vec<u8> {
        if self.frozen && !self.raw.is_empty() {
            return if use_crlf {
                scanner::lf_to_crlf(&self.raw)
            } else {
                self.raw.to_vec()
            };
        }

        // legacy uuencode/binary children cannot travel in a MIME
        // envelope; re-encode them as base64 and refresh the envelope
        // headers to say so
        if !self.children.is_empty() {
            let mut converted = false;
            for child in &mut self.children {
                if matches!(
                    child.transfer_encoding(),
                    TransferEncoding::Uuencode | TransferEncoding::Binary
                ) {
                    let decoded = child.decoded_content();
                    let mut encoded = codecs::base64_encode(&decoded);
                    if !encoded.ends_with('\n') {
                        encoded.push('\n');
                    }
                    child.body = BString::from(encoded);
                    child.transfer_decoded = false;
                    child.headers.set_content_transfer_encoding("base64");
                    child.headers.remove_named("Content-Description");
                    child.assemble();
                    converted = true;
                }
            }
            if converted {
                self.headers.set_mime_version("1.0");
                self.headers.set_content_transfer_encoding("7bit");
                self.transfer_decoded = true;
                self.assemble();
            }
        }

        let mut out: Vec<u8> = self.head.to_vec();
        if !out.is_empty() && !out.ends_with(b"\n") {
            out.push(b'\n');
        }
        out.push(b'\n');

        if !self.body.is_empty() {
            let needs_encode = self.transfer_decoded
                && matches!(
                    self.transfer_encoding(),
                    TransferEncoding::QuotedPrintable | TransferEncoding::Base64
                );
            if needs_encode {
                match self.transfer_encoding() {
                    TransferEncoding::QuotedPrintable => {
                        out.extend_from_slice(&codecs::qp_encode(&self.body));
                        out.push(b'\n');
                    }
                    _ => {
                        out.extend_from_slice(codecs::base64_encode(&self.body).as_bytes());
                        out.push(b'\n');
                    }
                }
            } else {
                out.extend_from_slice(&self.body);
            }
        } else if !self.children.is_empty() {
            let ct = self.content_type();
            let is_encapsulated = ct
                .as_ref()
                .map(|ct| ct.is_mime_type("message/rfc822"))
                .unwrap_or(false);
            if is_encapsulated {
                let child = &mut self.children[0];
                out.extend_from_slice(&child.encoded_content(false));
            } else {
                let boundary = ct
                    .as_ref()
                    .and_then(|ct| ct.boundary())
                    .unwrap_or_else(multipart_boundary);
                for child in &mut self.children {
                    out.extend_from_slice(format!("--{boundary}\n").as_bytes());
                    out.extend_from_slice(&child.encoded_content(false));
                }
                out.extend_from_slice(format!("--{boundary}--\n").as_bytes());
            }
        }

        if use_crlf {
            scanner::lf_to_crlf(&out)
        } else {
            out
        }
    }

    /// Decode the leaf body according to its transfer encoding. The
    /// base64, quoted-printable and identity paths strip exactly one
    /// trailing LF when present; the binary path never does.
    pub fn decoded_content(&self) -> Vec<u8> {
        if self.body.is_empty() {
            return vec![];
        }

        let strip_one_newline = |mut bytes: Vec<u8>| {
            if bytes.last() == Some(&b'\n') {
                bytes.pop();
            }
            bytes
        };

        if self.transfer_decoded {
            return strip_one_newline(self.body.to_vec());
        }

        match self.transfer_encoding() {
            TransferEncoding::Base64 => {
                let (decoded, clean) = codecs::base64_decode(&self.body);
                if !clean {
                    tracing::warn!("truncated base64 body; returning partial decode");
                }
                strip_one_newline(decoded)
            }
            TransferEncoding::QuotedPrintable => {
                let (decoded, clean) = codecs::qp_decode(&self.body);
                if !clean {
                    tracing::warn!("undecodable quoted-printable body; returning raw bytes");
                }
                strip_one_newline(decoded)
            }
            TransferEncoding::Uuencode => {
                let (decoded, clean) = codecs::uudecode(&self.body);
                if !clean {
                    tracing::warn!("truncated uuencode body; returning partial decode");
                }
                decoded
            }
            TransferEncoding::Binary => self.body.to_vec(),
            TransferEncoding::SevenBit | TransferEncoding::EightBit => {
                strip_one_newline(self.body.to_vec())
            }
        }
    }

    /// Charset-decode a text body to unicode. `trim` removes all
    /// trailing whitespace instead of the default single newline.
    pub fn decoded_text(&self, trim: bool) -> Option<String> {
        if !self.is_text_type() {
            return None;
        }
        let bytes = self.decoded_content();
        let (mut text, _used) = charsets::decode(&bytes, &self.charset(), &self.default_charset);
        if trim {
            text.truncate(text.trim_end().len());
        } else if text.ends_with('\n') {
            text.pop();
        }
        Some(text)
    }

    /// Encode a unicode string into the body using this node's
    /// charset, falling back to UTF-8 (and recording that in the
    /// Content-Type) when the declared charset has no codec.
    pub fn set_body_from_unicode(&mut self, s: &str) {
        let declared = self.charset();
        let (bytes, used) = charsets::encode(s, &declared);
        if !used.eq_ignore_ascii_case(&declared) {
            let mut ct = self
                .content_type()
                .unwrap_or_else(|| MimeParameters::new("text/plain"));
            ct.set("charset", &used);
            self.headers.set_content_type(ct);
        }
        self.body = BString::from(bytes);
        self.transfer_decoded = true;
    }

    /// Add a child to this node. A leaf is first converted into a
    /// multipart/mixed container: the existing body and its MIME-scoped
    /// headers move into a synthesized first child. Any ContentIndex
    /// previously resolved against this subtree must be re-resolved
    /// afterwards.
    pub fn add_content(&mut self, child: Content, prepend: bool) {
        if self.children.is_empty() {
            let mut main = self.make_child();

            let (mime, kept): (Vec<Header>, Vec<Header>) = self
                .headers
                .drain(..)
                .partition(|h| is_mime_header(h.get_name()));
            main.headers = HeaderMap::new(mime);
            self.headers = HeaderMap::new(kept);

            main.category = ContentCategory::MixedPart;
            main.body = std::mem::take(&mut self.body);
            main.transfer_decoded = self.transfer_decoded;
            main.parsed = true;
            main.assemble();
            self.children.push(main);

            let mut ct = MimeParameters::new("multipart/mixed");
            ct.set("boundary", &multipart_boundary());
            self.headers.set_content_type(ct);
            self.headers.set_content_transfer_encoding("7bit");
            self.transfer_decoded = true;
            self.category = ContentCategory::Container;
            self.raw.clear();
            self.assemble();
        }

        if prepend {
            self.children.insert(0, child);
        } else {
            self.children.push(child);
        }
    }

    /// Remove and return the child at `index`. When exactly one child
    /// remains afterwards, the container collapses back into a leaf:
    /// the survivor's MIME-scoped headers and body move into this node.
    pub fn remove_content(&mut self, index: usize) -> Option<Content> {
        if index >= self.children.len() {
            return None;
        }
        let removed = self.children.remove(index);

        if self.children.len() == 1 {
            let mut main = self.children.pop().expect("length checked");

            for header in main.headers.drain(..) {
                if is_mime_header(header.get_name()) {
                    self.headers.remove_named(header.get_name());
                    self.headers.push(header);
                }
            }
            self.body = std::mem::take(&mut main.body);
            self.transfer_decoded = main.transfer_decoded;
            self.children = std::mem::take(&mut main.children);
            self.category = if self.children.is_empty() {
                ContentCategory::Single
            } else {
                ContentCategory::Container
            };
            self.raw.clear();
            self.assemble();
        }

        Some(removed)
    }

    /// Change the transfer encoding. Text bodies are normalized to
    /// their decoded form and re-encoded on emit; binary bodies are
    /// re-encoded immediately, and always as base64.
    pub fn change_encoding(&mut self, encoding: TransferEncoding) {
        if self.transfer_encoding() == encoding {
            return;
        }

        if self.is_text_type() {
            if !self.transfer_decoded {
                let mut decoded = self.decoded_content();
                if !decoded.is_empty() && !decoded.ends_with(b"\n") {
                    decoded.push(b'\n');
                }
                self.body = BString::from(decoded);
                self.transfer_decoded = true;
            }
            self.headers
                .set_content_transfer_encoding(encoding.as_str());
        } else {
            let decoded = self.decoded_content();
            let mut encoded = codecs::base64_encode(&decoded);
            if !encoded.ends_with('\n') {
                encoded.push('\n');
            }
            self.body = BString::from(encoded);
            self.transfer_decoded = false;
            self.headers
                .set_content_transfer_encoding(TransferEncoding::Base64.as_str());
        }
    }

    /// Resolve a dotted content index against this node. An empty
    /// index resolves to self.
    pub fn content(&self, index: &ContentIndex) -> Option<&Content> {
        let mut node = self;
        for &component in index.components() {
            node = node.children.get(component as usize - 1)?;
        }
        Some(node)
    }

    pub fn content_mut(&mut self, index: &ContentIndex) -> Option<&mut Content> {
        let mut node = self;
        for &component in index.components() {
            node = node.children.get_mut(component as usize - 1)?;
        }
        Some(node)
    }

    /// The index of a node within this subtree, found by identity.
    pub fn index_of(&self, target: &Content) -> Option<ContentIndex> {
        if std::ptr::eq(self, target) {
            return Some(ContentIndex::new());
        }
        for (pos, child) in self.children.iter().enumerate() {
            if let Some(mut index) = child.index_of(target) {
                index.push(pos as u32 + 1);
                return Some(index);
            }
        }
        None
    }

    /// The first part (depth-first, self included) with a text/*
    /// Content-Type.
    pub fn text_content(&self) -> Option<&Content> {
        if self.children.is_empty() {
            if self.is_text_type() {
                return Some(self);
            }
            return None;
        }
        for child in &self.children {
            if let Some(found) = child.text_content() {
                return Some(found);
            }
        }
        None
    }

    fn collect_leaves<'a>(&'a self, dst: &mut Vec<&'a Content>, include_alternatives: bool) {
        if self.children.is_empty() {
            dst.push(self);
            return;
        }
        for child in &self.children {
            if !include_alternatives && child.category == ContentCategory::AlternativePart {
                continue;
            }
            child.collect_leaves(dst, include_alternatives);
        }
    }

    /// The attachment leaves of this subtree: every leaf except the
    /// main text content.
    pub fn attachments(&self, include_alternatives: bool) -> Vec<&Content> {
        let mut leaves = vec![];
        self.collect_leaves(&mut leaves, include_alternatives);
        if let Some(text) = self.text_content() {
            leaves.retain(|leaf| !std::ptr::eq(*leaf, text));
        }
        leaves
    }

    /// Whether this node itself looks like an attachment: a multipart
    /// never is, an encapsulated message always is, and otherwise a
    /// declared file name or an attachment disposition marks one.
    pub fn is_attachment_node(&self) -> bool {
        if let Some(ct) = self.content_type() {
            if ct.is_multipart() {
                return false;
            }
            if ct.is_mime_type("message/rfc822") {
                return true;
            }
            if ct.name().map(|n| !n.is_empty()).unwrap_or(false) {
                return true;
            }
        }
        match self.headers.content_disposition() {
            Ok(Some(cd)) => {
                cd.value == "attachment"
                    || cd.get("filename").map(|f| !f.is_empty()).unwrap_or(false)
            }
            _ => false,
        }
    }

    /// Whether this subtree carries an attachment anywhere. Related
    /// subtrees are not descended, matching how mailers treat inline
    /// resources.
    pub fn has_attachment(&self) -> bool {
        if self.is_attachment_node() {
            return true;
        }
        if let Some(ct) = self.content_type() {
            if ct.is_multipart() && ct.sub_type().eq_ignore_ascii_case("related") {
                return false;
            }
        }
        self.children.iter().any(|child| child.has_attachment())
    }

    /// Approximate decoded size of the leaf body in octets.
    pub fn size(&self) -> usize {
        let len = self.body.len();
        if !self.transfer_decoded && self.transfer_encoding() == TransferEncoding::Base64 {
            return len * 3 / 4;
        }
        len
    }

    /// In-memory footprint of the subtree's buffers.
    pub fn storage_size(&self) -> usize {
        let mut total = self.head.len();
        if self.children.is_empty() {
            total += self.body.len();
        } else {
            for child in &self.children {
                total += child.storage_size();
            }
        }
        total
    }

    /// Number of lines in the subtree, head included at the root.
    pub fn line_count(&self) -> usize {
        let mut count = memchr::memchr_iter(b'\n', &self.head).count()
            + memchr::memchr_iter(b'\n', &self.body).count();
        for child in &self.children {
            count += child.line_count();
        }
        count
    }

    /// A leaf carrying `content` as text, transfer-encoded per the
    /// character frequency of the data.
    pub fn new_text(content_type: &str, content: &str) -> Content {
        let mut node = Content::new();
        let mut ct = MimeParameters::new(content_type);
        ct.set(
            "charset",
            if content.is_ascii() { "us-ascii" } else { "utf-8" },
        );
        node.headers.set_content_type(ct);

        let encoding = *crate::charfreq::encodings_for_data(content.as_bytes())
            .first()
            .unwrap_or(&TransferEncoding::QuotedPrintable);
        node.headers.set_content_transfer_encoding(encoding.as_str());

        node.body = BString::from(content.as_bytes());
        node.transfer_decoded = true;
        node.parsed = true;
        node.assemble();
        node
    }

    pub fn new_text_plain(content: &str) -> Content {
        Self::new_text("text/plain", content)
    }

    /// A binary attachment leaf; the body is stored decoded and
    /// base64-encoded on emit.
    pub fn new_binary(content_type: &str, data: &[u8], file_name: Option<&str>) -> Content {
        let mut node = Content::new();

        let mut ct = MimeParameters::new(content_type);
        if let Some(name) = file_name {
            ct.set("name", name);
        }
        node.headers.set_content_type(ct);
        node.headers
            .set_content_transfer_encoding(TransferEncoding::Base64.as_str());
        if let Some(name) = file_name {
            let mut cd = MimeParameters::new("attachment");
            cd.set("filename", name);
            node.headers.set_content_disposition(cd);
        }

        node.body = BString::from(data);
        node.transfer_decoded = true;
        node.parsed = true;
        node.assemble();
        node
    }

    /// A container over `children` with the given multipart type.
    pub fn new_multipart(content_type: &str, children: Vec<Content>) -> Content {
        let mut node = Content::new();
        let mut ct = MimeParameters::new(content_type);
        ct.set("boundary", &multipart_boundary());
        node.headers.set_content_type(ct);
        node.children = children;
        node.category = ContentCategory::Container;
        node.parsed = true;
        node.assemble();
        node
    }

    /// Reset the node to its fresh state.
    pub fn clear(&mut self) {
        *self = Content {
            default_charset: self.default_charset.clone(),
            force_default_charset: self.force_default_charset,
            ..Content::default()
        };
    }
}
