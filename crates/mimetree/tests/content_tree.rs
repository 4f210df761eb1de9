use mimetree::{codecs, Content, ContentCategory, ContentIndex, ParseWarnings, TransferEncoding};

#[test]
fn encoded_subject_and_body() {
    let content = Content::from_bytes("Subject: =?utf-8?B?SMOpbGxv?=\n\nbody");
    k9::assert_equal!(content.headers().subject().unwrap().unwrap(), "Héllo");
    k9::assert_equal!(content.body(), b"body");
    k9::assert_equal!(content.decoded_content(), b"body".to_vec());
}

const TWO_PART: &str = concat!(
    "Content-Type: multipart/mixed; boundary=X\n",
    "\n",
    "--X\n",
    "Content-Type: text/plain\n",
    "\n",
    "A\n",
    "--X\n",
    "Content-Type: text/plain\n",
    "\n",
    "B\n",
    "--X--\n",
);

#[test]
fn multipart_split_into_two_children() {
    let content = Content::from_bytes(TWO_PART);
    k9::assert_equal!(content.children().len(), 2);
    k9::assert_equal!(content.category(), ContentCategory::Container);
    assert!(content.body().is_empty());
    k9::assert_equal!(content.children()[0].decoded_content(), b"A".to_vec());
    k9::assert_equal!(content.children()[1].decoded_content(), b"B".to_vec());
    k9::assert_equal!(content.children()[0].category(), ContentCategory::MixedPart);
}

#[test]
fn multipart_round_trips_exactly() {
    let mut content = Content::from_bytes(TWO_PART);
    k9::assert_equal!(content.encoded_content(false), TWO_PART.as_bytes().to_vec());
}

#[test]
fn boundary_occurrence_invariant() {
    let mut content = Content::from_bytes(TWO_PART);
    let children = content.children().len();
    let encoded = content.encoded_content(false);
    let marker = b"\n--X";
    // one occurrence before each child plus the closing one; the first
    // boundary sits right after the blank line separating the head
    let count = memchr::memmem::find_iter(&encoded, marker).count();
    k9::assert_equal!(count, children + 1);
}

#[test]
fn alternative_subtype_sets_child_category() {
    let message = TWO_PART.replace("multipart/mixed", "multipart/alternative");
    let content = Content::from_bytes(message);
    k9::assert_equal!(
        content.children()[0].category(),
        ContentCategory::AlternativePart
    );
}

#[test]
fn head_without_blank_line() {
    let content = Content::from_bytes("Subject: x");
    k9::assert_equal!(content.head(), b"Subject: x");
    assert!(content.body().is_empty());
    k9::assert_equal!(content.headers().subject().unwrap().unwrap(), "x");
}

#[test]
fn parse_assemble_parse_is_isomorphic() {
    let mut content = Content::from_bytes(TWO_PART);
    content.assemble();
    content.parse();

    k9::assert_equal!(content.children().len(), 2);
    k9::assert_equal!(content.children()[0].decoded_content(), b"A".to_vec());
    k9::assert_equal!(content.children()[1].decoded_content(), b"B".to_vec());
    k9::assert_equal!(
        content.content_type().unwrap().boundary().unwrap(),
        "X"
    );
}

#[test]
fn missing_boundary_reclassifies_as_text() {
    let content = Content::from_bytes("Content-Type: multipart/mixed\n\njust some text\n");
    assert!(content.children().is_empty());
    assert!(content.warnings().contains(ParseWarnings::BOUNDARY_MISSING));
    let ct = content.content_type().unwrap();
    k9::assert_equal!(ct.value, "text/plain");
    k9::assert_equal!(ct.charset().unwrap(), "US-ASCII");
}

#[test]
fn duplicate_single_valued_headers_keep_first() {
    let content = Content::from_bytes(
        "Content-Type: text/plain\nContent-Type: text/html\n\nbody\n",
    );
    assert!(content
        .warnings()
        .contains(ParseWarnings::MULTIPLE_WHERE_SINGLE_EXPECTED));
    k9::assert_equal!(content.content_type().unwrap().value, "text/plain");
}

#[test]
fn unknown_declared_charset_is_flagged() {
    let content =
        Content::from_bytes("Content-Type: text/plain; charset=x-martian\n\nbody\n");
    assert!(content.warnings().contains(ParseWarnings::UNKNOWN_CHARSET));
    // the body still decodes, using the default charset
    k9::assert_equal!(content.decoded_text(false).unwrap(), "body");
}

#[test]
fn bare_text_mime_type_is_coerced() {
    // "Content-Type: text" alone marks a broken producer; the body is
    // re-examined, found to be plain, and classified accordingly
    let content = Content::from_bytes("Content-Type: text\n\nhello\n");
    k9::assert_equal!(content.content_type().unwrap().value, "text/plain");
    assert!(content.children().is_empty());
}

#[test]
fn message_rfc822_encapsulates_one_child() {
    let message = concat!(
        "Content-Type: message/rfc822\n",
        "\n",
        "Subject: inner\n",
        "\n",
        "inner body\n",
    );
    let mut content = Content::from_bytes(message);
    k9::assert_equal!(content.children().len(), 1);
    k9::assert_equal!(
        content.children()[0].headers().subject().unwrap().unwrap(),
        "inner"
    );
    k9::assert_equal!(content.encoded_content(false), message.as_bytes().to_vec());
}

#[test]
fn uuencode_becomes_multipart_mixed() {
    let message = concat!(
        "Subject: the cat file\n",
        "\n",
        "Here is the file.\n",
        "begin 644 cat.txt\n",
        "#0V%T\n",
        "`\n",
        "end\n",
    );
    let mut content = Content::from_bytes(message);

    let ct = content.content_type().unwrap();
    k9::assert_equal!(ct.value, "multipart/mixed");
    assert!(ct.boundary().is_some());
    k9::assert_equal!(content.children().len(), 2);
    assert!(content.body().is_empty());

    // prelude text child
    let prelude = &content.children()[0];
    k9::assert_equal!(prelude.content_type().unwrap().value, "text/plain");
    assert!(String::from_utf8_lossy(&prelude.decoded_content()).contains("Here is the file."));

    // binary child still carries its legacy encoding
    let binary = &content.children()[1];
    k9::assert_equal!(binary.content_type().unwrap().name().unwrap(), "cat.txt");
    k9::assert_equal!(binary.transfer_encoding(), TransferEncoding::Uuencode);
    k9::assert_equal!(binary.decoded_content(), b"Cat".to_vec());
    k9::assert_equal!(
        binary
            .headers()
            .content_disposition()
            .unwrap()
            .unwrap()
            .get("filename")
            .unwrap(),
        "cat.txt"
    );

    // serialization converts the legacy child to base64 in a clean
    // MIME envelope
    let encoded = String::from_utf8_lossy(&content.encoded_content(false)).to_string();
    assert!(encoded.contains("MIME-Version: 1.0"));
    assert!(encoded.contains("Q2F0"));
    assert!(encoded.contains("Content-Transfer-Encoding: base64"));
    assert!(!encoded.contains("begin 644"));
    // and the subject survived
    assert!(encoded.contains("Subject: the cat file"));
}

#[test]
fn uuencode_partial_becomes_message_partial() {
    let message = concat!(
        "Subject: hugefile.bin (1/3)\n",
        "\n",
        "begin 644 hugefile.bin\n",
        "#0V%T\n",
    );
    let content = Content::from_bytes(message);
    let ct = content.content_type().unwrap();
    k9::assert_equal!(ct.value, "message/partial");
    k9::assert_equal!(ct.partial_number().unwrap(), 1);
    k9::assert_equal!(ct.partial_count().unwrap(), 3);
    k9::assert_equal!(content.transfer_encoding(), TransferEncoding::SevenBit);
    assert!(content.children().is_empty());
    assert!(ct.is_partial());
}

#[test]
fn yenc_becomes_multipart_mixed() {
    let payload: Vec<u8> = (0u8..=255).collect();
    let mut message = b"intro\n=ybegin line=128 size=256 name=dump.bin\n".to_vec();
    message.extend_from_slice(&codecs::yenc_encode_bytes(&payload));
    message.extend_from_slice(b"=yend size=256\n");

    let mut body = b"Subject: binaries\n\n".to_vec();
    body.extend_from_slice(&message);

    let mut content = Content::new();
    content.set_content(&body);
    content.parse();

    k9::assert_equal!(content.content_type().unwrap().value, "multipart/mixed");
    k9::assert_equal!(content.children().len(), 2);
    let binary = &content.children()[1];
    k9::assert_equal!(binary.transfer_encoding(), TransferEncoding::Binary);
    k9::assert_equal!(binary.decoded_content(), payload);

    // re-emitted as base64
    let encoded = content.encoded_content(false);
    let reparsed = Content::from_bytes(encoded);
    k9::assert_equal!(reparsed.children().len(), 2);
    k9::assert_equal!(
        reparsed.children()[1].transfer_encoding(),
        TransferEncoding::Base64
    );
    k9::assert_equal!(reparsed.children()[1].decoded_content(), payload);
}

#[test]
fn add_then_remove_restores_leaf() {
    let original = "Subject: hi\nContent-Type: text/plain\n\nhello\n";
    let mut content = Content::from_bytes(original);

    content.add_content(Content::new_text_plain("attached"), false);
    k9::assert_equal!(content.children().len(), 2);
    k9::assert_equal!(content.content_type().unwrap().value, "multipart/mixed");
    // previous body lives in the synthesized first child
    k9::assert_equal!(content.children()[0].body(), b"hello\n");
    k9::assert_equal!(
        content.children()[0].content_type().unwrap().value,
        "text/plain"
    );

    let removed = content.remove_content(1).unwrap();
    k9::assert_equal!(removed.decoded_content(), b"attached".to_vec());

    // collapsed back to a leaf, structurally equal to the original
    assert!(content.children().is_empty());
    k9::assert_equal!(content.body(), b"hello\n");
    k9::assert_equal!(content.content_type().unwrap().value, "text/plain");
    k9::assert_equal!(content.headers().subject().unwrap().unwrap(), "hi");
}

#[test]
fn default_charset_propagates() {
    let mut content = Content::from_bytes(TWO_PART);
    content.set_default_charset("iso-8859-2");
    k9::assert_equal!(content.default_charset(), "ISO-8859-2");
    for child in content.children() {
        k9::assert_equal!(child.default_charset(), "ISO-8859-2");
    }

    content.set_force_default_charset(true);
    for child in content.children() {
        assert!(child.force_default_charset());
    }
}

#[test]
fn charset_decision_uses_header_witness_unless_forced() {
    let message = b"Content-Type: text/plain; charset=ISO-8859-1\n\ncaf\xe9\n";
    let mut content = Content::new();
    content.set_content(&message[..]);
    content.parse();
    k9::assert_equal!(content.decoded_text(false).unwrap(), "café");

    // forcing the default overrides the declared charset
    content.set_default_charset("UTF-8");
    content.set_force_default_charset(true);
    k9::assert_equal!(content.charset(), "UTF-8");
}

#[test]
fn frozen_reproduces_original_bytes() {
    let mut content = Content::from_bytes(TWO_PART);
    content.freeze();

    let head_before = content.head().to_vec();
    content.assemble();
    k9::assert_equal!(content.head(), head_before.as_slice());

    k9::assert_equal!(content.encoded_content(false), TWO_PART.as_bytes().to_vec());
    k9::assert_equal!(
        content.encoded_content(true),
        TWO_PART.replace('\n', "\r\n").into_bytes()
    );
}

#[test]
fn crlf_input_is_normalized_and_restored() {
    let message = TWO_PART.replace('\n', "\r\n");
    let mut content = Content::from_bytes(message.clone());
    k9::assert_equal!(content.children().len(), 2);
    k9::assert_equal!(content.encoded_content(true), message.into_bytes());
}

#[test]
fn decoded_content_trailing_newline_rules() {
    // base64 and identity strip exactly one trailing LF
    let mut message = b"Content-Type: application/octet-stream\nContent-Transfer-Encoding: base64\n\n".to_vec();
    message.extend_from_slice(codecs::base64_encode(b"data\n").as_bytes());
    message.push(b'\n');
    let content = Content::from_bytes(message);
    k9::assert_equal!(content.decoded_content(), b"data".to_vec());

    let content = Content::from_bytes("Content-Type: text/plain\n\ndata\n");
    k9::assert_equal!(content.decoded_content(), b"data".to_vec());

    // binary never strips
    let content = Content::from_bytes(
        "Content-Type: application/octet-stream\nContent-Transfer-Encoding: binary\n\ndata\n",
    );
    k9::assert_equal!(content.decoded_content(), b"data\n".to_vec());
}

#[test]
fn change_encoding_text_reencodes_on_emit() {
    let mut content = Content::from_bytes(
        "Content-Type: text/plain\nContent-Transfer-Encoding: quoted-printable\n\nhello=20world\n",
    );
    content.change_encoding(TransferEncoding::Base64);
    k9::assert_equal!(content.transfer_encoding(), TransferEncoding::Base64);
    assert!(content.is_transfer_decoded());

    let encoded = content.encoded_content(false);
    let reparsed = Content::from_bytes(encoded);
    k9::assert_equal!(reparsed.decoded_content(), b"hello world".to_vec());
}

#[test]
fn change_encoding_binary_forces_base64() {
    let mut content = Content::from_bytes(
        "Content-Type: application/octet-stream\nContent-Transfer-Encoding: binary\n\n\x01\x02\x03",
    );
    content.change_encoding(TransferEncoding::QuotedPrintable);
    k9::assert_equal!(content.transfer_encoding(), TransferEncoding::Base64);
    assert!(!content.is_transfer_decoded());
    k9::assert_equal!(content.decoded_content(), b"\x01\x02\x03".to_vec());
}

#[test]
fn content_index_navigation() {
    let content = Content::from_bytes(TWO_PART);

    let first: ContentIndex = "1".parse().unwrap();
    let second: ContentIndex = "2".parse().unwrap();
    let missing: ContentIndex = "3".parse().unwrap();

    k9::assert_equal!(
        content.content(&first).unwrap().decoded_content(),
        b"A".to_vec()
    );
    k9::assert_equal!(
        content.content(&second).unwrap().decoded_content(),
        b"B".to_vec()
    );
    assert!(content.content(&missing).is_none());

    let target = &content.children()[1];
    k9::assert_equal!(content.index_of(target).unwrap().to_string(), "2");
    // the empty index addresses the root itself
    k9::assert_equal!(
        content.index_of(&content).unwrap(),
        ContentIndex::new()
    );
}

#[test]
fn text_content_and_attachments() {
    let mut root = Content::from_bytes("Subject: x\nContent-Type: text/plain\n\nmain text\n");
    root.add_content(
        Content::new_binary("application/pdf", b"%PDF-fake", Some("doc.pdf")),
        false,
    );

    let text = root.text_content().unwrap();
    k9::assert_equal!(text.decoded_content(), b"main text".to_vec());

    let attachments = root.attachments(true);
    k9::assert_equal!(attachments.len(), 1);
    assert!(attachments[0].is_attachment_node());
    k9::assert_equal!(
        attachments[0].content_type().unwrap().name().unwrap(),
        "doc.pdf"
    );
    assert!(root.has_attachment());

    let plain = Content::from_bytes("Content-Type: text/plain\n\njust text\n");
    assert!(!plain.has_attachment());
}

#[test]
fn constructed_multipart_emits_and_reparses() {
    let mut root = Content::new_multipart(
        "multipart/mixed",
        vec![
            Content::new_text_plain("plain body\n"),
            Content::new_binary("image/png", &[0x89, 0x50, 0x4e, 0x47], Some("i.png")),
        ],
    );
    let encoded = root.encoded_content(true);
    assert!(!mimetree::scanner::has_lone_cr_or_lf(&encoded));

    let reparsed = Content::from_bytes(encoded);
    k9::assert_equal!(reparsed.children().len(), 2);
    k9::assert_equal!(
        reparsed.children()[0].decoded_text(true).unwrap(),
        "plain body"
    );
    k9::assert_equal!(
        reparsed.children()[1].decoded_content(),
        vec![0x89, 0x50, 0x4e, 0x47]
    );
}

#[test]
fn unicode_body_uses_declared_charset() {
    let mut content =
        Content::from_bytes("Content-Type: text/plain; charset=ISO-8859-1\n\nold\n");
    content.set_body_from_unicode("café");
    k9::assert_equal!(content.body(), b"caf\xe9");
    k9::assert_equal!(content.decoded_text(false).unwrap(), "café");

    // a declared charset with no codec falls back to UTF-8 and records
    // that in the Content-Type
    let mut content =
        Content::from_bytes("Content-Type: text/plain; charset=x-martian\n\nold\n");
    content.set_body_from_unicode("café");
    k9::assert_equal!(
        content.content_type().unwrap().charset().unwrap(),
        "UTF-8"
    );
    k9::assert_equal!(content.decoded_text(false).unwrap(), "café");
}

#[test]
fn clear_resets_node() {
    let mut content = Content::from_bytes(TWO_PART);
    content.set_default_charset("iso-8859-2");
    content.clear();
    assert!(content.head().is_empty());
    assert!(content.body().is_empty());
    assert!(content.children().is_empty());
    // configuration survives the reset
    k9::assert_equal!(content.default_charset(), "ISO-8859-2");
}

#[test]
fn storage_and_line_accounting() {
    let content = Content::from_bytes("Subject: x\n\n12345\n");
    k9::assert_equal!(content.storage_size(), "Subject: x\n".len() + "12345\n".len());
    k9::assert_equal!(content.line_count(), 2);

    let b64 = Content::from_bytes(
        "Content-Type: application/octet-stream\nContent-Transfer-Encoding: base64\n\nQUJDRA==\n",
    );
    // the base64 size estimate reflects the decoded length
    k9::assert_equal!(b64.size(), 6);
}
