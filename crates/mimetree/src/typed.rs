//! The typed header model: a tagged union over every header kind this
//! library understands, with a name-driven factory and per-variant
//! emit. Unknown names become the generic unstructured variant, which
//! remembers its name.

use crate::headermap::EncodeHeaderValue;
use crate::rfc5322::Parser;
use crate::{AddrSpec, AddressList, Mailbox, MailboxList, MessageID, MimeError, MimeParameters, Result};
use chrono::{DateTime, FixedOffset};
use std::str::FromStr;

/// The transfer encodings a body can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferEncoding {
    #[default]
    SevenBit,
    EightBit,
    QuotedPrintable,
    Base64,
    Uuencode,
    Binary,
}

impl TransferEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SevenBit => "7bit",
            Self::EightBit => "8bit",
            Self::QuotedPrintable => "quoted-printable",
            Self::Base64 => "base64",
            Self::Uuencode => "x-uuencode",
            Self::Binary => "binary",
        }
    }

    /// A 7bit or 8bit body arrives already decoded; everything else is
    /// stored on the wire in encoded form.
    pub fn is_identity(&self) -> bool {
        matches!(self, Self::SevenBit | Self::EightBit)
    }
}

impl FromStr for TransferEncoding {
    type Err = MimeError;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("7bit") {
            Ok(Self::SevenBit)
        } else if s.eq_ignore_ascii_case("8bit") {
            Ok(Self::EightBit)
        } else if s.eq_ignore_ascii_case("quoted-printable") {
            Ok(Self::QuotedPrintable)
        } else if s.eq_ignore_ascii_case("base64") {
            Ok(Self::Base64)
        } else if s.eq_ignore_ascii_case("x-uuencode") || s.eq_ignore_ascii_case("uuencode") {
            Ok(Self::Uuencode)
        } else if s.eq_ignore_ascii_case("binary") {
            Ok(Self::Binary)
        } else {
            Err(MimeError::InvalidContentTransferEncoding(s.to_string()))
        }
    }
}

impl std::fmt::Display for TransferEncoding {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.write_str(self.as_str())
    }
}

/// Mail-Copies-To is either an address list or one of four
/// distinguished tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailCopiesTo {
    Poster,
    Always,
    Nobody,
    Never,
    Addresses(AddressList),
}

impl MailCopiesTo {
    pub fn parse(text: &str) -> Result<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "poster" => Ok(Self::Poster),
            "always" => Ok(Self::Always),
            "nobody" => Ok(Self::Nobody),
            "never" => Ok(Self::Never),
            _ => Ok(Self::Addresses(Parser::parse_address_list_header(text)?)),
        }
    }

    pub fn always_copy(&self) -> bool {
        matches!(self, Self::Poster | Self::Always)
    }

    pub fn never_copy(&self) -> bool {
        matches!(self, Self::Nobody | Self::Never)
    }
}

impl EncodeHeaderValue for MailCopiesTo {
    fn encode_value(&self) -> String {
        match self {
            Self::Poster => "poster".to_string(),
            Self::Always => "always".to_string(),
            Self::Nobody => "nobody".to_string(),
            Self::Never => "never".to_string(),
            Self::Addresses(list) => list.encode_value(),
        }
    }
}

/// The parsed form of a header value, tagged by schema.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    /// Free text with RFC 2047 decode/encode; also the fallback for
    /// unknown header names
    Unstructured { name: String, text: String },
    /// From, Resent-From
    Mailboxes(MailboxList),
    /// Sender, Resent-Sender
    SingleMailbox(Mailbox),
    /// To, Cc, Bcc, Reply-To and the Resent- variants
    Addresses(AddressList),
    /// Message-ID, Content-ID
    Ident(MessageID),
    /// References, In-Reply-To, Supersedes
    IdentList(Vec<MessageID>),
    /// Keywords
    PhraseList(Vec<String>),
    /// MIME-Version
    DotAtom(String),
    /// Date, Resent-Date
    Date(DateTime<FixedOffset>),
    ContentType(MimeParameters),
    ContentTransferEncoding(TransferEncoding),
    ContentDisposition(MimeParameters),
    /// Return-Path; None is the null path `<>`
    ReturnPath(Option<AddrSpec>),
    /// Newsgroups, Followup-To
    Newsgroups(Vec<String>),
    Lines(u64),
    Control { action: String, parameter: String },
    MailCopiesTo(MailCopiesTo),
}

/// The schema families a header name can map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderKind {
    Unstructured,
    MailboxList,
    SingleMailbox,
    AddressList,
    Ident,
    IdentList,
    ContentIdent,
    PhraseList,
    DotAtom,
    Date,
    ContentType,
    ContentTransferEncoding,
    ContentDisposition,
    ReturnPath,
    Newsgroups,
    Lines,
    Control,
    MailCopiesTo,
}

fn kind_for_name(name: &str) -> HeaderKind {
    match name.to_ascii_lowercase().as_str() {
        "from" | "resent-from" => HeaderKind::MailboxList,
        "sender" | "resent-sender" => HeaderKind::SingleMailbox,
        "to" | "cc" | "bcc" | "reply-to" | "resent-to" | "resent-cc" | "resent-bcc" => {
            HeaderKind::AddressList
        }
        "message-id" | "resent-message-id" => HeaderKind::Ident,
        "content-id" => HeaderKind::ContentIdent,
        "references" | "in-reply-to" | "supersedes" => HeaderKind::IdentList,
        "keywords" => HeaderKind::PhraseList,
        "mime-version" => HeaderKind::DotAtom,
        "date" | "resent-date" => HeaderKind::Date,
        "content-type" => HeaderKind::ContentType,
        "content-transfer-encoding" => HeaderKind::ContentTransferEncoding,
        "content-disposition" => HeaderKind::ContentDisposition,
        "return-path" => HeaderKind::ReturnPath,
        "newsgroups" | "followup-to" => HeaderKind::Newsgroups,
        "lines" => HeaderKind::Lines,
        "control" => HeaderKind::Control,
        "mail-copies-to" => HeaderKind::MailCopiesTo,
        _ => HeaderKind::Unstructured,
    }
}

impl HeaderValue {
    /// Factory: parse a raw 7-bit value according to the schema its
    /// name selects. Unknown names parse as unstructured text.
    pub fn parse(name: &str, raw: &str) -> Result<Self> {
        Ok(match kind_for_name(name) {
            HeaderKind::Unstructured => Self::Unstructured {
                name: name.to_string(),
                text: Parser::parse_unstructured_header(raw)?,
            },
            HeaderKind::MailboxList => Self::Mailboxes(Parser::parse_mailbox_list_header(raw)?),
            HeaderKind::SingleMailbox => Self::SingleMailbox(Parser::parse_mailbox_header(raw)?),
            HeaderKind::AddressList => Self::Addresses(Parser::parse_address_list_header(raw)?),
            HeaderKind::Ident => Self::Ident(Parser::parse_msg_id_header(raw)?),
            HeaderKind::ContentIdent => Self::Ident(Parser::parse_content_id_header(raw)?),
            HeaderKind::IdentList => Self::IdentList(Parser::parse_msg_id_header_list(raw)?),
            HeaderKind::PhraseList => Self::PhraseList(Parser::parse_phrase_list_header(raw)?),
            HeaderKind::DotAtom => Self::DotAtom(raw.trim().to_string()),
            HeaderKind::Date => {
                let header = crate::Header::with_name_value(name, raw);
                Self::Date(header.as_date()?)
            }
            HeaderKind::ContentType => Self::ContentType(Parser::parse_content_type_header(raw)?),
            HeaderKind::ContentTransferEncoding => Self::ContentTransferEncoding(
                Parser::parse_token_with_params_header(raw)?.value.parse()?,
            ),
            HeaderKind::ContentDisposition => {
                Self::ContentDisposition(Parser::parse_token_with_params_header(raw)?)
            }
            HeaderKind::ReturnPath => Self::ReturnPath(Parser::parse_return_path_header(raw)?),
            HeaderKind::Newsgroups => Self::Newsgroups(Parser::parse_newsgroups_header(raw)?),
            HeaderKind::Lines => Self::Lines(Parser::parse_lines_header(raw)?),
            HeaderKind::Control => {
                let (action, parameter) = Parser::parse_control_header(raw)?;
                Self::Control { action, parameter }
            }
            HeaderKind::MailCopiesTo => Self::MailCopiesTo(MailCopiesTo::parse(raw)?),
        })
    }

    /// A cancel control referencing the article to withdraw.
    pub fn cancel(msgid: &MessageID) -> Self {
        Self::Control {
            action: "cancel".to_string(),
            parameter: format!("<{}>", msgid.0),
        }
    }

    /// Whether this is a cancel control.
    pub fn is_cancel(&self) -> bool {
        matches!(
            self,
            Self::Control { action, .. } if action.eq_ignore_ascii_case("cancel")
        )
    }

    /// Emit the 7-bit wire form of the value.
    pub fn encode(&self) -> String {
        match self {
            Self::Unstructured { text, .. } => {
                if text.is_ascii() {
                    text.clone()
                } else {
                    crate::rfc2047::encode_sentence(text)
                }
            }
            Self::Mailboxes(list) => list.encode_value(),
            Self::SingleMailbox(mbox) => mbox.encode_value(),
            Self::Addresses(list) => list.encode_value(),
            Self::Ident(id) => id.encode_value(),
            Self::IdentList(ids) => ids.encode_value(),
            Self::PhraseList(phrases) => phrases.join(", "),
            Self::DotAtom(text) => text.clone(),
            Self::Date(dt) => dt.to_rfc2822(),
            Self::ContentType(params) | Self::ContentDisposition(params) => params.encode_value(),
            Self::ContentTransferEncoding(enc) => enc.as_str().to_string(),
            Self::ReturnPath(Some(addr)) => format!("<{}>", addr.encode_value()),
            Self::ReturnPath(None) => "<>".to_string(),
            Self::Newsgroups(groups) => groups.join(","),
            Self::Lines(n) => n.to_string(),
            Self::Control { action, parameter } => {
                if parameter.is_empty() {
                    action.clone()
                } else {
                    format!("{action} {parameter}")
                }
            }
            Self::MailCopiesTo(mct) => mct.encode_value(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Unstructured { text, .. } => text.is_empty(),
            Self::Mailboxes(list) => list.0.is_empty(),
            Self::SingleMailbox(mbox) => !mbox.has_name() && !mbox.has_address(),
            Self::Addresses(list) => list.0.is_empty(),
            Self::Ident(id) => id.0.is_empty(),
            Self::IdentList(ids) => ids.is_empty(),
            Self::PhraseList(phrases) => phrases.is_empty(),
            Self::DotAtom(text) => text.is_empty(),
            Self::Date(_) => false,
            Self::ContentType(params) | Self::ContentDisposition(params) => params.value.is_empty(),
            Self::ContentTransferEncoding(_) => false,
            Self::ReturnPath(_) => false,
            Self::Newsgroups(groups) => groups.is_empty(),
            Self::Lines(_) => false,
            Self::Control { action, .. } => action.is_empty(),
            Self::MailCopiesTo(_) => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn transfer_encoding_tokens() {
        k9::assert_equal!(
            TransferEncoding::from_str("Base64").unwrap(),
            TransferEncoding::Base64
        );
        k9::assert_equal!(
            TransferEncoding::from_str("7BIT").unwrap(),
            TransferEncoding::SevenBit
        );
        k9::assert_equal!(
            TransferEncoding::from_str("x-uuencode").unwrap(),
            TransferEncoding::Uuencode
        );
        assert!(TransferEncoding::from_str("rot13").is_err());
        assert!(TransferEncoding::SevenBit.is_identity());
        assert!(TransferEncoding::EightBit.is_identity());
        assert!(!TransferEncoding::Base64.is_identity());
    }

    #[test]
    fn factory_selects_schema() {
        let value = HeaderValue::parse("From", "Someone <someone@example.com>").unwrap();
        match value {
            HeaderValue::Mailboxes(list) => {
                k9::assert_equal!(list.0.len(), 1);
            }
            wat => panic!("unexpected {wat:?}"),
        }

        let value = HeaderValue::parse("X-Unknown-Thing", "whatever text").unwrap();
        match value {
            HeaderValue::Unstructured { name, text } => {
                k9::assert_equal!(name, "X-Unknown-Thing");
                k9::assert_equal!(text, "whatever text");
            }
            wat => panic!("unexpected {wat:?}"),
        }

        // names compare case-insensitively
        let value = HeaderValue::parse("CONTENT-TYPE", "text/plain").unwrap();
        match value {
            HeaderValue::ContentType(params) => {
                k9::assert_equal!(params.value, "text/plain");
            }
            wat => panic!("unexpected {wat:?}"),
        }
    }

    #[test]
    fn mail_copies_to_forms() {
        k9::assert_equal!(
            MailCopiesTo::parse("poster").unwrap(),
            MailCopiesTo::Poster
        );
        k9::assert_equal!(MailCopiesTo::parse("NEVER").unwrap(), MailCopiesTo::Never);
        assert!(MailCopiesTo::parse("always").unwrap().always_copy());
        assert!(MailCopiesTo::parse("nobody").unwrap().never_copy());
        match MailCopiesTo::parse("copies@example.com").unwrap() {
            MailCopiesTo::Addresses(list) => {
                k9::assert_equal!(list.mailboxes().len(), 1);
            }
            wat => panic!("unexpected {wat:?}"),
        }
    }

    #[test]
    fn control_roundtrip() {
        let value = HeaderValue::parse("Control", "cancel <dead@example.com>").unwrap();
        k9::assert_equal!(value.encode(), "cancel <dead@example.com>");
        assert!(!value.is_empty());
        assert!(value.is_cancel());

        let value = HeaderValue::parse("Control", "CANCEL <dead@example.com>").unwrap();
        assert!(value.is_cancel());

        let value = HeaderValue::parse("Control", "newgroup comp.lang.rust").unwrap();
        assert!(!value.is_cancel());
        // non-control values are never cancels
        assert!(!HeaderValue::parse("Subject", "cancel").unwrap().is_cancel());
    }

    #[test]
    fn cancel_constructor() {
        let value = HeaderValue::cancel(&MessageID("dead@example.com".to_string()));
        k9::assert_equal!(value.encode(), "cancel <dead@example.com>");
        assert!(value.is_cancel());
        // round-trips through the factory
        let reparsed = HeaderValue::parse("Control", &value.encode()).unwrap();
        k9::assert_equal!(reparsed, value);
    }

    #[test]
    fn lines_and_newsgroups() {
        let value = HeaderValue::parse("Lines", " 42 ").unwrap();
        k9::assert_equal!(value.encode(), "42");

        let value = HeaderValue::parse("Newsgroups", "comp.lang.rust,comp.mail.mime").unwrap();
        k9::assert_equal!(value.encode(), "comp.lang.rust,comp.mail.mime");
    }

    #[test]
    fn return_path_null() {
        let value = HeaderValue::parse("Return-Path", "<>").unwrap();
        k9::assert_equal!(value.encode(), "<>");
        let value = HeaderValue::parse("Return-Path", "<b@example.com>").unwrap();
        k9::assert_equal!(value.encode(), "<b@example.com>");
    }
}
