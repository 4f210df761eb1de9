pub mod bodyparse;
pub mod charfreq;
pub mod charsets;
pub mod codecs;
mod content;
mod contentindex;
mod error;
mod header;
mod headermap;
mod nom_utils;
pub mod rfc2047;
mod rfc5322;
pub mod scanner;
mod typed;

pub use error::{MimeError, ParseWarnings};
pub type Result<T> = std::result::Result<T, MimeError>;

pub use content::{multipart_boundary, Content, ContentCategory};
pub use contentindex::ContentIndex;
pub use header::{extract_header, is_mime_header, Header, HeaderParseResult};
pub use headermap::{EncodeHeaderValue, HeaderMap};
pub use rfc5322::{
    strip_bidi_controls, AddrSpec, Address, AddressList, Mailbox, MailboxList, MessageID,
    MimeParameters, Parser,
};
pub use typed::{HeaderValue, MailCopiesTo, TransferEncoding};
