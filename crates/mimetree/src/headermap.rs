use crate::typed::MailCopiesTo;
use crate::{AddrSpec, AddressList, Header, Mailbox, MailboxList, MessageID, MimeParameters, Result};
use chrono::{DateTime, FixedOffset, TimeZone};
use pastey::paste;

/// Represents an ordered list of headers.
/// Note that there may be multiple headers with the same name.
/// Derefs to the underlying `Vec<Header>` for mutation,
/// but provides accessors for retrieving headers by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderMap {
    pub(crate) headers: Vec<Header>,
}

impl std::ops::Deref for HeaderMap {
    type Target = Vec<Header>;
    fn deref(&self) -> &Vec<Header> {
        &self.headers
    }
}

impl std::ops::DerefMut for HeaderMap {
    fn deref_mut(&mut self) -> &mut Vec<Header> {
        &mut self.headers
    }
}

/// Emit a value in its 7-bit header form.
pub trait EncodeHeaderValue {
    fn encode_value(&self) -> String;
}

impl EncodeHeaderValue for &str {
    fn encode_value(&self) -> String {
        self.to_string()
    }
}

impl EncodeHeaderValue for String {
    fn encode_value(&self) -> String {
        self.clone()
    }
}

impl<T: TimeZone> EncodeHeaderValue for DateTime<T>
where
    <T as TimeZone>::Offset: std::fmt::Display,
{
    fn encode_value(&self) -> String {
        self.to_rfc2822()
    }
}

macro_rules! accessor {
    ($func_name:ident, $header_name:literal, $ty:path, $parser:ident) => {
        pub fn $func_name(&self) -> Result<Option<$ty>> {
            match self.get_first($header_name) {
                None => Ok(None),
                Some(header) => Ok(Some(header.$parser()?)),
            }
        }

        paste! {
            pub fn [<set_ $func_name>](&mut self, v: impl EncodeHeaderValue) {
                if let Some(idx) = self
                    .headers
                    .iter()
                    .position(|header| header.get_name().eq_ignore_ascii_case($header_name))
                {
                    self.headers[idx].assign(v);
                } else {
                    self.headers
                        .push(Header::with_name_value($header_name, v.encode_value()));
                }
            }
        }
    };
}

impl HeaderMap {
    pub fn new(headers: Vec<Header>) -> Self {
        Self { headers }
    }

    pub fn prepend<V: AsRef<str>>(&mut self, name: &str, v: V) {
        self.headers.insert(0, Header::new_unstructured(name, v));
    }

    pub fn get_first(&self, name: &str) -> Option<&Header> {
        self.iter_named(name).next()
    }

    pub fn get_first_mut(&mut self, name: &str) -> Option<&mut Header> {
        self.iter_named_mut(name).next()
    }

    pub fn get_last(&self, name: &str) -> Option<&Header> {
        self.iter_named(name).next_back()
    }

    pub fn remove_named(&mut self, name: &str) -> bool {
        let before = self.headers.len();
        self.headers
            .retain(|header| !header.get_name().eq_ignore_ascii_case(name));
        self.headers.len() != before
    }

    pub fn iter_named<'a, 'name>(
        &'a self,
        name: &'name str,
    ) -> impl DoubleEndedIterator<Item = &'a Header> + 'name
    where
        'a: 'name,
    {
        self.headers
            .iter()
            .filter(move |header| header.get_name().eq_ignore_ascii_case(name))
    }

    pub fn iter_named_mut<'a, 'name>(
        &'a mut self,
        name: &'name str,
    ) -> impl DoubleEndedIterator<Item = &'a mut Header> + 'name
    where
        'a: 'name,
    {
        self.headers
            .iter_mut()
            .filter(move |header| header.get_name().eq_ignore_ascii_case(name))
    }

    accessor!(from, "From", MailboxList, as_mailbox_list);
    accessor!(resent_from, "Resent-From", MailboxList, as_mailbox_list);

    accessor!(to, "To", AddressList, as_address_list);
    accessor!(reply_to, "Reply-To", AddressList, as_address_list);
    accessor!(cc, "Cc", AddressList, as_address_list);
    accessor!(bcc, "Bcc", AddressList, as_address_list);
    accessor!(resent_to, "Resent-To", AddressList, as_address_list);
    accessor!(resent_cc, "Resent-Cc", AddressList, as_address_list);
    accessor!(resent_bcc, "Resent-Bcc", AddressList, as_address_list);

    accessor!(date, "Date", DateTime<FixedOffset>, as_date);

    accessor!(sender, "Sender", Mailbox, as_mailbox);
    accessor!(resent_sender, "Resent-Sender", Mailbox, as_mailbox);

    accessor!(message_id, "Message-ID", MessageID, as_message_id);
    accessor!(content_id, "Content-ID", MessageID, as_content_id);
    accessor!(references, "References", Vec<MessageID>, as_message_id_list);
    accessor!(in_reply_to, "In-Reply-To", Vec<MessageID>, as_message_id_list);
    accessor!(supersedes, "Supersedes", Vec<MessageID>, as_message_id_list);

    accessor!(subject, "Subject", String, as_unstructured);
    accessor!(comments, "Comments", String, as_unstructured);
    accessor!(organization, "Organization", String, as_unstructured);
    accessor!(user_agent, "User-Agent", String, as_unstructured);
    accessor!(content_description, "Content-Description", String, as_unstructured);
    accessor!(content_location, "Content-Location", String, as_unstructured);
    accessor!(mime_version, "MIME-Version", String, as_unstructured);

    accessor!(keywords, "Keywords", Vec<String>, as_phrase_list);

    accessor!(
        content_transfer_encoding,
        "Content-Transfer-Encoding",
        MimeParameters,
        as_content_transfer_encoding
    );
    accessor!(
        content_disposition,
        "Content-Disposition",
        MimeParameters,
        as_content_disposition
    );
    accessor!(content_type, "Content-Type", MimeParameters, as_content_type);

    accessor!(return_path, "Return-Path", Option<AddrSpec>, as_return_path);

    accessor!(newsgroups, "Newsgroups", Vec<String>, as_newsgroups);
    accessor!(followup_to, "Followup-To", Vec<String>, as_newsgroups);
    accessor!(lines, "Lines", u64, as_lines);
    accessor!(mail_copies_to, "Mail-Copies-To", MailCopiesTo, as_mail_copies_to);

    /// Whether the Newsgroups header posts to more than one group.
    pub fn is_crossposted(&self) -> Result<bool> {
        Ok(self
            .newsgroups()?
            .map(|groups| groups.len() >= 2)
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn first_last_and_multiples() {
        let mut map = HeaderMap::default();
        map.push(Header::with_name_value("Received", "first hop"));
        map.push(Header::with_name_value("Received", "second hop"));
        map.push(Header::with_name_value("Subject", "hi"));

        k9::assert_equal!(map.get_first("received").unwrap().get_raw_value(), "first hop");
        k9::assert_equal!(map.get_last("Received").unwrap().get_raw_value(), "second hop");
        k9::assert_equal!(map.iter_named("received").count(), 2);
        assert!(map.get_first("Missing").is_none());
    }

    #[test]
    fn set_replaces_in_place() {
        let mut map = HeaderMap::default();
        map.push(Header::with_name_value("Subject", "old"));
        map.push(Header::with_name_value("To", "a@example.com"));
        map.set_subject("new");

        k9::assert_equal!(map.subject().unwrap().unwrap(), "new");
        // position preserved
        k9::assert_equal!(map.headers[0].get_name(), "Subject");
    }

    #[test]
    fn set_appends_when_missing() {
        let mut map = HeaderMap::default();
        map.set_subject("fresh");
        k9::assert_equal!(map.len(), 1);
        k9::assert_equal!(map.subject().unwrap().unwrap(), "fresh");
    }

    #[test]
    fn typed_getters() {
        let mut map = HeaderMap::default();
        map.push(Header::with_name_value("From", "Someone <someone@example.com>"));
        map.push(Header::with_name_value("Lines", "12"));

        let from = map.from().unwrap().unwrap();
        k9::assert_equal!(from.0[0].address, AddrSpec::new("someone", "example.com"));
        k9::assert_equal!(map.lines().unwrap().unwrap(), 12);
        k9::assert_equal!(map.newsgroups().unwrap(), None);
    }

    #[test]
    fn crossposted() {
        let mut map = HeaderMap::default();
        assert!(!map.is_crossposted().unwrap());

        map.push(Header::with_name_value("Newsgroups", "comp.lang.rust"));
        assert!(!map.is_crossposted().unwrap());

        map.clear();
        map.push(Header::with_name_value(
            "Newsgroups",
            "comp.lang.rust,comp.mail.mime",
        ));
        assert!(map.is_crossposted().unwrap());
    }

    #[test]
    fn remove_named_headers() {
        let mut map = HeaderMap::default();
        map.push(Header::with_name_value("X-A", "1"));
        map.push(Header::with_name_value("x-a", "2"));
        map.push(Header::with_name_value("X-B", "3"));
        assert!(map.remove_named("X-A"));
        k9::assert_equal!(map.len(), 1);
        assert!(!map.remove_named("X-A"));
    }
}
