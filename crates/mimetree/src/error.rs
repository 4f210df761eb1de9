use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MimeError {
    #[error("invalid header: {0}")]
    HeaderParse(String),
    #[error("while parsing header '{header_name}': {error}")]
    InvalidHeaderValue {
        header_name: String,
        error: Box<MimeError>,
    },
    #[error("header {0} not found")]
    MissingHeader(String),
    #[error("invalid Content-Transfer-Encoding: {0}")]
    InvalidContentTransferEncoding(String),
    #[error("parsing body: {0}")]
    BodyParse(String),
    #[error("unknown charset: {0}")]
    UnknownCharset(String),
    #[error("error parsing Date header: {0}")]
    DateParse(String),
    #[error("invalid content index: {0}")]
    InvalidContentIndex(String),
    #[error("IO error while writing message")]
    WriteIo,
}

bitflags::bitflags! {
    /// Non-fatal observations accumulated while parsing. None of these
    /// abort a parse; the value degrades per the rules of the owning
    /// parser and the matching flag is raised.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct ParseWarnings: u16 {
        const MISSING_COLON_VALUE = 0b0000_0000_0001;
        const NON_CANONICAL_LINE_ENDINGS = 0b0000_0000_0010;
        const NAME_ENDS_WITH_SPACE = 0b0000_0000_0100;
        const LINE_TOO_LONG = 0b0000_0000_1000;
        const MALFORMED_HEADER = 0b0000_0001_0000;
        const UNKNOWN_CHARSET = 0b0000_0010_0000;
        const TRUNCATED_ENCODING = 0b0000_0100_0000;
        const BOUNDARY_MISSING = 0b0000_1000_0000;
        const UNBALANCED_COMMENT = 0b0001_0000_0000;
        const MULTIPLE_WHERE_SINGLE_EXPECTED = 0b0010_0000_0000;
    }
}

impl FromStr for ParseWarnings {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        let mut result = Self::default();
        for ele in s.split('|') {
            if ele.is_empty() {
                continue;
            }
            match Self::from_name(ele) {
                Some(v) => {
                    result = result.union(v);
                }
                None => {
                    let mut possible: Vec<String> = Self::all()
                        .iter_names()
                        .map(|(name, _)| format!("'{name}'"))
                        .collect();
                    possible.sort();
                    let possible = possible.join(", ");
                    return Err(format!(
                        "invalid ParseWarnings flag '{ele}', possible values are {possible}"
                    ));
                }
            }
        }
        Ok(result)
    }
}

impl std::fmt::Display for ParseWarnings {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut names: Vec<&str> = self.iter_names().map(|(name, _)| name).collect();
        names.sort();
        fmt.write_str(&names.join("|"))
    }
}
