//! The header grammars: RFC 5322 addresses and identifiers (including
//! the obsolete syntax), RFC 2047 encoded-word decoding, and RFC 2045 /
//! RFC 2231 parameterized values.

use crate::headermap::EncodeHeaderValue;
use crate::nom_utils::{explain_nom, make_context_error, make_span, IResult, ParseFailure, Span};
use crate::{charsets, MimeError, Result};
use nom::branch::alt;
use nom::bytes::complete::{tag, take_while, take_while1};
use nom::character::complete::{char, satisfy};
use nom::combinator::{all_consuming, map, opt, recognize};
use nom::error::context;
use nom::multi::{many0, many1, separated_list1};
use nom::sequence::{delimited, preceded, separated_pair, terminated, tuple};
use serde::{Deserialize, Serialize};

impl MimeError {
    pub(crate) fn from_nom(input: Span, err: nom::Err<ParseFailure<Span<'_>>>) -> Self {
        MimeError::HeaderParse(explain_nom(input, err))
    }
}

fn is_utf8_non_ascii(c: char) -> bool {
    let c = c as u32;
    c == 0 || c >= 0x80
}

// ctl = { '\u{00}'..'\u{1f}' | "\u{7f}" }
fn is_ctl(c: char) -> bool {
    matches!(c, '\u{00}'..='\u{1f}' | '\u{7f}')
}

// char = { '\u{01}'..'\u{ff}' }
fn is_char(c: char) -> bool {
    matches!(c, '\u{01}'..='\u{ff}')
}

fn is_especial(c: char) -> bool {
    matches!(
        c,
        '(' | ')' | '<' | '>' | '@' | ',' | ';' | ':' | '/' | '[' | ']' | '?' | '.' | '='
    )
}

fn is_token(c: char) -> bool {
    is_char(c) && c != ' ' && !is_especial(c) && !is_ctl(c)
}

// vchar = { '\u{21}'..'\u{7e}' | utf8_non_ascii }
fn is_vchar(c: char) -> bool {
    let u = c as u32;
    (0x21..=0x7e).contains(&u) || is_utf8_non_ascii(c)
}

fn is_atext(c: char) -> bool {
    match c {
        '!' | '#' | '$' | '%' | '&' | '\'' | '*' | '+' | '-' | '/' | '=' | '?' | '^' | '_'
        | '`' | '{' | '|' | '}' | '~' => true,
        c => c.is_ascii_alphanumeric() || is_utf8_non_ascii(c),
    }
}

fn atext(input: Span) -> IResult<Span, Span> {
    context("atext", take_while1(is_atext))(input)
}

fn is_obs_no_ws_ctl(c: char) -> bool {
    matches!(c, '\u{01}'..='\u{08}' | '\u{0b}'..='\u{0c}' | '\u{0e}'..='\u{1f}' | '\u{7f}')
}

// ctext = { '\u{21}'..'\u{27}' | '\u{2a}'..'\u{5b}' | '\u{5d}'..'\u{7e}' | obs_ctext | utf8_non_ascii }
fn is_ctext(c: char) -> bool {
    match c {
        '\u{21}'..='\u{27}' | '\u{2a}'..='\u{5b}' | '\u{5d}'..='\u{7e}' => true,
        c => is_obs_no_ws_ctl(c) || is_utf8_non_ascii(c),
    }
}

// dtext = { '\u{21}'..'\u{5a}' | '\u{5e}'..'\u{7e}' | obs_dtext | utf8_non_ascii }
fn is_dtext(c: char) -> bool {
    match c {
        '\u{21}'..='\u{5a}' | '\u{5e}'..='\u{7e}' => true,
        c => is_obs_no_ws_ctl(c) || is_utf8_non_ascii(c),
    }
}

// qtext = { "\u{21}" | '\u{23}'..'\u{5b}' | '\u{5d}'..'\u{7e}' | obs_qtext | utf8_non_ascii }
fn is_qtext(c: char) -> bool {
    match c {
        '\u{21}' | '\u{23}'..='\u{5b}' | '\u{5d}'..='\u{7e}' => true,
        c => is_obs_no_ws_ctl(c) || is_utf8_non_ascii(c),
    }
}

fn is_tspecial(c: char) -> bool {
    matches!(
        c,
        '(' | ')' | '<' | '>' | '@' | ',' | ';' | ':' | '\\' | '"' | '/' | '[' | ']' | '?' | '='
    )
}

fn is_attribute_char(c: char) -> bool {
    match c {
        ' ' | '*' | '\'' | '%' => false,
        _ => is_char(c) && !is_ctl(c) && !is_tspecial(c),
    }
}

pub(crate) fn is_mime_token(c: char) -> bool {
    is_char(c) && c != ' ' && !is_ctl(c) && !is_tspecial(c)
}

fn wsp(input: Span) -> IResult<Span, Span> {
    context("wsp", take_while1(|c| c == ' ' || c == '\t'))(input)
}

fn newline(input: Span) -> IResult<Span, Span> {
    context("newline", recognize(preceded(opt(char('\r')), char('\n'))))(input)
}

// fws = { ((wsp* ~ "\r"? ~ "\n")* ~ wsp+) | obs_fws }
fn fws(input: Span) -> IResult<Span, Span> {
    context(
        "fws",
        alt((
            recognize(preceded(many0(preceded(many0(wsp), newline)), many1(wsp))),
            obs_fws,
        )),
    )(input)
}

// obs_fws = { wsp+ ~ ("\r"? ~ "\n" ~ wsp+)* }
fn obs_fws(input: Span) -> IResult<Span, Span> {
    context(
        "obs_fws",
        recognize(preceded(many1(wsp), preceded(newline, many1(wsp)))),
    )(input)
}

// cfws = { ( (fws? ~ comment)+ ~ fws?) | fws }
fn cfws(input: Span) -> IResult<Span, Span> {
    context(
        "cfws",
        recognize(alt((
            recognize(tuple((many1(tuple((opt(fws), comment))), opt(fws)))),
            fws,
        ))),
    )(input)
}

// comment = { "(" ~ (fws? ~ ccontent)* ~ fws? ~ ")" }
fn comment(input: Span) -> IResult<Span, Span> {
    context(
        "comment",
        recognize(tuple((
            char('('),
            many0(tuple((opt(fws), ccontent))),
            opt(fws),
            char(')'),
        ))),
    )(input)
}

// ccontent = { ctext | quoted_pair | comment | encoded_word }
fn ccontent(input: Span) -> IResult<Span, Span> {
    context(
        "ccontent",
        recognize(alt((
            recognize(satisfy(is_ctext)),
            recognize(quoted_pair),
            comment,
            recognize(encoded_word),
        ))),
    )(input)
}

/// Like `comment`, but returns the decoded inner text: quoted pairs are
/// unescaped, encoded words decoded, nested comments flattened, and
/// whitespace runs collapsed to single spaces.
fn comment_text(input: Span) -> IResult<Span, String> {
    enum Piece {
        Text(String),
        Space,
    }
    let (loc, pieces) = context(
        "comment_text",
        delimited(
            char('('),
            many0(alt((
                map(fws, |_| Piece::Space),
                map(encoded_word, |(s, _cs)| Piece::Text(s)),
                map(comment_text, Piece::Text),
                map(quoted_pair, |c| Piece::Text(c.to_string())),
                map(satisfy(is_ctext), |c| Piece::Text(c.to_string())),
            ))),
            char(')'),
        ),
    )(input)?;

    let mut result = String::new();
    for piece in pieces {
        match piece {
            Piece::Text(s) => result.push_str(&s),
            Piece::Space => {
                if !result.ends_with(' ') {
                    result.push(' ');
                }
            }
        }
    }
    Ok((loc, result.trim().to_string()))
}

/// CFWS that captures the text of the last comment it swallowed. Used
/// where a trailing comment doubles as a display name in legacy
/// producers.
fn cfws_comment(input: Span) -> IResult<Span, Option<String>> {
    let mut rest = input;
    let mut last = None;
    let mut consumed = false;
    loop {
        if let Ok((r, text)) = comment_text(rest) {
            if !text.is_empty() {
                last = Some(text);
            }
            rest = r;
            consumed = true;
            continue;
        }
        if let Ok((r, _)) = fws(rest) {
            rest = r;
            consumed = true;
            continue;
        }
        break;
    }
    if consumed {
        Ok((rest, last))
    } else {
        Err(make_context_error(input, "cfws_comment: no whitespace"))
    }
}

fn is_quoted_pair(c: char) -> bool {
    match c {
        '\u{00}' | '\r' | '\n' | ' ' => true,
        c => is_obs_no_ws_ctl(c) || is_vchar(c),
    }
}

// quoted_pair = { ( "\\"  ~ (vchar | wsp)) | obs_qp }
fn quoted_pair(input: Span) -> IResult<Span, char> {
    context("quoted_pair", preceded(char('\\'), satisfy(is_quoted_pair)))(input)
}

// quoted_string = { cfws? ~ "\"" ~ (fws? ~ qcontent)* ~ fws? ~ "\"" ~ cfws? }
fn quoted_string(input: Span) -> IResult<Span, String> {
    let (loc, (bits, trailer)) = context(
        "quoted_string",
        delimited(
            opt(cfws),
            delimited(
                char('"'),
                tuple((many0(tuple((opt(fws), qcontent))), opt(fws))),
                char('"'),
            ),
            opt(cfws),
        ),
    )(input)?;

    let mut result = String::new();
    for (a, b) in bits {
        if let Some(a) = a {
            result.push_str(&a);
        }
        result.push(b);
    }
    if let Some(t) = trailer {
        result.push_str(&t);
    }
    Ok((loc, result))
}

// qcontent = { qtext | quoted_pair }
fn qcontent(input: Span) -> IResult<Span, char> {
    context("qcontent", alt((satisfy(is_qtext), quoted_pair)))(input)
}

// atom = { cfws? ~ atext ~ cfws? }
fn atom(input: Span) -> IResult<Span, String> {
    let (loc, text) = context("atom", delimited(opt(cfws), atext, opt(cfws)))(input)?;
    Ok((loc, text.fragment().to_string()))
}

// word = { atom | quoted_string }
fn word(input: Span) -> IResult<Span, String> {
    context("word", alt((atom, quoted_string)))(input)
}

// dot_atom_text = @{ atext ~ ("." ~ atext)* }
fn dot_atom_text(input: Span) -> IResult<Span, String> {
    let (loc, (a, b)) = context(
        "dot_atom_text",
        tuple((atext, many0(preceded(char('.'), atext)))),
    )(input)?;
    let mut result = String::new();
    result.push_str(&a);
    for item in b {
        result.push('.');
        result.push_str(&item);
    }
    Ok((loc, result))
}

// dot_atom = { cfws? ~ dot_atom_text ~ cfws? }
fn dot_atom(input: Span) -> IResult<Span, String> {
    context("dot_atom", delimited(opt(cfws), dot_atom_text, opt(cfws)))(input)
}

// obs_local_part = { word ~ (dot ~ word)* }
fn obs_local_part(input: Span) -> IResult<Span, String> {
    let (loc, (word, dotted_words)) = context(
        "obs_local_part",
        tuple((word, many0(tuple((char('.'), word))))),
    )(input)?;
    let mut result = String::new();
    result.push_str(&word);
    for (dot, w) in dotted_words {
        result.push(dot);
        result.push_str(&w);
    }
    Ok((loc, result))
}

// local_part = { dot_atom | quoted_string | obs_local_part }
fn local_part(input: Span) -> IResult<Span, String> {
    context("local_part", alt((dot_atom, quoted_string, obs_local_part)))(input)
}

// domain = { dot_atom | domain_literal | obs_domain }
fn domain(input: Span) -> IResult<Span, String> {
    context("domain", alt((dot_atom, domain_literal, obs_domain)))(input)
}

// obs_domain = { atom ~ ( dot ~ atom)* }
fn obs_domain(input: Span) -> IResult<Span, String> {
    let (loc, (atom, dotted_atoms)) =
        context("obs_domain", tuple((atom, many0(tuple((char('.'), atom))))))(input)?;
    let mut result = String::new();
    result.push_str(&atom);
    for (dot, w) in dotted_atoms {
        result.push(dot);
        result.push_str(&w);
    }
    Ok((loc, result))
}

fn domain_literal_inner(input: Span) -> IResult<Span, String> {
    let (loc, (bits, trailer)) = context(
        "domain_literal",
        delimited(
            char('['),
            tuple((
                many0(tuple((opt(fws), alt((satisfy(is_dtext), quoted_pair))))),
                opt(fws),
            )),
            char(']'),
        ),
    )(input)?;

    let mut result = String::new();
    result.push('[');
    for (a, b) in bits {
        if let Some(a) = a {
            result.push_str(&a);
        }
        result.push(b);
    }
    if let Some(t) = trailer {
        result.push_str(&t);
    }
    result.push(']');
    Ok((loc, result))
}

// domain_literal = { cfws? ~ "[" ~ (fws? ~ dtext)* ~ fws? ~ "]" ~ cfws? }
fn domain_literal(input: Span) -> IResult<Span, String> {
    delimited(opt(cfws), domain_literal_inner, opt(cfws))(input)
}

/// domain without trailing CFWS consumption, so that a trailing
/// comment remains available as a legacy display name.
fn domain_no_trail(input: Span) -> IResult<Span, String> {
    preceded(opt(cfws), alt((dot_atom_text, domain_literal_inner)))(input)
}

// encoded_word = { "=?" ~ charset ~ ("*" ~ language)? ~ "?" ~ encoding ~ "?" ~ encoded_text ~ "?=" }
// Returns the decoded text along with the canonical charset label used.
fn encoded_word(input: Span) -> IResult<Span, (String, String)> {
    let (loc, (charset, _language, _, encoding, _, text)) = context(
        "encoded_word",
        delimited(
            tag("=?"),
            tuple((
                ew_charset,
                opt(preceded(char('*'), ew_language)),
                char('?'),
                ew_encoding,
                char('?'),
                encoded_text,
            )),
            tag("?="),
        ),
    )(input)?;

    let bytes = match *encoding.fragment() {
        "B" | "b" => data_encoding::BASE64_MIME
            .decode(text.as_bytes())
            .map_err(|err| {
                make_context_error(
                    input,
                    format!("encoded_word: base64 decode failed: {err:#}"),
                )
            })?,
        "Q" | "q" => {
            quoted_printable::decode(text.replace('_', " "), quoted_printable::ParseMode::Robust)
                .map_err(|err| {
                    make_context_error(
                        input,
                        format!("encoded_word: quoted printable decode failed: {err:#}"),
                    )
                })?
        }
        encoding => {
            return Err(make_context_error(
                input,
                format!("encoded_word: invalid encoding '{encoding}', expected one of b, B, q or Q"),
            ));
        }
    };

    let (decoded, used) = charsets::decode(&bytes, charset.fragment(), &charsets::default_charset());

    Ok((loc, (decoded, used)))
}

// charset = @{ (!"*" ~ token)+ }
fn ew_charset(input: Span) -> IResult<Span, Span> {
    context("charset", take_while1(|c| c != '*' && is_token(c)))(input)
}

// language = @{ token+ }
fn ew_language(input: Span) -> IResult<Span, Span> {
    context("language", take_while1(|c| c != '*' && is_token(c)))(input)
}

// encoding = @{ token+ }
fn ew_encoding(input: Span) -> IResult<Span, Span> {
    context("encoding", take_while1(|c| c != '*' && is_token(c)))(input)
}

// encoded_text = @{ (!( " " | "?") ~ vchar)+ }
fn encoded_text(input: Span) -> IResult<Span, Span> {
    context(
        "encoded_text",
        take_while1(|c| is_vchar(c) && c != ' ' && c != '?'),
    )(input)
}

// phrase = { (encoded_word | word)+ | obs_phrase }
// obs_phrase = { (encoded_word | word) ~ (encoded_word | word | dot | cfws)* }
//
// Adjacent encoded words that share a charset concatenate without the
// intervening whitespace; everything else joins with single spaces.
fn phrase(input: Span) -> IResult<Span, String> {
    #[derive(Debug)]
    enum Word {
        Encoded(String, String),
        Text(String),
        Skip,
    }

    // encoded_word must be tried ahead of word at each step, and any
    // whitespace consumed first: atext admits '=' and '?', so an atom
    // would otherwise swallow a following encoded word as raw text
    let (loc, (first, rest)) = context(
        "phrase",
        preceded(
            opt(cfws),
            tuple((
                alt((
                    map(encoded_word, |(s, cs)| Word::Encoded(s, cs)),
                    map(word, Word::Text),
                )),
                many0(alt((
                    map(encoded_word, |(s, cs)| Word::Encoded(s, cs)),
                    map(cfws, |_| Word::Skip),
                    map(word, Word::Text),
                    map(char('.'), |dot| Word::Text(dot.to_string())),
                ))),
            )),
        ),
    )(input)?;

    let mut items: Vec<Word> = vec![];
    for w in std::iter::once(first).chain(rest) {
        match w {
            Word::Skip => continue,
            Word::Encoded(s, cs) => {
                if let Some(Word::Encoded(prior, prior_cs)) = items.last_mut() {
                    if *prior_cs == cs {
                        prior.push_str(&s);
                        continue;
                    }
                }
                items.push(Word::Encoded(s, cs));
            }
            text => items.push(text),
        }
    }

    let result = items
        .iter()
        .map(|w| match w {
            Word::Encoded(s, _) | Word::Text(s) => s.as_str(),
            Word::Skip => unreachable!(),
        })
        .collect::<Vec<_>>()
        .join(" ");
    Ok((loc, result))
}

// display_name = { phrase }
fn display_name(input: Span) -> IResult<Span, String> {
    context("display_name", phrase)(input)
}

// obs_route = { obs_domain_list ~ ":" }
// obs_domain_list = { (cfws | ",")* ~ "@" ~ domain ~ ("," ~ cfws? ~ ("@" ~ domain)?)* }
fn obs_route(input: Span) -> IResult<Span, Span> {
    context(
        "obs_route",
        recognize(terminated(
            tuple((
                many0(alt((cfws, recognize(char(','))))),
                recognize(char('@')),
                recognize(domain),
                many0(tuple((
                    char(','),
                    opt(cfws),
                    opt(tuple((char('@'), domain))),
                ))),
            )),
            char(':'),
        )),
    )(input)
}

// addr_spec = { local_part ~ "@" ~ domain }
fn addr_spec(input: Span) -> IResult<Span, AddrSpec> {
    let (loc, (local_part, domain)) =
        context("addr_spec", separated_pair(local_part, char('@'), domain))(input)?;
    Ok((loc, AddrSpec { local_part, domain }))
}

/// addr_spec that leaves a trailing comment uneaten and hands back its
/// text, for the `user@example.com (Display Name)` legacy shape.
fn addr_spec_trailing_comment(input: Span) -> IResult<Span, (AddrSpec, Option<String>)> {
    let (loc, ((local_part, domain), comment)) = context(
        "addr_spec",
        tuple((
            separated_pair(local_part, char('@'), domain_no_trail),
            opt(cfws_comment),
        )),
    )(input)?;
    Ok((loc, (AddrSpec { local_part, domain }, comment.flatten())))
}

// angle_addr = { cfws? ~ "<" ~ [obs_route] ~ addr_spec ~ ">" ~ cfws? }
// The trailing cfws may carry a legacy display-name comment.
fn angle_addr(input: Span) -> IResult<Span, (AddrSpec, Option<String>)> {
    let (loc, (address, comment)) = context(
        "angle_addr",
        tuple((
            preceded(
                opt(cfws),
                delimited(char('<'), preceded(opt(obs_route), addr_spec), char('>')),
            ),
            opt(cfws_comment),
        )),
    )(input)?;
    Ok((loc, (address, comment.flatten())))
}

// name_addr = { display_name? ~ angle_addr }
fn name_addr(input: Span) -> IResult<Span, Mailbox> {
    context(
        "name_addr",
        map(
            tuple((opt(display_name), angle_addr)),
            |(name, (address, comment))| Mailbox {
                name: name.or(comment).map(|n| strip_bidi_controls(&n)),
                address,
            },
        ),
    )(input)
}

// mailbox = { name_addr | addr_spec ~ comment? }
fn mailbox(input: Span) -> IResult<Span, Mailbox> {
    if let Ok(res) = name_addr(input) {
        Ok(res)
    } else {
        let (loc, (address, comment)) =
            context("mailbox", addr_spec_trailing_comment)(input)?;
        Ok((
            loc,
            Mailbox {
                name: comment.map(|n| strip_bidi_controls(&n)),
                address,
            },
        ))
    }
}

// mailbox_list = { (mailbox ~ ("," ~ mailbox)*) | obs_mbox_list }
fn mailbox_list(input: Span) -> IResult<Span, MailboxList> {
    let (loc, mailboxes) = context(
        "mailbox_list",
        alt((separated_list1(char(','), mailbox), obs_mbox_list)),
    )(input)?;
    Ok((loc, MailboxList(mailboxes)))
}

// obs_mbox_list = {  ((cfws? ~ ",")* ~ mailbox ~ ("," ~ (mailbox | cfws))*)+ ~ ","? }
// with trailing and empty commas ignored
fn obs_mbox_list(input: Span) -> IResult<Span, Vec<Mailbox>> {
    let (loc, entries) = context(
        "obs_mbox_list",
        terminated(
            many1(preceded(
                many0(preceded(opt(cfws), char(','))),
                tuple((
                    mailbox,
                    many0(preceded(
                        char(','),
                        alt((map(mailbox, Some), map(cfws, |_| None))),
                    )),
                )),
            )),
            tuple((many0(preceded(opt(cfws), char(','))), opt(cfws))),
        ),
    )(input)?;

    let mut result: Vec<Mailbox> = vec![];
    for (first, boxes) in entries {
        result.push(first);
        result.extend(boxes.into_iter().flatten());
    }
    Ok((loc, result))
}

// address = { mailbox | group }
fn address(input: Span) -> IResult<Span, Address> {
    context("address", alt((map(mailbox, Address::Mailbox), group)))(input)
}

// group = { display_name ~ ":" ~ group_list? ~ ";" ~ cfws? }
fn group(input: Span) -> IResult<Span, Address> {
    let (loc, (name, _, group_list, _)) = context(
        "group",
        terminated(
            tuple((display_name, char(':'), opt(group_list), char(';'))),
            opt(cfws),
        ),
    )(input)?;
    Ok((
        loc,
        Address::Group {
            name,
            entries: group_list.unwrap_or_else(|| MailboxList(vec![])),
        },
    ))
}

// group_list = { mailbox_list | cfws | obs_group_list }
fn group_list(input: Span) -> IResult<Span, MailboxList> {
    context(
        "group_list",
        alt((
            mailbox_list,
            map(cfws, |_| MailboxList(vec![])),
            obs_group_list,
        )),
    )(input)
}

// obs_group_list = @{ (cfws? ~ ",")+ ~ cfws? }
fn obs_group_list(input: Span) -> IResult<Span, MailboxList> {
    context(
        "obs_group_list",
        map(
            terminated(many1(preceded(opt(cfws), char(','))), opt(cfws)),
            |_| MailboxList(vec![]),
        ),
    )(input)
}

// address_list = { (address ~ ("," ~ address)*) | obs_addr_list }
fn address_list(input: Span) -> IResult<Span, AddressList> {
    context(
        "address_list",
        alt((
            map(separated_list1(char(','), address), AddressList),
            obs_address_list,
        )),
    )(input)
}

// obs_addr_list = {  ((cfws? ~ ",")* ~ address ~ ("," ~ (address | cfws))*)+ ~ ","? }
// with trailing and empty commas ignored
fn obs_address_list(input: Span) -> IResult<Span, AddressList> {
    let (loc, entries) = context(
        "obs_address_list",
        terminated(
            many1(preceded(
                many0(preceded(opt(cfws), char(','))),
                tuple((
                    address,
                    many0(preceded(
                        char(','),
                        alt((map(address, Some), map(cfws, |_| None))),
                    )),
                )),
            )),
            tuple((many0(preceded(opt(cfws), char(','))), opt(cfws))),
        ),
    )(input)?;

    let mut result: Vec<Address> = vec![];
    for (first, boxes) in entries {
        result.push(first);
        result.extend(boxes.into_iter().flatten());
    }
    Ok((loc, AddressList(result)))
}

// msg_id = { cfws? ~ "<" ~ id_left ~ "@" ~ id_right ~ ">" ~ cfws? }
fn msg_id(input: Span) -> IResult<Span, MessageID> {
    let (loc, (left, _, right)) = context(
        "msg_id",
        delimited(
            preceded(opt(cfws), char('<')),
            tuple((id_left, char('@'), id_right)),
            preceded(char('>'), opt(cfws)),
        ),
    )(input)?;
    Ok((loc, MessageID(format!("{left}@{right}"))))
}

// A Content-ID is nominally "<" id ">", but bare dot-atoms are a common
// wild form and are tolerated.
fn content_id(input: Span) -> IResult<Span, MessageID> {
    context(
        "content_id",
        alt((
            map(
                delimited(
                    preceded(opt(cfws), char('<')),
                    id_right,
                    preceded(char('>'), opt(cfws)),
                ),
                MessageID,
            ),
            map(delimited(opt(cfws), dot_atom_text, opt(cfws)), MessageID),
        )),
    )(input)
}

// msg_id_list = { msg_id+ }
fn msg_id_list(input: Span) -> IResult<Span, Vec<MessageID>> {
    context("msg_id_list", many1(msg_id))(input)
}

// id_left = { dot_atom_text | obs_id_left }
fn id_left(input: Span) -> IResult<Span, String> {
    context("id_left", alt((dot_atom_text, local_part)))(input)
}

// id_right = { dot_atom_text | no_fold_literal | obs_id_right }
fn id_right(input: Span) -> IResult<Span, String> {
    context("id_right", alt((dot_atom_text, no_fold_literal, domain)))(input)
}

// no_fold_literal = { "[" ~ dtext* ~ "]" }
fn no_fold_literal(input: Span) -> IResult<Span, String> {
    context(
        "no_fold_literal",
        map(
            recognize(tuple((tag("["), take_while(is_dtext), tag("]")))),
            |s: Span| s.fragment().to_string(),
        ),
    )(input)
}

// obs_utext = @{ "\u{00}" | obs_no_ws_ctl | vchar }
fn obs_utext(input: Span) -> IResult<Span, char> {
    context(
        "obs_utext",
        satisfy(|c| c == '\u{00}' || is_obs_no_ws_ctl(c) || is_vchar(c)),
    )(input)
}

// obs_unstruct = { (( "\r"* ~ "\n"* ~ ((encoded_word | obs_utext)~ "\r"* ~ "\n"*)+) | fws)+ }
fn unstructured(input: Span) -> IResult<Span, String> {
    #[derive(Debug)]
    enum Word {
        Encoded(String, String),
        UText(char),
        Fws,
    }

    let (loc, words) = context(
        "unstructured",
        many0(alt((
            preceded(
                map(take_while(|c| c == '\r' || c == '\n'), |_| Word::Fws),
                terminated(
                    alt((
                        map(encoded_word, |(w, cs)| Word::Encoded(w, cs)),
                        map(obs_utext, Word::UText),
                    )),
                    map(take_while(|c| c == '\r' || c == '\n'), |_| Word::Fws),
                ),
            ),
            map(fws, |_| Word::Fws),
        ))),
    )(input)?;

    #[derive(Debug)]
    enum ProcessedWord {
        Encoded(String, String),
        Text(String),
        Fws,
    }
    let mut processed: Vec<ProcessedWord> = vec![];
    for w in words {
        match w {
            Word::Encoded(p, cs) => {
                // Fws between encoded words of one charset is elided
                if processed.len() >= 2
                    && matches!(processed.last(), Some(ProcessedWord::Fws))
                    && matches!(
                        &processed[processed.len() - 2],
                        ProcessedWord::Encoded(_, prior_cs) if *prior_cs == cs
                    )
                {
                    processed.pop();
                }
                processed.push(ProcessedWord::Encoded(p, cs));
            }
            Word::Fws => {
                // collapse runs of Fws/newline to a single Fws
                if !matches!(processed.last(), Some(ProcessedWord::Fws)) {
                    processed.push(ProcessedWord::Fws);
                }
            }
            Word::UText(c) => match processed.last_mut() {
                Some(ProcessedWord::Text(prior)) => prior.push(c),
                _ => processed.push(ProcessedWord::Text(c.to_string())),
            },
        }
    }

    let mut result = String::new();
    for word in processed {
        match word {
            ProcessedWord::Encoded(s, _) | ProcessedWord::Text(s) => {
                result.push_str(&s);
            }
            ProcessedWord::Fws => {
                result.push(' ');
            }
        }
    }

    Ok((loc, result))
}

// mime_token = { (!(" " | ctl | tspecials) ~ char)+ }
fn mime_token(input: Span) -> IResult<Span, Span> {
    context("mime_token", take_while1(is_mime_token))(input)
}

// RFC 2045 modified by the RFC 2231 MIME header field extensions.
// content_type = { cfws? ~ mime_type ~ cfws? ~ "/" ~ cfws? ~ subtype ~
//  cfws? ~ (";"? ~ cfws? ~ parameter ~ cfws?)*
// }
fn content_type(input: Span) -> IResult<Span, MimeParameters> {
    let (loc, (mime_type, _, _, _, mime_subtype, _, parameters)) = context(
        "content_type",
        preceded(
            opt(cfws),
            tuple((
                mime_token,
                opt(cfws),
                char('/'),
                opt(cfws),
                mime_token,
                opt(cfws),
                many0(preceded(
                    // RFC 2231 originally showed examples without `;` as
                    // a separator; the errata corrected those, but
                    // implementations exist that assume it is optional,
                    // so it is optional here too
                    preceded(opt(char(';')), opt(cfws)),
                    terminated(parameter, opt(cfws)),
                )),
            )),
        ),
    )(input)?;

    let value = format!("{}/{}", mime_type.fragment(), mime_subtype.fragment()).to_ascii_lowercase();
    Ok((loc, MimeParameters { value, parameters }))
}

// A bare token followed by parameters; the shape shared by
// Content-Transfer-Encoding and Content-Disposition.
fn token_with_parameters(input: Span) -> IResult<Span, MimeParameters> {
    let (loc, (value, _, parameters)) = context(
        "token_with_parameters",
        preceded(
            opt(cfws),
            tuple((
                mime_token,
                opt(cfws),
                many0(preceded(
                    preceded(opt(char(';')), opt(cfws)),
                    terminated(parameter, opt(cfws)),
                )),
            )),
        ),
    )(input)?;

    Ok((
        loc,
        MimeParameters {
            value: value.to_ascii_lowercase(),
            parameters,
        },
    ))
}

// parameter = { regular_parameter | extended_parameter }
fn parameter(input: Span) -> IResult<Span, MimeParameter> {
    context(
        "parameter",
        alt((
            regular_parameter,
            extended_param_with_charset,
            extended_param_no_charset,
        )),
    )(input)
}

fn extended_param_with_charset(input: Span) -> IResult<Span, MimeParameter> {
    context(
        "extended_param_with_charset",
        map(
            tuple((
                attribute,
                opt(section),
                char('*'),
                opt(cfws),
                char('='),
                opt(cfws),
                opt(mime_charset),
                char('\''),
                opt(mime_language),
                char('\''),
                map(
                    recognize(many0(alt((ext_octet, take_while1(is_attribute_char))))),
                    |s: Span| s.fragment().to_string(),
                ),
            )),
            |(name, section, _, _, _, _, mime_charset, _, mime_language, _, value)| MimeParameter {
                name: name.fragment().to_string(),
                section,
                mime_charset: mime_charset.map(|s| s.fragment().to_string()),
                mime_language: mime_language.map(|s| s.fragment().to_string()),
                uses_encoding: true,
                value,
            },
        ),
    )(input)
}

fn extended_param_no_charset(input: Span) -> IResult<Span, MimeParameter> {
    context(
        "extended_param_no_charset",
        map(
            tuple((
                attribute,
                opt(section),
                opt(char('*')),
                opt(cfws),
                char('='),
                opt(cfws),
                alt((
                    quoted_string,
                    map(
                        recognize(many0(alt((ext_octet, take_while1(is_attribute_char))))),
                        |s: Span| s.fragment().to_string(),
                    ),
                )),
            )),
            |(name, section, star, _, _, _, value)| MimeParameter {
                name: name.fragment().to_string(),
                section,
                mime_charset: None,
                mime_language: None,
                uses_encoding: star.is_some(),
                value,
            },
        ),
    )(input)
}

fn mime_charset(input: Span) -> IResult<Span, Span> {
    context(
        "mime_charset",
        take_while1(|c| is_mime_token(c) && c != '\''),
    )(input)
}

fn mime_language(input: Span) -> IResult<Span, Span> {
    context(
        "mime_language",
        take_while1(|c| is_mime_token(c) && c != '\''),
    )(input)
}

fn ext_octet(input: Span) -> IResult<Span, Span> {
    context(
        "ext_octet",
        recognize(tuple((
            char('%'),
            satisfy(|c| c.is_ascii_hexdigit()),
            satisfy(|c| c.is_ascii_hexdigit()),
        ))),
    )(input)
}

// section = { "*" ~ ASCII_DIGIT+ }
fn section(input: Span) -> IResult<Span, u32> {
    context(
        "section",
        preceded(char('*'), nom::character::complete::u32),
    )(input)
}

// regular_parameter = { attribute ~ cfws? ~ "=" ~ cfws? ~ value }
fn regular_parameter(input: Span) -> IResult<Span, MimeParameter> {
    context(
        "regular_parameter",
        map(
            tuple((attribute, opt(cfws), char('='), opt(cfws), param_value)),
            |(name, _, _, _, value)| MimeParameter {
                name: name.fragment().to_string(),
                value,
                section: None,
                uses_encoding: false,
                mime_charset: None,
                mime_language: None,
            },
        ),
    )(input)
}

// attribute = { attribute_char+ }
fn attribute(input: Span) -> IResult<Span, Span> {
    context("attribute", take_while1(is_attribute_char))(input)
}

fn param_value(input: Span) -> IResult<Span, String> {
    context(
        "value",
        alt((map(mime_token, |s: Span| s.fragment().to_string()), quoted_string)),
    )(input)
}

// return_path = { "<" ~ addr_spec? ~ ">" }, "<>" being the null path
fn return_path(input: Span) -> IResult<Span, Option<AddrSpec>> {
    context(
        "return_path",
        delimited(
            preceded(opt(cfws), char('<')),
            opt(addr_spec),
            preceded(char('>'), opt(cfws)),
        ),
    )(input)
}

fn comma(input: Span) -> IResult<Span, char> {
    char(',')(input)
}

// keywords = { phrase ~ ("," ~ phrase)* } with empty entries tolerated
fn phrase_list(input: Span) -> IResult<Span, Vec<String>> {
    let mut rest = input;
    let mut out = vec![];
    loop {
        loop {
            if let Ok((r, _)) = cfws(rest) {
                rest = r;
                continue;
            }
            if let Ok((r, _)) = comma(rest) {
                rest = r;
                continue;
            }
            break;
        }
        match phrase(rest) {
            Ok((r, p)) => {
                out.push(p);
                rest = r;
            }
            Err(_) => break,
        }
    }
    Ok((rest, out))
}

fn parse_with<'a, R, F>(text: &'a str, parser: F) -> Result<R>
where
    F: Fn(Span<'a>) -> IResult<'a, Span<'a>, R>,
{
    let input = make_span(text);
    let (_, result) =
        all_consuming(parser)(input).map_err(|err| MimeError::from_nom(input, err))?;
    Ok(result)
}

/// Facade over the header grammars. Each method parses a complete
/// header value; trailing garbage is an error.
pub struct Parser;

impl Parser {
    pub fn parse_mailbox_list_header(text: &str) -> Result<MailboxList> {
        parse_with(text, mailbox_list)
    }

    pub fn parse_mailbox_header(text: &str) -> Result<Mailbox> {
        parse_with(text, mailbox)
    }

    pub fn parse_address_list_header(text: &str) -> Result<AddressList> {
        parse_with(text, address_list)
    }

    pub fn parse_msg_id_header(text: &str) -> Result<MessageID> {
        parse_with(text, msg_id)
    }

    pub fn parse_msg_id_header_list(text: &str) -> Result<Vec<MessageID>> {
        parse_with(text, msg_id_list)
    }

    pub fn parse_content_id_header(text: &str) -> Result<MessageID> {
        parse_with(text, content_id)
    }

    pub fn parse_content_type_header(text: &str) -> Result<MimeParameters> {
        parse_with(text, content_type)
    }

    pub fn parse_token_with_params_header(text: &str) -> Result<MimeParameters> {
        parse_with(text, token_with_parameters)
    }

    pub fn parse_unstructured_header(text: &str) -> Result<String> {
        parse_with(text, unstructured)
    }

    pub fn parse_phrase_list_header(text: &str) -> Result<Vec<String>> {
        parse_with(text, phrase_list)
    }

    pub fn parse_return_path_header(text: &str) -> Result<Option<AddrSpec>> {
        parse_with(text, return_path)
    }

    /// Newsgroups / Followup-To: group names separated by commas or
    /// whitespace, UTF-8 allowed.
    pub fn parse_newsgroups_header(text: &str) -> Result<Vec<String>> {
        Ok(text
            .split(|c: char| c == ',' || c.is_ascii_whitespace())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect())
    }

    /// Control: the first token names the control action, the remainder
    /// is its parameter string.
    pub fn parse_control_header(text: &str) -> Result<(String, String)> {
        let text = text.trim();
        match text.split_once(|c: char| c.is_ascii_whitespace()) {
            Some((action, param)) => Ok((action.to_string(), param.trim().to_string())),
            None if !text.is_empty() => Ok((text.to_string(), String::new())),
            None => Err(MimeError::HeaderParse("empty Control header".to_string())),
        }
    }

    pub fn parse_lines_header(text: &str) -> Result<u64> {
        text.trim()
            .parse()
            .map_err(|err| MimeError::HeaderParse(format!("Lines: {err}")))
    }
}

/// Strip bidirectional control code points from a display name, so a
/// right-to-left override cannot visually reorder the address next to
/// it.
pub fn strip_bidi_controls(s: &str) -> String {
    s.chars()
        .filter(|c| {
            !matches!(
                c,
                '\u{061c}' | '\u{200e}' | '\u{200f}' | '\u{202a}'..='\u{202e}' | '\u{2066}'..='\u{2069}'
            )
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddrSpec {
    pub local_part: String,
    pub domain: String,
}

impl AddrSpec {
    pub fn new(local_part: &str, domain: &str) -> Self {
        Self {
            local_part: local_part.to_string(),
            domain: domain.to_string(),
        }
    }

    pub fn parse(email: &str) -> Result<Self> {
        parse_with(email, addr_spec)
    }

    pub fn is_empty(&self) -> bool {
        self.local_part.is_empty() && self.domain.is_empty()
    }

    fn render(&self, pretty: bool) -> String {
        let mut result = String::new();

        let needs_quoting = !self
            .local_part
            .chars()
            .all(|c| is_atext(c) || c == '.');
        if needs_quoting {
            result.push('"');
            for c in self.local_part.chars() {
                if c == '"' || c == '\\' {
                    result.push('\\');
                }
                result.push(c);
            }
            result.push('"');
        } else {
            result.push_str(&self.local_part);
        }

        if self.domain.is_empty() {
            return result;
        }
        result.push('@');
        if pretty && self.domain.contains("xn--") {
            let (unicode, _errors) = idna::domain_to_unicode(&self.domain);
            result.push_str(&unicode);
        } else {
            result.push_str(&self.domain);
        }
        result
    }

    /// Dot-atom form, quoting the local part as needed.
    pub fn as_string(&self) -> String {
        self.render(false)
    }

    /// Like [Self::as_string], additionally converting ACE-encoded
    /// (`xn--`) domain labels to unicode.
    pub fn as_pretty_string(&self) -> String {
        self.render(true)
    }
}

impl EncodeHeaderValue for AddrSpec {
    fn encode_value(&self) -> String {
        self.as_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mailbox {
    pub name: Option<String>,
    pub address: AddrSpec,
}

impl Mailbox {
    pub fn new(name: Option<&str>, address: AddrSpec) -> Self {
        Self {
            name: name.map(strip_bidi_controls),
            address,
        }
    }

    pub fn set_name(&mut self, name: Option<&str>) {
        self.name = name.map(strip_bidi_controls);
    }

    pub fn has_name(&self) -> bool {
        self.name.as_deref().map(|n| !n.is_empty()).unwrap_or(false)
    }

    pub fn has_address(&self) -> bool {
        !self.address.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Address {
    Mailbox(Mailbox),
    Group { name: String, entries: MailboxList },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressList(pub Vec<Address>);

impl AddressList {
    /// Flatten groups and return every mailbox in the list.
    pub fn mailboxes(&self) -> Vec<&Mailbox> {
        let mut result = vec![];
        for entry in &self.0 {
            match entry {
                Address::Mailbox(mbox) => result.push(mbox),
                Address::Group { entries, .. } => result.extend(entries.0.iter()),
            }
        }
        result
    }

    pub fn display_names(&self) -> Vec<&str> {
        self.mailboxes()
            .into_iter()
            .filter_map(|m| m.name.as_deref())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailboxList(pub Vec<Mailbox>);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageID(pub String);

impl EncodeHeaderValue for MessageID {
    fn encode_value(&self) -> String {
        format!("<{}>", self.0)
    }
}

impl EncodeHeaderValue for Vec<MessageID> {
    fn encode_value(&self) -> String {
        let mut result = String::new();
        for id in self {
            if !result.is_empty() {
                result.push_str("\n\t");
            }
            result.push_str(&format!("<{}>", id.0));
        }
        result
    }
}

/// Emit a display name, wrapping it in a quoted string (with `\` and
/// `"` escaped) whenever it contains punctuation that would otherwise
/// be parsed as address structure.
pub(crate) fn quote_display_name(name: &str) -> String {
    const SPECIALS: &str = "\\\",;:.<>@()[]";
    if name.chars().any(|c| SPECIALS.contains(c)) {
        let mut result = String::with_capacity(name.len() + 4);
        result.push('"');
        for c in name.chars() {
            if c == '"' || c == '\\' {
                result.push('\\');
            }
            result.push(c);
        }
        result.push('"');
        result
    } else {
        name.to_string()
    }
}

impl EncodeHeaderValue for Mailbox {
    fn encode_value(&self) -> String {
        match &self.name {
            Some(name) => {
                let mut value = if name.is_ascii() {
                    quote_display_name(name)
                } else {
                    crate::rfc2047::qp_encode_address(name)
                };
                value.push_str(" <");
                value.push_str(&self.address.encode_value());
                value.push('>');
                value
            }
            None => format!("<{}>", self.address.encode_value()),
        }
    }
}

impl EncodeHeaderValue for MailboxList {
    fn encode_value(&self) -> String {
        let mut result = String::new();
        for mailbox in &self.0 {
            if !result.is_empty() {
                result.push_str(",\n\t");
            }
            result.push_str(&mailbox.encode_value());
        }
        result
    }
}

impl EncodeHeaderValue for Address {
    fn encode_value(&self) -> String {
        match self {
            Self::Mailbox(mbox) => mbox.encode_value(),
            Self::Group { name, entries } => {
                let mut result = format!("{name}:");
                result += &entries.encode_value();
                result.push(';');
                result
            }
        }
    }
}

impl EncodeHeaderValue for AddressList {
    fn encode_value(&self) -> String {
        let mut result = String::new();
        for address in &self.0 {
            if !result.is_empty() {
                result.push_str(",\n\t");
            }
            result.push_str(&address.encode_value());
        }
        result
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MimeParameter {
    pub name: String,
    pub section: Option<u32>,
    pub mime_charset: Option<String>,
    pub mime_language: Option<String>,
    pub uses_encoding: bool,
    pub value: String,
}

/// The value of a parameterized header: a leading token plus a
/// parameter list, as used by Content-Type, Content-Disposition and
/// Content-Transfer-Encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeParameters {
    pub value: String,
    pub(crate) parameters: Vec<MimeParameter>,
}

impl MimeParameters {
    pub fn new(value: &str) -> Self {
        Self {
            value: value.to_string(),
            parameters: vec![],
        }
    }

    /// Retrieve the value for a named parameter, reassembling RFC 2231
    /// continuation segments and %-decoding extended values.
    pub fn get(&self, name: &str) -> Option<String> {
        self.get_with_charset(name).map(|(value, _)| value)
    }

    /// Like [Self::get], also reporting the canonical name of the
    /// charset the value declared, when it declared one.
    pub fn get_with_charset(&self, name: &str) -> Option<(String, Option<String>)> {
        let mut elements: Vec<_> = self
            .parameters
            .iter()
            .filter(|p| p.name.eq_ignore_ascii_case(name))
            .collect();
        if elements.is_empty() {
            return None;
        }
        elements.sort_by(|a, b| a.section.cmp(&b.section));

        let mut declared_charset: Option<String> = None;
        let mut active_charset: Option<String> = None;
        let mut result = String::new();

        for ele in elements {
            if let Some(cset) = ele.mime_charset.as_deref() {
                active_charset = Some(cset.to_string());
                if declared_charset.is_none() {
                    declared_charset = Some(charsets::cached_charset(cset));
                }
            }

            match (&active_charset, ele.uses_encoding) {
                (Some(cset), true) => {
                    let mut bytes: Vec<u8> = Vec::with_capacity(ele.value.len());
                    let mut chars = ele.value.chars();
                    'next_char: while let Some(c) = chars.next() {
                        if c != '%' {
                            let mut buf = [0u8; 4];
                            bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                            continue;
                        }
                        let mut value = 0u8;
                        for _ in 0..2 {
                            match chars.next().and_then(|n| n.to_digit(16)) {
                                Some(d) => {
                                    value = (value << 4) | d as u8;
                                }
                                None => {
                                    // not a hex escape after all; keep it
                                    bytes.push(b'%');
                                    break 'next_char;
                                }
                            }
                        }
                        bytes.push(value);
                    }
                    let (decoded, _used) =
                        charsets::decode(&bytes, cset, &charsets::default_charset());
                    result.push_str(&decoded);
                }
                _ => {
                    result.push_str(&ele.value);
                }
            }
        }

        Some((result, declared_charset))
    }

    /// Remove the named parameter
    pub fn remove(&mut self, name: &str) {
        self.parameters
            .retain(|p| !p.name.eq_ignore_ascii_case(name));
    }

    pub fn set(&mut self, name: &str, value: &str) {
        self.remove(name);
        self.parameters.push(MimeParameter {
            name: name.to_ascii_lowercase(),
            value: value.to_string(),
            section: None,
            mime_charset: None,
            mime_language: None,
            uses_encoding: false,
        });
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.parameters.iter().map(|p| p.name.as_str()).collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn is_multipart(&self) -> bool {
        self.value.starts_with("multipart/")
    }

    pub fn is_text(&self) -> bool {
        self.value.starts_with("text/") || self.value.is_empty()
    }

    /// The "type" half of type/subtype.
    pub fn media_type(&self) -> &str {
        match self.value.split_once('/') {
            Some((t, _)) => t,
            None => &self.value,
        }
    }

    /// The "subtype" half of type/subtype.
    pub fn sub_type(&self) -> &str {
        match self.value.split_once('/') {
            Some((_, s)) => s,
            None => "",
        }
    }

    pub fn is_mime_type(&self, mime_type: &str) -> bool {
        self.value.eq_ignore_ascii_case(mime_type)
    }

    pub fn is_plain_text(&self) -> bool {
        self.is_mime_type("text/plain") || self.value.is_empty()
    }

    pub fn is_html_text(&self) -> bool {
        self.is_mime_type("text/html")
    }

    pub fn is_image(&self) -> bool {
        self.media_type().eq_ignore_ascii_case("image")
    }

    pub fn is_partial(&self) -> bool {
        self.is_mime_type("message/partial")
    }

    pub fn charset(&self) -> Option<String> {
        self.get("charset")
    }

    pub fn boundary(&self) -> Option<String> {
        self.get("boundary")
    }

    pub fn name(&self) -> Option<String> {
        self.get("name")
    }

    pub fn id(&self) -> Option<String> {
        self.get("id")
    }

    pub fn partial_number(&self) -> Option<u32> {
        self.get("number").and_then(|n| n.parse().ok())
    }

    pub fn partial_count(&self) -> Option<u32> {
        self.get("total").and_then(|n| n.parse().ok())
    }

    pub fn set_partial_params(&mut self, total: u32, number: u32) {
        self.set("number", &number.to_string());
        self.set("total", &total.to_string());
    }
}

impl EncodeHeaderValue for MimeParameters {
    fn encode_value(&self) -> String {
        let mut result = self.value.to_string();

        for name in self.names() {
            let value = self.get(name).expect("name to be present");

            let needs_encoding = value.chars().any(|c| !is_mime_token(c) || !c.is_ascii());
            // Prefer the quoted_string representation when possible, as
            // it doesn't require any RFC 2231 encoding
            let use_quoted_string = value
                .chars()
                .all(|c| (is_qtext(c) || is_quoted_pair(c)) && c.is_ascii());

            let mut params = vec![];
            let mut chars = value.chars().peekable();
            while chars.peek().is_some() {
                let count = params.len();
                let is_first = count == 0;
                let prefix = if use_quoted_string {
                    "\""
                } else if is_first && needs_encoding {
                    "UTF-8''"
                } else {
                    ""
                };
                let limit = 74usize.saturating_sub(name.len() + 4 + prefix.len());

                let mut encoded = String::new();

                while encoded.len() < limit {
                    let c = match chars.next() {
                        Some(c) => c,
                        None => break,
                    };

                    if use_quoted_string {
                        if c == '"' || c == '\\' {
                            encoded.push('\\');
                        }
                        encoded.push(c);
                    } else if is_mime_token(c) && c.is_ascii() && (!needs_encoding || c != '%') {
                        encoded.push(c);
                    } else {
                        let mut buf = [0u8; 4];
                        for b in c.encode_utf8(&mut buf).bytes() {
                            encoded.push('%');
                            encoded.push(crate::rfc2047::HEX_CHARS[(b as usize) >> 4] as char);
                            encoded.push(crate::rfc2047::HEX_CHARS[(b as usize) & 0x0f] as char);
                        }
                    }
                }

                if use_quoted_string {
                    encoded.push('"');
                }

                params.push(MimeParameter {
                    name: name.to_string(),
                    section: Some(count as u32),
                    mime_charset: if is_first {
                        Some("UTF-8".to_string())
                    } else {
                        None
                    },
                    mime_language: None,
                    uses_encoding: needs_encoding,
                    value: encoded,
                })
            }
            if params.len() == 1 {
                if let Some(p) = params.last_mut() {
                    p.section = None;
                }
            }
            for p in params {
                result.push_str(";\n\t");
                let ticks = if !use_quoted_string
                    && (p.mime_charset.is_some() || p.mime_language.is_some())
                {
                    "'"
                } else {
                    ""
                };

                let section = p
                    .section
                    .map(|s| format!("*{s}"))
                    .unwrap_or_default();

                let uses_encoding = if !use_quoted_string && p.uses_encoding {
                    "*"
                } else {
                    ""
                };
                let charset = if use_quoted_string {
                    "\""
                } else {
                    p.mime_charset.as_deref().unwrap_or("")
                };
                let lang = p.mime_language.as_deref().unwrap_or("");

                let line = format!(
                    "{name}{section}{uses_encoding}={charset}{ticks}{lang}{ticks}{value}",
                    name = &p.name,
                    value = &p.value
                );
                result.push_str(&line);
            }
        }
        result
    }
}
