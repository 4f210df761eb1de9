use nom::error::{ContextError, ErrorKind};
use nom_locate::LocatedSpan;
use std::fmt::{Debug, Write};

pub(crate) type Span<'a> = LocatedSpan<&'a str>;
pub(crate) type IResult<'a, A, B> = nom::IResult<A, B, ParseFailure<Span<'a>>>;

pub(crate) fn make_span(s: &str) -> Span {
    Span::new(s)
}

#[derive(Debug)]
pub enum FailureKind {
    Context(&'static str),
    Char(char),
    Nom(ErrorKind),
    External(String),
}

/// Error carrier for the header grammars; keeps the failure trail so
/// that the rendered message can point into the input.
#[derive(Debug)]
pub struct ParseFailure<I: Debug> {
    pub trail: Vec<(I, FailureKind)>,
}

impl<I: Debug> ContextError<I> for ParseFailure<I> {
    fn add_context(input: I, ctx: &'static str, mut other: Self) -> Self {
        other.trail.push((input, FailureKind::Context(ctx)));
        other
    }
}

impl<I: Debug> nom::error::ParseError<I> for ParseFailure<I> {
    fn from_error_kind(input: I, kind: ErrorKind) -> Self {
        Self {
            trail: vec![(input, FailureKind::Nom(kind))],
        }
    }

    fn append(input: I, kind: ErrorKind, mut other: Self) -> Self {
        other.trail.push((input, FailureKind::Nom(kind)));
        other
    }

    fn from_char(input: I, c: char) -> Self {
        Self {
            trail: vec![(input, FailureKind::Char(c))],
        }
    }
}

impl<I: Debug, E: std::fmt::Display> nom::error::FromExternalError<I, E> for ParseFailure<I> {
    fn from_external_error(input: I, _kind: ErrorKind, err: E) -> Self {
        Self {
            trail: vec![(input, FailureKind::External(format!("{err:#}")))],
        }
    }
}

pub(crate) fn make_context_error<'a, S: Into<String>>(
    input: Span<'a>,
    reason: S,
) -> nom::Err<ParseFailure<Span<'a>>> {
    nom::Err::Error(ParseFailure {
        trail: vec![(input, FailureKind::External(reason.into()))],
    })
}

/// Render a nom failure as a human-oriented multi-line message with a
/// caret pointing at the failing position.
pub(crate) fn explain_nom(input: Span, err: nom::Err<ParseFailure<Span<'_>>>) -> String {
    let e = match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => e,
        other => return format!("{other:#}"),
    };

    let mut result = String::new();
    for (i, (span, kind)) in e.trail.iter().enumerate() {
        if input.is_empty() {
            write!(&mut result, "{i}: {kind:?}, got empty input\n").ok();
            continue;
        }

        let line_number = span.location_line();
        let line = std::str::from_utf8(span.get_line_beginning()).unwrap_or("<not utf8>");
        // remap characters that would render over multiple columns and
        // defeat the caret position
        let line: String = line
            .chars()
            .map(|c| match c {
                '\t' => '\u{2409}',
                '\r' => '\u{240d}',
                '\n' => '\u{240a}',
                _ => c,
            })
            .collect();
        let mut caret = " ".repeat(span.get_utf8_column().saturating_sub(1));
        caret.push('^');

        match kind {
            FailureKind::Char(expected) => {
                let found = span
                    .fragment()
                    .chars()
                    .next()
                    .map(|c| format!("found {c}"))
                    .unwrap_or_else(|| "got end of input".to_string());
                write!(
                    &mut result,
                    "{i}: at line {line_number}:\n{line}\n{caret}\nexpected '{expected}', {found}\n\n",
                )
            }
            FailureKind::Context(context) => {
                write!(
                    &mut result,
                    "{i}: at line {line_number}, in {context}:\n{line}\n{caret}\n\n",
                )
            }
            FailureKind::External(reason) => {
                write!(
                    &mut result,
                    "{i}: at line {line_number}, {reason}:\n{line}\n{caret}\n\n",
                )
            }
            FailureKind::Nom(nom_err) => {
                write!(
                    &mut result,
                    "{i}: at line {line_number}, in {nom_err:?}:\n{line}\n{caret}\n\n",
                )
            }
        }
        .ok();
    }
    result
}
