//! Charset registry. The codec tables themselves come from the
//! `charset`/`encoding_rs` crates; this module only maintains the
//! canonical-name cache and the process-wide default charset knobs.

use charset::Charset;
use std::sync::{Mutex, OnceLock};

pub const INITIAL_DEFAULT_CHARSET: &str = "ISO-8859-1";

fn name_cache() -> &'static Mutex<Vec<String>> {
    static CACHE: OnceLock<Mutex<Vec<String>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(vec![]))
}

/// Return the canonical (uppercased) form of a charset label, cached
/// process-wide so that repeated lookups share one allocation strategy.
pub fn cached_charset(label: &str) -> String {
    let mut cache = name_cache().lock().unwrap();
    for name in cache.iter() {
        if name.eq_ignore_ascii_case(label) {
            return name.clone();
        }
    }
    let canonical = label.to_ascii_uppercase();
    cache.push(canonical.clone());
    canonical
}

fn default_charset_cell() -> &'static Mutex<String> {
    static DEFAULT: OnceLock<Mutex<String>> = OnceLock::new();
    DEFAULT.get_or_init(|| Mutex::new(INITIAL_DEFAULT_CHARSET.to_string()))
}

pub fn default_charset() -> String {
    default_charset_cell().lock().unwrap().clone()
}

pub fn set_default_charset(label: &str) {
    *default_charset_cell().lock().unwrap() = cached_charset(label);
}

fn force_default_cell() -> &'static Mutex<bool> {
    static FORCE: OnceLock<Mutex<bool>> = OnceLock::new();
    FORCE.get_or_init(|| Mutex::new(false))
}

/// When set, the process default charset overrides any per-header
/// charset witness.
pub fn force_default_charset() -> bool {
    *force_default_cell().lock().unwrap()
}

pub fn set_force_default_charset(b: bool) {
    *force_default_cell().lock().unwrap() = b;
}

pub fn codec_for(label: &str) -> Option<Charset> {
    Charset::for_label_no_replacement(label.as_bytes())
}

/// Decode bytes using the named charset, falling back to the supplied
/// default (and then to latin1-ish lossy utf-8) when the label has no
/// codec. Returns the decoded text and the canonical name of the
/// charset actually used.
pub fn decode(bytes: &[u8], label: &str, fallback: &str) -> (String, String) {
    if let Some(charset) = codec_for(label) {
        let (decoded, _malformed) = charset.decode_without_bom_handling(bytes);
        return (decoded.to_string(), cached_charset(label));
    }
    tracing::warn!("unknown charset '{label}', substituting '{fallback}'");
    if let Some(charset) = codec_for(fallback) {
        let (decoded, _malformed) = charset.decode_without_bom_handling(bytes);
        return (decoded.to_string(), cached_charset(fallback));
    }
    (
        String::from_utf8_lossy(bytes).to_string(),
        cached_charset("UTF-8"),
    )
}

/// Encode text with the named charset, falling back to UTF-8 when the
/// label has no codec. Returns the bytes and the canonical name of the
/// charset actually used.
pub fn encode(s: &str, label: &str) -> (Vec<u8>, String) {
    if let Some(encoding) = encoding_rs::Encoding::for_label(label.as_bytes()) {
        let (bytes, _, _had_unmappable) = encoding.encode(s);
        return (bytes.into_owned(), cached_charset(label));
    }
    tracing::warn!("unknown charset '{label}', encoding as UTF-8");
    (s.as_bytes().to_vec(), cached_charset("UTF-8"))
}
