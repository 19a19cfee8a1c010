//! Header access on top of `mail-parser`.
//!
//! Field values (addresses, subject, dates) come from the parsed
//! [`HeaderValue`]s. The raw-header map shown in the metadata block keeps
//! each header's original text unless it carries RFC 2047 encoded words or
//! is an address list, in which case the decoded form is used.

use chrono::{DateTime, TimeZone, Utc};
use mail_parser::{Addr, Address, Header, HeaderValue, MessageParser};

use crate::model::email::{RawHeaders, Received};

/// The value of `header` exactly as written in `message`, unfolded onto one line.
pub fn raw_value(message: &[u8], header: &Header<'_>) -> String {
    let bytes = message
        .get(header.offset_start..header.offset_end)
        .unwrap_or_default();
    unfold(&decode_header_bytes(bytes))
}

/// Header text is usually ASCII or UTF-8; anything else is read as Windows-1252.
fn decode_header_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

fn unfold(value: &str) -> String {
    value
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Every header of a message keyed by lowercase name, repeats preserved.
pub fn raw_header_map(message: &[u8], headers: &[Header<'_>]) -> RawHeaders {
    headers
        .iter()
        .map(|h| (h.name.as_str().to_ascii_lowercase(), display_value(message, h)))
        .collect()
}

fn display_value(message: &[u8], header: &Header<'_>) -> String {
    let raw = raw_value(message, header);
    match &header.value {
        HeaderValue::Address(address) => {
            let formatted = format_address(address);
            if formatted.is_empty() {
                raw
            } else {
                formatted
            }
        }
        HeaderValue::Text(text) if raw.contains("=?") => text.to_string(),
        HeaderValue::TextList(list) if raw.contains("=?") => list.join(", "),
        _ => raw,
    }
}

fn format_address(address: &Address<'_>) -> String {
    match address {
        Address::List(list) => format_addrs(list),
        Address::Group(groups) => groups
            .iter()
            .map(|group| match group.name.as_deref() {
                Some(name) => format!("{name}: {};", format_addrs(&group.addresses)),
                None => format_addrs(&group.addresses),
            })
            .collect::<Vec<_>>()
            .join(", "),
    }
}

fn format_addrs(list: &[Addr<'_>]) -> String {
    list.iter()
        .filter_map(|addr| match (addr.name.as_deref(), addr.address.as_deref()) {
            (Some(name), Some(address)) => Some(format!("{} <{address}>", quote_name(name))),
            (None, Some(address)) => Some(address.to_string()),
            (Some(name), None) => Some(name.to_string()),
            (None, None) => None,
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Display names that would split or confuse an address list are quoted.
fn quote_name(name: &str) -> String {
    if name.contains([',', ';', '<', '>', '@', '"']) {
        format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        name.to_string()
    }
}

/// Bare mailbox addresses of an address header, groups flattened.
pub fn bare_addresses(address: Option<&Address<'_>>) -> Vec<String> {
    let addrs: Vec<&Addr<'_>> = match address {
        Some(Address::List(list)) => list.iter().collect(),
        Some(Address::Group(groups)) => groups.iter().flat_map(|g| g.addresses.iter()).collect(),
        None => Vec::new(),
    };
    addrs
        .into_iter()
        .filter_map(|addr| addr.address.as_deref())
        .map(String::from)
        .collect()
}

/// A `Received` hop. The timestamp follows the last `;` of the field.
pub fn received_hop(message: &[u8], header: &Header<'_>) -> Received {
    let src = raw_value(message, header);
    let date = src
        .rfind(';')
        .and_then(|pos| parse_date(&src[pos + 1..]));
    Received { src, date }
}

/// Parse an RFC 5322 date-time with `mail-parser`'s lenient date grammar.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let fake = format!("Date: {value}\r\n\r\n");
    let msg = MessageParser::default().parse(fake.as_bytes())?;
    msg.date().and_then(to_utc)
}

pub fn to_utc(date: &mail_parser::DateTime) -> Option<DateTime<Utc>> {
    if !date.is_valid() {
        return None;
    }
    Utc.timestamp_opt(date.to_timestamp(), 0).single()
}
