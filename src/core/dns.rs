//! Minimal DNS question decoding.
//!
//! Only the first question name is read, and compression pointers are not
//! followed: a pointer byte is taken as an ordinary label length.

/// Size of the fixed DNS message header.
pub const DNS_HEADER_LEN: usize = 12;

/// Extract the lowercased, dot-joined question name from a raw DNS message.
///
/// Returns `None` when the message is shorter than a header plus terminator
/// or when a label length runs past the end of the buffer.
pub fn extract_query_name(message: &[u8]) -> Option<String> {
    if message.len() <= DNS_HEADER_LEN {
        return None;
    }

    let mut name = String::new();
    let mut offset = DNS_HEADER_LEN;

    while offset < message.len() && message[offset] != 0 {
        let len = message[offset] as usize;
        offset += 1;
        let label = message.get(offset..offset + len)?;
        if !name.is_empty() {
            name.push('.');
        }
        name.push_str(&String::from_utf8_lossy(label));
        offset += len;
    }

    if name.is_empty() {
        return None;
    }
    Some(name.to_lowercase())
}

/// Reduce a query name to its trailing two labels.
pub fn base_domain(query_name: &str) -> &str {
    let mut dots = query_name.rmatch_indices('.').map(|(idx, _)| idx);
    match (dots.next(), dots.next()) {
        (Some(_), Some(second)) => &query_name[second + 1..],
        _ => query_name,
    }
}
