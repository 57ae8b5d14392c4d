/// Strips formatting from a sender id and drops the legacy mobile `1` that
/// Mexican numbers carry after the country code (`521...` becomes `52...`).
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();

    match digits.strip_prefix("521") {
        Some(rest) if !rest.is_empty() => format!("52{rest}"),
        _ => digits,
    }
}
