/// Keeps the first three characters of the local part and the whole domain.
pub fn mask_email(email: &str) -> String {
    if email.is_empty() {
        return String::new();
    }
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return "***@***.***".to_string();
    }
    let visible: String = parts[0].chars().take(3).collect();
    format!("{}***@{}", visible, parts[1])
}

/// Keeps the first and last four characters of identifiers longer than 8.
pub fn mask_id(id: &str) -> String {
    if id.is_empty() {
        return String::new();
    }
    let chars: Vec<char> = id.chars().collect();
    if chars.len() <= 8 {
        return "********".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}****{}", head, tail)
}
