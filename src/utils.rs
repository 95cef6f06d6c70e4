/// Removes every occurrence of each pattern, applying the patterns in order
pub fn strip_all(full_str: &str, patterns: &[&str]) -> String {
    patterns
        .iter()
        .fold(full_str.to_string(), |acc, pattern| acc.replace(pattern, ""))
}
