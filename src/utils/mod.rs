//! Small helpers shared across modules.

/// Mask a secret for log output, keeping only its first and last character.
///
/// Values of two characters or fewer are masked entirely.
pub fn obfuscate(s: Option<&str>) -> String {
    let Some(s) = s else {
        return "(no-value)".to_string();
    };
    let n = s.chars().count();
    if n <= 2 {
        return "*".repeat(n);
    }
    s.chars()
        .enumerate()
        .map(|(i, c)| if i == 0 || i == n - 1 { c } else { '*' })
        .collect()
}
