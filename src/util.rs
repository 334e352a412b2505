//! Small utility helpers used across modules.

/// Keyboard shortcut for the option at `index` (0-based): "1", "2", ...
pub fn number_shortcut(index: usize) -> String {
  (index + 1).to_string()
}

/// Letter shortcut for the right column of a matching board: "A", "B", ...
/// Past "Z" it continues as "AA", "AB", ... so labels stay unique.
pub fn letter_shortcut(index: usize) -> String {
  let mut n = index;
  let mut out = Vec::new();
  loop {
    out.push(b'A' + (n % 26) as u8);
    if n < 26 { break; }
    n = n / 26 - 1;
  }
  out.reverse();
  String::from_utf8_lossy(&out).into_owned()
}

/// Log-safe truncation for large strings.
/// Cuts on a char boundary so Batak script never splits mid-codepoint.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max { return s.to_string(); }
  let mut end = max;
  while !s.is_char_boundary(end) { end -= 1; }
  format!("{}… ({} bytes total)", &s[..end], s.len())
}
