//! Show-name normalization.

/// Clean up a show name taken from a filename or folder.
///
/// Dots and underscores become spaces, whitespace runs collapse to one
/// space, and leading/trailing dashes and spaces are removed.
///
/// ```
/// use tvshelf_parser::normalize_show_name;
///
/// assert_eq!(normalize_show_name("Show.Name_Here "), "Show Name Here");
/// assert_eq!(normalize_show_name(" - Firefly -"), "Firefly");
/// ```
pub fn normalize_show_name(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| if c == '.' || c == '_' { ' ' } else { c })
        .collect();
    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_matches(|c: char| c == '-' || c.is_whitespace())
        .to_string()
}

/// Key used to compare show names for equality.
///
/// Lowercase, with everything but letters and digits removed, so spacing
/// and punctuation differences do not matter.
///
/// ```
/// use tvshelf_parser::show_name_match_key;
///
/// assert_eq!(show_name_match_key("Breaking Bad"), show_name_match_key("breaking-bad!!"));
/// ```
pub fn show_name_match_key(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_separators() {
        assert_eq!(normalize_show_name("The.Office.US"), "The Office US");
        assert_eq!(normalize_show_name("Doctor_Who__2005"), "Doctor Who 2005");
        assert_eq!(normalize_show_name("  Lots   of\tspace  "), "Lots of space");
    }

    #[test]
    fn test_normalize_dashes() {
        assert_eq!(normalize_show_name("Firefly -"), "Firefly");
        assert_eq!(normalize_show_name("--Firefly--"), "Firefly");
        assert_eq!(normalize_show_name("Spider-Man"), "Spider-Man");
        assert_eq!(normalize_show_name(" - "), "");
    }

    #[test]
    fn test_match_key() {
        assert_eq!(show_name_match_key("Marvel's Agents of S.H.I.E.L.D."), "marvelsagentsofshield");
        assert_eq!(show_name_match_key("Breaking Bad"), "breakingbad");
        assert_eq!(show_name_match_key("breaking-bad!!"), "breakingbad");
        assert_eq!(show_name_match_key("Pokémon"), "pokémon");
        assert_eq!(show_name_match_key("!!!"), "");
    }
}
