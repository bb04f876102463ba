/// Fold Romanian diacritics to their base Latin letters.
///
/// Both the comma-below (ș, ț) and the legacy cedilla (ş, ţ) forms are folded,
/// along with the acute/umlaut vowels common in Hungarian place names of
/// Transylvania. Combining marks (decomposed input) and zero-width characters
/// are dropped.
pub fn fold_diacritics(input: &str) -> String {
    input.chars().filter_map(fold_char).collect()
}

fn fold_char(c: char) -> Option<char> {
    let folded = match c {
        'ă' | 'â' | 'á' | 'à' | 'ä' => 'a',
        'Ă' | 'Â' | 'Á' | 'À' | 'Ä' => 'A',
        'î' | 'í' => 'i',
        'Î' | 'Í' => 'I',
        'ș' | 'ş' => 's',
        'Ș' | 'Ş' => 'S',
        'ț' | 'ţ' => 't',
        'Ț' | 'Ţ' => 'T',
        'é' | 'ë' => 'e',
        'É' | 'Ë' => 'E',
        'ó' | 'ö' | 'ő' => 'o',
        'Ó' | 'Ö' | 'Ő' => 'O',
        'ú' | 'ü' | 'ű' => 'u',
        'Ú' | 'Ü' | 'Ű' => 'U',
        '\u{0300}'..='\u{036F}' => return None,
        '\u{200B}'..='\u{200D}' | '\u{2060}' | '\u{FEFF}' => return None,
        other => other,
    };
    Some(folded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_comma_below_with_zero_width_space() {
        assert_eq!(fold_diacritics("Ș\u{200B}tefan cel Mare"), "Stefan cel Mare");
    }

    #[test]
    fn folds_circumflex() {
        assert_eq!(fold_diacritics("Bârlad"), "Barlad");
    }

    #[test]
    fn folds_cedilla_and_uppercase() {
        assert_eq!(fold_diacritics("Ţara Bârsei, ŞTEFĂNEŞTI"), "Tara Barsei, STEFANESTI");
        assert_eq!(fold_diacritics("Târgu Mureș"), "Targu Mures");
        assert_eq!(fold_diacritics("Iași, Timișoara, Constanța"), "Iasi, Timisoara, Constanta");
    }

    #[test]
    fn strips_decomposed_marks() {
        // "s" + combining comma below, "a" + combining breve
        assert_eq!(fold_diacritics("s\u{0326}a\u{0306}"), "sa");
    }

    #[test]
    fn plain_text_is_unchanged() {
        assert_eq!(fold_diacritics("Sala Sporturilor 2"), "Sala Sporturilor 2");
        assert_eq!(fold_diacritics(""), "");
    }
}
