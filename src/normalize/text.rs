//! Turkish-aware casing, collation and search folding.
//!
//! Turkish keeps two distinct i letters: dotted `i`/`İ` and dotless `ı`/`I`.
//! The default Unicode case mappings pair `i` with `I`, so every case
//! conversion here special-cases those four letters.

use std::cmp::Ordering;

/// Turkish alphabet with q, w, x at their Latin positions
const ALPHABET: &str = "abcçdefgğhıijklmnoöpqrsştuüvwxyz";

const CLASS_SPACE: u32 = 1 << 24;
const CLASS_PUNCT: u32 = 2 << 24;
const CLASS_DIGIT: u32 = 3 << 24;
const CLASS_LETTER: u32 = 4 << 24;
const CLASS_OTHER: u32 = 5 << 24;

fn push_lower(c: char, out: &mut String) {
    match c {
        'I' => out.push('ı'),
        'İ' => out.push('i'),
        _ => out.extend(c.to_lowercase()),
    }
}

fn push_upper(c: char, out: &mut String) {
    match c {
        'i' => out.push('İ'),
        'ı' => out.push('I'),
        _ => out.extend(c.to_uppercase()),
    }
}

/// Single-char Turkish lowercase (first char of the mapping)
pub fn lower_char(c: char) -> char {
    match c {
        'I' => 'ı',
        'İ' => 'i',
        _ => c.to_lowercase().next().unwrap_or(c),
    }
}

pub fn turkish_lowercase(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        push_lower(c, &mut out);
    }
    out
}

pub fn turkish_uppercase(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        push_upper(c, &mut out);
    }
    out
}

/// Trim, then uppercase the first character and lowercase the rest using
/// Turkish rules. Blank input yields `None`.
///
/// `"üsküdar"` becomes `"Üsküdar"`, `"ısparta"` becomes `"Isparta"`,
/// `"istanbul"` becomes `"İstanbul"`.
pub fn title_case(s: &str) -> Option<String> {
    let trimmed = s.trim();
    let mut chars = trimmed.chars();
    let first = chars.next()?;

    let mut out = String::with_capacity(trimmed.len());
    push_upper(first, &mut out);
    for c in chars {
        push_lower(c, &mut out);
    }
    Some(out)
}

/// Lowercase and strip Turkish diacritics for accent-insensitive search.
///
/// `"Çamlıca"` folds to `"camlica"`.
pub fn fold_search_text(s: &str) -> String {
    turkish_lowercase(s)
        .chars()
        .map(|c| match c {
            'ı' => 'i',
            'ğ' => 'g',
            'ü' => 'u',
            'ş' => 's',
            'ö' => 'o',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

/// Base letter for accented Latin letters that are not Turkish letters.
fn strip_accent(c: char) -> Option<char> {
    let base = match c {
        'â' | 'à' | 'á' | 'ä' | 'ã' | 'å' => 'a',
        'ê' | 'é' | 'è' | 'ë' => 'e',
        'î' | 'í' | 'ì' | 'ï' => 'i',
        'ô' | 'ó' | 'ò' | 'õ' => 'o',
        'û' | 'ú' | 'ù' => 'u',
        'ñ' => 'n',
        _ => return None,
    };
    Some(base)
}

fn is_combining_mark(c: char) -> bool {
    ('\u{0300}'..='\u{036F}').contains(&c)
}

/// Multi-level sort key approximating Turkish collation.
///
/// Primary: letters by Turkish alphabet, case and accents ignored;
/// whitespace < punctuation < digits < letters. Secondary: accents.
/// Tertiary: lowercase before uppercase.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CollationKey {
    primary: Vec<u32>,
    secondary: Vec<u8>,
    tertiary: Vec<u8>,
}

impl CollationKey {
    pub fn new(s: &str) -> Self {
        let mut primary = Vec::with_capacity(s.len());
        let mut secondary: Vec<u8> = Vec::with_capacity(s.len());
        let mut tertiary = Vec::with_capacity(s.len());

        for c in s.chars() {
            // A decomposed accent belongs to the preceding character's slot
            if is_combining_mark(c) {
                if let Some(last) = secondary.last_mut() {
                    *last = (*last).max(2);
                }
                continue;
            }

            let lower = lower_char(c);
            let (base, accent) = match strip_accent(lower) {
                Some(base) => (base, 1),
                None => (lower, 0),
            };

            let weight = if base.is_whitespace() {
                CLASS_SPACE
            } else if let Some(rank) = ALPHABET.chars().position(|a| a == base) {
                CLASS_LETTER + rank as u32
            } else if let Some(digit) = base.to_digit(10) {
                CLASS_DIGIT + digit
            } else if base.is_alphabetic() {
                CLASS_OTHER + base as u32
            } else {
                CLASS_PUNCT + base as u32
            };

            primary.push(weight);
            secondary.push(accent);
            tertiary.push(u8::from(c.is_uppercase()));
        }

        Self {
            primary,
            secondary,
            tertiary,
        }
    }
}

/// Compare two strings in Turkish collation order
pub fn turkish_cmp(a: &str, b: &str) -> Ordering {
    CollationKey::new(a).cmp(&CollationKey::new(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_case_turkish_letters() {
        assert_eq!(title_case("üsküdar").as_deref(), Some("Üsküdar"));
        // dotless ı uppercases to I
        assert_eq!(title_case("ısparta").as_deref(), Some("Isparta"));
        // dotted i uppercases to İ
        assert_eq!(title_case("istanbul").as_deref(), Some("İstanbul"));
        // I lowercases to dotless ı
        assert_eq!(title_case("KADIKÖY").as_deref(), Some("Kadıköy"));
        assert_eq!(title_case("  şişli ").as_deref(), Some("Şişli"));
        assert_eq!(title_case("İSTİNYE").as_deref(), Some("İstinye"));
    }

    #[test]
    fn test_title_case_blank_is_none() {
        assert_eq!(title_case(""), None);
        assert_eq!(title_case("   \t"), None);
    }

    #[test]
    fn test_case_conversion_roundtrip_of_i_pairs() {
        assert_eq!(turkish_uppercase("iı"), "İI");
        assert_eq!(turkish_lowercase("İI"), "iı");
    }

    #[test]
    fn test_fold_search_text() {
        assert_eq!(fold_search_text("Çamlıca Camii"), "camlica camii");
        assert_eq!(fold_search_text("ŞİŞLİ"), "sisli");
        assert_eq!(fold_search_text("Ağaç Öğütücü"), "agac ogutucu");
    }

    #[test]
    fn test_turkish_letters_sort_next_to_base_letters() {
        let mut names = vec!["Dolmabahçe", "Çınarlı", "Cihangir", "Zal Mahmud", "Şemsi"];
        names.sort_by(|a, b| turkish_cmp(a, b));
        assert_eq!(
            names,
            vec!["Cihangir", "Çınarlı", "Dolmabahçe", "Şemsi", "Zal Mahmud"]
        );
    }

    #[test]
    fn test_dotless_i_before_dotted_i() {
        assert_eq!(turkish_cmp("Irmak", "İmrahor"), Ordering::Less);
        assert_eq!(turkish_cmp("ıhlamur", "ihlas"), Ordering::Less);
        // Turkish uppercase I is dotless ı, so it sorts before i even though
        // it would tie with i in most locales
        assert_eq!(turkish_cmp("Ihlamur", "ihlas"), Ordering::Less);
    }

    #[test]
    fn test_case_and_accent_are_secondary() {
        assert_eq!(turkish_cmp("cami", "Cami"), Ordering::Less);
        assert_eq!(turkish_cmp("Cami", "camii"), Ordering::Less);
        assert_eq!(turkish_cmp("Hala", "Hâlâ"), Ordering::Less);
        assert_eq!(turkish_cmp("Hâlâ", "Halil"), Ordering::Less);
    }

    #[test]
    fn test_decomposed_accents_stay_aligned() {
        let key = CollationKey::new("Ha\u{0302}la\u{0302}");
        assert_eq!(key.primary.len(), 4);
        assert_eq!(key.secondary, vec![0, 2, 0, 2]);
        assert_eq!(key.tertiary.len(), 4);

        // both letters accented sorts after only the first accented
        assert_eq!(turkish_cmp("a\u{0301}â", "âa"), Ordering::Greater);
        assert_eq!(turkish_cmp("Ha\u{0302}la", "Hala"), Ordering::Greater);
        // a leading mark has no character to attach to
        assert_eq!(CollationKey::new("\u{0301}a"), CollationKey::new("a"));
    }

    #[test]
    fn test_digits_and_spaces_before_letters() {
        assert_eq!(turkish_cmp("1. Cami", "Abdi"), Ordering::Less);
        assert_eq!(turkish_cmp("Ali Paşa", "Alibey"), Ordering::Less);
    }
}
