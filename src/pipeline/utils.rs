use std::collections::BTreeSet;

/// String folding and similarity utilities for event matching
pub struct StringUtils;

impl StringUtils {
    /// Lowercase, strip diacritics and collapse everything that is not a
    /// letter or digit into single spaces.
    ///
    /// `"Fórmula 1 – GP São Paulo"` becomes `"formula 1 gp sao paulo"`.
    pub fn fold(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut pending_space = false;
        for ch in text.chars() {
            let mapped = match ch {
                '&' => Some("and"),
                _ => None,
            };
            if let Some(word) = mapped {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(word);
                pending_space = true;
                continue;
            }
            for lower in ch.to_lowercase() {
                let base = Self::strip_diacritic(lower);
                if base.is_alphanumeric() {
                    if pending_space && !out.is_empty() {
                        out.push(' ');
                    }
                    pending_space = false;
                    out.push(base);
                } else {
                    pending_space = true;
                }
            }
        }
        out
    }

    /// Lowercase and strip diacritics, keeping punctuation in place.
    ///
    /// Used where separators carry meaning (`10:30`, `02/08`, `10h-12h`).
    pub fn strip_accents(text: &str) -> String {
        text.chars()
            .flat_map(char::to_lowercase)
            .map(Self::strip_diacritic)
            .collect()
    }

    /// Map a lowercase latin letter with a diacritic to its base letter
    fn strip_diacritic(ch: char) -> char {
        match ch {
            'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' | 'ā' => 'a',
            'é' | 'è' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' => 'e',
            'í' | 'ì' | 'î' | 'ï' | 'ī' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' => 'o',
            'ú' | 'ù' | 'û' | 'ü' | 'ū' => 'u',
            'ç' | 'ć' | 'č' => 'c',
            'ñ' | 'ń' => 'n',
            'ý' | 'ÿ' => 'y',
            'š' | 'ś' => 's',
            'ž' | 'ź' | 'ż' => 'z',
            'ł' => 'l',
            'ğ' => 'g',
            'ř' => 'r',
            other => other,
        }
    }

    /// Collapse runs of whitespace and trim
    pub fn collapse_whitespace(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Case- and diacritic-insensitive fuzzy ratio in `[0, 1]`.
    ///
    /// The score is the better of a plain edit-distance ratio and the same
    /// ratio over the sorted, de-duplicated token sets, so word order
    /// differences ("GP Brazil F1" vs "F1 GP Brazil") still score high.
    pub fn similarity(a: &str, b: &str) -> f64 {
        let fa = Self::fold(a);
        let fb = Self::fold(b);
        Self::folded_similarity(&fa, &fb)
    }

    /// Same as [`StringUtils::similarity`] for inputs that are already folded
    pub fn folded_similarity(fa: &str, fb: &str) -> f64 {
        if fa == fb {
            return 1.0;
        }
        if fa.is_empty() || fb.is_empty() {
            return 0.0;
        }
        let plain = Self::ratio(fa, fb);
        let ta = Self::token_set(fa);
        let tb = Self::token_set(fb);
        plain.max(Self::ratio(&ta, &tb))
    }

    fn token_set(folded: &str) -> String {
        folded
            .split_whitespace()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Edit-distance ratio: `1 - distance / max_len`
    pub fn ratio(s1: &str, s2: &str) -> f64 {
        if s1 == s2 {
            return 1.0;
        }

        let len1 = s1.chars().count();
        let len2 = s2.chars().count();

        if len1 == 0 || len2 == 0 {
            return 0.0;
        }

        let max_len = len1.max(len2);
        let distance = Self::levenshtein_distance(s1, s2);

        1.0 - (distance as f64 / max_len as f64)
    }

    /// Levenshtein distance between two strings, two rows at a time
    pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
        let chars1: Vec<char> = s1.chars().collect();
        let chars2: Vec<char> = s2.chars().collect();

        let mut prev: Vec<usize> = (0..=chars2.len()).collect();
        let mut curr = vec![0; chars2.len() + 1];

        for (i, c1) in chars1.iter().enumerate() {
            curr[0] = i + 1;
            for (j, c2) in chars2.iter().enumerate() {
                let cost = if c1 == c2 { 0 } else { 1 };
                curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
            }
            std::mem::swap(&mut prev, &mut curr);
        }

        prev[chars2.len()]
    }
}
