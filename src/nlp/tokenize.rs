//! Word tokenizer shared by the heuristic analyzer and vocabulary phrases

/// A token before any annotation. Offsets are character positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawToken {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric()
}

/// Split text into words and punctuation.
///
/// Words are runs of alphanumerics, joined across a single inner hyphen or
/// apostrophe ("half-elf", "D'Arcy"). A trailing possessive `'s` becomes its
/// own token. Every other non-space character is a one-char token.
pub fn tokenize(text: &str) -> Vec<RawToken> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if !is_word_char(c) {
            tokens.push(RawToken {
                text: c.to_string(),
                start: i,
                end: i + 1,
            });
            i += 1;
            continue;
        }

        let start = i;
        while i < chars.len() {
            if is_word_char(chars[i]) {
                i += 1;
                continue;
            }
            let joiner = matches!(chars[i], '-' | '\'' | '\u{2019}');
            let next_is_word = chars.get(i + 1).map(|&n| is_word_char(n)).unwrap_or(false);
            if !(joiner && next_is_word) {
                break;
            }
            // Possessive: stop before 's when it ends the word
            if chars[i] != '-' && is_possessive_suffix(&chars, i) {
                break;
            }
            i += 1;
        }
        tokens.push(RawToken {
            text: chars[start..i].iter().collect(),
            start,
            end: i,
        });

        if i < chars.len() && is_possessive_suffix(&chars, i) {
            tokens.push(RawToken {
                text: chars[i..i + 2].iter().collect(),
                start: i,
                end: i + 2,
            });
            i += 2;
        }
    }

    tokens
}

/// True when `chars[i..]` starts with an apostrophe + `s` that ends a word.
fn is_possessive_suffix(chars: &[char], i: usize) -> bool {
    matches!(chars.get(i), Some('\'') | Some('\u{2019}'))
        && matches!(chars.get(i + 1), Some('s') | Some('S'))
        && chars.get(i + 2).map(|&c| !is_word_char(c)).unwrap_or(true)
}

/// Lower-cased token texts, the key the vocabulary matcher compares on.
pub fn normalized_words(text: &str) -> Vec<String> {
    tokenize(text).into_iter().map(|t| t.text.to_lowercase()).collect()
}
