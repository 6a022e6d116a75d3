//! Heuristic NLP engine: closed-class tables, a small verb lexicon, and
//! positional dependency guesses
//!
//! Good enough to drive the classifier on short campaign notes without a
//! statistical model. Exploits structural signals (capitalization, sentence
//! position, adjacent prepositions and verbs) rather than large lexicons.

use super::document::{dep, generic, Document, EntitySpan, NlpError, PartOfSpeech, Token};
use super::tokenize::{tokenize, RawToken};
use super::NlpEngine;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

const DETERMINERS: &[&str] = &[
    "a", "an", "the", "this", "that", "these", "those", "some", "every", "each", "any", "no",
    "his", "her", "its", "their", "our", "my", "your",
];

const ADPOSITIONS: &[&str] = &[
    "to", "in", "into", "at", "from", "near", "on", "onto", "of", "with", "by", "for",
    "through", "toward", "towards", "across", "under", "over", "inside", "within", "beyond",
    "behind", "beneath", "above", "below", "around", "against", "upon", "off", "out", "after",
    "before", "during", "past", "along", "among", "between", "without",
];

const PRONOUNS: &[&str] = &[
    "i", "me", "you", "he", "him", "she", "it", "we", "us", "they", "them", "who", "whom",
    "what", "which", "himself", "herself", "itself", "themselves", "ourselves", "someone",
    "something", "everyone", "everything", "nothing",
];

const CONJUNCTIONS: &[&str] = &["and", "or", "but", "nor", "yet", "so"];

const ADVERBS: &[&str] = &[
    "then", "later", "soon", "now", "also", "again", "finally", "quickly", "slowly", "never",
    "always", "once", "still", "already", "just", "not", "very", "here", "there", "eventually",
    "suddenly", "meanwhile", "afterwards", "together",
];

const AUXILIARIES: &[&str] = &[
    "is", "am", "are", "was", "were", "be", "been", "being", "has", "have", "had", "do", "does",
    "did", "will", "would", "can", "could", "shall", "should", "may", "might", "must",
];

/// Sentence-initial words that are never names.
const SENTENCE_STARTERS: &[&str] = &[
    "today", "yesterday", "tomorrow", "tonight", "when", "where", "why", "how", "if",
    "because", "while", "although", "please", "note", "session", "later",
];

const HONORIFICS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "lord", "lady", "sir", "dame", "king", "queen", "prince",
    "princess", "captain", "master", "mistress", "father", "mother", "brother", "sister",
];

const ORG_SUFFIXES: &[&str] = &[
    "guild", "order", "company", "church", "temple", "council", "brotherhood", "league",
    "syndicate", "cult", "consortium", "academy",
];

/// Base forms the lemmatizer validates candidates against.
const VERB_LEXICON: &[&str] = &[
    // classifier verbs
    "cast", "prepare", "learn", "invoke", "carry", "use", "draw", "equip", "wield", "hold",
    "swing", "attack", "fight", "encounter", "slay", "travel", "visit", "enter", "arrive",
    "leave",
    // common narrative verbs
    "go", "come", "see", "meet", "find", "give", "take", "tell", "speak", "say", "ask", "kill",
    "defeat", "help", "steal", "buy", "sell", "explore", "discover", "rescue", "return",
    "flee", "hide", "open", "close", "follow", "guard", "seek", "summon", "heal", "bless",
    "curse", "betray", "hire", "pay", "trade", "craft", "forge", "read", "write", "search",
    "climb", "cross", "reach", "escape", "camp", "rest", "sleep", "wake", "fly", "ride",
    "sail", "walk", "run", "move", "bring", "send", "keep", "lose", "win", "call", "sneak",
    "throw", "shoot", "strike", "hit", "block", "dodge", "grab", "loot", "drink", "eat",
    "wear", "break", "build", "destroy", "burn", "freeze", "charm", "banish", "resurrect",
    "recover", "protect", "defend", "enchant", "identify", "study", "pray", "befriend",
    "negotiate", "interrogate", "capture", "track", "hunt", "ambush", "notice", "hear",
    "watch", "warn", "promise", "agree", "refuse", "decide", "try", "want", "need", "know",
    "think", "believe", "remember", "forget", "catch", "lead", "fall", "stand", "begin",
    "become", "make", "get", "kidnap", "sneak", "journey", "depart", "land", "board",
];

const IRREGULAR_VERBS: &[(&str, &str)] = &[
    ("drew", "draw"), ("drawn", "draw"), ("held", "hold"), ("fought", "fight"),
    ("slew", "slay"), ("slain", "slay"), ("left", "leave"), ("swung", "swing"),
    ("learnt", "learn"), ("went", "go"), ("gone", "go"), ("came", "come"), ("saw", "see"),
    ("seen", "see"), ("met", "meet"), ("found", "find"), ("gave", "give"), ("given", "give"),
    ("took", "take"), ("taken", "take"), ("told", "tell"), ("spoke", "speak"),
    ("spoken", "speak"), ("said", "say"), ("stole", "steal"), ("stolen", "steal"),
    ("bought", "buy"), ("sold", "sell"), ("fled", "flee"), ("hid", "hide"),
    ("hidden", "hide"), ("sought", "seek"), ("brought", "bring"), ("sent", "send"),
    ("kept", "keep"), ("lost", "lose"), ("won", "win"), ("threw", "throw"),
    ("thrown", "throw"), ("shot", "shoot"), ("struck", "strike"), ("drank", "drink"),
    ("drunk", "drink"), ("ate", "eat"), ("eaten", "eat"), ("wore", "wear"), ("worn", "wear"),
    ("broke", "break"), ("broken", "break"), ("built", "build"), ("burnt", "burn"),
    ("froze", "freeze"), ("frozen", "freeze"), ("flew", "fly"), ("flown", "fly"),
    ("rode", "ride"), ("ridden", "ride"), ("ran", "run"), ("wrote", "write"),
    ("written", "write"), ("slept", "sleep"), ("woke", "wake"), ("paid", "pay"),
    ("knew", "know"), ("known", "know"), ("thought", "think"), ("heard", "hear"),
    ("caught", "catch"), ("led", "lead"), ("fell", "fall"), ("fallen", "fall"),
    ("stood", "stand"), ("began", "begin"), ("begun", "begin"), ("became", "become"),
    ("made", "make"), ("got", "get"), ("gotten", "get"),
];

struct Lexicon {
    verbs: HashSet<&'static str>,
    irregular: HashMap<&'static str, &'static str>,
}

fn lexicon() -> &'static Lexicon {
    static LEXICON: OnceLock<Lexicon> = OnceLock::new();
    LEXICON.get_or_init(|| Lexicon {
        verbs: VERB_LEXICON.iter().copied().collect(),
        irregular: IRREGULAR_VERBS.iter().copied().collect(),
    })
}

fn undouble(stem: &str) -> Option<&str> {
    let bytes = stem.as_bytes();
    let n = bytes.len();
    if n >= 3 && bytes[n - 1] == bytes[n - 2] && bytes[n - 1].is_ascii_alphabetic() {
        Some(&stem[..n - 1])
    } else {
        None
    }
}

/// Base form of a verb, if `word` (lower-cased) inflects a lexicon verb.
pub fn verb_lemma(word: &str) -> Option<String> {
    let lex = lexicon();
    if let Some(base) = lex.irregular.get(word) {
        return Some((*base).to_string());
    }
    if lex.verbs.contains(word) {
        return Some(word.to_string());
    }

    let mut candidates: Vec<String> = Vec::new();
    if let Some(stem) = word.strip_suffix("ies").or_else(|| word.strip_suffix("ied")) {
        candidates.push(format!("{}y", stem));
    }
    if let Some(stem) = word.strip_suffix("ing") {
        candidates.push(stem.to_string());
        candidates.push(format!("{}e", stem));
        if let Some(single) = undouble(stem) {
            candidates.push(single.to_string());
        }
    }
    if let Some(stem) = word.strip_suffix("ed") {
        candidates.push(stem.to_string());
        if let Some(single) = undouble(stem) {
            candidates.push(single.to_string());
        }
    }
    if let Some(stem) = word.strip_suffix('d') {
        candidates.push(stem.to_string());
    }
    if let Some(stem) = word.strip_suffix("es") {
        candidates.push(stem.to_string());
    }
    if let Some(stem) = word.strip_suffix('s') {
        candidates.push(stem.to_string());
    }

    candidates.into_iter().find(|c| lex.verbs.contains(c.as_str()))
}

fn singular(word: &str) -> String {
    if word.len() > 4 {
        if let Some(stem) = word.strip_suffix("ies") {
            return format!("{}y", stem);
        }
    }
    if word.len() > 3 && word.ends_with('s') && !word.ends_with("ss") {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

fn is_capitalized(word: &str) -> bool {
    word.chars().next().map(|c| c.is_uppercase()).unwrap_or(false)
}

/// Heuristic tokenizer, tagger, parser, and recognizer.
#[derive(Debug, Clone, Default)]
pub struct HeuristicAnalyzer;

impl HeuristicAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Indices where each sentence starts, plus the end sentinel.
    fn sentence_bounds(raw: &[RawToken]) -> Vec<usize> {
        let mut bounds = vec![0];
        for (i, token) in raw.iter().enumerate() {
            if !matches!(token.text.as_str(), "." | "!" | "?") || i + 1 >= raw.len() {
                continue;
            }
            // "Dr. Vex" does not end a sentence
            let after_honorific =
                i > 0 && HONORIFICS.contains(&raw[i - 1].text.to_lowercase().as_str());
            if !after_honorific {
                bounds.push(i + 1);
            }
        }
        bounds.push(raw.len());
        bounds.dedup();
        bounds
    }

    fn tag(word: &str, sentence_initial: bool) -> (PartOfSpeech, String) {
        let lower = word.to_lowercase();

        if lower == "'s" || lower == "\u{2019}s" {
            return (PartOfSpeech::Part, lower);
        }
        if !word.chars().next().map(|c| c.is_alphanumeric()).unwrap_or(false) {
            return (PartOfSpeech::Punct, word.to_string());
        }
        if word.chars().all(|c| c.is_ascii_digit()) {
            return (PartOfSpeech::Num, lower);
        }
        if DETERMINERS.contains(&lower.as_str()) {
            return (PartOfSpeech::Det, lower);
        }
        if ADPOSITIONS.contains(&lower.as_str()) {
            return (PartOfSpeech::Adp, lower);
        }
        if PRONOUNS.contains(&lower.as_str()) {
            return (PartOfSpeech::Pron, lower);
        }
        if CONJUNCTIONS.contains(&lower.as_str()) {
            return (PartOfSpeech::Cconj, lower);
        }
        if ADVERBS.contains(&lower.as_str()) {
            return (PartOfSpeech::Adv, lower);
        }
        if AUXILIARIES.contains(&lower.as_str()) {
            return (PartOfSpeech::Aux, lower);
        }

        let verb = verb_lemma(&lower);
        if is_capitalized(word) {
            let imperative = sentence_initial && verb.is_some();
            if !imperative && !(sentence_initial && SENTENCE_STARTERS.contains(&lower.as_str())) {
                return (PartOfSpeech::Propn, word.to_string());
            }
        }
        if let Some(lemma) = verb {
            return (PartOfSpeech::Verb, lemma);
        }
        if lower.len() > 4 && lower.ends_with("ed") {
            let stem = &lower[..lower.len() - 2];
            return (PartOfSpeech::Verb, stem.to_string());
        }
        (PartOfSpeech::Noun, singular(&lower))
    }

    /// Assign heads and dependency labels within one sentence `[start, end)`.
    fn parse_sentence(tokens: &mut [Token], start: usize, end: usize) {
        let verbs: Vec<usize> = (start..end)
            .filter(|&i| tokens[i].pos == PartOfSpeech::Verb)
            .collect();
        let root_verb = verbs.first().copied();

        for &v in &verbs {
            if Some(v) == root_verb {
                tokens[v].head = v;
                tokens[v].dep = dep::ROOT.to_string();
            } else if let Some(root) = root_verb {
                tokens[v].head = root;
                tokens[v].dep = dep::CONJ.to_string();
            }
        }

        // Noun chunks: runs of determiners, numerals, and nominals
        let mut chunks: Vec<(usize, usize, usize)> = Vec::new(); // (start, end, root)
        let mut i = start;
        while i < end {
            let in_chunk = |pos: PartOfSpeech| {
                matches!(pos, PartOfSpeech::Det | PartOfSpeech::Num | PartOfSpeech::Adj)
                    || pos.is_nominal()
            };
            if !in_chunk(tokens[i].pos) {
                i += 1;
                continue;
            }
            let chunk_start = i;
            while i < end && in_chunk(tokens[i].pos) {
                i += 1;
            }
            if let Some(root) = (chunk_start..i).rev().find(|&j| tokens[j].pos.is_nominal()) {
                chunks.push((chunk_start, i, root));
            }
        }

        for &(chunk_start, chunk_end, root) in &chunks {
            for j in chunk_start..chunk_end {
                if j == root {
                    continue;
                }
                tokens[j].head = root;
                tokens[j].dep = match tokens[j].pos {
                    PartOfSpeech::Det => dep::DET,
                    PartOfSpeech::Adj => dep::AMOD,
                    PartOfSpeech::Num => dep::DEP,
                    _ => dep::COMPOUND,
                }
                .to_string();
            }
        }

        // Adpositions attach to the preceding noun for "of", else the nearest verb
        for j in start..end {
            if tokens[j].pos != PartOfSpeech::Adp {
                continue;
            }
            let prev_chunk_root = chunks.iter().find(|c| c.1 == j).map(|c| c.2);
            let prev_verb = verbs.iter().rev().find(|&&v| v < j).copied();
            let head = if tokens[j].lemma == "of" {
                prev_chunk_root.or(prev_verb)
            } else {
                prev_verb.or(prev_chunk_root)
            };
            tokens[j].dep = dep::PREP.to_string();
            tokens[j].head = head.unwrap_or(j);
        }

        let mut previous_role: Option<(String, usize)> = None;
        for (n, &(chunk_start, chunk_end, root)) in chunks.iter().enumerate() {
            let prev = (chunk_start > start).then(|| chunk_start - 1);
            let next = (chunk_end < end).then_some(chunk_end);

            let next_verb = (chunk_end..end)
                .take_while(|&k| {
                    matches!(
                        tokens[k].pos,
                        PartOfSpeech::Adv | PartOfSpeech::Aux | PartOfSpeech::Verb
                    )
                })
                .find(|&k| tokens[k].pos == PartOfSpeech::Verb);
            let next_aux = next.filter(|&k| tokens[k].pos == PartOfSpeech::Aux);

            let role: Option<(String, usize)> = match (prev.map(|p| tokens[p].pos), next) {
                (_, Some(k)) if tokens[k].pos == PartOfSpeech::Part => {
                    tokens[k].head = root;
                    tokens[k].dep = dep::CASE.to_string();
                    chunks
                        .get(n + 1)
                        .filter(|c| c.0 == k + 1)
                        .map(|c| (dep::POSS.to_string(), c.2))
                }
                (Some(PartOfSpeech::Adp), _) => prev.map(|p| (dep::POBJ.to_string(), p)),
                (Some(PartOfSpeech::Verb), _) => prev.map(|p| (dep::DOBJ.to_string(), p)),
                (Some(PartOfSpeech::Aux), _) => prev.map(|p| (dep::ATTR.to_string(), p)),
                (Some(PartOfSpeech::Cconj), _) if previous_role.is_some() => previous_role.clone(),
                _ => next_verb
                    .or(next_aux)
                    .map(|v| (dep::NSUBJ.to_string(), v)),
            };

            match role {
                Some((label, head)) => {
                    tokens[root].dep = label.clone();
                    tokens[root].head = head;
                    previous_role = Some((label, head));
                }
                None => {
                    tokens[root].head = root_verb.unwrap_or(root);
                    let label = if root_verb.is_some() { dep::DEP } else { dep::ROOT };
                    tokens[root].dep = label.to_string();
                    previous_role = None;
                }
            }
        }

        for j in start..end {
            let label = match tokens[j].pos {
                PartOfSpeech::Punct => dep::PUNCT,
                PartOfSpeech::Cconj => "cc",
                PartOfSpeech::Adv => "advmod",
                PartOfSpeech::Aux => "aux",
                PartOfSpeech::Pron => dep::DEP,
                _ => continue,
            };
            tokens[j].dep = label.to_string();
            tokens[j].head = match tokens[j].pos {
                PartOfSpeech::Aux => verbs
                    .iter()
                    .find(|&&v| v > j)
                    .copied()
                    .or(root_verb)
                    .unwrap_or(j),
                _ => root_verb.unwrap_or(j),
            };
        }
    }

    /// Recognize generic entities within one sentence.
    fn recognize(tokens: &[Token], start: usize, end: usize, entities: &mut Vec<EntitySpan>) {
        let mut i = start;
        while i < end {
            if tokens[i].pos == PartOfSpeech::Num {
                entities.push(EntitySpan {
                    start: i,
                    end: i + 1,
                    label: generic::CARDINAL.to_string(),
                });
                i += 1;
                continue;
            }
            if tokens[i].pos != PartOfSpeech::Propn {
                i += 1;
                continue;
            }

            let span_start = i;
            i += 1;
            while i < end {
                if tokens[i].pos == PartOfSpeech::Propn {
                    i += 1;
                    continue;
                }
                // Only "of" and "the" connect name parts ("Sword of the Fallen")
                let connector = matches!(tokens[i].lemma.as_str(), "of" | "the");
                let next_is_name = i + 1 < end
                    && (tokens[i + 1].pos == PartOfSpeech::Propn
                        || (tokens[i + 1].lemma == "the"
                            && i + 2 < end
                            && tokens[i + 2].pos == PartOfSpeech::Propn));
                if connector && next_is_name {
                    i += 1;
                } else {
                    break;
                }
            }
            let span_end = i;

            let first = tokens[span_start].text.to_lowercase();
            let last = tokens[span_end - 1].text.to_lowercase();
            let prev = (span_start > start)
                .then(|| tokens[span_start - 1].text.to_lowercase());

            let titled = prev.as_deref().map(|p| HONORIFICS.contains(&p)).unwrap_or(false)
                || (span_end - span_start > 1 && HONORIFICS.contains(&first.as_str()));
            let label = if titled {
                generic::PERSON
            } else if ORG_SUFFIXES.contains(&last.as_str()) {
                generic::ORG
            } else if span_end - span_start == 1 && tokens[span_start].dep == dep::NSUBJ {
                generic::PERSON
            } else {
                generic::MISC
            };

            entities.push(EntitySpan {
                start: span_start,
                end: span_end,
                label: label.to_string(),
            });
        }
    }
}

impl NlpEngine for HeuristicAnalyzer {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn analyze(&self, text: &str) -> Result<Document, NlpError> {
        let raw = tokenize(text);
        let bounds = Self::sentence_bounds(&raw);
        let sentence_starts: HashSet<usize> = bounds.iter().copied().collect();

        let mut tokens: Vec<Token> = raw
            .into_iter()
            .enumerate()
            .map(|(i, t)| {
                let (pos, lemma) = Self::tag(&t.text, sentence_starts.contains(&i));
                Token {
                    text: t.text,
                    start: t.start,
                    end: t.end,
                    lemma,
                    pos,
                    dep: dep::DEP.to_string(),
                    head: i,
                }
            })
            .collect();

        let mut entities = Vec::new();
        for window in bounds.windows(2) {
            let (start, end) = (window[0], window[1]);
            if start >= end {
                continue;
            }
            Self::parse_sentence(&mut tokens, start, end);
            Self::recognize(&tokens, start, end, &mut entities);
        }

        let document = Document {
            text: text.to_string(),
            tokens,
            entities,
        };
        document.validate()?;
        Ok(document)
    }
}
