//! Word-frequency encoding of text.
//!
//! Text becomes a numeric sequence by replacing every token with the number
//! of times it occurs in the whole text. Common stopwords can be pruned first
//! so the profile reflects subject matter rather than grammar.

use std::collections::{HashMap, HashSet};

/// Standard English stopword vocabulary, used when the caller does not
/// supply its own.
pub const DEFAULT_STOPWORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst",
    "amoungst", "amount", "an", "and", "another", "any", "anyhow", "anyone", "anything",
    "anyway", "anywhere", "are", "around", "as", "at", "back", "be", "became", "because",
    "become", "becomes", "becoming", "been", "before", "beforehand", "behind", "being", "below",
    "beside", "besides", "between", "beyond", "bill", "both", "bottom", "but", "by", "call",
    "can", "cannot", "cant", "co", "computer", "con", "could", "couldnt", "cry", "de",
    "describe", "detail", "did", "do", "done", "down", "due", "during", "each", "eg", "eight",
    "either", "eleven", "else", "elsewhere", "empty", "enough", "etc", "even", "ever", "every",
    "everyone", "everything", "everywhere", "except", "few", "fifteen", "fifty", "fill", "find",
    "fire", "first", "five", "for", "former", "formerly", "forty", "found", "four", "from",
    "front", "full", "further", "get", "give", "go", "had", "has", "hasnt", "have", "he",
    "hence", "her", "here", "hereafter", "hereby", "herein", "hereupon", "hers", "herself",
    "him", "himself", "his", "how", "however", "hundred", "i", "ie", "if", "in", "inc",
    "indeed", "interest", "into", "is", "it", "its", "itself", "keep", "last", "latter",
    "latterly", "least", "less", "ltd", "made", "many", "may", "me", "meanwhile", "might",
    "mill", "mine", "more", "moreover", "most", "mostly", "move", "much", "must", "my",
    "myself", "name", "namely", "neither", "never", "nevertheless", "next", "nine", "no",
    "nobody", "none", "noone", "nor", "not", "nothing", "now", "nowhere", "of", "off", "often",
    "on", "once", "one", "only", "onto", "or", "other", "others", "otherwise", "our", "ours",
    "ourselves", "out", "over", "own", "part", "per", "perhaps", "please", "put", "rather",
    "re", "s", "same", "see", "seem", "seemed", "seeming", "seems", "serious", "several", "she",
    "should", "show", "side", "since", "sincere", "six", "sixty", "so", "some", "somehow",
    "someone", "something", "sometime", "sometimes", "somewhere", "still", "such", "system",
    "take", "ten", "than", "that", "the", "their", "them", "themselves", "then", "thence",
    "there", "thereafter", "thereby", "therefore", "therein", "thereupon", "these", "they",
    "thick", "thin", "third", "this", "those", "though", "three", "through", "throughout",
    "thru", "thus", "to", "together", "too", "top", "toward", "towards", "twelve", "twenty",
    "two", "un", "under", "until", "up", "upon", "us", "very", "via", "was", "we", "well",
    "were", "what", "whatever", "when", "whence", "whenever", "where", "whereafter", "whereas",
    "whereby", "wherein", "whereupon", "wherever", "whether", "which", "while", "whither",
    "who", "whoever", "whole", "whom", "whose", "why", "will", "with", "within", "without",
    "would", "yet", "you", "your", "yours", "yourself", "yourselves",
];

/// Owned copy of [`DEFAULT_STOPWORDS`].
pub fn default_stopwords() -> Vec<String> {
    DEFAULT_STOPWORDS.iter().map(|w| w.to_string()).collect()
}

/// Split on whitespace, strip every character that is not a word character
/// (alphanumeric or `_`), and lowercase. A chunk of pure punctuation becomes
/// an empty token and still counts as a word.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|raw| {
            raw.chars()
                .filter(|c| c.is_alphanumeric() || *c == '_')
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .collect()
}

/// Remove tokens found in `stopwords`. `None` disables filtering.
pub fn filter_stopwords(tokens: Vec<String>, stopwords: Option<&[String]>) -> Vec<String> {
    let Some(stopwords) = stopwords else {
        return tokens;
    };
    let stopwords: HashSet<&str> = stopwords.iter().map(String::as_str).collect();
    tokens
        .into_iter()
        .filter(|token| !stopwords.contains(token.as_str()))
        .collect()
}

/// Replace each token by its total occurrence count, keeping positions.
pub fn encode_by_frequency<S: AsRef<str>>(tokens: &[S]) -> Vec<usize> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for token in tokens {
        *counts.entry(token.as_ref()).or_default() += 1;
    }
    tokens.iter().map(|t| counts[t.as_ref()]).collect()
}

/// Tokenize, filter and frequency-encode `text` into sonifiable values.
pub fn encode_text(text: &str, stopwords: Option<&[String]>) -> Vec<f64> {
    let tokens = filter_stopwords(tokenize(text), stopwords);
    encode_by_frequency(&tokens)
        .into_iter()
        .map(|count| count as f64)
        .collect()
}
