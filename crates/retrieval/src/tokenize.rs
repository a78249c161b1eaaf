use regex::Regex;

pub fn tokenize(input: &str) -> Vec<String> {
    let cleaner = Regex::new(r"[^\p{Latin}\p{Nd}\s]+").expect("valid tokenizer regex");
    let normalized = cleaner.replace_all(input, " ").to_lowercase();

    normalized
        .split_whitespace()
        .filter(|token| token.chars().count() > 1)
        .map(str::to_string)
        .collect()
}
