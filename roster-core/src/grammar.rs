//! Class-name suffix grammar and section tokens.
//!
//! ```text
//! suffix  := grade level section | level grade section
//! grade   := DIGIT DIGIT?            (ASCII only, within the level's range)
//! level   := 'I' | 'P' | 'S'         (case-insensitive)
//! section := ASCII letter            (folded to uppercase)
//! ```
//!
//! The suffix is the last whitespace-separated word of a class display name,
//! with every non-ASCII-alphanumeric character removed before parsing.
//! `3PA`, `3-P-A`, `p3a` all decode to Primaria 3 A; `3ＰA` (fullwidth)
//! does not parse.
//!
//! A token that fits the shape but names a grade outside its level's range
//! is rejected like any other non-suffix: `9PA` (Primaria is 1-6) and `0IA`
//! leave the class unparsed, so the catalog lists it as ignored.
//!
//! Tokens such as `1SS` are not ambiguous: the first alternative
//! (`grade level section`) is tried first and `1SS` is Secundaria 1 S.

use crate::types::{Level, SectionKey};

/// Decoded `(grade, level, section)` suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassSuffix {
    pub grade: u8,
    pub level: Level,
    pub section: char,
}

impl ClassSuffix {
    /// Canonical `<grade><level><section>` rendering.
    pub fn render(&self) -> String {
        format!("{}{}{}", self.grade, self.level.letter(), self.section)
    }

    pub fn key(&self) -> SectionKey {
        SectionKey {
            level: self.level,
            grade: self.grade,
            section: self.section,
        }
    }
}

/// Parse a single suffix token (`3PA`, `P3A`, `10sb`).
pub fn parse_suffix_token(token: &str) -> Option<ClassSuffix> {
    let cleaned: Vec<char> = token
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    grade_first(&cleaned).or_else(|| level_first(&cleaned))
}

fn grade_first(chars: &[char]) -> Option<ClassSuffix> {
    let (section, rest) = chars.split_last()?;
    let (level, digits) = rest.split_last()?;
    build(digits, *level, *section)
}

fn level_first(chars: &[char]) -> Option<ClassSuffix> {
    let (level, rest) = chars.split_first()?;
    let (section, digits) = rest.split_last()?;
    build(digits, *level, *section)
}

fn build(digits: &[char], level: char, section: char) -> Option<ClassSuffix> {
    if digits.is_empty() || digits.len() > 2 || !digits.iter().all(char::is_ascii_digit) {
        return None;
    }
    if !section.is_ascii_alphabetic() {
        return None;
    }
    let level = Level::from_letter(level)?;
    let grade: u8 = digits.iter().collect::<String>().parse().ok()?;
    if !level.grades().contains(&grade) {
        return None;
    }
    Some(ClassSuffix {
        grade,
        level,
        section,
    })
}

/// Split a display name into `(base_name, suffix)`.
///
/// `base_name` is everything before the last word, with trailing
/// whitespace removed. Returns `None` when the last word is not a suffix.
pub fn split_class_name(name: &str) -> Option<(String, ClassSuffix)> {
    let trimmed = name.trim();
    let (base, token) = match trimmed.rsplit_once(char::is_whitespace) {
        Some((base, token)) => (base.trim_end(), token),
        None => ("", trimmed),
    };
    let suffix = parse_suffix_token(token)?;
    Some((base.to_string(), suffix))
}

/// One token of a `Secciones` cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionToken {
    /// A complete triple such as `3PA`.
    Exact(SectionKey),
    /// A bare section letter applying to every desired `(level, grade)`.
    Letter(char),
}

/// Parse a `Secciones` cell.
///
/// Tokens are separated by whitespace, `,`, `;` or `/`. On failure returns
/// the offending tokens.
pub fn parse_section_tokens(value: &str) -> Result<Vec<SectionToken>, Vec<String>> {
    let mut tokens = Vec::new();
    let mut invalid = Vec::new();
    for raw in value.split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '/')) {
        if raw.is_empty() {
            continue;
        }
        let mut chars = raw.chars();
        let token = match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphabetic() => {
                Some(SectionToken::Letter(c.to_ascii_uppercase()))
            }
            _ => parse_suffix_token(raw).map(|s| SectionToken::Exact(s.key())),
        };
        match token {
            Some(t) if !tokens.contains(&t) => tokens.push(t),
            Some(_) => {}
            None => invalid.push(raw.to_string()),
        }
    }
    if invalid.is_empty() {
        Ok(tokens)
    } else {
        Err(invalid)
    }
}
