//! Example generation by walking the parsed regex.
//!
//! The walk is total over literals, classes, repetition, alternation, groups
//! and line anchors. Word boundaries cannot be honoured by construction and are
//! rejected; back-references and lookaround never get this far because the
//! pattern would not have compiled.

use crate::error::ContractError;
use crate::pattern::RegexPattern;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex_syntax::hir::{Class, ClassUnicode, Hir, HirKind, Look};
use std::fmt;

/// Produces a string fully matching a pattern.
///
/// Implementations must be deterministic for a given `(pattern, attempt)` pair
/// so that compilation stays reproducible. Callers bump `attempt` when a
/// candidate is unusable, e.g. because it does not parse as an integer.
pub trait ExampleGenerator: Send + Sync + fmt::Debug {
    fn generate(&self, pattern: &RegexPattern, attempt: u32) -> Result<String, ContractError>;
}

/// Random walk over the pattern's syntax tree, seeded from the pattern text.
#[derive(Debug, Clone)]
pub struct SeededGenerator {
    seed: u64,
    max_extra_repeat: u32,
    tries: u32,
}

impl Default for SeededGenerator {
    fn default() -> Self {
        Self {
            seed: 0,
            max_extra_repeat: 3,
            tries: 32,
        }
    }
}

impl SeededGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Cap on iterations beyond a repetition's minimum (`*`, `+`, `{n,}`).
    pub fn with_max_extra_repeat(mut self, max_extra_repeat: u32) -> Self {
        self.max_extra_repeat = max_extra_repeat;
        self
    }

    fn unsynthesizable(pattern: &RegexPattern, reason: impl Into<String>) -> ContractError {
        ContractError::UnsynthesizablePattern {
            pattern: pattern.as_str().to_string(),
            reason: reason.into(),
        }
    }

    fn emit(&self, hir: &Hir, rng: &mut StdRng, out: &mut String) -> Result<(), String> {
        match hir.kind() {
            HirKind::Empty => Ok(()),
            HirKind::Literal(literal) => {
                let text = std::str::from_utf8(&literal.0)
                    .map_err(|_| "literal is not valid UTF-8".to_string())?;
                out.push_str(text);
                Ok(())
            }
            HirKind::Class(Class::Unicode(class)) => {
                out.push(pick_char(class, rng)?);
                Ok(())
            }
            HirKind::Class(Class::Bytes(class)) => {
                let ranges = class.ranges();
                if ranges.is_empty() {
                    return Err("character class matches nothing".to_string());
                }
                let range = &ranges[rng.gen_range(0..ranges.len())];
                let byte = rng.gen_range(range.start()..=range.end());
                if !byte.is_ascii() {
                    return Err("byte class outside ASCII".to_string());
                }
                out.push(char::from(byte));
                Ok(())
            }
            HirKind::Look(look) => match look {
                Look::Start | Look::End | Look::StartLF | Look::EndLF | Look::StartCRLF
                | Look::EndCRLF => Ok(()),
                other => Err(format!("assertion {other:?} cannot be generated")),
            },
            HirKind::Repetition(repetition) => {
                let extra = match repetition.max {
                    Some(max) => (max - repetition.min).min(self.max_extra_repeat),
                    None => self.max_extra_repeat,
                };
                let count = repetition.min + rng.gen_range(0..=extra);
                for _ in 0..count {
                    self.emit(&repetition.sub, rng, out)?;
                }
                Ok(())
            }
            HirKind::Capture(capture) => self.emit(&capture.sub, rng, out),
            HirKind::Concat(parts) => {
                for part in parts {
                    self.emit(part, rng, out)?;
                }
                Ok(())
            }
            HirKind::Alternation(branches) => {
                let branch = &branches[rng.gen_range(0..branches.len())];
                self.emit(branch, rng, out)
            }
        }
    }
}

impl ExampleGenerator for SeededGenerator {
    fn generate(&self, pattern: &RegexPattern, attempt: u32) -> Result<String, ContractError> {
        let hir = regex_syntax::Parser::new()
            .parse(pattern.as_str())
            .map_err(|e| Self::unsynthesizable(pattern, e.to_string()))?;

        let seed = self.seed ^ fingerprint(pattern.as_str()) ^ u64::from(attempt).rotate_left(32);
        let mut rng = StdRng::seed_from_u64(seed);
        for _ in 0..self.tries {
            let mut candidate = String::new();
            self.emit(&hir, &mut rng, &mut candidate)
                .map_err(|reason| Self::unsynthesizable(pattern, reason))?;
            if pattern.is_match(&candidate) {
                return Ok(candidate);
            }
        }
        Err(Self::unsynthesizable(
            pattern,
            format!("no matching candidate after {} tries", self.tries),
        ))
    }
}

/// Characters tried first, so examples stay readable.
const PREFERRED: [(char, char); 3] = [('a', 'z'), ('A', 'Z'), ('0', '9')];
const PRINTABLE: [(char, char); 1] = [(' ', '~')];

fn pick_char(class: &ClassUnicode, rng: &mut StdRng) -> Result<char, String> {
    let ranges: Vec<(char, char)> = class.ranges().iter().map(|r| (r.start(), r.end())).collect();
    if ranges.is_empty() {
        return Err("character class matches nothing".to_string());
    }
    for preference in [&PREFERRED[..], &PRINTABLE[..]] {
        let overlap = intersect(&ranges, preference);
        if let Some(c) = pick_from(&overlap, rng) {
            return Ok(c);
        }
    }
    pick_from(&ranges, rng).ok_or_else(|| "character class has no valid scalar value".to_string())
}

fn intersect(ranges: &[(char, char)], with: &[(char, char)]) -> Vec<(char, char)> {
    let mut out = Vec::new();
    for &(start, end) in ranges {
        for &(lo, hi) in with {
            let s = start.max(lo);
            let e = end.min(hi);
            if s <= e {
                out.push((s, e));
            }
        }
    }
    out
}

fn pick_from(ranges: &[(char, char)], rng: &mut StdRng) -> Option<char> {
    let total: u64 = ranges
        .iter()
        .map(|&(s, e)| u64::from(e as u32 - s as u32) + 1)
        .sum();
    if total == 0 {
        return None;
    }
    let mut index = rng.gen_range(0..total);
    for &(s, e) in ranges {
        let width = u64::from(e as u32 - s as u32) + 1;
        if index < width {
            let code = s as u32 + index as u32;
            return char::from_u32(code).or(Some(s));
        }
        index -= width;
    }
    None
}

/// FNV-1a over the pattern text.
fn fingerprint(text: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in text.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::NamedPattern;

    fn generate(source: &str) -> Result<String, ContractError> {
        SeededGenerator::default().generate(&RegexPattern::new(source).unwrap(), 0)
    }

    #[test]
    fn test_generated_values_match() {
        for source in [
            "[0-9]+",
            "abc",
            "(foo|bar)-[a-f]{4}",
            r"\d{3}-\d{2}",
            r"[^\s]+@[a-z]+\.com",
            "x?y*z+",
            r"(?i)hello",
            "",
        ] {
            let pattern = RegexPattern::new(source).unwrap();
            let value = generate(source).unwrap();
            assert!(pattern.is_match(&value), "{value:?} does not match {source}");
        }
    }

    #[test]
    fn test_library_patterns_generate() {
        for named in NamedPattern::ALL {
            let value = SeededGenerator::default()
                .generate(&named.pattern(), 0)
                .unwrap();
            assert!(named.pattern().is_match(&value), "{named}: {value:?}");
        }
    }

    #[test]
    fn test_generation_is_deterministic() {
        let pattern = NamedPattern::Uuid.pattern();
        let generator = SeededGenerator::default();
        assert_eq!(
            generator.generate(&pattern, 0).unwrap(),
            generator.generate(&pattern, 0).unwrap()
        );
    }

    #[test]
    fn test_word_boundary_fails_fast() {
        let err = generate(r"\bword\b").unwrap_err();
        assert!(matches!(err, ContractError::UnsynthesizablePattern { .. }));
    }

    #[test]
    fn test_prefers_readable_characters() {
        let value = generate(".{8}").unwrap();
        assert!(value.chars().all(|c| c.is_ascii_alphanumeric()), "{value:?}");
    }

    #[test]
    fn test_repetition_cap() {
        let generator = SeededGenerator::default().with_max_extra_repeat(0);
        let value = generator
            .generate(&RegexPattern::new("a+b*").unwrap(), 0)
            .unwrap();
        assert_eq!(value, "a");
    }
}
