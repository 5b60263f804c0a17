//! Wake and stop phrase matching.
//!
//! Matching is plain case-insensitive substring containment. There is no
//! tokenization and no word-boundary check, so "alexander" also wakes an agent
//! named "Alex"; recall is preferred over precision here.

/// Greetings placed in front of the agent name.
const NAME_LAST_TEMPLATES: [&str; 5] = ["hey", "hi", "hello", "listen", "tell me"];
/// Prompts placed after the agent name.
const NAME_FIRST_TEMPLATES: [&str; 3] = ["tell me", "answer", "what"];

/// Builds every wake phrase for an agent name, lower-cased.
///
/// The bare name comes first, followed by `"<greeting> <name>"` and
/// `"<name> <prompt>"` variants.
pub fn wake_variants(agent_name: &str) -> Vec<String> {
    let name = agent_name.trim().to_lowercase();
    let mut variants = Vec::with_capacity(1 + NAME_LAST_TEMPLATES.len() + NAME_FIRST_TEMPLATES.len());
    variants.push(name.clone());
    variants.extend(NAME_LAST_TEMPLATES.iter().map(|t| format!("{t} {name}")));
    variants.extend(NAME_FIRST_TEMPLATES.iter().map(|t| format!("{name} {t}")));
    variants
}

/// Splits a comma separated list into normalized stop phrases.
///
/// Entries are trimmed and lower-cased; empty entries are dropped.
pub fn parse_stop_phrases(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|phrase| phrase.trim().to_lowercase())
        .filter(|phrase| !phrase.is_empty())
        .collect()
}

/// True if the text contains any wake variant.
pub fn matches_wake(text: &str, variants: &[String]) -> bool {
    contains_any(text, variants)
}

/// True if the text contains any stop phrase.
pub fn matches_stop(text: &str, stop_phrases: &[String]) -> bool {
    contains_any(text, stop_phrases)
}

fn contains_any(text: &str, candidates: &[String]) -> bool {
    let normalized = text.to_lowercase();
    candidates
        .iter()
        .any(|candidate| normalized.contains(candidate.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_cover_bare_name_and_templates() {
        let variants = wake_variants("Alex");
        assert_eq!(variants.len(), 9);
        assert_eq!(variants[0], "alex");
        for expected in [
            "hey alex",
            "hi alex",
            "hello alex",
            "listen alex",
            "tell me alex",
            "alex tell me",
            "alex answer",
            "alex what",
        ] {
            assert!(variants.iter().any(|v| v == expected), "missing {expected}");
        }
    }

    #[test]
    fn every_variant_wakes() {
        let variants = wake_variants("Nova");
        for variant in &variants {
            let spoken = format!("so, {}, are you there", variant.to_uppercase());
            assert!(matches_wake(&spoken, &variants), "{spoken} should wake");
        }
        assert!(matches_wake("I think Nova knows", &variants));
    }

    #[test]
    fn wake_requires_the_name() {
        let variants = wake_variants("Alex");
        assert!(!matches_wake("hey there, what time is it", &variants));
        assert!(!matches_wake("", &variants));
    }

    #[test]
    fn wake_is_substring_permissive() {
        let variants = wake_variants("Alex");
        assert!(matches_wake("Alexander called earlier", &variants));
    }

    #[test]
    fn stop_phrases_are_normalized() {
        assert_eq!(
            parse_stop_phrases(" Thanks, STOP ,, enough,bye , "),
            vec!["thanks", "stop", "enough", "bye"]
        );
        assert!(parse_stop_phrases(" , ,").is_empty());
    }

    #[test]
    fn stop_matches_iff_a_phrase_is_contained() {
        let phrases = parse_stop_phrases("that will do, goodbye");
        assert!(matches_stop("OK, that will do for today", &phrases));
        assert!(matches_stop("Goodbye!", &phrases));
        assert!(!matches_stop("that will be all", &phrases));
        assert!(!matches_stop("anything", &[]));
    }
}
