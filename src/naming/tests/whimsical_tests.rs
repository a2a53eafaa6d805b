use super::*;

#[test]
fn generate_produces_adjective_noun_shape() {
    let name = generate();
    let parts: Vec<&str> = name.split('-').collect();
    assert_eq!(parts.len(), 2, "expected exactly one hyphen in {name:?}");
    assert!(ADJECTIVES.contains(&parts[0]));
    assert!(NOUNS.contains(&parts[1]));
}

#[test]
fn word_lists_have_no_duplicates() {
    let mut adjectives = ADJECTIVES.to_vec();
    adjectives.sort_unstable();
    adjectives.dedup();
    assert_eq!(adjectives.len(), ADJECTIVES.len());

    let mut nouns = NOUNS.to_vec();
    nouns.sort_unstable();
    nouns.dedup();
    assert_eq!(nouns.len(), NOUNS.len());
}

#[test]
fn generate_varies_across_calls() {
    let samples: std::collections::HashSet<String> = (0..50).map(|_| generate()).collect();
    assert!(samples.len() > 1, "expected randomness across 50 draws");
}
