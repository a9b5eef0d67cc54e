use super::*;

#[test]
fn word_hash_matches_known_values() {
    assert_eq!(word_hash("hello"), 99_162_322);
    assert_eq!(word_hash("world"), 113_318_802);
    // Overflows into the negative range
    assert_eq!(word_hash("sophie"), -896_664_208);
    assert_eq!(word_hash(""), 0);
}

#[test]
fn hello_world_lands_in_two_buckets() {
    let embedder = HashEmbedder::new(384);
    let vector = embedder.embed("hello world");

    assert_eq!(vector.len(), 384);
    let expected = 1.0 / 2.0_f32.sqrt();
    assert!((vector[82] - expected).abs() < 1e-6);
    assert!((vector[18] - expected).abs() < 1e-6);
    assert_eq!(vector.iter().filter(|v| **v != 0.0).count(), 2);
}

#[test]
fn negative_hash_uses_absolute_value() {
    let vector = HashEmbedder::new(384).embed("sophie");
    assert!((vector[16] - 1.0).abs() < 1e-6);
}

#[test]
fn output_is_unit_length() {
    let vector = HashEmbedder::new(384).embed("apa itu demokrasi? sistem pemerintahan rakyat");
    let magnitude = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    assert!((magnitude - 1.0).abs() < 1e-5);
}

#[test]
fn punctuation_and_case_are_ignored() {
    let embedder = HashEmbedder::new(384);
    assert_eq!(embedder.embed("Hello, WORLD!"), embedder.embed("hello world"));
}

#[test]
fn repeated_words_accumulate() {
    let vector = HashEmbedder::new(384).embed("hello hello world");
    // Counts 2 and 1 before normalization
    let magnitude = 5.0_f32.sqrt();
    assert!((vector[82] - 2.0 / magnitude).abs() < 1e-6);
    assert!((vector[18] - 1.0 / magnitude).abs() < 1e-6);
}

#[test]
fn empty_text_stays_zero() {
    let vector = HashEmbedder::new(64).embed("  ?! ");
    assert_eq!(vector.len(), 64);
    assert!(vector.iter().all(|v| *v == 0.0));
}

#[test]
fn same_text_same_vector() {
    let embedder = HashEmbedder::new(384);
    let text = "rumus teorema pythagoras segitiga siku-siku";
    assert_eq!(embedder.embed(text), embedder.embed(text));
}

#[test]
fn zero_dimension_is_clamped() {
    let embedder = HashEmbedder::new(0);
    assert_eq!(embedder.dimension(), 1);
    assert_eq!(embedder.embed("anything"), vec![1.0]);
}
