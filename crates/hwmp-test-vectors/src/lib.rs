//! Test vector loading for the mesh element codec.
//!
//! Each module corresponds to a single JSON vector file under
//! `.test-vectors/` and provides typed structs matching the JSON schema plus
//! a `load()` function that deserializes the embedded JSON via `include_str!`.
//!
//! # Usage
//!
//! ```rust
//! let vectors = hwmp_test_vectors::elements::load();
//! for v in &vectors.prep_vectors {
//!     let raw = hex::decode(&v.encoded).unwrap();
//!     // ... decode and compare against the typed fields
//! }
//! ```

#[cfg(feature = "helpers")]
pub mod helpers;

pub mod elements;

pub use elements::ElementsVectors;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_elements() {
        let v = elements::load();
        assert!(!v.preq_vectors.is_empty());
        assert!(!v.prep_vectors.is_empty());
        assert!(!v.perr_vectors.is_empty());
        assert!(!v.rann_vectors.is_empty());
        assert!(!v.pann_vectors.is_empty());
        assert!(!v.meshconf_vectors.is_empty());
        assert!(!v.malformed_vectors.is_empty());
    }

    #[test]
    fn every_extension_mode_is_covered() {
        let v = elements::load();
        for mode in 0..4 {
            assert!(
                v.preq_vectors.iter().any(|p| p.ae_mode == mode),
                "no PREQ vector with AE mode {mode}"
            );
            assert!(
                v.prep_vectors.iter().any(|p| p.ae_mode == mode),
                "no PREP vector with AE mode {mode}"
            );
        }
    }
}
