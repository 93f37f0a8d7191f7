//! Concept word pairs
//!
//! A built-in library of English noun pairs, grouped by category. A data
//! directory of `<category>.json` files (arrays of `["a", "b"]`) can
//! override or extend it.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::path::Path;
use undercover_error::{Error, Result};

use crate::types::ConceptPair;

/// Anything that can hand the engine a word pair for a category
pub trait ConceptSource {
    fn get_pair(&mut self, category: &str) -> Result<ConceptPair>;
}

pub struct ConceptLibrary {
    categories: BTreeMap<String, Vec<(String, String)>>,
    rng: StdRng,
}

impl Default for ConceptLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ConceptLibrary {
    pub fn builtin() -> Self {
        let categories = BUILTIN
            .iter()
            .map(|(name, pairs)| {
                let pairs = pairs
                    .iter()
                    .map(|(a, b)| (a.to_string(), b.to_string()))
                    .collect();
                (name.to_string(), pairs)
            })
            .collect();

        Self {
            categories,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Built-in data overlaid with every `*.json` file in `dir`.
    ///
    /// A file that cannot be read or parsed is skipped with a warning and the
    /// built-in pairs for that category stay in place.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut library = Self::builtin();

        let entries = std::fs::read_dir(dir)
            .map_err(|e| Error::from(e).with_context("dir", dir.display().to_string()))?;

        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(category) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            match read_pairs(&path) {
                Ok(pairs) if !pairs.is_empty() => {
                    log::debug!("[concepts] loaded {} pairs for {}", pairs.len(), category);
                    library.categories.insert(category.to_string(), pairs);
                }
                Ok(_) => log::warn!("[concepts] {} is empty, keeping built-in data", path.display()),
                Err(err) => log::warn!(
                    "[concepts] failed to load {}, keeping built-in data: {}",
                    path.display(),
                    err
                ),
            }
        }

        for name in library.categories.keys() {
            if !dir.join(format!("{}.json", name)).exists() {
                log::warn!("[concepts] no data file for {}, using built-in pairs", name);
            }
        }

        Ok(library)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn categories(&self) -> Vec<&str> {
        self.categories.keys().map(String::as_str).collect()
    }

    pub fn category_size(&self, category: &str) -> Result<usize> {
        self.pairs(category).map(<[_]>::len)
    }

    pub fn all_pairs(&self, category: &str) -> Result<Vec<ConceptPair>> {
        let pairs = self.pairs(category)?;
        Ok((0..pairs.len())
            .map(|index| make_pair(category, pairs, index))
            .collect())
    }

    pub fn pair_by_index(&self, category: &str, index: usize) -> Result<ConceptPair> {
        let pairs = self.pairs(category)?;
        if index >= pairs.len() {
            return Err(Error::concept_not_found(category, index));
        }
        Ok(make_pair(category, pairs, index))
    }

    pub fn random_pair(&mut self, category: &str) -> Result<ConceptPair> {
        let size = self.category_size(category)?;
        let index = self.rng.random_range(0..size);
        self.pair_by_index(category, index)
    }

    fn pairs(&self, category: &str) -> Result<&[(String, String)]> {
        self.categories
            .get(category)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::category_not_found(category))
    }
}

impl ConceptSource for ConceptLibrary {
    fn get_pair(&mut self, category: &str) -> Result<ConceptPair> {
        self.random_pair(category)
    }
}

fn read_pairs(path: &Path) -> Result<Vec<(String, String)>> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn make_pair(category: &str, pairs: &[(String, String)], index: usize) -> ConceptPair {
    let (a, b) = &pairs[index];
    ConceptPair {
        concept_a: a.clone(),
        concept_b: b.clone(),
        index: Some(index),
        category: Some(category.to_string()),
    }
}

// ============================================================================
// Built-in data
// ============================================================================

type Pairs = &'static [(&'static str, &'static str)];

const BUILTIN: &[(&str, Pairs)] = &[
    (
        "Animals",
        &[
            ("parrot", "crow"), ("shark", "whale"), ("wolf", "tiger"), ("elephant", "giraffe"),
            ("lion", "tiger"), ("tiger", "lion"), ("snake", "lizard"), ("fox", "coyote"),
            ("bee", "butterfly"), ("goose", "duck"), ("elephant", "mammoth"), ("lion", "rhino"),
            ("toad", "frog"), ("turtle", "tortoise"), ("moth", "butterfly"),
        ],
    ),
    (
        "Artifacts",
        &[
            ("cup", "bowl"), ("chair", "table"), ("vacuum", "broom"), ("car", "bus"),
            ("boat", "ship"), ("bike", "scooter"), ("plane", "helicopter"), ("truck", "car"),
            ("train", "subway"), ("table", "desk"), ("cabinet", "wardrobe"), ("stool", "bench"),
            ("paperclip", "flannel"), ("fork", "spoon"), ("bed", "pillow"), ("lamp", "lightbulb"),
            ("camera", "lens"), ("bed", "mattress"), ("pillow", "cushion"),
            ("sculpture", "statue"), ("clock", "watch"),
        ],
    ),
    (
        "Electronic Components",
        &[
            ("amplifier", "oscillator"), ("resistor", "capacitor"), ("transistor", "diode"),
            ("voltmeter", "ammeter"), ("inductor", "transformer"), ("voltage", "current"),
            ("microprocessor", "microcontroller"), ("inductor", "coil"), ("light", "bulb"),
            ("microchip", "processor"),
        ],
    ),
    (
        "Food",
        &[
            ("bread", "cake"), ("apple", "pear"), ("pineapple", "mango"), ("cherry", "blueberry"),
            ("noodle", "pasta"), ("zongzi", "mooncake"), ("macaron", "cookie"), ("jam", "juice"),
            ("pepper powder", "mustard"), ("pear", "peach"), ("salad", "soup"),
            ("cake", "pie"), ("banana", "kiwi"), ("tomato", "potato"), ("rice", "wheat"),
            ("beef", "pork"), ("bread", "pasta"), ("wine", "beer"), ("tea", "coffee"),
            ("peach", "plum"), ("apple", "orange"), ("pea", "bean"), ("chicken", "turkey"),
            ("salmon", "tuna"), ("pill", "capsule"), ("ice cream", "yogurt"),
            ("smoothie", "juice"), ("pizza", "lasagna"), ("sandwich", "hamburger"),
            ("dumplings", "wonton"),
        ],
    ),
    (
        "Landforms",
        &[
            ("continent", "island"), ("desert", "oasis"), ("mountain", "hill"), ("river", "lake"),
            ("valley", "plain"), ("peninsula", "isthmus"), ("valley", "canyon"),
            ("peninsula", "cape"), ("island", "archipelago"), ("desert", "sand"),
            ("river", "stream"), ("ocean", "sea"), ("desert", "beach"),
        ],
    ),
    (
        "People Social",
        &[
            ("aristocrat", "noble"), ("peasant", "farmer"), ("proletariat", "worker"),
            ("gentry", "landowner"), ("middle class", "upper middle class"),
            ("peasant", "serf"), ("bourgeoisie", "merchant"), ("bourgeoisie", "elite"),
            ("chef", "cook"), ("architect", "designer"), ("doctor", "physician"),
            ("teacher", "professor"), ("lawyer", "attorney"),
        ],
    ),
    (
        "Plants",
        &[
            ("fern", "palm"), ("tree", "bush"), ("rose", "tulip"), ("maple", "oak"),
            ("birch", "willow"), ("cherry", "walnut"), ("birch", "aspen"), ("pine", "cypress"),
        ],
    ),
    (
        "Sports",
        &[
            ("skateboard", "skis"), ("surfboard", "paddleboard"), ("skateboard", "rollerblades"),
            ("football", "rugby"), ("baseball", "cricket"), ("boxing", "taekwondo"),
            ("wrestling", "judo"), ("surfing", "windsurfing"),
        ],
    ),
    (
        "Stationery",
        &[
            ("eraser", "ruler"), ("marker", "highlighter"), ("stapler", "clip"),
            ("notepad", "notebook"), ("marker", "crayon"), ("stapler", "paperclip"),
        ],
    ),
    (
        "Sundries",
        &[
            ("prescription", "medication"), ("rain", "drizzle"), ("library", "bookstore"),
            ("vampire", "werewolf"), ("bicycle", "motorcycle"), ("museum", "gallery"),
            ("hospital", "clinic"), ("shampoo", "conditioner"), ("bakery", "cafe"),
            ("doctor", "nurse"), ("painting", "drawing"), ("garden", "park"),
            ("gouache", "watercolor"),
        ],
    ),
    (
        "Tools",
        &[
            ("saw", "chisel"), ("file", "grinder"), ("hammer", "axe"), ("screwdriver", "drill"),
            ("chisel", "plane"), ("saw", "blade"), ("pliers", "tongs"), ("saw", "scissors"),
            ("shovel", "rake"), ("scalpel", "scissors"), ("eraser", "sharpener"),
            ("wrench", "spanner"), ("pliers", "wrench"), ("scalpel", "forceps"),
            ("bandage", "gauze"), ("syringe", "needle"), ("stethoscope", "thermometer"),
        ],
    ),
];

#[cfg(test)]
mod tests {
    use super::*;
    use undercover_error::ErrorKind;

    #[test]
    fn test_builtin_categories() {
        let library = ConceptLibrary::builtin();
        let categories = library.categories();
        assert_eq!(categories.len(), 11);
        assert!(categories.contains(&"Electronic Components"));
        assert_eq!(library.category_size("Plants").unwrap(), 8);
    }

    #[test]
    fn test_pair_by_index() {
        let library = ConceptLibrary::builtin();
        let pair = library.pair_by_index("Animals", 1).unwrap();
        assert_eq!(pair.concept_a, "shark");
        assert_eq!(pair.concept_b, "whale");
        assert_eq!(pair.index, Some(1));
        assert_eq!(pair.category.as_deref(), Some("Animals"));

        let err = library.pair_by_index("Animals", 500).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConceptNotFound);
    }

    #[test]
    fn test_unknown_category() {
        let mut library = ConceptLibrary::builtin();
        let err = library.get_pair("Planets").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CategoryNotFound);
    }

    #[test]
    fn test_seeded_random_pair_is_reproducible() {
        let mut a = ConceptLibrary::builtin().with_seed(11);
        let mut b = ConceptLibrary::builtin().with_seed(11);
        for _ in 0..5 {
            assert_eq!(a.random_pair("Food").unwrap(), b.random_pair("Food").unwrap());
        }
    }

    #[test]
    fn test_all_pairs_indices() {
        let library = ConceptLibrary::builtin();
        let pairs = library.all_pairs("Stationery").unwrap();
        assert_eq!(pairs.len(), 6);
        assert!(pairs.iter().enumerate().all(|(i, p)| p.index == Some(i)));
    }

    #[test]
    fn test_load_dir_overlays_and_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Animals.json"),
            r#"[["cat", "dog"], ["horse", "donkey"]]"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("Colors.json"), r#"[["red", "pink"]]"#).unwrap();
        std::fs::write(dir.path().join("Tools.json"), "not json").unwrap();

        let library = ConceptLibrary::load_dir(dir.path()).unwrap();
        assert_eq!(library.category_size("Animals").unwrap(), 2);
        assert_eq!(library.pair_by_index("Colors", 0).unwrap().concept_b, "pink");
        assert_eq!(library.category_size("Tools").unwrap(), 17);
        assert_eq!(library.categories().len(), 12);
    }

    #[test]
    fn test_load_missing_dir() {
        let err = ConceptLibrary::load_dir("/definitely/not/here").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
    }
}
