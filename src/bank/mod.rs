use include_dir::{include_dir, Dir};
use itertools::Itertools;
use serde::Deserialize;
use serde_json::from_str;
use std::collections::HashMap;

static BANK_DIR: Dir = include_dir!("src/bank");

/// A single multiple-choice question. Immutable once loaded.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Question {
    pub prompt: String,
    pub options: Vec<String>,
    pub answer: String,
    pub feedback: String,
}

impl Question {
    pub fn is_correct(&self, option: &str) -> bool {
        self.answer == option
    }

    /// Indices of the options that are not the correct answer.
    pub fn wrong_option_indices(&self) -> Vec<usize> {
        self.options
            .iter()
            .enumerate()
            .filter(|(_, opt)| !self.is_correct(opt))
            .map(|(idx, _)| idx)
            .collect()
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct Category {
    pub name: String,
    pub description: String,
    pub questions: Vec<Question>,
}

#[derive(Deserialize, Debug)]
struct CatalogFile {
    categories: Vec<Category>,
}

#[derive(Deserialize, Debug)]
struct BonusFile {
    default: Vec<Question>,
    #[serde(default)]
    categories: HashMap<String, Vec<Question>>,
}

/// The full read-only question catalog: main categories plus the smaller
/// bonus pools sampled on bonus rounds.
#[derive(Clone, Debug)]
pub struct QuestionBank {
    categories: Vec<Category>,
    bonus_default: Vec<Question>,
    bonus_by_category: HashMap<String, Vec<Question>>,
}

impl QuestionBank {
    /// Load the catalog embedded in the binary.
    pub fn load() -> Self {
        let catalog: CatalogFile = read_embedded("categorias.json");
        let bonus: BonusFile = read_embedded("bonus.json");
        Self::from_parts(catalog.categories, bonus.default, bonus.categories)
    }

    /// Build a bank from already-loaded parts, validating the catalog shape.
    /// Panics on malformed data; the embedded catalog is checked at startup
    /// and test banks are expected to be well-formed.
    pub fn from_parts(
        categories: Vec<Category>,
        bonus_default: Vec<Question>,
        bonus_by_category: HashMap<String, Vec<Question>>,
    ) -> Self {
        assert!(!categories.is_empty(), "question bank has no categories");
        for category in &categories {
            assert!(
                !category.questions.is_empty(),
                "category {} has no questions",
                category.name
            );
            category.questions.iter().for_each(check_question);
        }
        bonus_default.iter().for_each(check_question);
        bonus_by_category
            .values()
            .flatten()
            .for_each(check_question);
        Self {
            categories,
            bonus_default,
            bonus_by_category,
        }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category(&self, index: usize) -> Option<&Category> {
        self.categories.get(index)
    }

    /// Bonus pool for a category, falling back to the default pool when the
    /// category has no dedicated one.
    pub fn bonus_pool(&self, category_name: &str) -> &[Question] {
        self.bonus_by_category
            .get(category_name)
            .map(Vec::as_slice)
            .unwrap_or(&self.bonus_default)
    }
}

fn check_question(question: &Question) {
    assert!(
        question.options.len() >= 2,
        "question '{}' needs at least two options",
        question.prompt
    );
    assert!(
        question.options.iter().all_unique(),
        "question '{}' has duplicate options",
        question.prompt
    );
    assert!(
        question.options.contains(&question.answer),
        "question '{}' lists an answer that is not an option",
        question.prompt
    );
}

fn read_embedded<T: for<'de> Deserialize<'de>>(file_name: &str) -> T {
    let file = BANK_DIR.get_file(file_name).expect("bank file not found");
    let contents = file
        .contents_utf8()
        .expect("unable to interpret bank file as a string");
    from_str(contents).expect("unable to deserialize bank json")
}
