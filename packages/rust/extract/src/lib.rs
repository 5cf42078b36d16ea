//! Field extraction from identity-document text.
//!
//! [`FieldExtractor`] recovers the holder's name, date of birth and 12-digit
//! identity number from raw text with no guaranteed layout. Each field is
//! found by an ordered [`StrategyChain`]; the first strategy that produces a
//! value wins:
//!
//! | Field | Strategies, in order |
//! |---|---|
//! | name | [`BilingualAdjacency`], [`CapitalizedPhrase`] |
//! | dob | [`LabelledDate`], [`FirstDate`] |
//! | id number | [`GroupedDigits`] |

mod dob;
mod id_number;
mod input;
mod name;
mod strategy;
mod text;

use ekyc_shared::{EkycError, ExtractedFields, ExtractionConfig, Result, mask_id};
use tracing::{debug, instrument};

pub use dob::{FirstDate, LabelledDate};
pub use id_number::GroupedDigits;
pub use input::unwrap_document_text;
pub use name::{BilingualAdjacency, CapitalizedPhrase, NOISE_WORDS};
pub use strategy::{FieldStrategy, Found, StrategyChain};
pub use text::DocumentText;

/// Recovers [`ExtractedFields`] from raw document text.
pub struct FieldExtractor {
    name: StrategyChain,
    dob: StrategyChain,
    id_number: StrategyChain,
}

impl FieldExtractor {
    /// Build the standard strategy chains from config.
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            name: StrategyChain::new(vec![
                Box::new(BilingualAdjacency),
                Box::new(CapitalizedPhrase::new(config.extra_noise_words.as_slice())),
            ]),
            dob: StrategyChain::new(vec![Box::new(LabelledDate), Box::new(FirstDate)]),
            id_number: StrategyChain::new(vec![Box::new(GroupedDigits::new(config.vid_window))]),
        }
    }

    /// Build an extractor from custom chains.
    pub fn with_chains(name: StrategyChain, dob: StrategyChain, id_number: StrategyChain) -> Self {
        Self {
            name,
            dob,
            id_number,
        }
    }

    /// Extract every field that can be found.
    ///
    /// Fails with [`EkycError::NoFields`] (`ERR97`) only when none of the
    /// three fields was found.
    #[instrument(skip_all, fields(len = text.len()))]
    pub fn extract(&self, text: &str) -> Result<ExtractedFields> {
        let doc = DocumentText::new(unwrap_document_text(text));

        let name = self.name.first_match(&doc);
        let dob = self.dob.first_match(&doc);
        let id_number = self.id_number.first_match(&doc);

        debug!(
            name_strategy = name.as_ref().map(|f| f.strategy.as_str()),
            dob_strategy = dob.as_ref().map(|f| f.strategy.as_str()),
            id_number = id_number.as_ref().map(|f| mask_id(&f.value)),
            lines = doc.lines().len(),
            "extraction finished"
        );

        let fields = ExtractedFields {
            name: name.map(|f| f.value),
            dob: dob.map(|f| f.value),
            id_number: id_number.map(|f| f.value),
        };

        if fields.is_empty() {
            return Err(EkycError::NoFields);
        }
        Ok(fields)
    }
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}
