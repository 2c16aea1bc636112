//! Citation module - where an extracted value was found

/// Source location for an extracted value
///
/// Templates that ask for citations add a list of these to every content
/// record. All three parts are required when a citation is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    /// The exact text on the source where the value was found
    pub source_text: String,

    /// Description of where on the page the text sits
    pub location: String,

    /// Link that highlights the text on the page, as written by the model
    pub location_url: String,
}
