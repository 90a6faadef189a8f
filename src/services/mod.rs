// Location hierarchy views
pub mod locations;

// Replacement suggestions: daily generator and read queries
pub mod replacement_suggestions;
pub mod warranty_suggestions;
