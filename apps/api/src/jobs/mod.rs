// Job descriptions and their shortlists.
// Shortlist policy lives in crate::shortlist; these are the HTTP entry points only.

pub mod handlers;
