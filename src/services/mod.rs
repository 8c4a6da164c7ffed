pub mod alert;
pub mod annotator;
