// ============ Model implementations ============

pub(crate) mod bert;

pub use bert::{BertModelId, ClozeBertModel};
