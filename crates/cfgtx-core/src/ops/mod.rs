pub mod edit;
pub mod existence;
pub mod insertion;
pub mod merge;
pub mod patch;

pub use edit::{expand_collection_write, CollectionWrite, EditOperation, InsertPosition};
pub use existence::{check_existence, ExistenceOutcome};
pub use insertion::{plan_insert, InsertPlan};
pub use merge::merge_config_and_state;
pub use patch::{EditStatus, PatchContext, PatchEdit, PatchOperation, PatchStatus};
