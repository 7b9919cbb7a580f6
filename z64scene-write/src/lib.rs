mod context;

pub use context::{WriteContext, WORKBLOB_STACK_SIZE};
