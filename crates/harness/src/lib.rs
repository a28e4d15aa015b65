pub mod field;
pub mod memory;

pub use field::{TestField, project};
pub use memory::MemoryStore;

use tracing_subscriber::filter::LevelFilter;

/// Route engine logs through the test writer. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(LevelFilter::DEBUG)
        .try_init();
}
