/// Install config validation
pub mod field;
pub mod machine_pool;
pub mod platform;
pub mod quantity;

pub use field::FieldPath;
pub use machine_pool::validate_machine_pool;
pub use platform::validate_platform;
