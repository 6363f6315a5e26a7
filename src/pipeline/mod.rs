pub mod builder;

pub use builder::Pipeline;
