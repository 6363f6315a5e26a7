pub mod bridge;
pub mod demand;
pub mod error;
pub mod pipeline;
pub mod protocol;
pub mod source;
pub mod stage;
pub mod subscriber;

// Re-export the core surface at the crate root
pub use bridge::{BoxedPullStream, PullStream};
pub use error::{StreamError, StreamResult};
pub use pipeline::Pipeline;
pub use protocol::{Publisher, Subscriber, Subscription};
pub use source::VecPublisher;
pub use stage::{FilterPublisher, MapPublisher};
pub use subscriber::{CollectSubscriber, DemandStrategy, ForEachSubscriber};
