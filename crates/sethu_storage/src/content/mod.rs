pub mod composite;
pub mod metadata;
pub mod remote;
pub mod static_source;

pub use composite::CompositeSource;
pub use metadata::{MetadataEntry, MetadataTable};
pub use remote::RemoteSource;
pub use static_source::StaticSource;
