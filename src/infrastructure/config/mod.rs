mod settings;

pub use settings::{
    ApiConfig, MetadataConfig, NotifyConfig, OtelConfig, PollConfig, ResourcesConfig,
    ServerConfig, Settings,
};
