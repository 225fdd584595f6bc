pub mod aoe2net_client;
pub mod source;

pub use aoe2net_client::Aoe2NetClient;
pub use source::MatchSource;
