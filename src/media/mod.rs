pub mod pipeline;
pub mod transcode;
