pub mod decoders;
pub mod drafts;
pub mod imap_client;
pub mod normalize;
pub mod ocr;
pub mod paginator;
pub mod store;
