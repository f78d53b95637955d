pub mod browser;
pub mod direct_downloader;
pub mod events;
pub mod filename;
pub mod http_client;
pub mod ledger;
pub mod queue;
pub mod url_parser;
