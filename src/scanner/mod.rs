pub mod scanner_client;

pub use scanner_client::ScannerClient;
