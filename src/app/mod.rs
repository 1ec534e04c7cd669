pub mod scanner_app;
pub mod views;

pub use scanner_app::ScannerApp;
pub use views::preview_view::PreviewView;
