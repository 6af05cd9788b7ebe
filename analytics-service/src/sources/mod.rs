pub mod cardiac_csv_file;
pub mod panel_csv_file;

pub use cardiac_csv_file::CardiacCsvFileSource;
pub use panel_csv_file::PanelCsvFileSource;
