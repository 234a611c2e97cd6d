pub mod cipher;
pub mod error;
pub mod integrity;
pub mod layout;
pub mod metadata;
pub mod pipeline;
pub mod split;

pub use error::DecryptError;
pub use layout::FormatConfig;
pub use metadata::{extract_metadata, DataRange, FooterRecord, HeaderRecord, PdfMetadata};
pub use pipeline::{decrypt, DecryptionOutcome};
pub use split::{split_file, SplitOutcome};
