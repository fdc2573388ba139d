//! Data protection: consent settings, portability exports, erasure and
//! consent forms.

mod consent;
mod erase;
mod export;
mod forms;

pub use consent::ConsentSettings;
pub use erase::{CONFIRMATION, ErasureOutcome, ErasureScope, erase};
pub use export::{
    ExportFile, ExportScope, anonymize, anonymized_email, anonymized_label, build_export,
    export_as_csv, export_as_json,
};
pub use forms::{FormTemplate, forms_archive, render_form_html, render_form_pdf, send_forms};
