pub mod package;
pub mod paragraphs;

pub use paragraphs::read_docx_paragraphs;
