pub mod html_listing;
pub mod text_block;

pub use html_listing::HtmlListingParser;
pub use text_block::TextBlockParser;
