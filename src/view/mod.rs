pub mod article_renderer;
pub mod error_renderer;
