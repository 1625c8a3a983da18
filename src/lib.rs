pub mod config;
pub mod logger;
pub mod post;
pub mod post_index;
mod text_utils;
pub mod html;
pub mod content;
pub mod view;
pub mod document;
pub mod headless;
pub mod fetch;
pub mod navigator;
mod test_data;
