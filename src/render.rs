pub mod bitmap;
pub mod font;
