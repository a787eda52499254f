pub mod error;
pub mod consts;
pub mod survey;
pub mod profile;
pub mod cutout;
pub mod catalog;
pub mod sample;
pub mod scene;
pub mod shift;
pub mod render;
pub mod detect;
pub mod measure;
pub mod pipeline;
pub mod io;
