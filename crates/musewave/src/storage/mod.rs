pub mod assets;

pub use assets::{AssetFile, AssetLayout, JobAssets};
