//! External media storage: the provider trait, the Cloudinary-backed
//! implementation, and an in-memory mock for tests.

mod cloudinary;
mod mock;
mod traits;
mod types;

pub use cloudinary::CloudinaryMedia;
pub use mock::{MockMedia, MockMediaStorage};
pub use traits::MediaStorage;
pub use types::{MediaStorageError, MediaUpload, StoredMedia, UploadOptions};
