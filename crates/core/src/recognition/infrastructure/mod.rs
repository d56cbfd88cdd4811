pub mod equalized_feature_extractor;
pub mod in_memory_gallery_store;
pub mod sqlite_gallery_store;
