//! Integration tests for media upload over the in-memory blob store.

use docsync::{BlobStore, MediaStore, MemoryBlobStore};

#[tokio::test]
async fn test_upload_image_stores_jpeg_and_returns_url() {
    let blobs = MemoryBlobStore::new();
    let media = MediaStore::new(blobs.clone());

    let url = media
        .upload_image(vec![0xff, 0xd8, 0xff], "avatars/u1")
        .await
        .unwrap();

    assert!(url.starts_with("memory://avatars/u1/"));
    assert!(url.ends_with(".jpg"));

    let path = url.trim_start_matches("memory://").to_string();
    assert_eq!(blobs.bytes(&path).await, Some(vec![0xff, 0xd8, 0xff]));
    assert_eq!(blobs.content_type(&path).await.as_deref(), Some("image/jpeg"));

    // File name is the short uid plus extension: "<6 hex chars>.jpg".
    let file_name = path.rsplit('/').next().unwrap();
    assert_eq!(file_name.len(), 10);
}

#[tokio::test]
async fn test_uploads_do_not_collide() {
    let media = MediaStore::new(MemoryBlobStore::new());

    let first = media.upload_image(vec![1], "avatars/u1").await.unwrap();
    let second = media.upload_image(vec![2], "avatars/u1").await.unwrap();
    assert_ne!(first, second);

    let paths = media.store().list("avatars/u1/").await.unwrap();
    assert_eq!(paths.len(), 2);
}

#[tokio::test]
async fn test_fetch_bucket_resolves_all_urls() {
    let media = MediaStore::new(MemoryBlobStore::new());

    media.upload_image(vec![1], "gallery/g1").await.unwrap();
    media.upload_image(vec![2], "gallery/g1").await.unwrap();
    media.upload_image(vec![3], "gallery/other").await.unwrap();

    let urls = media.fetch_bucket("gallery/g1/").await.unwrap();
    assert_eq!(urls.len(), 2);
    assert!(urls.iter().all(|url| url.starts_with("memory://gallery/g1/")));
}

#[tokio::test]
async fn test_fetch_bucket_empty_prefix_is_empty() {
    let media = MediaStore::new(MemoryBlobStore::new());
    assert!(media.fetch_bucket("nothing/").await.unwrap().is_empty());
}
